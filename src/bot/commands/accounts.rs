//! Account Discord commands - overview, reactivation and the manual bulk pass.
//!
//! These commands replace the user list columns and the row/bulk actions of a
//! web admin screen. All of them require the ADMINISTRATOR permission.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{account, listing, scanner, settings},
        errors::{Error, Result},
    };
    use chrono::Utc;
    use tracing::info;

    /// Discord rejects messages above 2000 characters; leave room for the code fence.
    const PAGE_LIMIT: usize = 1900;

    /// Lists every account with its "Disabled" and "Last Login" columns.
    #[poise::command(
        slash_command,
        prefix_command,
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn users(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let rows = listing::list_accounts(db).await?;

        if rows.is_empty() {
            ctx.say("📋 No accounts found.").await?;
            return Ok(());
        }

        let disabled = rows.iter().filter(|row| row.is_disabled()).count();
        ctx.say(format!(
            "📋 **{} accounts**, {disabled} disabled",
            rows.len()
        ))
        .await?;

        for page in listing::paginate(&rows, PAGE_LIMIT) {
            ctx.say(format!("```\n{page}\n```")).await?;
        }
        Ok(())
    }

    /// Reactivates a disabled account so it can log in again.
    #[poise::command(
        slash_command,
        prefix_command,
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn reactivate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Account ID to reactivate"] account_id: i64,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let Some(found) = account::get_account_by_id(db, account_id).await? else {
            ctx.say(format!("❌ No account with ID {account_id}."))
                .await?;
            return Ok(());
        };

        if account::reactivate(db, account_id).await? {
            info!(account_id, by = %ctx.author().name, "Account reactivated from Discord");
            ctx.say(format!("✅ User **{}** reactivated.", found.display_name))
                .await?;
        } else {
            ctx.say(format!("ℹ️ User **{}** was not disabled.", found.display_name))
                .await?;
        }
        Ok(())
    }

    /// Reactivates every disabled account.
    #[poise::command(
        slash_command,
        prefix_command,
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn reactivate_all(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let ids = account::reactivate_all(db).await?;

        if ids.is_empty() {
            ctx.say("ℹ️ There are no disabled users.").await?;
        } else {
            info!(count = ids.len(), by = %ctx.author().name, "All accounts reactivated from Discord");
            ctx.say(format!("✅ {} users reactivated.", ids.len())).await?;
        }
        Ok(())
    }

    /// Runs the bulk disable pass now instead of waiting for the daily run.
    #[poise::command(
        slash_command,
        prefix_command,
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn scan(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let now = Utc::now();
        let config = settings::load_settings(db, now).await?;

        let result = scanner::scan_and_disable(db, &config, now).await?;
        ctx.say(format!(
            "🔍 Checked {} accounts, disabled {}.",
            result.evaluated,
            result.newly_disabled.len()
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
