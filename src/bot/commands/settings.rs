//! Settings Discord commands - show and change the inactivity policy.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{
            lifecycle,
            settings::{PluginConfig, SettingsInput, load_settings},
        },
        errors::{Error, Result},
    };
    use chrono::Utc;
    use tracing::info;

    /// Choices offered for the notification target
    #[derive(Debug, poise::ChoiceParameter)]
    pub enum TargetChoice {
        #[name = "none"]
        None,
        #[name = "customer"]
        Customer,
        #[name = "administrator"]
        Administrator,
        #[name = "all"]
        All,
    }

    impl TargetChoice {
        const fn as_str(&self) -> &'static str {
            match self {
                Self::None => "none",
                Self::Customer => "customer",
                Self::Administrator => "administrator",
                Self::All => "all",
            }
        }
    }

    fn describe(config: &PluginConfig) -> String {
        let roles = config
            .excluded_roles
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "⚙️ **Inactivity settings**\n\
            • Days limit: **{}**\n\
            • Activation date: {}\n\
            • Excluded roles: {}\n\
            • Automatic disable: {}\n\
            • Notify on disable: {}\n\
            • Reminders: {}",
            config.days_limit,
            config.activation_date.format("%Y-%m-%d %H:%M"),
            if roles.is_empty() { "-" } else { roles.as_str() },
            if config.auto_disable_enabled { "on" } else { "off" },
            config.notification_target,
            if config.send_reminders { "on" } else { "off" },
        )
    }

    /// Parent command for the inactivity settings.
    #[poise::command(
        slash_command,
        subcommands("settings_show", "settings_set"),
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn settings(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Settings command. Available subcommands:\n\
            `/settings show` - Show the current settings\n\
            `/settings set` - Change one or more settings";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows the current inactivity settings.
    #[poise::command(
        slash_command,
        rename = "show",
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn settings_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let config = load_settings(db, Utc::now()).await?;
        ctx.say(describe(&config)).await?;
        Ok(())
    }

    /// Changes the inactivity settings. Omitted options keep their value.
    #[poise::command(
        slash_command,
        rename = "set",
        required_permissions = "ADMINISTRATOR",
        default_member_permissions = "ADMINISTRATOR"
    )]
    pub async fn settings_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Days without login before an account is disabled"] days_limit: Option<
            i64,
        >,
        #[description = "Activation date (YYYY-MM-DD)"] activation_date: Option<String>,
        #[description = "Comma-separated roles that are never disabled"] excluded_roles: Option<
            String,
        >,
        #[description = "Disable inactive accounts daily"] auto_disable: Option<bool>,
        #[description = "Who is notified when an account is disabled"] notify: Option<
            TargetChoice,
        >,
        #[description = "Email users the day before they are disabled"] reminders: Option<bool>,
    ) -> Result<()> {
        let input = SettingsInput {
            days_limit,
            activation_date,
            excluded_roles: excluded_roles
                .map(|roles| roles.split(',').map(str::to_string).collect()),
            auto_disable_enabled: auto_disable,
            notification_target: notify.map(|choice| choice.as_str().to_string()),
            send_reminders: reminders,
        };

        let db = &ctx.data().database;
        match lifecycle::apply_settings(db, input, Utc::now()).await {
            Ok(config) => {
                info!(by = %ctx.author().name, "Settings updated from Discord");
                ctx.say(format!("✅ Settings saved.\n{}", describe(&config)))
                    .await?;
            }
            Err(Error::Config { message }) => {
                ctx.say(format!("❌ {message}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
