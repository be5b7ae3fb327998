//! General Discord commands - ping and help.
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Inactive Account Guard Help**\n\
        Accounts that don't log in for the configured number of days are disabled.\n\n\
        **Account Commands** (administrators only)\n\
        • `/users` - Lists accounts with their Disabled and Last Login columns.\n\
        • `/reactivate <account_id>` - Reactivates one disabled account.\n\
        • `/reactivate_all` - Reactivates every disabled account.\n\
        • `/scan` - Runs the bulk disable pass now.\n\n\
        **Settings Commands** (administrators only)\n\
        • `/settings show` - Shows the current inactivity settings.\n\
        • `/settings set [...]` - Changes one or more settings.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
