use chrono::Utc;
use dotenvy::dotenv;
use inactive_guard::{
    bot::{self, BotData},
    config::{self, database},
    core::{jobs::JobContext, lifecycle, notification::Notifier, scheduler},
    errors::{Error, Result},
    mail::{Mailer, Transport},
};
use std::{env, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the deployment configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load config.toml: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Connect to the database and create missing tables
    std::fs::create_dir_all("data")?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Store default settings and register the daily passes
    let settings = lifecycle::activate(&db, Utc::now()).await?;
    info!(
        days_limit = settings.days_limit,
        auto_disable = settings.auto_disable_enabled,
        "Guard activated"
    );

    // 6. Start the scheduler
    let transport = Transport::from_config(&app_config.mail)?;
    let mailer = Mailer::new(transport, &app_config.mail.from)?;
    let notifier = Notifier::new(mailer, &app_config);
    let tick = Duration::from_secs(app_config.scheduler.tick_seconds.max(1));
    tokio::spawn(scheduler::run_forever(
        JobContext::new(db.clone(), notifier),
        tick,
    ));

    // 7. Run the bot
    // DISCORD_BOT_TOKEN is loaded directly before use, not stored in AppConfig
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, BotData::new(db)).await
}
