use app_checker::bot::CommandHandler;
use app_checker::config::BotConfig;
use app_checker::db;
use app_checker::monitor::HttpProber;
use app_checker::telegram::poller::TelegramPoller;
use app_checker::telegram::TelegramClient;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "app-checker.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the log directory, so configuration comes first.
    let config = match BotConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    init_logging(&config.log_dir);
    info!("Starting app-checker, version: {}", VERSION);

    let db = match db::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to open the registry.");
            return Err(e.into());
        }
    };

    let prober = Arc::new(HttpProber::new(Duration::from_secs(config.probe_timeout_seconds))?);
    let telegram = Arc::new(TelegramClient::new(&config.telegram_api_url, &config.telegram_token));
    let handler = Arc::new(CommandHandler::from_parts(db, prober, telegram.clone()));

    let scheduler = handler.scheduler().clone();
    scheduler.reschedule(config.check_interval_seconds).await?;
    info!(
        check_interval_seconds = config.check_interval_seconds,
        "Health scheduler started."
    );

    let poller = TelegramPoller::new(
        telegram,
        handler,
        Duration::from_secs(config.poll_timeout_seconds),
    );

    tokio::select! {
        _ = poller.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal.");
            }
            info!("Shutdown signal received.");
        }
    }

    scheduler.stop().await;
    info!("app-checker stopped.");
    Ok(())
}
