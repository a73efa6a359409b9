mod bootstrap;
mod health;

use anyhow::Result;
use kudos_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use kudos_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = bootstrap::load_config(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap(config).await?;

    health::spawn(&app.config.server.bind_address, app.config.server.health_check_port).await?;

    match app.repository.count().await {
        Ok(grants) => tracing::info!(
            event_name = "system.server.ledger_reachable",
            correlation_id = "bootstrap",
            grants,
            "grant ledger reachable"
        ),
        Err(error) => tracing::warn!(
            event_name = "system.server.ledger_unreachable",
            correlation_id = "bootstrap",
            error = %error,
            "grant ledger unreachable; views will render empty until it recovers"
        ),
    }

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "kudos bot connecting to slack"
    );

    tokio::select! {
        result = app.slack_runner.start() => result?,
        signal = tokio::signal::ctrl_c() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "kudos bot stopping"
    );

    Ok(())
}
