use std::sync::Arc;

use kudos_core::clock::SystemClock;
use kudos_core::config::{AppConfig, ConfigError, LoadOptions};
use kudos_db::{connect_grant_repository, redact_credentials, GrantRepository, RepositoryError};
use kudos_slack::web_api::WebApiError;
use kudos_slack::{
    kudos_dispatcher, KudosService, ReconnectPolicy, ReqwestSlackWebApi, SocketModeRunner,
    WebSocketTransport,
};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub repository: Arc<dyn GrantRepository>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("grant store connection failed: {0}")]
    Store(#[source] RepositoryError),
    #[error("slack web api client could not be built: {0}")]
    SlackClient(#[source] WebApiError),
}

/// Missing or invalid configuration is fatal before anything else starts.
pub fn load_config(options: LoadOptions) -> Result<AppConfig, BootstrapError> {
    Ok(AppConfig::load(options)?)
}

pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        store = %redact_credentials(&config.database.url),
        "starting application bootstrap"
    );

    let repository =
        connect_grant_repository(&config.database).await.map_err(BootstrapError::Store)?;

    // Indexes and schema only speed up reads; the bot still serves without them.
    match repository.prepare().await {
        Ok(()) => info!(
            event_name = "system.bootstrap.store_prepared",
            correlation_id = "bootstrap",
            "grant store prepared"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.store_prepare_failed",
            correlation_id = "bootstrap",
            error = %error,
            "grant store preparation failed; continuing"
        ),
    }

    let web_api = ReqwestSlackWebApi::new(
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    )
    .map_err(BootstrapError::SlackClient)?;
    let service = Arc::new(KudosService::new(
        repository.clone(),
        Arc::new(web_api),
        SystemClock,
        config.kudos.clone(),
    ));
    let transport =
        WebSocketTransport::new(config.slack.api_base_url.clone(), config.slack.app_token.clone());
    let slack_runner = SocketModeRunner::new(
        Arc::new(transport),
        kudos_dispatcher(service),
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        official_channel = %config.kudos.official_channel_id,
        monthly_limit = config.kudos.monthly_limit,
        "application wired"
    );

    Ok(Application { config, repository, slack_runner })
}
