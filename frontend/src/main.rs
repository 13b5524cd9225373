mod app;
mod ui;

use std::sync::Arc;

use dioxus::prelude::*;
use nosmoke_core::storage::LocalStorage;
use nosmoke_core::{ApiClient, Config, DomainStore, SessionStore};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{Services, StartupError};

fn main() {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e.to_string())),
    };

    let log_dir = config.data_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "nosmoke.log");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(file_appender))
        .init();

    if let Some(err) = config_error {
        error!(error = %err, "invalid config, falling back to defaults");
    }
    info!(api = %config.api_url, data_dir = %log_dir.display(), "starting dashboard");

    match ApiClient::from_config(&config) {
        Ok(api) => {
            let services = Services {
                session: SessionStore::new(api.clone(), LocalStorage::new(config.data_dir())),
                domain: DomainStore::new(api, config.dashboard.clone()),
                config: Arc::new(config),
            };
            LaunchBuilder::new().with_context(services).launch(app::App);
        }
        Err(e) => {
            error!(error = %e, "cannot build backend client");
            LaunchBuilder::new()
                .with_context(StartupError(e.to_string()))
                .launch(app::StartupErrorApp);
        }
    }
}
