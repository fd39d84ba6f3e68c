pub mod commands;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;

use crate::config::AppSettings;
use crate::core::registry::AppRegistry;
use crate::core::remote::HttpSource;
use crate::models::error::SError;
use crate::models::paths::ManagerPaths;
use crate::utils::context::EventSink;
use crate::utils::logging::{init_logging, LoggingGuard};
use std::sync::Arc;
use tracing::info;

/// Everything a shell holds on to while the process runs.
pub struct Session {
    pub settings: AppSettings,
    /// `None` until a target root has been chosen with `AppRegistry::initialize`.
    pub registry: Option<AppRegistry>,
    _logging: LoggingGuard,
}

/// Loads the stored settings, then starts logging and opens the registry.
pub fn start(events: EventSink) -> Result<Session, SError> {
    start_with(AppSettings::load()?, events)
}

pub fn start_with(settings: AppSettings, events: EventSink) -> Result<Session, SError> {
    let paths = ManagerPaths::new(&settings.home);
    let logging = init_logging(&paths.logs)?;
    info!("starting with home {}", settings.home);

    let registry = bootstrap(&settings, events)?;

    Ok(Session {
        settings,
        registry,
        _logging: logging,
    })
}

/// Opens the registry with the HTTP remote described by `settings`.
/// `Ok(None)` on first run, when a target root still has to be chosen.
pub fn bootstrap(settings: &AppSettings, events: EventSink) -> Result<Option<AppRegistry>, SError> {
    AppRegistry::open(settings, http_source(settings), events)
}

pub fn http_source(settings: &AppSettings) -> Arc<HttpSource> {
    Arc::new(HttpSource::new(
        settings.http_timeout_secs,
        settings.patch_base_url.clone(),
    ))
}
