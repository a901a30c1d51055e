//! Application state

use std::sync::Arc;

use payrelay_notify::NotifyService;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub notify: Arc<NotifyService>,
}

impl AppState {
    pub fn new(config: Config, notify: NotifyService) -> Self {
        Self {
            config,
            notify: Arc::new(notify),
        }
    }
}
