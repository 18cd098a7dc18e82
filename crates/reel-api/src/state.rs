//! Application state.

use reel_worker::MontageManager;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub manager: MontageManager,
}

impl AppState {
    pub fn new(config: ApiConfig, manager: MontageManager) -> Self {
        Self { config, manager }
    }
}
