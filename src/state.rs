use crate::backend::BackendClient;
use crate::config::Config;
use crate::qr::QrDisplay;
use std::time::Duration;

/// Shared state for the operator view.
///
/// Holds the configuration and a handle to the display loop; the handlers
/// never own any mutable state of their own.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub display: QrDisplay,
}

impl AppState {
    /// Builds the backend client and starts the display refresh loop.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = BackendClient::new(config.backend_url.clone(), config.fetch_timeout_seconds)?;

        let display = QrDisplay::spawn(
            client,
            config.company_id,
            config.frontend_base_url.clone(),
            Duration::from_millis(config.poll_interval_ms),
        );

        Ok(AppState { config, display })
    }
}
