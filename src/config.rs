use std::env;

/// Runtime configuration for the QR display client.
///
/// Everything is environment-driven with deploy-friendly defaults; there are
/// no CLI arguments and no persisted local state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the deployed attendance backend (FastAPI on Render).
    pub backend_url: String,
    /// Base URL embedded into the QR deep link. Empty means the deep link is
    /// emitted relative (`/?...`) so the view can be opened standalone.
    pub frontend_base_url: String,
    /// Company whose rotating token this display tracks.
    pub company_id: i64,
    /// Poll interval for the display refresh loop, in milliseconds.
    pub poll_interval_ms: u64,
    /// Timeout applied to each backend request, in seconds.
    pub fetch_timeout_seconds: u64,
    /// Port for the operator view.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = normalize_base_url(
            &env::var("BACKEND_URL")
                .unwrap_or_else(|_| "https://python-c5i8.onrender.com".to_string()),
        );
        url::Url::parse(&backend_url)
            .map_err(|e| anyhow::anyhow!("BACKEND_URL is not a valid URL: {}", e))?;

        let frontend_base_url =
            normalize_base_url(&env::var("FRONTEND_BASE_URL").unwrap_or_default());
        if !frontend_base_url.is_empty() {
            url::Url::parse(&frontend_base_url)
                .map_err(|e| anyhow::anyhow!("FRONTEND_BASE_URL is not a valid URL: {}", e))?;
        }

        Ok(Config {
            backend_url,
            frontend_base_url,
            company_id: env::var("COMPANY_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()?,
            fetch_timeout_seconds: env::var("FETCH_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
        })
    }
}

/// Strips trailing slashes so URL joins never produce `//`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
