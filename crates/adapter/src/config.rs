//! API client configuration
//!
//! Read from `MINES_*` environment variables; anything unset or unparsable
//! falls back to the default.

use std::env;
use std::time::Duration;

use url::Url;

use crate::protocol::Device;
use crate::types::Theme;

/// Connection and identity settings for [`crate::HttpApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub player_id: Option<String>,
    pub sub_partner_id: Option<String>,
    pub theme: Theme,
    pub device: Device,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            token: None,
            player_id: None,
            sub_partner_id: None,
            theme: Theme::default(),
            device: Device::Desktop,
            request_timeout_ms: 10_000,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .and_then(|s| if s.is_empty() { None } else { Some(s) })
}

impl ApiConfig {
    /// Create from environment variables
    ///
    /// - `MINES_API_URL`: server base URL
    /// - `MINES_API_TOKEN`: `authorization` header
    /// - `MINES_PLAYER_ID`: `apikey` header
    /// - `MINES_SUBPARTNER_ID`: `subpartnerid` header
    /// - `MINES_THEME`: game variant (`default`, `turbomines`, `testb`, ...)
    /// - `MINES_DEVICE`: `desktop` or `mobile`
    /// - `MINES_API_TIMEOUT_MS`: per-request timeout
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = non_empty("MINES_API_URL").unwrap_or(defaults.base_url);
        let theme = non_empty("MINES_THEME")
            .map(Theme::new)
            .unwrap_or(defaults.theme);
        let device = non_empty("MINES_DEVICE")
            .and_then(|s| s.parse::<Device>().ok())
            .unwrap_or(defaults.device);
        let request_timeout_ms = env::var("MINES_API_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.request_timeout_ms);

        Self {
            base_url,
            token: non_empty("MINES_API_TOKEN"),
            player_id: non_empty("MINES_PLAYER_ID"),
            sub_partner_id: non_empty("MINES_SUBPARTNER_ID"),
            theme,
            device,
            request_timeout_ms,
        }
    }

    /// Base URL normalised to end with `/` so relative joins keep its path.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}
