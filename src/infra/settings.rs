//! Usage: Client settings (schema + TOML loading + sanitizing).

use crate::shared::security::mask_token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_BASE_URL: &str = "https://api.vimeo.com";
pub const DEFAULT_API_VERSION: &str = "3.4";
const DEFAULT_USER_AGENT: &str = concat!("vimeo-networking-rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u32 = 60;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 8_000;
const DEFAULT_RESPONSE_CACHE_MAX_ENTRIES: u32 = 512;
const DEFAULT_MIN_PIN_CODE_POLL_INTERVAL_SECONDS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "info";
const MAX_REQUEST_TIMEOUT_SECONDS: u32 = 10 * 60;
const MAX_RETRY_BASE_DELAY_MS: u64 = 60_000;
const MAX_RETRY_MAX_DELAY_MS: u64 = 5 * 60_000;
const MAX_RESPONSE_CACHE_MAX_ENTRIES: u32 = 100_000;
const MAX_MIN_PIN_CODE_POLL_INTERVAL_SECONDS: u32 = 5 * 60;
pub const MIN_PIN_CODE_POLL_INTERVAL_SECONDS: u32 = 1;

pub const ENV_CLIENT_IDENTIFIER: &str = "VIMEO_CLIENT_IDENTIFIER";
pub const ENV_CLIENT_SECRET: &str = "VIMEO_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "VIMEO_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings toml: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub schema_version: u32,
    pub base_url: String,
    pub api_version: String,
    pub client_identifier: String,
    pub client_secret: String,
    pub user_agent: String,
    // 0 is not allowed; sanitize resets it to the default.
    pub request_timeout_seconds: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub response_cache_max_entries: u32,
    // Lower bound applied to the interval the server hands out for pin code polling.
    pub min_pin_code_poll_interval_seconds: u32,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client_identifier: String::new(),
            client_secret: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            response_cache_max_entries: DEFAULT_RESPONSE_CACHE_MAX_ENTRIES,
            min_pin_code_poll_interval_seconds: DEFAULT_MIN_PIN_CODE_POLL_INTERVAL_SECONDS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("schema_version", &self.schema_version)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("client_identifier", &self.client_identifier)
            .field("client_secret", &mask_token(&self.client_secret))
            .field("user_agent", &self.user_agent)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("response_cache_max_entries", &self.response_cache_max_entries)
            .field(
                "min_pin_code_poll_interval_seconds",
                &self.min_pin_code_poll_interval_seconds,
            )
            .field("log_filter", &self.log_filter)
            .finish()
    }
}

impl ClientSettings {
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let mut settings: ClientSettings = toml::from_str(content)?;
        if settings.sanitize() {
            tracing::debug!("client settings sanitized after load");
        }
        Ok(settings)
    }

    /// Environment wins over file values for credentials and base URL.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(value) = read(ENV_CLIENT_IDENTIFIER) {
            self.client_identifier = value;
        }
        if let Some(value) = read(ENV_CLIENT_SECRET) {
            self.client_secret = value;
        }
        if let Some(value) = read(ENV_BASE_URL) {
            self.base_url = value;
        }
    }

    /// Returns `true` when any field was adjusted.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;
        changed |= sanitize_urls(self);
        changed |= sanitize_request_timeout(self);
        changed |= sanitize_retry_delays(self);
        changed |= sanitize_cache_and_polling(self);
        changed
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_seconds.max(1)))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn accept_header(&self) -> String {
        format!("application/vnd.vimeo.*+json;version={}", self.api_version)
    }

    pub fn has_app_credentials(&self) -> bool {
        !self.client_identifier.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

fn sanitize_urls(settings: &mut ClientSettings) -> bool {
    let mut changed = false;

    let trimmed = settings.base_url.trim().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        settings.base_url = DEFAULT_BASE_URL.to_string();
        changed = true;
    } else if trimmed != settings.base_url {
        settings.base_url = trimmed;
        changed = true;
    }

    if settings.api_version.trim().is_empty() {
        settings.api_version = DEFAULT_API_VERSION.to_string();
        changed = true;
    }
    if settings.user_agent.trim().is_empty() {
        settings.user_agent = DEFAULT_USER_AGENT.to_string();
        changed = true;
    }

    changed
}

fn sanitize_request_timeout(settings: &mut ClientSettings) -> bool {
    if settings.request_timeout_seconds == 0 {
        settings.request_timeout_seconds = DEFAULT_REQUEST_TIMEOUT_SECONDS;
        return true;
    }
    if settings.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS {
        settings.request_timeout_seconds = MAX_REQUEST_TIMEOUT_SECONDS;
        return true;
    }
    false
}

fn sanitize_retry_delays(settings: &mut ClientSettings) -> bool {
    let mut changed = false;

    if settings.retry_base_delay_ms > MAX_RETRY_BASE_DELAY_MS {
        settings.retry_base_delay_ms = MAX_RETRY_BASE_DELAY_MS;
        changed = true;
    }
    if settings.retry_max_delay_ms > MAX_RETRY_MAX_DELAY_MS {
        settings.retry_max_delay_ms = MAX_RETRY_MAX_DELAY_MS;
        changed = true;
    }
    if settings.retry_max_delay_ms < settings.retry_base_delay_ms {
        settings.retry_max_delay_ms = settings.retry_base_delay_ms;
        changed = true;
    }

    changed
}

fn sanitize_cache_and_polling(settings: &mut ClientSettings) -> bool {
    let mut changed = false;

    if settings.response_cache_max_entries == 0 {
        settings.response_cache_max_entries = DEFAULT_RESPONSE_CACHE_MAX_ENTRIES;
        changed = true;
    }
    if settings.response_cache_max_entries > MAX_RESPONSE_CACHE_MAX_ENTRIES {
        settings.response_cache_max_entries = MAX_RESPONSE_CACHE_MAX_ENTRIES;
        changed = true;
    }
    if settings.min_pin_code_poll_interval_seconds < MIN_PIN_CODE_POLL_INTERVAL_SECONDS {
        settings.min_pin_code_poll_interval_seconds = MIN_PIN_CODE_POLL_INTERVAL_SECONDS;
        changed = true;
    }
    if settings.min_pin_code_poll_interval_seconds > MAX_MIN_PIN_CODE_POLL_INTERVAL_SECONDS {
        settings.min_pin_code_poll_interval_seconds = MAX_MIN_PIN_CODE_POLL_INTERVAL_SECONDS;
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_have_current_schema_version() {
        let settings = ClientSettings::default();
        assert_eq!(settings.schema_version, SCHEMA_VERSION);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert!(!settings.has_app_credentials());
    }

    #[test]
    fn toml_uses_defaults_for_missing_fields() {
        let settings = ClientSettings::from_toml_str(
            r#"
            client_identifier = "id"
            client_secret = "secret"
            "#,
        )
        .expect("parse settings");
        assert!(settings.has_app_credentials());
        assert_eq!(settings.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn toml_rejects_invalid_input() {
        let err = ClientSettings::from_toml_str("request_timeout_seconds = \"soon\"")
            .expect_err("type mismatch");
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ClientSettings::read(&dir.path().join("absent.toml")).expect_err("missing file");
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn read_loads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "base_url = \"https://example.test/\"\n").expect("write settings");

        let settings = ClientSettings::read(&path).expect("read settings");
        assert_eq!(settings.base_url, "https://example.test");
    }

    #[test]
    fn sanitize_resets_zero_timeout_and_clamps_excess() {
        let mut settings = ClientSettings {
            request_timeout_seconds: 0,
            ..ClientSettings::default()
        };
        assert!(settings.sanitize());
        assert_eq!(settings.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);

        settings.request_timeout_seconds = MAX_REQUEST_TIMEOUT_SECONDS + 1;
        assert!(settings.sanitize());
        assert_eq!(settings.request_timeout_seconds, MAX_REQUEST_TIMEOUT_SECONDS);
    }

    #[test]
    fn sanitize_raises_zero_poll_interval_to_floor() {
        let mut settings = ClientSettings {
            min_pin_code_poll_interval_seconds: 0,
            ..ClientSettings::default()
        };
        assert!(settings.sanitize());
        assert_eq!(
            settings.min_pin_code_poll_interval_seconds,
            MIN_PIN_CODE_POLL_INTERVAL_SECONDS
        );
    }

    #[test]
    fn sanitize_keeps_max_delay_above_base() {
        let mut settings = ClientSettings {
            retry_base_delay_ms: 2_000,
            retry_max_delay_ms: 100,
            ..ClientSettings::default()
        };
        assert!(settings.sanitize());
        assert_eq!(settings.retry_max_delay_ms, 2_000);
    }

    #[test]
    fn sanitize_no_change_for_valid_values() {
        let mut settings = ClientSettings::default();
        assert!(!settings.sanitize());
    }

    #[test]
    fn env_overrides_replace_credentials_and_ignore_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CLIENT_IDENTIFIER, "env-id"),
            (ENV_CLIENT_SECRET, "   "),
            (ENV_BASE_URL, "https://staging.example.test"),
        ]);
        let mut settings = ClientSettings {
            client_secret: "file-secret".to_string(),
            ..ClientSettings::default()
        };
        settings.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.client_identifier, "env-id");
        assert_eq!(settings.client_secret, "file-secret");
        assert_eq!(settings.base_url, "https://staging.example.test");
    }

    #[test]
    fn debug_masks_client_secret() {
        let settings = ClientSettings {
            client_identifier: "client-id".to_string(),
            client_secret: "s3cr3t-value-0123456789".to_string(),
            ..ClientSettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("client-id"));
        assert!(!rendered.contains("s3cr3t-value-0123456789"));
    }

    #[test]
    fn accept_header_carries_api_version() {
        let settings = ClientSettings::default();
        assert_eq!(
            settings.accept_header(),
            format!("application/vnd.vimeo.*+json;version={DEFAULT_API_VERSION}")
        );
    }
}
