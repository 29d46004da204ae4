use receptionist_core::language::{self, LanguageProviderSettings};
use receptionist_core::voice::{self, VoiceProviderSettings};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{Level, warn};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Upper bound on every outbound provider request.
    pub http_timeout: Duration,
    pub voice: VoiceProviderSettings,
    pub language: LanguageProviderSettings,
}

/// Reads an environment variable, treating empty values as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            optional_var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5001".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = optional_var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let http_timeout = match optional_var("HTTP_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if (1..=MAX_HTTP_TIMEOUT_SECS).contains(&secs) => {
                    Duration::from_secs(secs)
                }
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "HTTP_TIMEOUT_SECS".to_string(),
                        format!("'{raw}' must be a whole number of seconds between 1 and {MAX_HTTP_TIMEOUT_SECS}"),
                    ));
                }
            },
        };

        let voice = VoiceProviderSettings {
            api_key: optional_var("BLAND_AI_API_KEY"),
            base_url: optional_var("BLAND_AI_BASE_URL")
                .unwrap_or_else(|| voice::DEFAULT_BASE_URL.to_string()),
            flow_id: optional_var("BLAND_AI_FLOW_UUID"),
            webhook_url: optional_var("BLAND_AI_WEBHOOK_URL")
                .unwrap_or_else(|| voice::DEFAULT_WEBHOOK_URL.to_string()),
            from_number: optional_var("BLAND_AI_FROM_NUMBER"),
        };

        let language = LanguageProviderSettings {
            api_key: optional_var("GEMINI_API_KEY"),
            base_url: optional_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| language::DEFAULT_BASE_URL.to_string()),
            model: optional_var("GEMINI_MODEL")
                .unwrap_or_else(|| language::DEFAULT_MODEL.to_string()),
        };

        Ok(Self {
            bind_address,
            log_level,
            http_timeout,
            voice,
            language,
        })
    }

    /// Lists settings that still need attention before production use.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.voice.api_key.is_none() {
            warnings.push("BLAND_AI_API_KEY is not set. Calls cannot be ended or spoken into.".to_string());
        }
        if self.voice.flow_id.is_none() {
            warnings.push("BLAND_AI_FLOW_UUID is not set. Calls will use the provider's default flow.".to_string());
        }
        if self.voice.webhook_url == voice::DEFAULT_WEBHOOK_URL {
            warnings.push(format!(
                "BLAND_AI_WEBHOOK_URL is using the placeholder {}. Call events will not reach this service.",
                voice::DEFAULT_WEBHOOK_URL
            ));
        }
        if self.language.api_key.is_none() {
            warnings.push("GEMINI_API_KEY is not set. Language requests will be rejected.".to_string());
        }
        warnings
    }

    /// Logs every entry of [`Config::warnings`].
    pub fn log_warnings(&self) {
        for warning in self.warnings() {
            warn!("{warning}");
        }
    }
}
