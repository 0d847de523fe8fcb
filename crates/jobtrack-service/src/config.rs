use std::fmt;
use std::time::Duration;

use jobtrack_completion::groq::DEFAULT_GROQ_BASE_URL;
use jobtrack_completion::GroqConfig;
use jobtrack_storage::notion::DEFAULT_NOTION_BASE_URL;
use jobtrack_storage::{HttpClientConfig, NotionConfig};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_EXTRACTION_MODEL: &str = "mistral-saba-24b";
pub const DEFAULT_COMPARISON_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Debug,
    Release,
}

impl RunMode {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("release") => Self::Release,
            _ => Self::Debug,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Release => "info",
            Self::Debug => "debug,hyper=info,reqwest=info",
        }
    }
}

/// Process-wide settings, read once at start-up and passed down explicitly.
#[derive(Clone)]
pub struct RelayConfig {
    pub groq_api_key: String,
    pub notion_api_key: String,
    pub notion_database_id: String,
    pub port: u16,
    pub mode: RunMode,
    pub groq_base_url: String,
    pub notion_base_url: String,
    pub extraction_model: String,
    pub comparison_model: String,
    pub http_timeout: Duration,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("groq_api_key", &"<redacted>")
            .field("notion_api_key", &"<redacted>")
            .field("notion_database_id", &self.notion_database_id)
            .field("port", &self.port)
            .field("mode", &self.mode)
            .field("groq_base_url", &self.groq_base_url)
            .field("notion_base_url", &self.notion_base_url)
            .field("extraction_model", &self.extraction_model)
            .field("comparison_model", &self.comparison_model)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port: u16 = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };
        let timeout_secs: u64 = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                value: raw.clone(),
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            groq_api_key: required("GROQ_API_KEY")?,
            notion_api_key: required("NOTION_API_KEY")?,
            notion_database_id: required("NOTION_DATABASE_ID")?,
            port,
            mode: RunMode::from_env_value(get("MODE").as_deref()),
            groq_base_url: get("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            notion_base_url: get("NOTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string()),
            extraction_model: get("EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            comparison_model: get("COMPARISON_MODEL")
                .unwrap_or_else(|| DEFAULT_COMPARISON_MODEL.to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.http_timeout,
            ..HttpClientConfig::default()
        }
    }

    pub fn notion_config(&self) -> NotionConfig {
        NotionConfig {
            api_key: self.notion_api_key.clone(),
            database_id: self.notion_database_id.clone(),
            base_url: self.notion_base_url.clone(),
        }
    }

    pub fn groq_config(&self) -> GroqConfig {
        GroqConfig {
            api_key: self.groq_api_key.clone(),
            base_url: self.groq_base_url.clone(),
        }
    }
}
