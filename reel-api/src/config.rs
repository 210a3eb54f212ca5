//! Server Configuration
//!
//! Everything the binary needs to wire a feed: where to listen, which
//! provider generates ideas and code, where merges happen, and where the
//! deployed component lives. Loaded from environment variables.

use reel_core::{ConfigError, FeedConfig, ReelError, ReelResult};
use reel_deploy::{DEFAULT_APPLY_BASE_URL, DEFAULT_APPLY_MODEL};
use reel_llm::providers::{DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// PROVIDER SELECTION
// ============================================================================

/// Backend used for ideas and code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    /// Offline: catalogue ideas and the built-in template
    Local,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Local => "local",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::ProviderNotSupported {
                provider: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub provider: LlmProvider,
    pub openai_model: String,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    /// OpenAI-compatible endpoint of the merge service
    pub apply_base_url: String,
    /// Without a key, generated code replaces the component wholesale
    pub apply_api_key: Option<String>,
    pub apply_model: String,
    /// Deploy into this directory; `None` keeps deploys in memory
    pub site_root: Option<PathBuf>,
    /// Fill the queue to capacity at startup
    pub warm_start: bool,
    pub log_format: LogFormat,
    pub feed: FeedConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            provider: LlmProvider::Local,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
            apply_base_url: DEFAULT_APPLY_BASE_URL.to_string(),
            apply_api_key: None,
            apply_model: DEFAULT_APPLY_MODEL.to_string(),
            site_root: None,
            warm_start: false,
            log_format: LogFormat::Pretty,
            feed: FeedConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REEL_API_BIND`: Bind address (default: 0.0.0.0)
    /// - `PORT` or `REEL_API_PORT`: Listen port (default: 3000)
    /// - `REEL_LLM_PROVIDER`: openai | anthropic | local (default: inferred from keys)
    /// - `REEL_OPENAI_MODEL` / `REEL_ANTHROPIC_MODEL`: Model names
    /// - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`: Provider keys
    /// - `REEL_APPLY_BASE_URL`, `REEL_APPLY_API_KEY`, `REEL_APPLY_MODEL`: Merge service
    /// - `REEL_SITE_ROOT`: Directory the component is deployed into
    /// - `REEL_WARM_START`: "true" to prefetch at startup (default: false)
    /// - `REEL_LOG_FORMAT`: "json" for JSON logs
    ///
    /// Feed settings come from [`FeedConfig::from_env`].
    pub fn from_env() -> ReelResult<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.feed = FeedConfig::from_env();
        Ok(config)
    }

    /// Build from an arbitrary variable lookup. Feed settings stay at defaults.
    pub fn from_lookup<F>(lookup: F) -> ReelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("REEL_API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ReelError::Config(ConfigError::InvalidValue {
                    field: "PORT".to_string(),
                    value: raw.clone(),
                    reason: "must be a port number".to_string(),
                })
            })?,
            None => defaults.port,
        };

        let openai_api_key = non_empty("OPENAI_API_KEY");
        let anthropic_api_key = non_empty("ANTHROPIC_API_KEY");

        let provider = match non_empty("REEL_LLM_PROVIDER") {
            Some(raw) => raw.parse::<LlmProvider>()?,
            None if openai_api_key.is_some() => LlmProvider::OpenAI,
            None if anthropic_api_key.is_some() => LlmProvider::Anthropic,
            None => LlmProvider::Local,
        };

        let log_format = match non_empty("REEL_LOG_FORMAT") {
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind: non_empty("REEL_API_BIND").unwrap_or(defaults.bind),
            port,
            provider,
            openai_model: non_empty("REEL_OPENAI_MODEL").unwrap_or(defaults.openai_model),
            anthropic_model: non_empty("REEL_ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            openai_api_key,
            anthropic_api_key,
            apply_base_url: non_empty("REEL_APPLY_BASE_URL").unwrap_or(defaults.apply_base_url),
            apply_api_key: non_empty("REEL_APPLY_API_KEY"),
            apply_model: non_empty("REEL_APPLY_MODEL").unwrap_or(defaults.apply_model),
            site_root: non_empty("REEL_SITE_ROOT").map(PathBuf::from),
            warm_start: non_empty("REEL_WARM_START")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_format,
            feed: defaults.feed,
        })
    }

    /// Validate the configuration.
    ///
    /// The selected provider must have a key, the bind address must parse,
    /// and the feed settings must be valid.
    pub fn validate(&self) -> ReelResult<()> {
        let missing_key = match self.provider {
            LlmProvider::OpenAI if self.openai_api_key.is_none() => Some("OPENAI_API_KEY"),
            LlmProvider::Anthropic if self.anthropic_api_key.is_none() => {
                Some("ANTHROPIC_API_KEY")
            }
            _ => None,
        };
        if let Some(field) = missing_key {
            return Err(ReelError::Config(ConfigError::MissingRequired {
                field: field.to_string(),
            }));
        }

        self.socket_addr()?;
        self.feed.validate()
    }

    /// Address the server listens on.
    pub fn socket_addr(&self) -> ReelResult<SocketAddr> {
        let ip = self.bind.parse::<IpAddr>().map_err(|_| {
            ReelError::Config(ConfigError::InvalidValue {
                field: "REEL_API_BIND".to_string(),
                value: self.bind.clone(),
                reason: "must be an IP address".to_string(),
            })
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("provider", &self.provider)
            .field("openai_model", &self.openai_model)
            .field("anthropic_model", &self.anthropic_model)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("apply_base_url", &self.apply_base_url)
            .field("apply_api_key", &redact(&self.apply_api_key))
            .field("apply_model", &self.apply_model)
            .field("site_root", &self.site_root)
            .field("warm_start", &self.warm_start)
            .field("log_format", &self.log_format)
            .field("feed", &self.feed)
            .finish()
    }
}
