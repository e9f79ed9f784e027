//! Configuration module for the voicebridge gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voicebridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port
pub const DEFAULT_PORT: u16 = 8000;
/// Voice used when the client setup omits one
pub const DEFAULT_VOICE_NAME: &str = "Aoede";
/// VAD silence window used when the client setup omits one
pub const DEFAULT_SILENCE_DURATION_MS: u64 = 1000;
/// Sample rate of client microphone audio
pub const DEFAULT_INPUT_SAMPLE_RATE: u32 = 16000;
/// Agent websocket handshake timeout
pub const DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains:
/// - Bind address and optional TLS
/// - Agent runtime endpoint and credentials
/// - Session defaults applied when the client setup omits a value
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Agent runtime
    /// Websocket endpoint of the agent runtime (ws:// or wss://)
    pub agent_url: String,
    /// Bearer token presented to the agent runtime
    pub agent_api_key: Option<String>,
    /// Handshake timeout for the agent websocket
    pub agent_connect_timeout_seconds: u64,

    // Session defaults
    pub default_voice_name: String,
    pub default_silence_duration_ms: u64,
    /// Sample rate advertised with client audio (audio/pcm;rate=N)
    pub input_sample_rate: u32,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            agent_url: crate::core::agent::websocket::DEFAULT_AGENT_URL.to_string(),
            agent_api_key: None,
            agent_connect_timeout_seconds: DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS,
            default_voice_name: DEFAULT_VOICE_NAME.to_string(),
            default_silence_duration_ms: DEFAULT_SILENCE_DURATION_MS,
            input_sample_rate: DEFAULT_INPUT_SAMPLE_RATE,
            cors_allowed_origins: None,
        }
    }
}

/// Zeroize the agent credential when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.agent_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults)
    ///
    /// The .env file, if any, is loaded in main.rs before this is called.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_server_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;

        validation::validate_server_config(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn agent_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_connect_timeout_seconds)
    }

    /// Websocket agent settings derived from this configuration
    pub fn agent_config(&self) -> crate::core::agent::WebSocketAgentConfig {
        let config = crate::core::agent::WebSocketAgentConfig::new(self.agent_url.clone())
            .with_connect_timeout(self.agent_connect_timeout());
        match &self.agent_api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }
}
