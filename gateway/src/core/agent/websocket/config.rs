//! Connection settings for the websocket agent runtime.

use std::time::Duration;

use crate::core::agent::base::{AgentError, AgentResult};

/// Default agent runtime endpoint.
pub const DEFAULT_AGENT_URL: &str = "ws://127.0.0.1:9000/live";

/// Default time allowed for the websocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct WebSocketAgentConfig {
    pub url: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for WebSocketAgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketAgentConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for WebSocketAgentConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_AGENT_URL.to_string(),
            api_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl WebSocketAgentConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check that the endpoint is a `ws://` or `wss://` URL.
    pub fn validate(&self) -> AgentResult<()> {
        let parsed = url::Url::parse(&self.url).map_err(|e| {
            AgentError::InvalidConfiguration(format!("Invalid agent URL '{}': {e}", self.url))
        })?;
        match parsed.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(AgentError::InvalidConfiguration(format!(
                "Agent URL must use ws or wss, got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebSocketAgentConfig::default();
        assert_eq!(config.url, DEFAULT_AGENT_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_http_scheme() {
        let config = WebSocketAgentConfig::new("http://localhost:9000");
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(WebSocketAgentConfig::new("not a url").validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = WebSocketAgentConfig::default().with_api_key("secret-key");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
