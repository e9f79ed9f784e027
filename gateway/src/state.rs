use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::agent::{AgentResult, BoxedAgentConnector, WebSocketAgent};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Backend every chat session connects to
    pub agent: BoxedAgentConnector,
}

impl AppState {
    /// Build state with the websocket agent backend described by `config`.
    pub fn new(config: ServerConfig) -> AgentResult<Arc<Self>> {
        let agent = WebSocketAgent::new(config.agent_config())?;
        Ok(Self::with_agent(config, Arc::new(agent)))
    }

    /// Build state around an existing connector.
    pub fn with_agent(config: ServerConfig, agent: BoxedAgentConnector) -> Arc<Self> {
        Arc::new(Self { config, agent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_websocket_agent() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        assert_eq!(state.agent.provider_name(), "websocket");
        assert_eq!(state.config.port, 8000);
    }

    #[test]
    fn test_new_rejects_bad_agent_url() {
        let mut config = ServerConfig::default();
        config.agent_url = "http://not-a-websocket".to_string();
        assert!(AppState::new(config).is_err());
    }
}
