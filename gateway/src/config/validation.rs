//! Configuration validation logic.

use super::ServerConfig;

/// Validate a merged configuration.
pub(crate) fn validate_server_config(config: &ServerConfig) -> Result<(), String> {
    validate_agent_url(&config.agent_url)?;
    validate_sample_rate(config.input_sample_rate)?;
    validate_connect_timeout(config.agent_connect_timeout_seconds)?;
    Ok(())
}

/// The agent runtime is reached over a websocket.
pub(crate) fn validate_agent_url(agent_url: &str) -> Result<(), String> {
    let parsed =
        url::Url::parse(agent_url).map_err(|e| format!("Invalid AGENT_URL '{agent_url}': {e}"))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        scheme => Err(format!(
            "AGENT_URL must use the ws or wss scheme, got '{scheme}'"
        )),
    }
}

pub(crate) fn validate_sample_rate(sample_rate: u32) -> Result<(), String> {
    if sample_rate == 0 {
        return Err("INPUT_SAMPLE_RATE must be greater than zero".to_string());
    }
    Ok(())
}

pub(crate) fn validate_connect_timeout(seconds: u64) -> Result<(), String> {
    if seconds == 0 {
        return Err("AGENT_CONNECT_TIMEOUT_SECONDS must be greater than zero".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_agent_url() {
        assert!(validate_agent_url("ws://localhost:9000/live").is_ok());
        assert!(validate_agent_url("wss://agent.example.com").is_ok());
        assert!(validate_agent_url("https://agent.example.com").is_err());
        assert!(validate_agent_url("agent.example.com").is_err());
    }

    #[test]
    fn test_validate_sample_rate() {
        assert!(validate_sample_rate(16000).is_ok());
        assert!(validate_sample_rate(0).is_err());
    }

    #[test]
    fn test_validate_connect_timeout() {
        assert!(validate_connect_timeout(1).is_ok());
        assert!(validate_connect_timeout(0).is_err());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_server_config(&ServerConfig::default()).is_ok());
    }
}
