//! Merge YAML values over environment values over defaults.

use std::path::PathBuf;

use super::env::{env_var, parse_env};
use super::yaml::YamlConfig;
use super::{
    DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS, DEFAULT_HOST, DEFAULT_INPUT_SAMPLE_RATE,
    DEFAULT_PORT, DEFAULT_SILENCE_DURATION_MS, DEFAULT_VOICE_NAME, ServerConfig, TlsConfig,
};
use crate::core::agent::websocket::DEFAULT_AGENT_URL;

/// Build a [`ServerConfig`] from optional YAML overrides and the environment.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let agent = yaml.agent.unwrap_or_default();
    let session = yaml.session.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_var("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match server.port {
        Some(port) => port,
        None => parse_env::<u16>("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let tls = {
        let tls_yaml = server.tls.unwrap_or_default();
        if tls_yaml.enabled == Some(false) {
            None
        } else {
            let cert = tls_yaml.cert_path.or_else(|| env_var("TLS_CERT_PATH"));
            let key = tls_yaml.key_path.or_else(|| env_var("TLS_KEY_PATH"));
            match (cert, key) {
                (Some(cert), Some(key)) => Some(TlsConfig {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                }),
                (None, None) => None,
                _ => {
                    return Err(
                        "TLS requires both a certificate path and a key path".into(),
                    );
                }
            }
        }
    };

    let agent_url = agent
        .url
        .or_else(|| env_var("AGENT_URL"))
        .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string());

    let agent_api_key = agent.api_key.or_else(|| env_var("AGENT_API_KEY"));

    let agent_connect_timeout_seconds = match agent.connect_timeout_seconds {
        Some(secs) => secs,
        None => parse_env::<u64>("AGENT_CONNECT_TIMEOUT_SECONDS")?
            .unwrap_or(DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS),
    };

    let default_voice_name = session
        .default_voice_name
        .or_else(|| env_var("DEFAULT_VOICE_NAME"))
        .unwrap_or_else(|| DEFAULT_VOICE_NAME.to_string());

    let default_silence_duration_ms = match session.default_silence_duration_ms {
        Some(ms) => ms,
        None => parse_env::<u64>("DEFAULT_SILENCE_DURATION_MS")?
            .unwrap_or(DEFAULT_SILENCE_DURATION_MS),
    };

    let input_sample_rate = match session.input_sample_rate {
        Some(rate) => rate,
        None => parse_env::<u32>("INPUT_SAMPLE_RATE")?.unwrap_or(DEFAULT_INPUT_SAMPLE_RATE),
    };

    let cors_allowed_origins = security
        .cors_allowed_origins
        .or_else(|| env_var("CORS_ALLOWED_ORIGINS"));

    Ok(ServerConfig {
        host,
        port,
        tls,
        agent_url,
        agent_api_key,
        agent_connect_timeout_seconds,
        default_voice_name,
        default_silence_duration_ms,
        input_sample_rate,
        cors_allowed_origins,
    })
}
