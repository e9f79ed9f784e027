//! Server Startup Tests
//!
//! Tests for configuration loading and application state construction.

use std::fs;
use std::net::TcpListener;
use std::time::Duration;

use axum::{Router, body::Body, http::Request};
use serial_test::serial;
use tempfile::TempDir;
use tower::util::ServiceExt;

use voicebridge_gateway::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config(port: u16) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = port;
    config
}

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// The server boots without an agent API key; the agent is only dialled per session.
#[tokio::test]
async fn test_minimal_config_boot() {
    let port = find_available_port();
    let config = create_minimal_config(port);
    assert_eq!(config.address(), format!("127.0.0.1:{port}"));

    let app_state = AppState::new(config).expect("state builds");

    let app = Router::new()
        .merge(routes::api::create_api_router())
        .merge(routes::chat::create_chat_router())
        .with_state(app_state);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    // Plain GET without upgrade headers is not a websocket handshake.
    let request = Request::builder().uri("/ws/chat").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_invalid_agent_url_rejected_at_startup() {
    let mut config = create_minimal_config(find_available_port());
    config.agent_url = "https://agent.example.com".to_string();

    assert!(AppState::new(config).is_err());
}

#[test]
#[serial]
fn test_config_file_boot() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
server:
  host: "127.0.0.1"
  port: 9100
agent:
  url: "wss://agent.example.com/live"
  api_key: "agent-key"
  connect_timeout_seconds: 3
session:
  default_voice_name: "Charon"
"#,
    )
    .unwrap();

    let config = ServerConfig::from_file(&config_path).expect("config loads");
    assert_eq!(config.address(), "127.0.0.1:9100");
    assert_eq!(config.default_voice_name, "Charon");
    assert_eq!(config.agent_connect_timeout(), Duration::from_secs(3));

    let agent_config = config.agent_config();
    assert_eq!(agent_config.url, "wss://agent.example.com/live");
    assert_eq!(agent_config.api_key.as_deref(), Some("agent-key"));

    let state = AppState::new(config).expect("state builds");
    assert_eq!(state.agent.provider_name(), "websocket");
}

#[test]
#[serial]
fn test_config_file_with_bad_agent_url_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "agent:\n  url: \"http://agent.example.com\"\n").unwrap();

    let err = ServerConfig::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("AGENT_URL"));
}
