//! Websocket agent runtime client.
//!
//! One websocket connection per session. A spawned task owns the socket:
//! it writes queued client frames and decodes server frames into the event
//! channel, routing tool log entries to the session's log queue.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header};
use tokio_tungstenite::tungstenite::{self, Message};

use super::config::WebSocketAgentConfig;
use super::messages::{ClientFrame, ServerFrame};
use crate::core::agent::base::{
    AgentConnector, AgentError, AgentEvent, AgentRequestSink, AgentResult, AgentSession,
    AgentSessionConfig, AudioChunk,
};
use crate::core::tool_log::ToolLogSender;

/// Channel capacity for outgoing client frames.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for decoded agent events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Connector
// =============================================================================

/// Connects sessions to an agent runtime speaking the websocket JSON protocol.
#[derive(Debug, Clone)]
pub struct WebSocketAgent {
    config: WebSocketAgentConfig,
}

impl WebSocketAgent {
    pub fn new(config: WebSocketAgentConfig) -> AgentResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WebSocketAgentConfig {
        &self.config
    }

    fn build_request(&self) -> AgentResult<tungstenite::handshake::client::Request> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| AgentError::InvalidConfiguration(format!("Invalid agent URL: {e}")))?;

        if let Some(api_key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                AgentError::InvalidConfiguration("API key is not a valid header value".to_string())
            })?;
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }

        Ok(request)
    }
}

#[async_trait]
impl AgentConnector for WebSocketAgent {
    async fn connect(
        &self,
        config: AgentSessionConfig,
        tool_log: ToolLogSender,
    ) -> AgentResult<AgentSession> {
        let request = self.build_request()?;

        let connect_result = tokio::time::timeout(
            self.config.connect_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| {
            AgentError::Timeout(format!(
                "Connection to {} timed out after {:?}",
                self.config.url, self.config.connect_timeout
            ))
        })?;

        let (ws_stream, _response) = connect_result.map_err(|e| match e {
            tungstenite::Error::Http(response)
                if response.status() == StatusCode::UNAUTHORIZED
                    || response.status() == StatusCode::FORBIDDEN =>
            {
                AgentError::AuthenticationFailed(format!(
                    "Agent runtime rejected credentials ({})",
                    response.status()
                ))
            }
            other => AgentError::ConnectionFailed(other.to_string()),
        })?;

        tracing::info!(
            session_id = %config.session_id,
            url = %self.config.url,
            "Connected to agent runtime"
        );

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let start = serde_json::to_string(&ClientFrame::session_start(&config))
            .map_err(|e| AgentError::SerializationError(e.to_string()))?;
        ws_sink
            .send(Message::Text(start.into()))
            .await
            .map_err(|e| AgentError::WebSocketError(e.to_string()))?;

        let (frame_tx, mut frame_rx) = mpsc::channel::<ClientFrame>(WS_CHANNEL_CAPACITY);
        let (event_tx, mut event_rx) =
            mpsc::channel::<AgentResult<AgentEvent>>(EVENT_CHANNEL_CAPACITY);

        let session_id = config.session_id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = frame_rx.recv() => {
                        let Some(frame) = frame else {
                            // Request side dropped without an explicit close.
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };
                        let closing = matches!(frame, ClientFrame::Close);
                        let json = match serde_json::to_string(&frame) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client frame: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send frame to agent runtime: {}", e);
                            let _ = event_tx.send(Err(AgentError::WebSocketError(e.to_string()))).await;
                            break;
                        }
                        if closing {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        }
                    }

                    msg = ws_stream.next() => {
                        let item = match msg {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerFrame>(&text) {
                                    Ok(ServerFrame::Event(frame)) => Ok(frame.into_agent_event()),
                                    Ok(ServerFrame::ToolLog { entry }) => {
                                        tool_log.send(entry);
                                        continue;
                                    }
                                    Ok(ServerFrame::Error { message }) => {
                                        tracing::error!(session_id = %session_id, "Agent runtime error: {}", message);
                                        let _ = event_tx.send(Err(AgentError::ProviderError(message))).await;
                                        break;
                                    }
                                    Ok(ServerFrame::SessionEnd) => {
                                        tracing::info!(session_id = %session_id, "Agent runtime ended the session");
                                        break;
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse agent frame: {} - {}", e, text);
                                        Err(AgentError::InvalidEvent(e.to_string()))
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(data))) => Ok(AgentEvent::agent_audio(data)),
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                                continue;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!(session_id = %session_id, "Agent websocket closed");
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                tracing::error!(session_id = %session_id, "Agent websocket error: {}", e);
                                let _ = event_tx.send(Err(AgentError::WebSocketError(e.to_string()))).await;
                                break;
                            }
                        };

                        if event_tx.send(item).await.is_err() {
                            // Session stopped reading events.
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
            }
            tracing::debug!(session_id = %session_id, "Agent connection task finished");
        });

        let events = async_stream::stream! {
            while let Some(item) = event_rx.recv().await {
                yield item;
            }
        };

        Ok(AgentSession {
            requests: Arc::new(WebSocketRequestSink {
                tx: Mutex::new(Some(frame_tx)),
            }),
            events: Box::pin(events),
        })
    }

    fn provider_name(&self) -> &'static str {
        "websocket"
    }
}

// =============================================================================
// Request Sink
// =============================================================================

struct WebSocketRequestSink {
    tx: Mutex<Option<mpsc::Sender<ClientFrame>>>,
}

impl WebSocketRequestSink {
    async fn send_frame(&self, frame: ClientFrame) -> AgentResult<()> {
        let sender = self.tx.lock().clone().ok_or(AgentError::NotConnected)?;
        sender
            .send(frame)
            .await
            .map_err(|_| AgentError::ConnectionClosed)
    }
}

#[async_trait]
impl AgentRequestSink for WebSocketRequestSink {
    async fn send_audio(&self, chunk: AudioChunk) -> AgentResult<()> {
        self.send_frame(ClientFrame::audio(&chunk)).await
    }

    async fn send_text(&self, text: &str) -> AgentResult<()> {
        self.send_frame(ClientFrame::Content {
            text: text.to_string(),
        })
        .await
    }

    async fn close(&self) -> AgentResult<()> {
        let Some(sender) = self.tx.lock().take() else {
            return Ok(());
        };
        // The connection task may already be gone.
        let _ = sender.send(ClientFrame::Close).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_url() {
        assert!(WebSocketAgent::new(WebSocketAgentConfig::new("ftp://example.com")).is_err());
        assert!(WebSocketAgent::new(WebSocketAgentConfig::default()).is_ok());
    }

    #[test]
    fn test_request_carries_bearer_token() {
        let agent = WebSocketAgent::new(
            WebSocketAgentConfig::new("ws://localhost:9000/live").with_api_key("abc123"),
        )
        .unwrap();
        let request = agent.build_request().unwrap();
        assert_eq!(
            request.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer abc123"
        );
    }

    #[test]
    fn test_request_without_key_has_no_auth() {
        let agent = WebSocketAgent::new(WebSocketAgentConfig::default()).unwrap();
        let request = agent.build_request().unwrap();
        assert!(request.headers().get(header::AUTHORIZATION).is_none());
        assert_eq!(agent.provider_name(), "websocket");
    }

    #[tokio::test]
    async fn test_sink_after_close_reports_not_connected() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = WebSocketRequestSink {
            tx: Mutex::new(Some(tx)),
        };
        sink.close().await.unwrap();
        assert!(matches!(
            sink.send_text("hi").await,
            Err(AgentError::NotConnected)
        ));
        // Closing twice is fine.
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let agent = WebSocketAgent::new(WebSocketAgentConfig::new(format!("ws://{addr}/live")))
            .unwrap();
        let (tool_log, _rx) = crate::core::tool_log::channel();
        let config = AgentSessionConfig {
            session_id: "s".into(),
            voice_name: "Aoede".into(),
            silence_duration_ms: 1000,
            input_audio_mime_type: "audio/pcm;rate=16000".into(),
        };
        let err = agent.connect(config, tool_log).await.unwrap_err();
        assert!(matches!(err, AgentError::ConnectionFailed(_)));
    }
}
