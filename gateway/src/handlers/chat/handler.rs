//! Chat WebSocket handler
//!
//! Runs one client session: a setup handshake, then three loops (client
//! inbound, agent events, tool log) feeding one ordered outbound channel that
//! a dedicated sender task drains into the socket.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::agent::{
    AgentEventStream, AgentRequestSink, AgentSession, AgentSessionConfig, AudioChunk,
};
use crate::core::session::{SessionState, SharedSessionState};
use crate::core::timestamp::Timestamp;
use crate::core::tool_log::{self, ToolLogReceiver};
use crate::errors::{SessionError, SessionResult};
use crate::state::AppState;

use super::classifier;
use super::messages::{ChatMessageRoute, ClientTextMessage, SetupMessage};

/// Outbound channel capacity
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long shutdown waits for each loop to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat WebSocket handler
///
/// Upgrades the HTTP connection to a chat session bridged to the configured
/// agent backend.
pub async fn chat_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("Chat WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_chat_socket(socket, state))
}

async fn handle_chat_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    let span = info_span!("chat_session", session_id = %session_id);
    run_session(socket, app_state, session_id)
        .instrument(span)
        .await
}

async fn run_session(socket: WebSocket, app_state: Arc<AppState>, session_id: String) {
    info!("Chat WebSocket connection established");

    let (sender, mut receiver) = socket.split();
    let (route_tx, route_rx) = mpsc::channel::<ChatMessageRoute>(CHANNEL_BUFFER_SIZE);
    let cancel = CancellationToken::new();

    let sender_task = tokio::spawn(run_sender(sender, route_rx, cancel.clone()).in_current_span());

    match start_session(&mut receiver, &app_state, session_id).await {
        Ok((session, state, log_rx)) => {
            let AgentSession { requests, events } = session;

            let agent_task = tokio::spawn(
                run_agent_events(events, state.clone(), route_tx.clone(), cancel.clone())
                    .in_current_span(),
            );
            let log_task = tokio::spawn(
                run_tool_log(log_rx, state, route_tx.clone(), cancel.clone()).in_current_span(),
            );

            let sample_rate = app_state.config.input_sample_rate;
            run_client_inbound(&mut receiver, requests.as_ref(), sample_rate, &cancel).await;

            cancel.cancel();
            if let Err(e) = requests.close().await {
                debug!(error = %e, "Agent request sink already closed");
            }
            for (name, task) in [("agent", agent_task), ("tool_log", log_task)] {
                match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(task = name, error = %e, "Session task panicked"),
                    Err(_) => warn!(task = name, "Session task did not stop in time"),
                }
            }
        }
        Err(SessionError::ClientDisconnected) => {
            info!("Client disconnected before setup");
        }
        Err(e) => {
            warn!(error = %e, "Session setup failed");
        }
    }

    // Single close frame for the whole session.
    if route_tx.send(ChatMessageRoute::Close).await.is_err() {
        debug!("Sender task already stopped");
    }
    drop(route_tx);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, sender_task).await.is_err() {
        warn!("Sender task did not stop in time");
    }

    info!("Chat WebSocket connection closed");
}

/// `Setup` phase: read the handshake and connect the agent backend.
async fn start_session(
    receiver: &mut SplitStream<WebSocket>,
    app_state: &AppState,
    session_id: String,
) -> SessionResult<(AgentSession, SharedSessionState, ToolLogReceiver)> {
    let setup = read_setup(receiver).await?;
    let config = &app_state.config;

    let voice_name = setup.setup.voice_name_or(&config.default_voice_name).to_string();
    let silence_window = setup
        .setup
        .silence_window_or(config.default_silence_duration_ms);
    let silence_duration_ms =
        u64::try_from(silence_window.as_millis()).unwrap_or(config.default_silence_duration_ms);

    info!(
        voice = %voice_name,
        silence_duration_ms,
        provider = app_state.agent.provider_name(),
        "Session setup received"
    );

    let agent_config = AgentSessionConfig {
        session_id,
        voice_name,
        silence_duration_ms,
        input_audio_mime_type: AudioChunk::pcm_mime_type(config.input_sample_rate),
    };

    let (log_tx, log_rx) = tool_log::channel();
    let session = app_state.agent.connect(agent_config, log_tx).await?;
    let state = SessionState::shared(silence_window);

    info!("Session active");
    Ok((session, state, log_rx))
}

async fn read_setup(receiver: &mut SplitStream<WebSocket>) -> SessionResult<SetupMessage> {
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                let setup: SetupMessage = serde_json::from_str(&text)
                    .map_err(|e| SessionError::InvalidSetup(e.to_string()))?;
                setup
                    .validate()
                    .map_err(|e| SessionError::InvalidSetup(e.to_string()))?;
                return Ok(setup);
            }
            Some(Ok(Message::Binary(_))) => {
                return Err(SessionError::InvalidSetup(
                    "expected a JSON text frame".to_string(),
                ));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(SessionError::ClientDisconnected),
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Sole writer of the client socket.
async fn run_sender(
    mut sender: SplitSink<WebSocket, Message>,
    mut route_rx: mpsc::Receiver<ChatMessageRoute>,
    cancel: CancellationToken,
) {
    while let Some(route) = route_rx.recv().await {
        let should_close = matches!(route, ChatMessageRoute::Close);

        let result = match route {
            ChatMessageRoute::Audio(data) => sender.send(Message::Binary(data)).await,
            ChatMessageRoute::Close => {
                debug!("Closing chat WebSocket connection");
                sender.send(Message::Close(None)).await
            }
            other => match other.to_json() {
                Some(Ok(json_str)) => sender.send(Message::Text(json_str.into())).await,
                Some(Err(e)) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
                None => continue,
            },
        };

        if let Err(e) = result {
            if should_close {
                debug!("Close frame not delivered: {}", e);
            } else {
                warn!("Failed to send WebSocket message: {}", e);
                cancel.cancel();
            }
            break;
        }

        if should_close {
            break;
        }
    }
}

/// Forwards client audio and text to the agent until the client leaves or the
/// session is cancelled. No timing side effects.
async fn run_client_inbound(
    receiver: &mut SplitStream<WebSocket>,
    requests: &dyn AgentRequestSink,
    sample_rate: u32,
    cancel: &CancellationToken,
) {
    loop {
        let msg = select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = receiver.next() => msg,
        };

        match msg {
            Some(Ok(Message::Binary(data))) => {
                if let Err(e) = requests.send_audio(AudioChunk::pcm(data, sample_rate)).await {
                    error!(error = %e, "Failed to forward audio to agent");
                    break;
                }
            }
            Some(Ok(Message::Text(text))) => {
                let message: ClientTextMessage = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed client message");
                        continue;
                    }
                };
                if let Err(e) = message.validate_size() {
                    warn!(error = %e, "Dropping client message");
                    continue;
                }
                let Some(text) = message.text else {
                    debug!("Client message without text ignored");
                    continue;
                };
                if let Err(e) = requests.send_text(&text).await {
                    error!(error = %e, "Failed to forward text to agent");
                    break;
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                info!("Client closed the connection");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Client socket error");
                break;
            }
        }
    }
}

/// Classifies agent events into outbound messages. The end of the stream or a
/// fatal error ends the session.
async fn run_agent_events(
    mut events: AgentEventStream,
    state: SharedSessionState,
    route_tx: mpsc::Sender<ChatMessageRoute>,
    cancel: CancellationToken,
) {
    loop {
        let next = select! {
            biased;
            _ = cancel.cancelled() => break,
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                if event.is_empty() {
                    continue;
                }
                let now = Timestamp::now();
                let routes = {
                    let mut state = state.lock();
                    classifier::dispatch(&event, &mut state, now)
                };
                for route in routes {
                    if route_tx.send(route).await.is_err() {
                        debug!("Outbound channel closed");
                        cancel.cancel();
                        return;
                    }
                }
            }
            Some(Err(e)) if e.is_recoverable() => {
                warn!(error = %e, "Skipping agent event");
            }
            Some(Err(e)) => {
                error!(error = %e, "Agent event stream failed");
                break;
            }
            None => {
                info!("Agent event stream ended");
                break;
            }
        }
    }
    cancel.cancel();
}

/// Forwards tool log entries. Completion entries run the tool-log TTFB path
/// with the entry's own timestamp before being forwarded.
async fn run_tool_log(
    mut log_rx: ToolLogReceiver,
    state: SharedSessionState,
    route_tx: mpsc::Sender<ChatMessageRoute>,
    cancel: CancellationToken,
) {
    loop {
        let entry = select! {
            biased;
            _ = cancel.cancelled() => break,
            entry = log_rx.recv() => entry,
        };

        let Some(entry) = entry else {
            debug!("Tool log queue closed");
            break;
        };

        if entry.is_complete() {
            let measurement = state
                .lock()
                .tool_logged_complete(&entry.agent, entry.timestamp);
            if let Some(measurement) = measurement
                && route_tx
                    .send(classifier::ttfb_route(&measurement))
                    .await
                    .is_err()
            {
                cancel.cancel();
                break;
            }
        }

        if route_tx.send(ChatMessageRoute::Log(entry)).await.is_err() {
            cancel.cancel();
            break;
        }
    }
}
