//! Base traits and types for conversational agent backends.
//!
//! An agent backend accepts client audio and text through a request sink and
//! emits a stream of [`AgentEvent`]s. Each event is decoded once at the
//! transport boundary into explicit optional fields, one per category the
//! session cares about.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::core::tool_log::ToolLogSender;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to an agent backend.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Connection to the agent runtime failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Error reported by the agent runtime
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// The agent closed the conversation
    #[error("Connection closed")]
    ConnectionClosed,

    /// A single event could not be decoded
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl AgentError {
    /// Errors scoped to one event. The session skips them and keeps reading.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::InvalidEvent(_) | AgentError::SerializationError(_)
        )
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

// =============================================================================
// Request Types
// =============================================================================

/// A chunk of client audio bound for the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub data: Bytes,
    /// e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
}

impl AudioChunk {
    /// Raw 16-bit PCM at the given sample rate.
    pub fn pcm(data: Bytes, sample_rate: u32) -> Self {
        Self {
            data,
            mime_type: Self::pcm_mime_type(sample_rate),
        }
    }

    pub fn pcm_mime_type(sample_rate: u32) -> String {
        format!("audio/pcm;rate={sample_rate}")
    }
}

/// Parameters negotiated during the client setup handshake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSessionConfig {
    pub session_id: String,
    pub voice_name: String,
    pub silence_duration_ms: u64,
    pub input_audio_mime_type: String,
}

// =============================================================================
// Event Types
// =============================================================================

/// Origin of a piece of content or transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    #[serde(alias = "model")]
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// A tool the agent asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Value,
}

/// The result of a tool run, as reported back through the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub name: String,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Audio(Bytes),
}

/// Raw output content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentContent {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

/// Turn-complete marker, optionally carrying the final transcripts of the turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnComplete {
    pub input_transcript: Option<String>,
    pub output_transcript: Option<String>,
}

/// One inbound agent event. Every field is independently optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentEvent {
    /// Transcripts in this event are still streaming
    pub partial: bool,
    pub tool_calls: Vec<ToolInvocation>,
    pub tool_results: Vec<ToolOutcome>,
    /// Transcription of user speech
    pub input_transcript: Option<String>,
    /// Transcription of agent speech
    pub output_transcript: Option<String>,
    /// Streaming text parts of the model turn
    pub model_turn_text: Vec<String>,
    pub turn_complete: Option<TurnComplete>,
    pub content: Option<AgentContent>,
}

impl AgentEvent {
    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_calls: vec![ToolInvocation {
                name: name.into(),
                args,
            }],
            ..Default::default()
        }
    }

    pub fn tool_result(name: impl Into<String>, result: Value) -> Self {
        Self {
            tool_results: vec![ToolOutcome {
                name: name.into(),
                result,
            }],
            ..Default::default()
        }
    }

    pub fn user_transcript(text: impl Into<String>) -> Self {
        Self {
            partial: true,
            input_transcript: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn agent_transcript(text: impl Into<String>, partial: bool) -> Self {
        Self {
            partial,
            output_transcript: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            content: Some(AgentContent {
                role: Role::Agent,
                parts: vec![ContentPart::Text(text.into())],
            }),
            ..Default::default()
        }
    }

    pub fn agent_audio(data: impl Into<Bytes>) -> Self {
        Self {
            content: Some(AgentContent {
                role: Role::Agent,
                parts: vec![ContentPart::Audio(data.into())],
            }),
            ..Default::default()
        }
    }

    pub fn turn_complete() -> Self {
        Self {
            turn_complete: Some(TurnComplete::default()),
            ..Default::default()
        }
    }

    /// True when the event carries nothing the session acts on.
    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
            && self.tool_results.is_empty()
            && self.input_transcript.is_none()
            && self.output_transcript.is_none()
            && self.model_turn_text.is_empty()
            && self.turn_complete.is_none()
            && self.content.is_none()
    }
}

/// Stream of decoded agent events.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentResult<AgentEvent>> + Send>>;

// =============================================================================
// Traits
// =============================================================================

/// Request side of a live agent session.
#[async_trait]
pub trait AgentRequestSink: Send + Sync {
    /// Forward a realtime audio chunk.
    async fn send_audio(&self, chunk: AudioChunk) -> AgentResult<()>;

    /// Forward a discrete text turn.
    async fn send_text(&self, text: &str) -> AgentResult<()>;

    /// Close the request side. Further sends fail with `NotConnected`.
    async fn close(&self) -> AgentResult<()>;
}

/// A connected agent session: request sink plus event stream.
pub struct AgentSession {
    pub requests: Arc<dyn AgentRequestSink>,
    pub events: AgentEventStream,
}

impl fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSession").finish_non_exhaustive()
    }
}

/// Opens agent sessions.
///
/// Tool log entries produced on behalf of the session are pushed to `tool_log`.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    async fn connect(
        &self,
        config: AgentSessionConfig,
        tool_log: ToolLogSender,
    ) -> AgentResult<AgentSession>;

    fn provider_name(&self) -> &'static str;
}

pub type BoxedAgentConnector = Arc<dyn AgentConnector>;
