//! Chat WebSocket message types
//!
//! The first text frame from the client is the setup handshake. After that the
//! client sends binary audio frames and `{"text": ...}` text turns; the server
//! sends the typed messages below, untyped `{text, role}` content, forwarded
//! tool log entries, and binary audio frames.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::agent::Role;
use crate::core::tool_log::LogEvent;

/// Maximum allowed size for a client text turn (50 KB)
pub const MAX_TEXT_SIZE: usize = 50 * 1024;

/// Maximum allowed length of a voice name
pub const MAX_VOICE_NAME_LEN: usize = 128;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Setup handshake: `{"setup": {"voice_name": ..., "vad_settings": {...}}}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetupMessage {
    #[serde(default)]
    pub setup: SetupConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub voice_name: Option<String>,
    #[serde(default)]
    pub vad_settings: Option<VadSettings>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VadSettings {
    /// Silence window the client VAD waits before ending an utterance.
    /// Any JSON number is accepted.
    #[serde(default)]
    pub silence_duration_ms: Option<f64>,
}

impl SetupConfig {
    pub fn voice_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.voice_name
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
    }

    /// Negative, non-finite or out-of-range windows fall back to `default_ms`.
    pub fn silence_window_or(&self, default_ms: u64) -> Duration {
        self.vad_settings
            .as_ref()
            .and_then(|v| v.silence_duration_ms)
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
            .unwrap_or(Duration::from_millis(default_ms))
    }
}

/// Text turn sent after setup. Frames without a `text` field are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientTextMessage {
    #[serde(default)]
    pub text: Option<String>,
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ChatOutgoingMessage {
    /// Streaming transcript chunk
    #[serde(rename = "transcript_partial")]
    TranscriptPartial { text: String, role: Role },

    /// Finalized transcript
    #[serde(rename = "transcript")]
    Transcript { text: String, role: Role },

    /// A tool invocation began
    #[serde(rename = "subagent_start")]
    SubagentStart {
        /// Display name of the tool
        agent: String,
        args: Value,
    },

    /// A tool invocation finished
    #[serde(rename = "subagent_complete")]
    SubagentComplete {
        agent: String,
        /// Stringified tool result
        result: String,
        /// Seconds
        duration: f64,
    },

    /// Time to first byte of the current turn, in seconds
    #[serde(rename = "ttfb")]
    Ttfb { duration: f64 },
}

/// Non-transcript text content, sent without a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMessage {
    pub text: String,
    pub role: Role,
}

// =============================================================================
// Message Routing
// =============================================================================

/// Everything the session writes to the client socket goes through this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessageRoute {
    /// Typed JSON message
    Outgoing(ChatOutgoingMessage),
    /// Untyped `{text, role}` content
    Content(ContentMessage),
    /// Tool log entry, forwarded as-is
    Log(LogEvent),
    /// Binary audio data
    Audio(Bytes),
    /// Close connection
    Close,
}

impl ChatMessageRoute {
    pub fn transcript(text: impl Into<String>, role: Role, partial: bool) -> Self {
        let text = text.into();
        ChatMessageRoute::Outgoing(if partial {
            ChatOutgoingMessage::TranscriptPartial { text, role }
        } else {
            ChatOutgoingMessage::Transcript { text, role }
        })
    }

    pub fn ttfb(duration: f64) -> Self {
        ChatMessageRoute::Outgoing(ChatOutgoingMessage::Ttfb { duration })
    }

    /// JSON text for text-frame routes, `None` for audio and close.
    pub fn to_json(&self) -> Option<serde_json::Result<String>> {
        match self {
            ChatMessageRoute::Outgoing(message) => Some(serde_json::to_string(message)),
            ChatMessageRoute::Content(content) => Some(serde_json::to_string(content)),
            ChatMessageRoute::Log(entry) => Some(serde_json::to_string(entry)),
            ChatMessageRoute::Audio(_) | ChatMessageRoute::Close => None,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone, PartialEq)]
pub enum ChatValidationError {
    /// Text content exceeds maximum allowed size
    TextTooLarge { size: usize, max: usize },
    /// Voice name exceeds maximum allowed length
    VoiceNameTooLong { len: usize, max: usize },
}

impl std::fmt::Display for ChatValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextTooLarge { size, max } => {
                write!(f, "Text too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::VoiceNameTooLong { len, max } => {
                write!(f, "Voice name too long: {} bytes (max: {} bytes)", len, max)
            }
        }
    }
}

impl std::error::Error for ChatValidationError {}

impl SetupMessage {
    pub fn validate(&self) -> Result<(), ChatValidationError> {
        if let Some(voice) = &self.setup.voice_name
            && voice.len() > MAX_VOICE_NAME_LEN
        {
            return Err(ChatValidationError::VoiceNameTooLong {
                len: voice.len(),
                max: MAX_VOICE_NAME_LEN,
            });
        }
        Ok(())
    }
}

impl ClientTextMessage {
    pub fn validate_size(&self) -> Result<(), ChatValidationError> {
        if let Some(text) = &self.text {
            let size = text.len();
            if size > MAX_TEXT_SIZE {
                return Err(ChatValidationError::TextTooLarge {
                    size,
                    max: MAX_TEXT_SIZE,
                });
            }
        }
        Ok(())
    }
}
