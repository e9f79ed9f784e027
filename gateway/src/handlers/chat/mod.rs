//! Voice/text chat sessions
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **setup** (first frame): `{"setup": {"voice_name", "vad_settings": {"silence_duration_ms"}}}`
//! - **text**: `{"text": "..."}` sent to the agent as a content turn
//! - **Binary frames**: Audio data (PCM 16-bit, mono)
//!
//! ## Server → Client
//!
//! - **transcript_partial** / **transcript**: user or agent transcription
//! - **subagent_start** / **subagent_complete**: tool activity
//! - **ttfb**: response latency of the turn, at most once per turn
//! - `{text, role}`: agent text content
//! - **Binary frames**: Agent audio

pub mod classifier;
mod handler;
pub mod messages;

pub use classifier::{EventCategory, categories, dispatch};
pub use handler::chat_handler;
