//! Agent runtime reached over a websocket with a JSON frame protocol.
//!
//! # Protocol
//!
//! The gateway opens the connection with a `session.start` frame, then
//! streams client audio as base64 `realtime_input` frames and text turns as
//! `content` frames. The runtime answers with `event` frames, `tool_log`
//! frames for out-of-band tool progress, binary audio frames, and finally
//! `session_end` or `error`.

mod client;
mod config;
mod messages;

pub use client::WebSocketAgent;
pub use config::{DEFAULT_AGENT_URL, DEFAULT_CONNECT_TIMEOUT, WebSocketAgentConfig};
pub use messages::{ClientFrame, EventFrame, ServerFrame};
