//! Conversational agent backends.
//!
//! - `AgentConnector` opens one [`AgentSession`] per client connection
//! - `AgentRequestSink` forwards client audio and text
//! - the session's event stream yields decoded [`AgentEvent`]s

mod base;
pub mod websocket;

pub use base::{
    AgentConnector, AgentContent, AgentError, AgentEvent, AgentEventStream, AgentRequestSink,
    AgentResult, AgentSession, AgentSessionConfig, AudioChunk, BoxedAgentConnector, ContentPart,
    Role, ToolInvocation, ToolOutcome, TurnComplete,
};
pub use websocket::{WebSocketAgent, WebSocketAgentConfig};
