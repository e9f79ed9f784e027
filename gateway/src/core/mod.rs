pub mod agent;
pub mod session;
pub mod timestamp;
pub mod tool_log;

// Re-export commonly used types for convenience
pub use agent::{
    AgentConnector, AgentError, AgentEvent, AgentRequestSink, AgentResult, AgentSession,
    AgentSessionConfig, BoxedAgentConnector, Role, WebSocketAgent, WebSocketAgentConfig,
};

pub use session::{
    SessionState, SharedSessionState, ToolRegistry, TtfbMeasurement, TtfbTrigger, TurnPhase,
    TurnTimer, display_name,
};

pub use timestamp::Timestamp;

pub use tool_log::{LogEvent, LogEventKind, ToolLogReceiver, ToolLogSender};
