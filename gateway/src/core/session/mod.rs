//! Turn timing and tool tracking for one client session.

pub mod registry;
pub mod state;
pub mod timing;
pub mod tool_names;

pub use registry::{DEFAULT_TOOL_DURATION, ToolCompletion, ToolRegistry};
pub use state::{SessionState, SharedSessionState, ToolFinished};
pub use timing::{TtfbMeasurement, TtfbTrigger, TurnPhase, TurnTimer};
pub use tool_names::display_name;
