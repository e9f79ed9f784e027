//! Per-connection turn and tool state.
//!
//! The agent-event loop and the tool-log loop both feed completion signals
//! into the same [`SessionState`]. It lives behind one mutex; every method
//! below is a single critical section, so the TTFB guard is checked and set
//! atomically with respect to both loops.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::registry::ToolRegistry;
use super::timing::{TtfbMeasurement, TurnTimer};
use super::tool_names::display_name;
use crate::core::agent::Role;
use crate::core::timestamp::Timestamp;

pub type SharedSessionState = Arc<Mutex<SessionState>>;

/// Result of a tool completion observed on the agent event stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolFinished {
    pub duration: Duration,
    pub ttfb: Option<TtfbMeasurement>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    timer: TurnTimer,
    tools: ToolRegistry,
}

impl SessionState {
    pub fn new(silence_offset: Duration) -> Self {
        Self {
            timer: TurnTimer::new(silence_offset),
            tools: ToolRegistry::new(),
        }
    }

    pub fn shared(silence_offset: Duration) -> SharedSessionState {
        Arc::new(Mutex::new(Self::new(silence_offset)))
    }

    pub fn timer(&self) -> &TurnTimer {
        &self.timer
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn user_speech_detected(&mut self, now: Timestamp) -> bool {
        self.timer.on_user_speech_detected(now)
    }

    pub fn tool_started(&mut self, name: &str, now: Timestamp) {
        if self.tools.start(name, now) {
            self.timer.on_first_tool_start(now);
        }
    }

    pub fn tool_finished(&mut self, name: &str, now: Timestamp) -> ToolFinished {
        let completion = self.tools.complete(name, now);
        let ttfb = if completion.all_complete {
            tracing::debug!(tool = %name, "All tools completed");
            self.timer.on_all_tools_complete(now)
        } else {
            None
        };
        ToolFinished {
            duration: completion.duration,
            ttfb,
        }
    }

    pub fn content_produced(&mut self, now: Timestamp, role: Role) -> Option<TtfbMeasurement> {
        self.timer.on_content_produced(now, role)
    }

    pub fn turn_complete(&mut self, now: Timestamp) -> Option<TtfbMeasurement> {
        let measurement = self.timer.on_turn_complete(now);
        if !self.tools.is_empty() {
            tracing::debug!(outstanding = self.tools.len(), "Turn complete with tools outstanding, registry cleared");
        }
        self.tools.clear();
        measurement
    }

    /// Completion reported by the tool layer's log, stamped with the tool's own
    /// finish time. Log entries carry display names, so the registry is
    /// matched through [`display_name`]. The completion counts as "all tools
    /// complete" unless another tool is still outstanding.
    pub fn tool_logged_complete(
        &mut self,
        agent: &str,
        at: Timestamp,
    ) -> Option<TtfbMeasurement> {
        let mut same = 0usize;
        let mut other = 0usize;
        for name in self.tools.outstanding() {
            if display_name(name) == agent {
                same += 1;
            } else {
                other += 1;
            }
        }

        if other > 0 || same > 1 {
            tracing::debug!(agent = %agent, same, other, "Logged completion while other tools are running");
            return None;
        }
        self.timer.on_tool_logged_complete(at)
    }
}
