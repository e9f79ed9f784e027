//! Registry of in-flight tool executions for the current turn.
//!
//! Entries are keyed by tool name. Two concurrent invocations of the same tool
//! share one slot: the second start overwrites the first start time and the
//! first result to arrive removes the slot.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::timestamp::Timestamp;

/// Duration reported for a completion whose start was never observed.
pub const DEFAULT_TOOL_DURATION: Duration = Duration::from_millis(500);

/// Outcome of [`ToolRegistry::complete`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolCompletion {
    /// Time between start and completion, or [`DEFAULT_TOOL_DURATION`]
    pub duration: Duration,
    /// The registry is empty after this completion
    pub all_complete: bool,
    /// A matching start was found
    pub was_registered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    running: HashMap<String, Timestamp>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool start. Returns `true` when the registry was empty before
    /// the call, i.e. this is the first tool of a new wait.
    pub fn start(&mut self, name: &str, now: Timestamp) -> bool {
        let was_empty = self.running.is_empty();
        if self.running.insert(name.to_string(), now).is_some() {
            tracing::warn!(tool = %name, "Tool started while already running, start time replaced");
        }
        was_empty
    }

    /// Remove a tool and compute how long it ran.
    pub fn complete(&mut self, name: &str, now: Timestamp) -> ToolCompletion {
        let (duration, was_registered) = match self.running.remove(name) {
            Some(started) => (now.duration_since(started), true),
            None => {
                tracing::debug!(tool = %name, "Completion without a recorded start, using default duration");
                (DEFAULT_TOOL_DURATION, false)
            }
        };

        ToolCompletion {
            duration,
            all_complete: self.running.is_empty(),
            was_registered,
        }
    }

    /// Whether any tool is still running.
    pub fn is_waiting(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn started_at(&self, name: &str) -> Option<Timestamp> {
        self.running.get(name).copied()
    }

    /// Names of the tools still running.
    pub fn outstanding(&self) -> impl Iterator<Item = &str> {
        self.running.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }
}
