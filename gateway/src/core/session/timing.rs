//! Turn timing tracker.
//!
//! Computes the time-to-first-byte (TTFB) of each conversational turn. Three
//! signals race to close a turn's measurement:
//!
//! - the first agent content of a turn that used no tools,
//! - the completion of the last outstanding tool (seen on the agent stream or
//!   reported by the tool layer's own log),
//! - the agent's turn-complete marker, as a safety net.
//!
//! Whichever arrives first wins; the `ttfb_recorded` guard makes every later
//! signal a no-op until genuinely new user speech starts the next turn.
//!
//! The client's VAD silence window delays the moment the end of user speech is
//! observed here, so the window is subtracted from the recorded start time.

use serde::Serialize;
use std::time::Duration;

use crate::core::agent::Role;
use crate::core::timestamp::Timestamp;

/// Which signal produced a TTFB measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TtfbTrigger {
    /// First agent content of a turn without tool calls
    StandardResponse,
    /// Last tool result observed on the agent event stream
    ToolsComplete,
    /// Tool completion reported by the tool layer's log queue
    ToolLog,
    /// Turn-complete marker arrived before any other signal
    TurnComplete,
}

impl std::fmt::Display for TtfbTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TtfbTrigger::StandardResponse => write!(f, "standard_response"),
            TtfbTrigger::ToolsComplete => write!(f, "tools_complete"),
            TtfbTrigger::ToolLog => write!(f, "tool_log"),
            TtfbTrigger::TurnComplete => write!(f, "turn_complete"),
        }
    }
}

/// A single TTFB emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtfbMeasurement {
    /// Seconds from the (offset-adjusted) end of user speech to first output
    pub latency_secs: f64,
    /// Seconds spent in tools this turn, when tools ran
    pub tool_execution_secs: Option<f64>,
    pub trigger: TtfbTrigger,
}

/// Phase of the current turn. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No user input since the last measurement
    Idle,
    /// User spoke; no TTFB recorded yet
    AwaitingFirstOutput,
    /// TTFB recorded for this turn
    Completed,
}

/// Per-session TTFB state machine. Pure: every operation takes the time of the
/// signal and returns the measurement to emit, if any.
#[derive(Debug, Clone)]
pub struct TurnTimer {
    silence_offset: Duration,
    user_input_end_time: Option<Timestamp>,
    has_new_user_input: bool,
    ttfb_recorded: bool,
    response_in_progress: bool,
    first_tool_start_time: Option<Timestamp>,
    last_tool_end_time: Option<Timestamp>,
    tool_call_seen: bool,
}

impl TurnTimer {
    pub fn new(silence_offset: Duration) -> Self {
        Self {
            silence_offset,
            user_input_end_time: None,
            has_new_user_input: false,
            ttfb_recorded: false,
            response_in_progress: false,
            first_tool_start_time: None,
            last_tool_end_time: None,
            tool_call_seen: false,
        }
    }

    pub fn silence_offset(&self) -> Duration {
        self.silence_offset
    }

    pub fn user_input_end_time(&self) -> Option<Timestamp> {
        self.user_input_end_time
    }

    pub fn has_new_user_input(&self) -> bool {
        self.has_new_user_input
    }

    pub fn ttfb_recorded(&self) -> bool {
        self.ttfb_recorded
    }

    pub fn response_in_progress(&self) -> bool {
        self.response_in_progress
    }

    pub fn first_tool_start_time(&self) -> Option<Timestamp> {
        self.first_tool_start_time
    }

    pub fn last_tool_end_time(&self) -> Option<Timestamp> {
        self.last_tool_end_time
    }

    pub fn tool_call_seen(&self) -> bool {
        self.tool_call_seen
    }

    pub fn phase(&self) -> TurnPhase {
        if self.ttfb_recorded {
            TurnPhase::Completed
        } else if self.has_new_user_input {
            TurnPhase::AwaitingFirstOutput
        } else {
            TurnPhase::Idle
        }
    }

    /// User speech confirmed by the agent's transcription.
    ///
    /// Starts a new measurement only when no user input is pending, so repeated
    /// partial transcripts of one utterance keep the first timestamp. Returns
    /// whether a new measurement started.
    pub fn on_user_speech_detected(&mut self, now: Timestamp) -> bool {
        if self.has_new_user_input {
            return false;
        }
        self.user_input_end_time = Some(now);
        self.has_new_user_input = true;
        self.ttfb_recorded = false;
        tracing::debug!(at = now.as_secs_f64(), "User speech detected, timing reset");
        true
    }

    /// First tool of the turn started (the registry was empty).
    pub fn on_first_tool_start(&mut self, now: Timestamp) {
        self.tool_call_seen = true;
        if self.first_tool_start_time.is_none() {
            self.first_tool_start_time = Some(now);
            tracing::debug!(at = now.as_secs_f64(), "First tool execution started");
        }
    }

    /// Agent or user content chunk forwarded to the client.
    pub fn on_content_produced(&mut self, now: Timestamp, role: Role) -> Option<TtfbMeasurement> {
        if role != Role::Agent || !self.has_new_user_input || self.ttfb_recorded {
            return None;
        }
        if self.tool_call_seen {
            // Deferred to the tool completion path.
            tracing::debug!("Content received while tools are involved, TTFB deferred");
            return None;
        }
        let measurement = self.record(now, None, TtfbTrigger::StandardResponse)?;
        self.response_in_progress = true;
        Some(measurement)
    }

    /// The last outstanding tool finished, as seen on the agent event stream.
    pub fn on_all_tools_complete(&mut self, now: Timestamp) -> Option<TtfbMeasurement> {
        self.tools_finished(now, TtfbTrigger::ToolsComplete)
    }

    /// A tool finished, as reported by the tool layer with its own timestamp.
    pub fn on_tool_logged_complete(&mut self, at: Timestamp) -> Option<TtfbMeasurement> {
        self.tools_finished(at, TtfbTrigger::ToolLog)
    }

    /// The agent finished its turn.
    ///
    /// Records TTFB with `now` if no other signal has yet, then resets the
    /// per-turn tool state. The user-input fields survive so agent
    /// continuations cannot overwrite the measurement of the turn.
    pub fn on_turn_complete(&mut self, now: Timestamp) -> Option<TtfbMeasurement> {
        let measurement = if !self.ttfb_recorded && self.has_new_user_input {
            let tool_time = match self.first_tool_start_time {
                Some(start) if self.tool_call_seen => Some(now.secs_since(start)),
                _ => None,
            };
            self.record(now, tool_time, TtfbTrigger::TurnComplete)
        } else {
            None
        };

        self.response_in_progress = false;
        self.first_tool_start_time = None;
        self.last_tool_end_time = None;
        self.tool_call_seen = false;

        measurement
    }

    fn tools_finished(&mut self, at: Timestamp, trigger: TtfbTrigger) -> Option<TtfbMeasurement> {
        self.last_tool_end_time = Some(at);
        if self.ttfb_recorded || !self.has_new_user_input {
            return None;
        }
        let tool_time = self.first_tool_start_time.map(|start| at.secs_since(start));
        self.record(at, tool_time, trigger)
    }

    /// Check-and-set of the per-turn guard. Callers must hold the session lock
    /// across the whole call.
    fn record(
        &mut self,
        at: Timestamp,
        tool_execution_secs: Option<f64>,
        trigger: TtfbTrigger,
    ) -> Option<TtfbMeasurement> {
        let user_input_end = self.user_input_end_time?;
        let adjusted_start = user_input_end - self.silence_offset;
        let latency_secs = at.secs_since(adjusted_start);

        self.ttfb_recorded = true;
        self.has_new_user_input = false;

        Some(TtfbMeasurement {
            latency_secs,
            tool_execution_secs,
            trigger,
        })
    }
}
