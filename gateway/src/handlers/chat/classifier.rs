//! Agent event classification.
//!
//! One [`AgentEvent`] may carry several categories at once. [`dispatch`]
//! applies them to the session state in a fixed order and returns the
//! outbound messages in the order they must reach the client.

use serde_json::Value;
use tracing::{debug, info};

use super::messages::{ChatMessageRoute, ChatOutgoingMessage, ContentMessage};
use crate::core::agent::{AgentEvent, ContentPart, Role};
use crate::core::session::{SessionState, TtfbMeasurement, display_name};
use crate::core::timestamp::Timestamp;

/// Categories an agent event can belong to, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    ToolInvocation,
    Transcript,
    TurnComplete,
    Content,
    ToolResult,
}

/// Categories present in `event`, in dispatch order.
pub fn categories(event: &AgentEvent) -> Vec<EventCategory> {
    let mut found = Vec::with_capacity(5);
    if !event.tool_calls.is_empty() {
        found.push(EventCategory::ToolInvocation);
    }
    if event.input_transcript.is_some()
        || event.output_transcript.is_some()
        || !event.model_turn_text.is_empty()
    {
        found.push(EventCategory::Transcript);
    }
    if event.turn_complete.is_some() {
        found.push(EventCategory::TurnComplete);
    }
    if event
        .content
        .as_ref()
        .is_some_and(|content| !content.parts.is_empty())
    {
        found.push(EventCategory::Content);
    }
    if !event.tool_results.is_empty() {
        found.push(EventCategory::ToolResult);
    }
    found
}

/// Apply `event` to `state` at time `now` and build the outbound messages.
///
/// The caller holds the session lock for the duration of the call. Nothing
/// here awaits.
pub fn dispatch(event: &AgentEvent, state: &mut SessionState, now: Timestamp) -> Vec<ChatMessageRoute> {
    let found = categories(event);
    debug!(categories = ?found, "Agent event");

    let mut out = Vec::new();
    for category in found {
        match category {
            EventCategory::ToolInvocation => dispatch_tool_calls(event, state, now, &mut out),
            EventCategory::Transcript => dispatch_transcripts(event, state, now, &mut out),
            EventCategory::TurnComplete => dispatch_turn_complete(event, state, now, &mut out),
            EventCategory::Content => dispatch_content(event, state, now, &mut out),
            EventCategory::ToolResult => dispatch_tool_results(event, state, now, &mut out),
        }
    }
    out
}

fn dispatch_tool_calls(
    event: &AgentEvent,
    state: &mut SessionState,
    now: Timestamp,
    out: &mut Vec<ChatMessageRoute>,
) {
    for call in &event.tool_calls {
        state.tool_started(&call.name, now);
        debug!(tool = %call.name, "Tool call started");
        out.push(ChatMessageRoute::Outgoing(ChatOutgoingMessage::SubagentStart {
            agent: display_name(&call.name).to_string(),
            args: call.args.clone(),
        }));
    }
}

fn dispatch_transcripts(
    event: &AgentEvent,
    state: &mut SessionState,
    now: Timestamp,
    out: &mut Vec<ChatMessageRoute>,
) {
    if let Some(text) = &event.input_transcript {
        if state.user_speech_detected(now) {
            debug!("New user turn started");
        }
        out.push(ChatMessageRoute::transcript(text.as_str(), Role::User, true));
    }
    if let Some(text) = &event.output_transcript {
        out.push(ChatMessageRoute::transcript(text.as_str(), Role::Agent, event.partial));
    }
    for text in &event.model_turn_text {
        out.push(ChatMessageRoute::transcript(text.as_str(), Role::Agent, true));
    }
}

fn dispatch_turn_complete(
    event: &AgentEvent,
    state: &mut SessionState,
    now: Timestamp,
    out: &mut Vec<ChatMessageRoute>,
) {
    let Some(turn) = &event.turn_complete else {
        return;
    };
    if let Some(measurement) = state.turn_complete(now) {
        out.push(ttfb_route(&measurement));
    }
    if let Some(text) = &turn.input_transcript {
        out.push(ChatMessageRoute::transcript(text.as_str(), Role::User, false));
    }
    if let Some(text) = &turn.output_transcript {
        out.push(ChatMessageRoute::transcript(text.as_str(), Role::Agent, false));
    }
}

/// Each chunk is forwarded before the TTFB it triggers.
fn dispatch_content(
    event: &AgentEvent,
    state: &mut SessionState,
    now: Timestamp,
    out: &mut Vec<ChatMessageRoute>,
) {
    let Some(content) = &event.content else {
        return;
    };
    for part in &content.parts {
        match part {
            ContentPart::Audio(data) => out.push(ChatMessageRoute::Audio(data.clone())),
            ContentPart::Text(text) => out.push(ChatMessageRoute::Content(ContentMessage {
                text: text.clone(),
                role: content.role,
            })),
        }
        if let Some(measurement) = state.content_produced(now, content.role) {
            out.push(ttfb_route(&measurement));
        }
    }
}

fn dispatch_tool_results(
    event: &AgentEvent,
    state: &mut SessionState,
    now: Timestamp,
    out: &mut Vec<ChatMessageRoute>,
) {
    for outcome in &event.tool_results {
        let finished = state.tool_finished(&outcome.name, now);
        if let Some(measurement) = finished.ttfb {
            out.push(ttfb_route(&measurement));
        }
        let duration = finished.duration.as_secs_f64();
        debug!(tool = %outcome.name, duration_secs = duration, "Tool call finished");
        out.push(ChatMessageRoute::Outgoing(ChatOutgoingMessage::SubagentComplete {
            agent: display_name(&outcome.name).to_string(),
            result: stringify_result(&outcome.result),
            duration,
        }));
    }
}

/// Log a TTFB emission and build its client message.
pub fn ttfb_route(measurement: &TtfbMeasurement) -> ChatMessageRoute {
    match measurement.tool_execution_secs {
        Some(tool_secs) => info!(
            ttfb_secs = measurement.latency_secs,
            tool_execution_secs = tool_secs,
            trigger = %measurement.trigger,
            "TTFB recorded"
        ),
        None => info!(
            ttfb_secs = measurement.latency_secs,
            trigger = %measurement.trigger,
            "TTFB recorded"
        ),
    }
    ChatMessageRoute::ttfb(measurement.latency_secs)
}

/// Objects are pretty-printed, strings passed through, anything else compact.
pub fn stringify_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        Value::Object(_) => serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
        other => other.to_string(),
    }
}
