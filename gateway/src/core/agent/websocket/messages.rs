//! Wire format of the websocket agent runtime.
//!
//! Client frames (sent to the runtime):
//! - session.start - Open the conversation with the negotiated voice settings
//! - realtime_input - Base64 audio chunk
//! - content - Discrete text turn
//! - close - End of input
//!
//! Server frames (received from the runtime):
//! - event - One agent event, every section optional
//! - tool_log - Out-of-band tool log entry
//! - error - Fatal runtime error
//! - session_end - The runtime finished the conversation
//!
//! Binary frames from the runtime carry raw agent audio.

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tracing::warn;

use crate::core::agent::base::{
    AgentContent, AgentEvent, AgentSessionConfig, AudioChunk, ContentPart, Role, ToolInvocation,
    ToolOutcome, TurnComplete,
};
use crate::core::tool_log::LogEvent;

// =============================================================================
// Client Frames
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "session.start")]
    SessionStart {
        session_id: String,
        voice_name: String,
        silence_duration_ms: u64,
        input_audio_mime_type: String,
    },

    #[serde(rename = "realtime_input")]
    RealtimeInput {
        mime_type: String,
        /// Base64-encoded audio
        data: String,
    },

    #[serde(rename = "content")]
    Content { text: String },

    #[serde(rename = "close")]
    Close,
}

impl ClientFrame {
    pub fn session_start(config: &AgentSessionConfig) -> Self {
        ClientFrame::SessionStart {
            session_id: config.session_id.clone(),
            voice_name: config.voice_name.clone(),
            silence_duration_ms: config.silence_duration_ms,
            input_audio_mime_type: config.input_audio_mime_type.clone(),
        }
    }

    pub fn audio(chunk: &AudioChunk) -> Self {
        ClientFrame::RealtimeInput {
            mime_type: chunk.mime_type.clone(),
            data: BASE64_STANDARD.encode(&chunk.data),
        }
    }
}

// =============================================================================
// Server Frames
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "event")]
    Event(EventFrame),

    #[serde(rename = "tool_log")]
    ToolLog { entry: LogEvent },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "session_end")]
    SessionEnd,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFrame {
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub tool_call: Option<ToolCallPayload>,
    #[serde(default)]
    pub tool_response: Option<ToolResponsePayload>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub content: Option<WireContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallPayload {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, alias = "parameters")]
    pub args: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolResponsePayload {
    #[serde(default)]
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    #[serde(default, alias = "result")]
    pub response: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

impl Transcription {
    fn into_text(self) -> Option<String> {
        self.text.filter(|t| !t.is_empty())
    }
}

/// `turn_complete` is either a flag or an object with the turn's transcripts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TurnCompleteWire {
    Flag(bool),
    Detailed {
        #[serde(default)]
        input_transcription: Option<Transcription>,
        #[serde(default)]
        output_transcription: Option<Transcription>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerContent {
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: Option<TurnCompleteWire>,
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireContent {
    /// Anything other than `user` is treated as agent output.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

// =============================================================================
// Conversion
// =============================================================================

impl EventFrame {
    /// Decode into an [`AgentEvent`]. Function calls found in content parts
    /// are folded into the event's tool calls. A content part that cannot be
    /// decoded is dropped on its own; the rest of the event survives.
    pub fn into_agent_event(self) -> AgentEvent {
        let mut event = AgentEvent {
            partial: self.partial,
            ..Default::default()
        };

        if let Some(tool_call) = self.tool_call {
            event
                .tool_calls
                .extend(tool_call.function_calls.into_iter().map(FunctionCall::into_invocation));
        }

        if let Some(tool_response) = self.tool_response {
            event.tool_results.extend(
                tool_response
                    .function_responses
                    .into_iter()
                    .map(|fr| ToolOutcome {
                        name: fr.name,
                        result: fr.response,
                    }),
            );
        }

        if let Some(server_content) = self.server_content {
            event.input_transcript = server_content
                .input_transcription
                .and_then(Transcription::into_text);
            event.output_transcript = server_content
                .output_transcription
                .and_then(Transcription::into_text);
            event.turn_complete = match server_content.turn_complete {
                Some(TurnCompleteWire::Flag(true)) => Some(TurnComplete::default()),
                Some(TurnCompleteWire::Flag(false)) | None => None,
                Some(TurnCompleteWire::Detailed {
                    input_transcription,
                    output_transcription,
                }) => Some(TurnComplete {
                    input_transcript: input_transcription.and_then(Transcription::into_text),
                    output_transcript: output_transcription.and_then(Transcription::into_text),
                }),
            };
            if let Some(model_turn) = server_content.model_turn {
                event.model_turn_text = model_turn
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text.filter(|t| !t.is_empty()))
                    .collect();
            }
        }

        if let Some(content) = self.content {
            let mut parts = Vec::with_capacity(content.parts.len());
            for part in content.parts {
                if let Some(call) = part.function_call {
                    event.tool_calls.push(call.into_invocation());
                }
                if let Some(inline) = part.inline_data {
                    match BASE64_STANDARD.decode(inline.data.as_bytes()) {
                        Ok(data) if !data.is_empty() => {
                            parts.push(ContentPart::Audio(Bytes::from(data)));
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Skipping undecodable inline audio part: {}", e),
                    }
                }
                if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                    parts.push(ContentPart::Text(text));
                }
            }
            if !parts.is_empty() {
                event.content = Some(AgentContent {
                    role: wire_role(content.role.as_deref()),
                    parts,
                });
            }
        }

        event
    }
}

fn wire_role(role: Option<&str>) -> Role {
    match role {
        Some(r) if r.eq_ignore_ascii_case("user") => Role::User,
        _ => Role::Agent,
    }
}

impl FunctionCall {
    fn into_invocation(self) -> ToolInvocation {
        let args = if self.args.is_null() {
            Value::Object(Default::default())
        } else {
            self.args
        };
        ToolInvocation {
            name: self.name,
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_event(value: Value) -> AgentEvent {
        match serde_json::from_value::<ServerFrame>(value).unwrap() {
            ServerFrame::Event(frame) => frame.into_agent_event(),
            other => panic!("expected event frame, got {other:?}"),
        }
    }

    #[test]
    fn test_client_frames_serialize() {
        let chunk = AudioChunk::pcm(Bytes::from_static(&[1, 2, 3]), 16000);
        let value = serde_json::to_value(ClientFrame::audio(&chunk)).unwrap();
        assert_eq!(
            value,
            json!({"type": "realtime_input", "mime_type": "audio/pcm;rate=16000", "data": "AQID"})
        );

        let value = serde_json::to_value(ClientFrame::Close).unwrap();
        assert_eq!(value, json!({"type": "close"}));

        let config = AgentSessionConfig {
            session_id: "abc".into(),
            voice_name: "Aoede".into(),
            silence_duration_ms: 800,
            input_audio_mime_type: "audio/pcm;rate=16000".into(),
        };
        let value = serde_json::to_value(ClientFrame::session_start(&config)).unwrap();
        assert_eq!(value["type"], "session.start");
        assert_eq!(value["silence_duration_ms"], 800);
    }

    #[test]
    fn test_empty_event() {
        let event = parse_event(json!({"type": "event"}));
        assert!(event.is_empty());
        assert!(!event.partial);
    }

    #[test]
    fn test_tool_call_and_response() {
        let event = parse_event(json!({
            "type": "event",
            "tool_call": {"function_calls": [
                {"name": "consult_flight_specialist", "args": {"destination": "Paris"}},
                {"name": "google_search"}
            ]},
            "tool_response": {"function_responses": [
                {"name": "google_search", "result": {"hits": 3}}
            ]}
        }));
        assert_eq!(event.tool_calls.len(), 2);
        assert_eq!(event.tool_calls[0].args["destination"], "Paris");
        assert_eq!(event.tool_calls[1].args, json!({}));
        assert_eq!(event.tool_results[0].result, json!({"hits": 3}));
    }

    #[test]
    fn test_server_content_transcripts() {
        let event = parse_event(json!({
            "type": "event",
            "partial": true,
            "server_content": {
                "input_transcription": {"text": "book a flight"},
                "output_transcription": {"text": ""},
                "model_turn": {"parts": [{"text": "Sure"}, {"text": ""}]}
            }
        }));
        assert!(event.partial);
        assert_eq!(event.input_transcript.as_deref(), Some("book a flight"));
        assert_eq!(event.output_transcript, None);
        assert_eq!(event.model_turn_text, vec!["Sure".to_string()]);
        assert!(event.turn_complete.is_none());
    }

    #[test]
    fn test_turn_complete_forms() {
        let flag = parse_event(json!({"type": "event", "server_content": {"turn_complete": true}}));
        assert_eq!(flag.turn_complete, Some(TurnComplete::default()));

        let off = parse_event(json!({"type": "event", "server_content": {"turn_complete": false}}));
        assert!(off.turn_complete.is_none());

        let detailed = parse_event(json!({
            "type": "event",
            "server_content": {"turn_complete": {
                "input_transcription": {"text": "hello"},
                "output_transcription": {"text": "hi there"}
            }}
        }));
        let tc = detailed.turn_complete.unwrap();
        assert_eq!(tc.input_transcript.as_deref(), Some("hello"));
        assert_eq!(tc.output_transcript.as_deref(), Some("hi there"));
    }

    #[test]
    fn test_content_parts_and_folded_function_call() {
        let event = parse_event(json!({
            "type": "event",
            "content": {"role": "agent", "parts": [
                {"inline_data": {"mime_type": "audio/pcm", "data": "AAEC"}},
                {"text": "Looking that up"},
                {"function_call": {"name": "search_lifestyle_subagent", "args": {"query": "museums"}}}
            ]}
        }));
        let content = event.content.unwrap();
        assert_eq!(content.role, Role::Agent);
        assert_eq!(
            content.parts,
            vec![
                ContentPart::Audio(Bytes::from_static(&[0, 1, 2])),
                ContentPart::Text("Looking that up".into()),
            ]
        );
        assert_eq!(event.tool_calls[0].name, "search_lifestyle_subagent");
    }

    #[test]
    fn test_content_role_defaults_to_agent() {
        let event = parse_event(json!({"type": "event", "content": {"parts": [{"text": "x"}]}}));
        assert_eq!(event.content.unwrap().role, Role::Agent);
    }

    #[test]
    fn test_bad_audio_part_keeps_rest_of_event() {
        let event = parse_event(json!({
            "type": "event",
            "tool_response": {"function_responses": [{"name": "google_search", "result": "ok"}]},
            "server_content": {"turn_complete": true},
            "content": {"parts": [
                {"inline_data": {"data": "@@not-base64@@"}},
                {"text": "still here"}
            ]}
        }));
        assert_eq!(event.tool_results.len(), 1);
        assert_eq!(event.tool_results[0].name, "google_search");
        assert_eq!(event.turn_complete, Some(TurnComplete::default()));
        assert_eq!(
            event.content.unwrap().parts,
            vec![ContentPart::Text("still here".into())]
        );
    }

    #[test]
    fn test_only_bad_audio_part_yields_no_content() {
        let event = parse_event(json!({
            "type": "event",
            "server_content": {"turn_complete": true},
            "content": {"parts": [{"inline_data": {"data": "***"}}]}
        }));
        assert!(event.content.is_none());
        assert!(event.turn_complete.is_some());
    }

    #[test]
    fn test_unknown_content_role() {
        let event = parse_event(json!({
            "type": "event",
            "tool_call": {"function_calls": [{"name": "consult_flight_specialist"}]},
            "content": {"role": "system", "parts": [{"text": "x"}]}
        }));
        assert_eq!(event.tool_calls[0].name, "consult_flight_specialist");
        assert_eq!(event.content.unwrap().role, Role::Agent);

        let event = parse_event(json!({
            "type": "event",
            "content": {"role": "user", "parts": [{"text": "y"}]}
        }));
        assert_eq!(event.content.unwrap().role, Role::User);

        let event = parse_event(json!({
            "type": "event",
            "content": {"role": "model", "parts": [{"text": "z"}]}
        }));
        assert_eq!(event.content.unwrap().role, Role::Agent);
    }

    #[test]
    fn test_other_server_frames() {
        let frame: ServerFrame = serde_json::from_value(json!({
            "type": "tool_log",
            "entry": {"type": "subagent_complete", "agent": "Flight Specialist",
                      "result": "ok", "duration": 1.5, "timestamp": 42.0}
        }))
        .unwrap();
        match frame {
            ServerFrame::ToolLog { entry } => {
                assert!(entry.is_complete());
                assert_eq!(entry.duration, Some(1.5));
            }
            other => panic!("unexpected frame {other:?}"),
        }

        let frame: ServerFrame =
            serde_json::from_value(json!({"type": "error", "message": "quota"})).unwrap();
        assert!(matches!(frame, ServerFrame::Error { message } if message == "quota"));

        let frame: ServerFrame = serde_json::from_value(json!({"type": "session_end"})).unwrap();
        assert!(matches!(frame, ServerFrame::SessionEnd));
    }
}
