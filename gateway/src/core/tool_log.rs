//! Out-of-band tool log queue.
//!
//! Tools report their own start and completion through this queue,
//! independently of the agent event stream. Each session owns the single
//! receiver; senders are cheap clones handed to whoever runs the tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::core::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEventKind {
    #[serde(rename = "subagent_start")]
    Start,
    #[serde(rename = "subagent_complete")]
    Complete,
}

/// One tool log entry. Serialized verbatim to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: LogEventKind,
    /// Display name of the tool
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Seconds the tool ran, on completion entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default = "Timestamp::now")]
    pub timestamp: Timestamp,
}

impl LogEvent {
    pub fn start(agent: impl Into<String>, args: Value, timestamp: Timestamp) -> Self {
        Self {
            kind: LogEventKind::Start,
            agent: agent.into(),
            args: Some(args),
            result: None,
            duration: None,
            timestamp,
        }
    }

    pub fn complete(
        agent: impl Into<String>,
        result: Value,
        duration: Duration,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            kind: LogEventKind::Complete,
            agent: agent.into(),
            args: None,
            result: Some(result),
            duration: Some(duration.as_secs_f64()),
            timestamp,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.kind == LogEventKind::Complete
    }
}

/// Producer side of the tool log queue.
#[derive(Debug, Clone)]
pub struct ToolLogSender {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl ToolLogSender {
    /// Enqueue an entry. Never fails the caller: once the session is gone the
    /// entry is dropped.
    pub fn send(&self, event: LogEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Tool log queue closed, entry dropped");
        }
    }

    pub fn log_tool_start(&self, agent: &str, args: Value) {
        self.send(LogEvent::start(agent, args, Timestamp::now()));
    }

    pub fn log_tool_complete(&self, agent: &str, result: Value, duration: Duration) {
        self.send(LogEvent::complete(agent, result, duration, Timestamp::now()));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the tool log queue.
#[derive(Debug)]
pub struct ToolLogReceiver {
    rx: mpsc::UnboundedReceiver<LogEvent>,
}

impl ToolLogReceiver {
    /// Next entry, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.rx.recv().await
    }
}

pub fn channel() -> (ToolLogSender, ToolLogReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ToolLogSender { tx }, ToolLogReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_entry_wire_format() {
        let event = LogEvent::start(
            "Flight Specialist",
            json!({"destination": "Tokyo"}),
            Timestamp::from_secs_f64(12.5),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "subagent_start",
                "agent": "Flight Specialist",
                "args": {"destination": "Tokyo"},
                "timestamp": 12.5
            })
        );
    }

    #[test]
    fn test_complete_entry_wire_format() {
        let event = LogEvent::complete(
            "Lifestyle Specialist",
            json!("Found 3 restaurants"),
            Duration::from_millis(1250),
            Timestamp::from_secs_f64(20.0),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "subagent_complete");
        assert_eq!(value["result"], "Found 3 restaurants");
        assert_eq!(value["duration"], 1.25);
        assert!(value.get("args").is_none());
        assert!(event.is_complete());
    }

    #[test]
    fn test_parse_without_timestamp_stamps_now() {
        let event: LogEvent =
            serde_json::from_str(r#"{"type":"subagent_complete","agent":"x","result":{}}"#)
                .unwrap();
        assert!(event.timestamp.as_secs_f64() > 0.0);
        assert!(event.is_complete());
    }

    #[tokio::test]
    async fn test_queue_preserves_order() {
        let (tx, mut rx) = channel();
        tx.log_tool_start("Flight Specialist", json!({}));
        tx.log_tool_complete("Flight Specialist", json!("ok"), Duration::from_secs(1));

        assert_eq!(rx.recv().await.unwrap().kind, LogEventKind::Start);
        assert_eq!(rx.recv().await.unwrap().kind, LogEventKind::Complete);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(tx.is_closed());
        tx.log_tool_start("Flight Specialist", json!({}));
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (tx, mut rx) = channel();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
