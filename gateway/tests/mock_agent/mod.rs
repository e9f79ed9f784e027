//! Scripted in-process agent backend
//!
//! Each `connect` hands the test a [`ScriptedSession`]: the test pushes agent
//! events and tool log entries, and observes what the gateway forwarded.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use voicebridge_gateway::core::agent::{
    AgentConnector, AgentError, AgentEvent, AgentRequestSink, AgentResult, AgentSession,
    AgentSessionConfig, AudioChunk,
};
use voicebridge_gateway::core::tool_log::{LogEvent, ToolLogSender};

/// What the gateway sent to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentRequest {
    Audio(AudioChunk),
    Text(String),
    Close,
}

/// Test-side handle on one connected session.
pub struct ScriptedSession {
    pub config: AgentSessionConfig,
    pub events: Option<mpsc::UnboundedSender<AgentResult<AgentEvent>>>,
    pub tool_log: ToolLogSender,
    pub requests: mpsc::UnboundedReceiver<AgentRequest>,
}

impl ScriptedSession {
    pub fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(Ok(event));
        }
    }

    pub fn fail(&self, error: AgentError) {
        if let Some(events) = &self.events {
            let _ = events.send(Err(error));
        }
    }

    pub fn log(&self, entry: LogEvent) {
        self.tool_log.send(entry);
    }

    /// End the agent event stream.
    pub fn end(&mut self) {
        self.events = None;
    }

    pub async fn next_request(&mut self) -> Option<AgentRequest> {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .ok()
            .flatten()
    }
}

struct ScriptedSink {
    tx: mpsc::UnboundedSender<AgentRequest>,
}

#[async_trait]
impl AgentRequestSink for ScriptedSink {
    async fn send_audio(&self, chunk: AudioChunk) -> AgentResult<()> {
        self.tx
            .send(AgentRequest::Audio(chunk))
            .map_err(|_| AgentError::NotConnected)
    }

    async fn send_text(&self, text: &str) -> AgentResult<()> {
        self.tx
            .send(AgentRequest::Text(text.to_string()))
            .map_err(|_| AgentError::NotConnected)
    }

    async fn close(&self) -> AgentResult<()> {
        let _ = self.tx.send(AgentRequest::Close);
        Ok(())
    }
}

/// Connector that hands every session to the test.
pub struct ScriptedAgent {
    sessions: mpsc::UnboundedSender<ScriptedSession>,
    fail_connect: bool,
}

impl ScriptedAgent {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ScriptedSession>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sessions,
                fail_connect: false,
            }),
            rx,
        )
    }

    pub fn unreachable() -> Arc<Self> {
        let (sessions, _rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            sessions,
            fail_connect: true,
        })
    }
}

#[async_trait]
impl AgentConnector for ScriptedAgent {
    async fn connect(
        &self,
        config: AgentSessionConfig,
        tool_log: ToolLogSender,
    ) -> AgentResult<AgentSession> {
        if self.fail_connect {
            return Err(AgentError::ConnectionFailed("scripted refusal".to_string()));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let events = futures::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed();

        let _ = self.sessions.send(ScriptedSession {
            config,
            events: Some(event_tx),
            tool_log,
            requests: request_rx,
        });

        Ok(AgentSession {
            requests: Arc::new(ScriptedSink { tx: request_tx }),
            events,
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
