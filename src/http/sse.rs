//! Progress events and their `text/event-stream` encoding.
//!
//! # Wire format
//! ```text
//! data: {"type":"step","stepId":"analysis","status":"running","progress":0}
//!
//! data: {"type":"complete","runId":"…","result":{…}}
//! ```
//!
//! Each event is one `data:` line followed by a blank line. Comment lines
//! (`:`-prefixed keep-alives) carry no event.

use axum::response::sse::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ErrorKind, GatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
}

/// One event in a progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Step {
        #[serde(rename = "stepId")]
        step_id: String,
        status: StepStatus,
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Complete {
        #[serde(rename = "runId")]
        run_id: Uuid,
        #[serde(default)]
        result: Value,
    },
    Error {
        error: String,
        code: ErrorKind,
        #[serde(rename = "stepId", default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
    },
}

impl StreamEvent {
    pub fn step(step_id: &str, status: StepStatus, progress: u8, message: Option<String>) -> Self {
        StreamEvent::Step {
            step_id: step_id.to_string(),
            status,
            progress: progress.min(100),
            message,
        }
    }

    /// Terminal error event. Uses the caller-safe message, never internal detail.
    pub fn failure(step_id: Option<&str>, err: &GatewayError) -> Self {
        let body = err.body();
        StreamEvent::Error {
            error: body.error,
            code: body.code,
            step_id: step_id.map(str::to_string),
        }
    }

    /// `complete` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StreamEvent::Step { .. } => "step",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Encode an event as an SSE `data:` frame.
pub fn to_event(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, event_type = event.type_name(), "Failed to encode stream event");
            Event::default().data(r#"{"type":"error","error":"Internal server error","code":"unknown"}"#)
        }
    }
}

/// Incremental decoder for `data: <json>` lines.
///
/// Bytes may arrive split at arbitrary points; incomplete lines are held
/// until their newline shows up.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, serde_json::Error>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.strip_prefix(' ').unwrap_or(data);
                if !data.is_empty() {
                    events.push(serde_json::from_str(data));
                }
            }
        }
        events
    }
}
