// orchestrator-service-rs/src/context.rs
// Per-request context and the response envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_types::SideEffectRecord;

/// One incoming request, as assembled at the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Correlates every decision record this request produces.
    pub trace_id: String,
    pub text: String,
    pub speaker: Option<String>,
    pub room: Option<String>,
    pub conversation_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(text: impl Into<String>) -> Self {
        let request_id = Uuid::new_v4();
        RequestContext {
            request_id,
            trace_id: request_id.to_string(),
            text: text.into(),
            speaker: None,
            room: None,
            conversation_id: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Wall-clock cost of one executed stage. Stages that were skipped
/// produce no timing entry at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: f64,
    /// True when the stage overran its soft budget and the pipeline
    /// continued with the stage's safe default.
    pub timed_out: bool,
}

/// The pipeline's answer. Always produced; failures degrade the content,
/// never the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub request_id: Uuid,
    pub trace_id: String,
    pub response: String,
    pub intent: String,
    pub sub_category: Option<String>,
    pub confidence: f64,
    /// "pattern", "heuristic" or "model_based".
    pub method: String,
    #[serde(default)]
    pub side_effects: Vec<SideEffectRecord>,
    #[serde(default)]
    pub timings: Vec<StageTiming>,
    /// True when any stage fell back to its safe default.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_derives_trace_from_request_id() {
        let request = RequestContext::new("hello");
        assert_eq!(request.trace_id, request.request_id.to_string());
        assert!(request.speaker.is_none());
    }

    #[test]
    fn builder_helpers_fill_the_envelope() {
        let request = RequestContext::new("hi")
            .with_speaker("ida")
            .with_room("kitchen")
            .with_conversation("c-1");
        assert_eq!(request.speaker.as_deref(), Some("ida"));
        assert_eq!(request.room.as_deref(), Some("kitchen"));
        assert_eq!(request.conversation_id.as_deref(), Some("c-1"));
    }
}
