// shared-types-rs/src/handler.rs
// Capability-module contracts consumed by the orchestrator.
//
// Each handler (instant / action / memory / conversation) and the
// classifier is consumed through a uniform async trait so the pipeline
// never depends on a concrete implementation. External collaborators
// (model provider, device protocol, durable memory store) sit behind the
// same seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ClassificationOutcome;

/// Errors surfaced by capability modules and collaborators.
///
/// The orchestrator treats every variant as recoverable: a failing stage
/// degrades to its safe default instead of failing the request.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("capability timed out after {0} ms")]
    Timeout(u64),

    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("capability failed: {0}")]
    Internal(String),
}

/// Context assembled by the orchestrator and handed to the chosen module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerContext {
    pub speaker: Option<String>,
    pub room: Option<String>,
    pub conversation_id: Option<String>,
    /// Memory strings retrieved in the context stage, best first.
    #[serde(default)]
    pub retrieved_context: Vec<String>,
    pub emotional_tone: Option<String>,
    /// Forced true when the routed intent is EMERGENCY.
    pub urgent: bool,
    pub sub_category: Option<String>,
}

/// What a capability module hands back to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerOutput {
    /// Becomes the pipeline's response text.
    pub response: String,
    /// Device or side-effect description, appended to the request's
    /// side-effect list when present.
    pub action: Option<serde_json::Value>,
    /// Memory strings the module wants persisted.
    #[serde(default)]
    pub memories: Vec<String>,
}

impl HandlerOutput {
    pub fn text(response: impl Into<String>) -> Self {
        HandlerOutput {
            response: response.into(),
            action: None,
            memories: Vec::new(),
        }
    }
}

/// One recorded side effect of a request (e.g. a device action taken).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideEffectRecord {
    pub kind: String,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl SideEffectRecord {
    pub fn new(kind: impl Into<String>, detail: serde_json::Value) -> Self {
        SideEffectRecord {
            kind: kind.into(),
            detail,
            occurred_at: Utc::now(),
        }
    }
}

/// Uniform contract for every capability module the router can select.
///
/// `init`/`shutdown` are lifecycle hooks called once per process
/// lifetime, never per request.
#[async_trait]
pub trait CapabilityModule: Send + Sync {
    /// Stable name used in decision records and logs.
    fn name(&self) -> &str;

    async fn handle_input(
        &self,
        text: &str,
        context: &HandlerContext,
    ) -> Result<HandlerOutput, CapabilityError>;

    async fn init(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// The classification capability consumed by stage 1.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassificationOutcome, CapabilityError>;
}

/// One event synthesized from a completed turn, forwarded to the
/// memory-generation collaborator by the persistence stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub conversation_id: Option<String>,
    pub speaker: Option<String>,
    pub user_text: String,
    pub assistant_text: String,
    pub intent: String,
    pub occurred_at: DateTime<Utc>,
}

/// Memory collaborator with the RETRIEVE / GENERATE operation split.
///
/// `retrieve` returns ranked memory content strings; `generate` is
/// fire-and-forget from the pipeline's point of view.
#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn retrieve(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<Vec<String>, CapabilityError>;

    async fn generate(&self, events: Vec<MemoryEvent>) -> Result<(), CapabilityError>;
}
