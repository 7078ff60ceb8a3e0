// orchestrator-service-rs/src/stages.rs
// Explicit per-stage result types. Each stage returns its own struct
// instead of mutating shared request state, so the pipeline reads as a
// straight line and every degradation is visible in the type.

use shared_types::{ClassificationOutcome, HandlerOutput};

use crate::context::StageTiming;
use crate::routing::HandlerKind;

/// Stage 1: classification. Always produces an outcome; classifier
/// failure or timeout degrades to the conversational fallback.
#[derive(Debug, Clone)]
pub struct ClassifyStage {
    pub outcome: ClassificationOutcome,
    pub degraded: bool,
    pub timing: StageTiming,
}

/// Stage 2: context retrieval. Skipped entirely when the classification
/// carries no context queries; a skipped stage has no timing.
#[derive(Debug, Clone)]
pub struct ContextStage {
    pub retrieved: Vec<String>,
    pub timing: Option<StageTiming>,
}

impl ContextStage {
    pub fn skipped() -> Self {
        ContextStage {
            retrieved: Vec::new(),
            timing: None,
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.timing.is_none()
    }
}

/// Stage 3: dispatch to the routed handler. Handler failure or timeout
/// degrades to the fixed apology.
#[derive(Debug, Clone)]
pub struct DispatchStage {
    pub output: HandlerOutput,
    pub handler: HandlerKind,
    pub degraded: bool,
    pub timing: StageTiming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_context_stage_has_no_timing() {
        let stage = ContextStage::skipped();
        assert!(stage.was_skipped());
        assert!(stage.retrieved.is_empty());
    }
}
