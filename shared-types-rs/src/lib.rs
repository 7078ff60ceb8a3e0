// shared-types-rs/src/lib.rs
// Shared data model for the Hearth assistant pipeline.
//
// Everything in this crate is plain data plus the trait seams the
// orchestrator consumes. No component state lives here, so every other
// workspace crate can depend on it without dependency cycles.

pub mod classification;
pub mod handler;

pub use classification::{
    ClassificationMethod, ClassificationOutcome, ClassificationResult, IntentCategory,
    UrgencyLevel,
};
pub use handler::{
    CapabilityError, CapabilityModule, HandlerContext, HandlerOutput, IntentClassifier,
    MemoryEvent, MemoryService, SideEffectRecord,
};
