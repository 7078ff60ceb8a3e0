// capabilities-rs/src/lib.rs
// Built-in capability modules: the pattern classifier and the four
// handlers the router can select, plus the in-process memory store.
// Everything here is consumed through the shared-types seams; the
// orchestrator never names a concrete type from this crate except at
// wiring time.

pub mod classifier;
pub mod conversation;
pub mod device;
pub mod instant;
pub mod memory_ops;
pub mod memory_store;
pub mod patterns;

pub use classifier::PatternIntentClassifier;
pub use conversation::{ConversationalResponder, ModelClient, TemplateModelClient};
pub use device::{DeviceCommand, DeviceCommandExecutor, DeviceController, LoggingDeviceController};
pub use instant::InstantResponder;
pub use memory_ops::MemoryOperationExecutor;
pub use memory_store::InMemoryMemoryService;
pub use patterns::{default_group_priority, default_pattern_groups};
