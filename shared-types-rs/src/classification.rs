// shared-types-rs/src/classification.rs
// Intent taxonomy and classification results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of request classes the classifier can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentCategory {
    /// Answerable locally with zero latency (time, date, simple facts).
    Instant,
    /// A device or home-automation command.
    Action,
    /// An explicit memory operation (remember / recall / forget).
    Memory,
    /// Requires an urgent, prioritized response.
    Emergency,
    /// Open-ended conversation.
    Conversation,
    /// A question that may need retrieved context.
    Query,
    /// Could not be classified.
    Unknown,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Instant => "INSTANT",
            IntentCategory::Action => "ACTION",
            IntentCategory::Memory => "MEMORY",
            IntentCategory::Emergency => "EMERGENCY",
            IntentCategory::Conversation => "CONVERSATION",
            IntentCategory::Query => "QUERY",
            IntentCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a classification was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Pattern,
    Heuristic,
    ModelBased,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::Pattern => "pattern",
            ClassificationMethod::Heuristic => "heuristic",
            ClassificationMethod::ModelBased => "model_based",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        UrgencyLevel::Normal
    }
}

/// Output of the classification stage. Immutable once produced; owned by
/// the request context that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: IntentCategory,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub sub_category: Option<String>,
    /// Queries the context-retrieval stage should run. Empty means the
    /// stage is skipped entirely.
    #[serde(default)]
    pub context_queries: Vec<String>,
    pub emotional_tone: Option<String>,
    pub urgency: Option<UrgencyLevel>,
}

impl ClassificationResult {
    /// The safe default used when the classification capability fails:
    /// route to the conversational responder with low confidence.
    pub fn fallback() -> Self {
        ClassificationResult {
            intent: IntentCategory::Conversation,
            confidence: 0.0,
            sub_category: None,
            context_queries: Vec::new(),
            emotional_tone: None,
            urgency: None,
        }
    }

    pub fn clamped(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// A classification plus the evidence behind it, so callers can record
/// how the result was reached without re-running diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub result: ClassificationResult,
    pub method: ClassificationMethod,
    /// Source of the winning pattern, when method is `Pattern`.
    pub matched_pattern: Option<String>,
    /// Pattern sources that nearly matched, best first.
    #[serde(default)]
    pub near_misses: Vec<String>,
}

impl ClassificationOutcome {
    pub fn heuristic(result: ClassificationResult) -> Self {
        ClassificationOutcome {
            result,
            method: ClassificationMethod::Heuristic,
            matched_pattern: None,
            near_misses: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serializes_screaming_snake() {
        let json = serde_json::to_string(&IntentCategory::Emergency).unwrap();
        assert_eq!(json, "\"EMERGENCY\"");
        let back: IntentCategory = serde_json::from_str("\"QUERY\"").unwrap();
        assert_eq!(back, IntentCategory::Query);
    }

    #[test]
    fn fallback_routes_to_conversation() {
        let fallback = ClassificationResult::fallback();
        assert_eq!(fallback.intent, IntentCategory::Conversation);
        assert_eq!(fallback.confidence, 0.0);
        assert!(fallback.context_queries.is_empty());
    }

    #[test]
    fn clamped_bounds_confidence() {
        let result = ClassificationResult {
            intent: IntentCategory::Query,
            confidence: 1.7,
            sub_category: None,
            context_queries: Vec::new(),
            emotional_tone: None,
            urgency: None,
        };
        assert_eq!(result.clamped().confidence, 1.0);
    }
}
