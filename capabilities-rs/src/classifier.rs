// capabilities-rs/src/classifier.rs
// Pattern-first intent classifier with a heuristic fallback.

use async_trait::async_trait;
use log::debug;

use pattern_diagnostics::{
    normalize, tokenize, GroupPriority, PatternDiagnosticsEngine, PatternGroup,
};
use shared_types::{
    CapabilityError, ClassificationMethod, ClassificationOutcome, ClassificationResult,
    IntentCategory, IntentClassifier, UrgencyLevel,
};

use crate::patterns::{default_group_priority, default_pattern_groups, intent_for_group};

const HEURISTIC_QUERY_CONFIDENCE: f64 = 0.4;
const HEURISTIC_CONVERSATION_CONFIDENCE: f64 = 0.3;
const MAX_CONTEXT_QUERIES: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "do", "does", "did", "what", "who", "where",
    "when", "why", "how", "can", "could", "will", "would", "you", "your", "my", "me", "i", "it",
    "to", "of", "in", "on", "at", "for", "about", "please", "that", "this", "remember",
    "recall", "forget",
];

const INTERROGATIVES: &[&str] = &[
    "what", "who", "where", "when", "why", "how", "is", "are", "do", "does", "did", "can",
    "could", "will", "would",
];

/// Stage-1 classifier: runs the input through the pattern tables in
/// priority order, falling back to word-order heuristics when nothing
/// matches. Never fails on odd input; pathological text just classifies
/// as conversation.
pub struct PatternIntentClassifier {
    engine: PatternDiagnosticsEngine,
    groups: Vec<PatternGroup>,
    priority: Vec<GroupPriority>,
}

impl PatternIntentClassifier {
    pub fn new(
        groups: Vec<PatternGroup>,
        priority: Vec<GroupPriority>,
    ) -> Result<Self, CapabilityError> {
        pattern_diagnostics::validate_groups(&groups)
            .map_err(|e| CapabilityError::InvalidInput(e.to_string()))?;
        Ok(PatternIntentClassifier {
            engine: PatternDiagnosticsEngine::default(),
            groups,
            priority,
        })
    }

    pub fn with_default_patterns() -> Self {
        // builtin tables are validated by test, construction cannot fail
        PatternIntentClassifier {
            engine: PatternDiagnosticsEngine::default(),
            groups: default_pattern_groups(),
            priority: default_group_priority(),
        }
    }

    /// Content words worth retrieving memories for.
    fn context_queries(text: &str) -> Vec<String> {
        tokenize(text)
            .into_iter()
            .filter(|t| t.len() >= 3 && !STOPWORDS.contains(&t.as_str()))
            .take(MAX_CONTEXT_QUERIES)
            .collect()
    }

    fn emotional_tone(text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        if lowered.contains("help") || text.matches('!').count() >= 2 {
            Some("distressed".to_string())
        } else if text.ends_with('!') {
            Some("excited".to_string())
        } else {
            None
        }
    }

    fn urgency_for(intent: IntentCategory, text: &str) -> UrgencyLevel {
        match intent {
            IntentCategory::Emergency => UrgencyLevel::Critical,
            _ if text.ends_with('!') => UrgencyLevel::High,
            _ => UrgencyLevel::Normal,
        }
    }

    fn heuristic_classify(&self, normalized: &str) -> ClassificationResult {
        let tokens = tokenize(normalized);
        let (intent, confidence) = match tokens.first() {
            Some(first) if INTERROGATIVES.contains(&first.as_str()) => {
                (IntentCategory::Query, HEURISTIC_QUERY_CONFIDENCE)
            }
            _ => (
                IntentCategory::Conversation,
                HEURISTIC_CONVERSATION_CONFIDENCE,
            ),
        };
        ClassificationResult {
            intent,
            confidence,
            sub_category: None,
            context_queries: Self::context_queries(normalized),
            emotional_tone: Self::emotional_tone(normalized),
            urgency: Some(Self::urgency_for(intent, normalized)),
        }
    }
}

#[async_trait]
impl IntentClassifier for PatternIntentClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationOutcome, CapabilityError> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Ok(ClassificationOutcome::heuristic(
                ClassificationResult::fallback(),
            ));
        }

        let report = self
            .engine
            .diagnose(&normalized, &self.groups, &self.priority);

        if let Some(winner) = report.winner {
            let intent = intent_for_group(&winner.group);
            debug!(
                "pattern classification: {} via {:?} ({:.2})",
                intent, winner.pattern, winner.confidence
            );
            let context_queries = match intent {
                IntentCategory::Query | IntentCategory::Memory | IntentCategory::Conversation => {
                    Self::context_queries(&normalized)
                }
                _ => Vec::new(),
            };
            return Ok(ClassificationOutcome {
                result: ClassificationResult {
                    intent,
                    confidence: winner.confidence,
                    sub_category: winner.sub_category.clone(),
                    context_queries,
                    emotional_tone: Self::emotional_tone(&normalized),
                    urgency: Some(Self::urgency_for(intent, &normalized)),
                }
                .clamped(),
                method: ClassificationMethod::Pattern,
                matched_pattern: Some(winner.pattern),
                near_misses: Vec::new(),
            });
        }

        let near_misses = report
            .near_misses
            .iter()
            .map(|c| c.pattern.clone())
            .collect();
        debug!("no pattern match, using heuristic fallback");
        Ok(ClassificationOutcome {
            result: self.heuristic_classify(&normalized).clamped(),
            method: ClassificationMethod::Heuristic,
            matched_pattern: None,
            near_misses,
        })
    }
}
