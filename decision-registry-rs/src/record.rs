// decision-registry-rs/src/record.rs
// The decision record shape: typed payload values, logic descriptors and
// sealed records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of choice a decision point represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Classification,
    ContextEvaluation,
    Routing,
    Dispatch,
    Persistence,
    Diagnostic,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Classification => "CLASSIFICATION",
            DecisionKind::ContextEvaluation => "CONTEXT_EVALUATION",
            DecisionKind::Routing => "ROUTING",
            DecisionKind::Dispatch => "DISPATCH",
            DecisionKind::Persistence => "PERSISTENCE",
            DecisionKind::Diagnostic => "DIAGNOSTIC",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome tag of a sealed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Match,
    NoMatch,
    Selected,
    Rejected,
    Skipped,
    Error,
    Overridden,
    Fallback,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::Match => "MATCH",
            DecisionOutcome::NoMatch => "NO_MATCH",
            DecisionOutcome::Selected => "SELECTED",
            DecisionOutcome::Rejected => "REJECTED",
            DecisionOutcome::Skipped => "SKIPPED",
            DecisionOutcome::Error => "ERROR",
            DecisionOutcome::Overridden => "OVERRIDDEN",
            DecisionOutcome::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload value for inputs, logic parameters and results.
///
/// A tagged union instead of a free-form map: callers store anything,
/// the registry renders it safely and truncates for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DecisionValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl DecisionValue {
    pub fn text(value: impl Into<String>) -> Self {
        DecisionValue::Text(value.into())
    }

    /// Render for display, truncating long content to `max_chars`.
    pub fn render(&self, max_chars: usize) -> String {
        let full = match self {
            DecisionValue::None => "none".to_string(),
            DecisionValue::Bool(b) => b.to_string(),
            DecisionValue::Int(i) => i.to_string(),
            DecisionValue::Float(f) => format!("{f:.4}"),
            DecisionValue::Text(s) => s.clone(),
            DecisionValue::Json(v) => v.to_string(),
        };
        if full.chars().count() <= max_chars {
            full
        } else {
            let truncated: String = full.chars().take(max_chars).collect();
            format!("{truncated}...")
        }
    }
}

impl From<&str> for DecisionValue {
    fn from(value: &str) -> Self {
        DecisionValue::Text(value.to_string())
    }
}

impl From<String> for DecisionValue {
    fn from(value: String) -> Self {
        DecisionValue::Text(value)
    }
}

impl From<bool> for DecisionValue {
    fn from(value: bool) -> Self {
        DecisionValue::Bool(value)
    }
}

impl From<i64> for DecisionValue {
    fn from(value: i64) -> Self {
        DecisionValue::Int(value)
    }
}

impl From<f64> for DecisionValue {
    fn from(value: f64) -> Self {
        DecisionValue::Float(value)
    }
}

impl From<serde_json::Value> for DecisionValue {
    fn from(value: serde_json::Value) -> Self {
        DecisionValue::Json(value)
    }
}

/// Ordered key/value snapshot attached to a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot(pub BTreeMap<String, DecisionValue>);

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<DecisionValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DecisionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render every entry, truncating each value for display.
    pub fn render(&self, max_chars_per_value: usize) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.render(max_chars_per_value)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What rule/pattern/model was applied, and where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicDescriptor {
    /// The rule applied, e.g. a pattern source or "intent routing table".
    pub rule: String,
    /// Where the rule lives, e.g. "capabilities::classifier".
    pub source: String,
    #[serde(default)]
    pub parameters: Snapshot,
}

impl LogicDescriptor {
    pub fn new(rule: impl Into<String>, source: impl Into<String>) -> Self {
        LogicDescriptor {
            rule: rule.into(),
            source: source.into(),
            parameters: Snapshot::new(),
        }
    }

    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<DecisionValue>,
    ) -> Self {
        self.parameters.insert(key, value);
        self
    }
}

/// A rejected candidate, kept for ranking context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub value: DecisionValue,
    pub confidence: f64,
}

/// Maximum alternatives stored per decision.
pub const MAX_ALTERNATIVES: usize = 3;

/// The sealed outcome of one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub outcome: DecisionOutcome,
    pub value: DecisionValue,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub alternatives: Vec<RankedAlternative>,
    pub explanation: Option<String>,
}

impl DecisionResult {
    pub fn new(outcome: DecisionOutcome, value: impl Into<DecisionValue>) -> Self {
        DecisionResult {
            outcome,
            value: value.into(),
            confidence: None,
            alternatives: Vec::new(),
            explanation: None,
        }
    }

    pub fn selected(value: impl Into<DecisionValue>) -> Self {
        DecisionResult::new(DecisionOutcome::Selected, value)
    }

    pub fn matched(value: impl Into<DecisionValue>) -> Self {
        DecisionResult::new(DecisionOutcome::Match, value)
    }

    pub fn no_match() -> Self {
        DecisionResult::new(DecisionOutcome::NoMatch, DecisionValue::None)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        DecisionResult::new(DecisionOutcome::Skipped, DecisionValue::None)
            .with_explanation(reason)
    }

    pub fn fallback(value: impl Into<DecisionValue>, reason: impl Into<String>) -> Self {
        DecisionResult::new(DecisionOutcome::Fallback, value).with_explanation(reason)
    }

    pub fn error(message: impl Into<String>) -> Self {
        DecisionResult::new(DecisionOutcome::Error, DecisionValue::None)
            .with_explanation(message)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Append an alternative, keeping at most [`MAX_ALTERNATIVES`].
    pub fn with_alternative(
        mut self,
        value: impl Into<DecisionValue>,
        confidence: f64,
    ) -> Self {
        if self.alternatives.len() < MAX_ALTERNATIVES {
            self.alternatives.push(RankedAlternative {
                value: value.into(),
                confidence,
            });
        }
        self
    }
}

/// One sealed entry per decision point. Created at decision start,
/// sealed at decision end, owned by the registry for its retention
/// window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub trace_id: Option<String>,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub kind: DecisionKind,
    pub component: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: f64,
    #[serde(default)]
    pub inputs: Snapshot,
    pub logic: Option<LogicDescriptor>,
    pub result: DecisionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_render_truncates_long_text() {
        let value = DecisionValue::text("a".repeat(100));
        let rendered = value.render(10);
        assert_eq!(rendered, format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn snapshot_renders_in_key_order() {
        let snap = Snapshot::new().with("b", 2i64).with("a", "one");
        assert_eq!(snap.render(32), "a=one, b=2");
    }

    #[test]
    fn alternatives_are_capped() {
        let mut result = DecisionResult::selected("winner");
        for i in 0..10 {
            result = result.with_alternative(format!("alt-{i}"), 0.1);
        }
        assert_eq!(result.alternatives.len(), MAX_ALTERNATIVES);
    }

    #[test]
    fn outcome_serializes_screaming_snake() {
        let json = serde_json::to_string(&DecisionOutcome::NoMatch).unwrap();
        assert_eq!(json, "\"NO_MATCH\"");
    }
}
