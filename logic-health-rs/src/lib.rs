// logic-health-rs/src/lib.rs
// Classification consistency monitor.
//
// Records every classification outcome keyed by a hash of the normalized
// input, flags inputs the classifier has answered differently over time,
// and reports near-miss patterns that keep almost matching distinct
// inputs (a sign the pattern table is missing an entry).
//
// Pure library crate; the orchestrator owns the instance and feeds it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use pattern_diagnostics::normalize;
use shared_types::{ClassificationMethod, ClassificationOutcome, IntentCategory};

#[cfg(test)]
mod tests;

pub const DEFAULT_WINDOW_SIZE: usize = 5_000;
pub const DEFAULT_LOW_COVERAGE_THRESHOLD: usize = 3;

/// Characters of the hex digest kept as the input key.
const HASH_PREFIX_LEN: usize = 16;

/// Characters of raw input echoed into findings.
const FINDING_INPUT_PREVIEW: usize = 48;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("health monitor lock poisoned")]
    Poisoned,
}

/// One remembered classification of one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub intent: IntentCategory,
    pub sub_category: Option<String>,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub matched_pattern: Option<String>,
    #[serde(default)]
    pub near_misses: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A distinct (intent, sub_category, method) combination seen for an
/// input, with its occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTuple {
    pub intent: IntentCategory,
    pub sub_category: Option<String>,
    pub method: ClassificationMethod,
    pub count: usize,
}

/// Consistency verdict for a single input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub input_hash: String,
    pub observations: usize,
    /// True when every observation agreed on (intent, sub_category).
    /// Method differences alone do not break consistency.
    pub is_consistent: bool,
    /// The most frequent (intent, sub_category) pair, if any.
    pub dominant_intent: Option<IntentCategory>,
    pub dominant_sub_category: Option<String>,
    /// Every distinct combination observed, in first-seen order.
    pub conflicts: Vec<ClassificationTuple>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingSeverity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFinding {
    pub severity: FindingSeverity,
    /// Stable machine-readable code, e.g. "INCONSISTENT_CLASSIFICATION".
    pub code: String,
    /// Set for per-input findings; None for pattern-table findings.
    pub input_hash: Option<String>,
    pub message: String,
}

/// Point-in-time summary over the retained window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub window_size: usize,
    pub unique_inputs: usize,
    /// Fraction of distinct inputs whose repeated classifications agree.
    pub consistency_score: f64,
    pub findings: Vec<HealthFinding>,
    pub intent_distribution: HashMap<String, usize>,
    pub method_distribution: HashMap<String, usize>,
    pub avg_confidence: f64,
}

impl HealthReport {
    /// Proportion of retained observations per classification method.
    /// Values sum to 1.0 over a non-empty window.
    pub fn method_proportions(&self) -> HashMap<String, f64> {
        if self.window_size == 0 {
            return HashMap::new();
        }
        self.method_distribution
            .iter()
            .map(|(method, count)| (method.clone(), *count as f64 / self.window_size as f64))
            .collect()
    }
}

struct InputHistory {
    raw_input: String,
    normalized_input: String,
    observations: Vec<Observation>,
}

#[derive(Default)]
struct Inner {
    /// One hash entry per recorded observation, oldest first.
    order: VecDeque<String>,
    by_hash: HashMap<String, InputHistory>,
    total_recorded: u64,
}

impl Inner {
    fn new() -> Self {
        Inner {
            order: VecDeque::new(),
            by_hash: HashMap::new(),
            total_recorded: 0,
        }
    }
}

/// Hash key for an input: truncated SHA-256 of the normalized,
/// lowercased text. Whitespace variants of the same utterance share a
/// key; content is never stored beyond the normalized form.
pub fn input_hash(text: &str) -> String {
    let normalized = normalize(text).to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")[..HASH_PREFIX_LEN].to_string()
}

pub struct LogicHealthMonitor {
    window_size: usize,
    low_coverage_threshold: usize,
    inner: Mutex<Inner>,
}

impl LogicHealthMonitor {
    pub fn new(window_size: usize, low_coverage_threshold: usize) -> Self {
        LogicHealthMonitor {
            window_size: window_size.max(1),
            low_coverage_threshold: low_coverage_threshold.max(2),
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Window and threshold from LOGIC_HEALTH_WINDOW_SIZE and
    /// LOGIC_HEALTH_LOW_COVERAGE_THRESHOLD; defaults 5,000 and 3.
    pub fn from_env() -> Self {
        LogicHealthMonitor::new(
            config_rs::env_usize("LOGIC_HEALTH_WINDOW_SIZE", DEFAULT_WINDOW_SIZE),
            config_rs::env_usize(
                "LOGIC_HEALTH_LOW_COVERAGE_THRESHOLD",
                DEFAULT_LOW_COVERAGE_THRESHOLD,
            ),
        )
    }

    /// Record one classification outcome. Returns the input hash so the
    /// caller can attach it to its own records.
    pub fn record_classification(
        &self,
        input: &str,
        outcome: &ClassificationOutcome,
    ) -> Result<String, HealthError> {
        let hash = input_hash(input);
        let normalized = normalize(input).to_lowercase();
        let observation = Observation {
            intent: outcome.result.intent,
            sub_category: outcome.result.sub_category.clone(),
            confidence: outcome.result.confidence,
            method: outcome.method,
            matched_pattern: outcome.matched_pattern.clone(),
            near_misses: outcome.near_misses.clone(),
            recorded_at: Utc::now(),
        };

        let mut inner = self.inner.lock().map_err(|_| HealthError::Poisoned)?;
        if inner.order.len() >= self.window_size {
            Self::evict_oldest(&mut inner);
        }
        inner.order.push_back(hash.clone());
        inner
            .by_hash
            .entry(hash.clone())
            .or_insert_with(|| InputHistory {
                raw_input: input.trim().to_string(),
                normalized_input: normalized,
                observations: Vec::new(),
            })
            .observations
            .push(observation);
        inner.total_recorded += 1;
        debug!("classification recorded for input hash {hash}");
        Ok(hash)
    }

    fn evict_oldest(inner: &mut Inner) {
        let Some(oldest) = inner.order.pop_front() else {
            return;
        };
        let remove = if let Some(history) = inner.by_hash.get_mut(&oldest) {
            if !history.observations.is_empty() {
                history.observations.remove(0);
            }
            history.observations.is_empty()
        } else {
            false
        };
        if remove {
            inner.by_hash.remove(&oldest);
        }
    }

    /// Distinct combinations observed for a history, in first-seen order.
    fn tuples(history: &InputHistory) -> Vec<ClassificationTuple> {
        let mut tuples: Vec<ClassificationTuple> = Vec::new();
        for obs in &history.observations {
            if let Some(existing) = tuples.iter_mut().find(|t| {
                t.intent == obs.intent
                    && t.sub_category == obs.sub_category
                    && t.method == obs.method
            }) {
                existing.count += 1;
            } else {
                tuples.push(ClassificationTuple {
                    intent: obs.intent,
                    sub_category: obs.sub_category.clone(),
                    method: obs.method,
                    count: 1,
                });
            }
        }
        tuples
    }

    fn consistency_of(hash: &str, history: &InputHistory) -> ConsistencyReport {
        let tuples = Self::tuples(history);

        // Consistency ignores the method: two pattern hits and a heuristic
        // fallback that all said ACTION/light_control still agree.
        let mut pairs: Vec<(IntentCategory, Option<String>, usize)> = Vec::new();
        for t in &tuples {
            if let Some(existing) = pairs
                .iter_mut()
                .find(|(i, s, _)| *i == t.intent && *s == t.sub_category)
            {
                existing.2 += t.count;
            } else {
                pairs.push((t.intent, t.sub_category.clone(), t.count));
            }
        }
        let dominant = pairs.iter().max_by_key(|(_, _, count)| *count).cloned();

        ConsistencyReport {
            input_hash: hash.to_string(),
            observations: history.observations.len(),
            is_consistent: pairs.len() <= 1,
            dominant_intent: dominant.as_ref().map(|(i, _, _)| *i),
            dominant_sub_category: dominant.and_then(|(_, s, _)| s),
            conflicts: tuples,
        }
    }

    /// Consistency verdict for one input. Unseen inputs are vacuously
    /// consistent with zero observations.
    pub fn check_consistency(&self, input: &str) -> Result<ConsistencyReport, HealthError> {
        let hash = input_hash(input);
        let inner = self.inner.lock().map_err(|_| HealthError::Poisoned)?;
        Ok(match inner.by_hash.get(&hash) {
            Some(history) => Self::consistency_of(&hash, history),
            None => ConsistencyReport {
                input_hash: hash,
                observations: 0,
                is_consistent: true,
                dominant_intent: None,
                dominant_sub_category: None,
                conflicts: Vec::new(),
            },
        })
    }

    /// Summarize the retained window: one WARNING per inconsistently
    /// classified input, one INFO per near-miss pattern recurring across
    /// enough distinct inputs to suggest a missing table entry.
    #[instrument(name = "logic_health_report", skip(self))]
    pub fn generate_health_report(&self) -> Result<HealthReport, HealthError> {
        let inner = self.inner.lock().map_err(|_| HealthError::Poisoned)?;

        let mut findings = Vec::new();
        let mut intent_distribution: HashMap<String, usize> = HashMap::new();
        let mut method_distribution: HashMap<String, usize> = HashMap::new();
        let mut near_miss_inputs: HashMap<String, HashSet<String>> = HashMap::new();
        let mut confidence_sum = 0.0;
        let mut observation_count = 0usize;
        let mut conflicting_inputs = 0usize;

        let mut hashes: Vec<&String> = inner.by_hash.keys().collect();
        hashes.sort();

        for hash in &hashes {
            let history = &inner.by_hash[*hash];
            for obs in &history.observations {
                *intent_distribution
                    .entry(obs.intent.as_str().to_string())
                    .or_insert(0) += 1;
                *method_distribution
                    .entry(obs.method.as_str().to_string())
                    .or_insert(0) += 1;
                confidence_sum += obs.confidence;
                observation_count += 1;
                for pattern in &obs.near_misses {
                    near_miss_inputs
                        .entry(pattern.clone())
                        .or_default()
                        .insert((*hash).clone());
                }
            }

            let preview: String = history
                .raw_input
                .chars()
                .take(FINDING_INPUT_PREVIEW)
                .collect();

            let report = Self::consistency_of(hash, history);
            if !report.is_consistent {
                conflicting_inputs += 1;
                let variants = report
                    .conflicts
                    .iter()
                    .map(|t| {
                        format!(
                            "{}/{} x{}",
                            t.intent,
                            t.sub_category.as_deref().unwrap_or("-"),
                            t.count
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                findings.push(HealthFinding {
                    severity: FindingSeverity::Warning,
                    code: "INCONSISTENT_CLASSIFICATION".to_string(),
                    input_hash: Some((*hash).clone()),
                    message: format!(
                        "input \"{preview}\" classified {} ways over {} observations: {variants}",
                        report.conflicts.len(),
                        report.observations
                    ),
                });
            }
        }

        // A near-miss pattern that keeps almost matching distinct inputs
        // points at a gap in the pattern table.
        let mut recurring: Vec<(&String, usize)> = near_miss_inputs
            .iter()
            .filter(|(_, inputs)| inputs.len() >= self.low_coverage_threshold)
            .map(|(pattern, inputs)| (pattern, inputs.len()))
            .collect();
        recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (pattern, input_count) in recurring {
            let example = near_miss_inputs[pattern]
                .iter()
                .min()
                .and_then(|h| inner.by_hash.get(h))
                .map(|history| history.normalized_input.as_str())
                .unwrap_or_default();
            findings.push(HealthFinding {
                severity: FindingSeverity::Info,
                code: "LOW_COVERAGE".to_string(),
                input_hash: None,
                message: format!(
                    "pattern {pattern:?} nearly matched {input_count} distinct inputs \
                     (e.g. \"{example}\"); consider a broader table entry"
                ),
            });
        }

        let unique_inputs = inner.by_hash.len();
        Ok(HealthReport {
            generated_at: Utc::now(),
            window_size: observation_count,
            unique_inputs,
            consistency_score: if unique_inputs > 0 {
                (unique_inputs - conflicting_inputs) as f64 / unique_inputs as f64
            } else {
                1.0
            },
            findings,
            intent_distribution,
            method_distribution,
            avg_confidence: if observation_count > 0 {
                confidence_sum / observation_count as f64
            } else {
                0.0
            },
        })
    }
}

impl Default for LogicHealthMonitor {
    fn default() -> Self {
        LogicHealthMonitor::new(DEFAULT_WINDOW_SIZE, DEFAULT_LOW_COVERAGE_THRESHOLD)
    }
}
