// pattern-diagnostics-rs/src/lib.rs
// Pattern-match explanation engine.
//
// Given input text and a prioritized set of pattern groups, determines
// the winning match or explains every near miss: typos against a
// pattern's anchor keywords, anchoring failures, and partial token
// overlap. Stateless and synchronous; used both during live routing and
// for offline health analysis.

use std::time::Instant;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod suggest;

pub use analysis::{edit_distance, normalize, tokenize};
pub use suggest::PatternSuggestion;

use analysis::{anchor_keywords, similarity, typo_threshold};
use suggest::suggest_patterns;

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// One candidate pattern inside a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDef {
    /// Regex source, matched case-insensitively.
    pub pattern: String,
    pub sub_category: Option<String>,
}

impl PatternDef {
    pub fn new(pattern: impl Into<String>, sub_category: Option<&str>) -> Self {
        PatternDef {
            pattern: pattern.into(),
            sub_category: sub_category.map(str::to_string),
        }
    }
}

/// A named, ordered list of candidate patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternGroup {
    pub name: String,
    pub patterns: Vec<PatternDef>,
}

/// Group priority entry: groups are tried in the order these are listed
/// and a win inherits the group's confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPriority {
    pub group: String,
    pub confidence: f64,
}

impl GroupPriority {
    pub fn new(group: impl Into<String>, confidence: f64) -> Self {
        GroupPriority {
            group: group.into(),
            confidence,
        }
    }
}

/// Why a candidate pattern did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// An anchor keyword is one edit away from an input token.
    Typo,
    /// The de-anchored pattern matches, but leading/trailing words broke
    /// the `^`/`$` anchoring.
    AnchorFail,
    /// Significant token overlap without a match.
    Partial,
    /// No meaningful relation to the input.
    Unrelated,
    /// Not applicable (the pattern matched, or was not diagnosed).
    None,
}

/// The evaluation of one candidate pattern against the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCheck {
    pub group: String,
    pub pattern: String,
    pub sub_category: Option<String>,
    /// The group confidence this check would carry if it won.
    pub confidence: f64,
    pub matched: bool,
    pub failure_reason: FailureReason,
    /// Similarity to the input in [0, 1]; 1.0 for a match.
    pub similarity: f64,
    /// Human-readable repair suggestions for this pattern.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Aggregate result of one diagnostic call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub winner: Option<PatternCheck>,
    pub checks: Vec<PatternCheck>,
    /// Near misses ranked by descending similarity (UNRELATED excluded).
    pub near_misses: Vec<PatternCheck>,
    pub suggestions: Vec<PatternSuggestion>,
    pub total_patterns: usize,
    /// "pattern" when a winner was found, "fallback" otherwise.
    pub method: String,
    pub elapsed_ms: f64,
}

/// Validate every pattern in the groups compiles; used by classifiers at
/// construction time so bad table entries fail fast instead of being
/// silently skipped at request time.
pub fn validate_groups(groups: &[PatternGroup]) -> Result<(), DiagnosticsError> {
    for group in groups {
        for def in &group.patterns {
            compile(&def.pattern).map_err(|source| DiagnosticsError::InvalidPattern {
                pattern: def.pattern.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Strip a leading `^` and trailing `$` so the core of an anchored
/// pattern can be searched anywhere in the input.
fn deanchor(pattern: &str) -> &str {
    let mut core = pattern;
    if let Some(rest) = core.strip_prefix('^') {
        core = rest;
    }
    if core.ends_with('$') && !core.ends_with("\\$") {
        core = &core[..core.len() - 1];
    }
    core
}

fn is_anchored(pattern: &str) -> bool {
    pattern.starts_with('^') || (pattern.ends_with('$') && !pattern.ends_with("\\$"))
}

/// The diagnostics engine. Thresholds are fixed at construction; the
/// engine itself holds no per-call state.
#[derive(Debug, Clone)]
pub struct PatternDiagnosticsEngine {
    /// Similarity at or above which a non-match is kept as PARTIAL.
    pub partial_threshold: f64,
    /// Cap on the ranked near-miss list.
    pub max_near_misses: usize,
}

impl Default for PatternDiagnosticsEngine {
    fn default() -> Self {
        PatternDiagnosticsEngine {
            partial_threshold: 0.5,
            max_near_misses: 5,
        }
    }
}

impl PatternDiagnosticsEngine {
    pub fn new(partial_threshold: f64, max_near_misses: usize) -> Self {
        PatternDiagnosticsEngine {
            partial_threshold,
            max_near_misses,
        }
    }

    /// Evaluate `text` against the groups in priority order.
    ///
    /// The first pattern that matches wins and evaluation stops. When
    /// nothing matches, every candidate is diagnosed and the input's
    /// surface structure is mined for new-pattern suggestions.
    pub fn diagnose(
        &self,
        text: &str,
        groups: &[PatternGroup],
        priority: &[GroupPriority],
    ) -> DiagnosticsReport {
        let started = Instant::now();
        let normalized = normalize(text);
        let input_tokens = tokenize(&normalized);

        let mut checks: Vec<PatternCheck> = Vec::new();
        let mut winner: Option<PatternCheck> = None;

        'outer: for entry in priority {
            let Some(group) = groups.iter().find(|g| g.name == entry.group) else {
                log::warn!("priority entry references unknown group {:?}", entry.group);
                continue;
            };
            for def in &group.patterns {
                let regex = match compile(&def.pattern) {
                    Ok(r) => r,
                    Err(e) => {
                        log::warn!("skipping invalid pattern {:?}: {}", def.pattern, e);
                        continue;
                    }
                };
                if regex.is_match(&normalized) {
                    let check = PatternCheck {
                        group: group.name.clone(),
                        pattern: def.pattern.clone(),
                        sub_category: def.sub_category.clone(),
                        confidence: entry.confidence,
                        matched: true,
                        failure_reason: FailureReason::None,
                        similarity: 1.0,
                        suggestions: Vec::new(),
                    };
                    checks.push(check.clone());
                    winner = Some(check);
                    break 'outer;
                }
                checks.push(PatternCheck {
                    group: group.name.clone(),
                    pattern: def.pattern.clone(),
                    sub_category: def.sub_category.clone(),
                    confidence: entry.confidence,
                    matched: false,
                    failure_reason: FailureReason::None,
                    similarity: 0.0,
                    suggestions: Vec::new(),
                });
            }
        }

        let (checks, near_misses, suggestions) = if winner.is_some() {
            (checks, Vec::new(), Vec::new())
        } else {
            let diagnosed: Vec<PatternCheck> = checks
                .into_iter()
                .map(|check| self.explain(check, &normalized, &input_tokens))
                .collect();

            let mut near: Vec<PatternCheck> = diagnosed
                .iter()
                .filter(|c| {
                    matches!(
                        c.failure_reason,
                        FailureReason::Typo | FailureReason::AnchorFail | FailureReason::Partial
                    )
                })
                .cloned()
                .collect();
            near.sort_by(|a, b| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            near.truncate(self.max_near_misses);

            (diagnosed, near, suggest_patterns(&normalized))
        };

        let total_patterns = checks.len();
        let method = if winner.is_some() {
            "pattern"
        } else {
            "fallback"
        };

        DiagnosticsReport {
            winner,
            checks,
            near_misses,
            suggestions,
            total_patterns,
            method: method.to_string(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Attach a failure reason, similarity and suggestions to one
    /// non-matching check.
    fn explain(
        &self,
        mut check: PatternCheck,
        normalized: &str,
        input_tokens: &[String],
    ) -> PatternCheck {
        let keywords = anchor_keywords(&check.pattern);
        let base_similarity = similarity(&keywords, input_tokens);

        // Typo detection against the pattern's anchor keywords.
        for kw in &keywords {
            if input_tokens.iter().any(|t| t == kw) {
                continue;
            }
            let closest = input_tokens
                .iter()
                .map(|t| (edit_distance(kw, t), t))
                .min_by_key(|(d, _)| *d);
            if let Some((distance, token)) = closest {
                if distance > 0 && distance <= typo_threshold(kw.chars().count()) {
                    let corrected = 1.0 - distance as f64 / kw.chars().count().max(1) as f64;
                    check.failure_reason = FailureReason::Typo;
                    check.similarity = base_similarity.max(corrected);
                    check
                        .suggestions
                        .push(format!("replace \"{}\" with \"{}\"", token, kw));
                    return check;
                }
            }
        }

        // Anchor failure: the de-anchored core matches somewhere inside
        // the input, so extra leading/trailing words broke the match.
        if is_anchored(&check.pattern) {
            if let Ok(core) = compile(deanchor(&check.pattern)) {
                if core.is_match(normalized) {
                    check.failure_reason = FailureReason::AnchorFail;
                    check.similarity = base_similarity.max(0.9);
                    check.suggestions.push(format!(
                        "relax the anchors in {:?} to tolerate surrounding words",
                        check.pattern
                    ));
                    return check;
                }
            }
        }

        check.similarity = base_similarity;
        check.failure_reason = if base_similarity >= self.partial_threshold {
            FailureReason::Partial
        } else {
            FailureReason::Unrelated
        };
        check
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_groups() -> Vec<PatternGroup> {
        vec![PatternGroup {
            name: "action".to_string(),
            patterns: vec![PatternDef::new(
                r"^turn (on|off) (the )?(.+)$",
                Some("device_power"),
            )],
        }]
    }

    fn light_priority() -> Vec<GroupPriority> {
        vec![GroupPriority::new("action", 0.9)]
    }

    #[test]
    fn exact_command_wins_with_group_confidence() {
        let engine = PatternDiagnosticsEngine::default();
        let report = engine.diagnose("turn on the light", &light_groups(), &light_priority());
        let winner = report.winner.expect("should match");
        assert!(winner.matched);
        assert_eq!(winner.confidence, 0.9);
        assert_eq!(winner.sub_category.as_deref(), Some("device_power"));
        assert_eq!(report.method, "pattern");
        assert!(report.near_misses.is_empty());
    }

    #[test]
    fn transposed_typo_is_detected_with_correction() {
        let engine = PatternDiagnosticsEngine::default();
        let report = engine.diagnose("trun on the light", &light_groups(), &light_priority());
        assert!(report.winner.is_none());
        assert_eq!(report.method, "fallback");
        let miss = report.near_misses.first().expect("typo near miss");
        assert_eq!(miss.failure_reason, FailureReason::Typo);
        assert!(miss.suggestions[0].contains("\"turn\""));
        assert!(miss.suggestions[0].contains("\"trun\""));
    }

    #[test]
    fn leading_words_break_anchor() {
        let groups = vec![PatternGroup {
            name: "action".to_string(),
            patterns: vec![PatternDef::new(r"^turn on (.+)$", Some("device_power"))],
        }];
        let engine = PatternDiagnosticsEngine::default();
        let report = engine.diagnose("please turn on the light", &groups, &light_priority());
        assert!(report.winner.is_none());
        let miss = report.near_misses.first().expect("anchor near miss");
        assert_eq!(miss.failure_reason, FailureReason::AnchorFail);
        assert!(miss.suggestions[0].contains("anchor"));
    }

    #[test]
    fn unrelated_input_keeps_no_near_misses() {
        let engine = PatternDiagnosticsEngine::default();
        let report = engine.diagnose(
            "completely different subject entirely",
            &light_groups(),
            &light_priority(),
        );
        assert!(report.winner.is_none());
        assert!(report.near_misses.is_empty());
        assert_eq!(report.total_patterns, 1);
        assert_eq!(report.checks[0].failure_reason, FailureReason::Unrelated);
    }

    #[test]
    fn priority_order_decides_between_overlapping_groups() {
        let groups = vec![
            PatternGroup {
                name: "emergency".to_string(),
                patterns: vec![PatternDef::new(r"\bhelp\b", None)],
            },
            PatternGroup {
                name: "conversation".to_string(),
                patterns: vec![PatternDef::new(r"\bhelp\b", Some("assist"))],
            },
        ];
        let priority = vec![
            GroupPriority::new("emergency", 0.98),
            GroupPriority::new("conversation", 0.5),
        ];
        let engine = PatternDiagnosticsEngine::default();
        let report = engine.diagnose("help me please", &groups, &priority);
        let winner = report.winner.expect("should match");
        assert_eq!(winner.group, "emergency");
        assert_eq!(winner.confidence, 0.98);
    }

    #[test]
    fn empty_and_pathological_inputs_do_not_panic() {
        let engine = PatternDiagnosticsEngine::default();
        let huge = "lights ".repeat(5_000);
        for text in ["", "   ", huge.as_str()] {
            let report = engine.diagnose(text, &light_groups(), &light_priority());
            assert_eq!(report.total_patterns, report.checks.len());
        }
    }

    #[test]
    fn validate_groups_rejects_bad_regex() {
        let groups = vec![PatternGroup {
            name: "broken".to_string(),
            patterns: vec![PatternDef::new(r"turn (on", None)],
        }];
        assert!(validate_groups(&groups).is_err());
    }
}
