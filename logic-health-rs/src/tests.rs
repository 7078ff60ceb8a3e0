// logic-health-rs/src/tests.rs

use super::*;
use shared_types::{ClassificationResult, UrgencyLevel};

fn outcome(
    intent: IntentCategory,
    sub: Option<&str>,
    method: ClassificationMethod,
) -> ClassificationOutcome {
    ClassificationOutcome {
        result: ClassificationResult {
            intent,
            confidence: 0.9,
            sub_category: sub.map(|s| s.to_string()),
            context_queries: Vec::new(),
            emotional_tone: None,
            urgency: Some(UrgencyLevel::Normal),
        },
        method,
        matched_pattern: None,
        near_misses: Vec::new(),
    }
}

fn near_miss_outcome(pattern: &str) -> ClassificationOutcome {
    let mut out = outcome(IntentCategory::Conversation, None, ClassificationMethod::Heuristic);
    out.near_misses = vec![pattern.to_string()];
    out
}

#[test]
fn hash_ignores_whitespace_and_case() {
    assert_eq!(input_hash("Turn on  the light"), input_hash("turn on the light "));
    assert_ne!(input_hash("turn on the light"), input_hash("turn off the light"));
    assert_eq!(input_hash("x").len(), 16);
}

#[test]
fn identical_classifications_stay_consistent() {
    let monitor = LogicHealthMonitor::default();
    for _ in 0..3 {
        monitor
            .record_classification(
                "turn on the light",
                &outcome(IntentCategory::Action, Some("light_control"), ClassificationMethod::Pattern),
            )
            .unwrap();
    }
    let report = monitor.check_consistency("turn on the light").unwrap();
    assert!(report.is_consistent);
    assert_eq!(report.observations, 3);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].count, 3);
    assert_eq!(report.dominant_intent, Some(IntentCategory::Action));
}

#[test]
fn one_divergent_classification_adds_one_conflict_entry() {
    let monitor = LogicHealthMonitor::default();
    for _ in 0..2 {
        monitor
            .record_classification(
                "play some jazz",
                &outcome(IntentCategory::Action, Some("media"), ClassificationMethod::Pattern),
            )
            .unwrap();
    }
    monitor
        .record_classification(
            "play some jazz",
            &outcome(IntentCategory::Conversation, None, ClassificationMethod::Heuristic),
        )
        .unwrap();

    let report = monitor.check_consistency("play some jazz").unwrap();
    assert!(!report.is_consistent);
    assert_eq!(report.conflicts.len(), 2);
    assert_eq!(report.dominant_intent, Some(IntentCategory::Action));
    assert_eq!(report.dominant_sub_category.as_deref(), Some("media"));
}

#[test]
fn method_difference_alone_is_not_a_conflict() {
    let monitor = LogicHealthMonitor::default();
    monitor
        .record_classification(
            "what time is it",
            &outcome(IntentCategory::Instant, Some("time"), ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "what time is it",
            &outcome(IntentCategory::Instant, Some("time"), ClassificationMethod::Heuristic),
        )
        .unwrap();

    let report = monitor.check_consistency("what time is it").unwrap();
    assert!(report.is_consistent);
    // both tuples are still listed for inspection
    assert_eq!(report.conflicts.len(), 2);
}

#[test]
fn unseen_input_is_vacuously_consistent() {
    let monitor = LogicHealthMonitor::default();
    let report = monitor.check_consistency("never seen this").unwrap();
    assert!(report.is_consistent);
    assert_eq!(report.observations, 0);
    assert!(report.conflicts.is_empty());
}

#[test]
fn health_report_flags_inconsistency_as_warning() {
    let monitor = LogicHealthMonitor::default();
    monitor
        .record_classification(
            "dim the lights",
            &outcome(IntentCategory::Action, Some("light_control"), ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "dim the lights",
            &outcome(IntentCategory::Query, None, ClassificationMethod::Heuristic),
        )
        .unwrap();

    // a second, consistent input halves the score
    monitor
        .record_classification(
            "what time is it",
            &outcome(IntentCategory::Instant, Some("time"), ClassificationMethod::Pattern),
        )
        .unwrap();

    let report = monitor.generate_health_report().unwrap();
    let warning = report
        .findings
        .iter()
        .find(|f| f.code == "INCONSISTENT_CLASSIFICATION")
        .expect("expected an inconsistency finding");
    assert_eq!(warning.severity, FindingSeverity::Warning);
    assert_eq!(warning.input_hash.as_deref(), Some(input_hash("dim the lights").as_str()));
    assert!(warning.message.contains("dim the lights"));
    assert_eq!(report.unique_inputs, 2);
    assert_eq!(report.window_size, 3);
    assert!((report.consistency_score - 0.5).abs() < 1e-9);
}

#[test]
fn recurring_near_miss_flags_low_coverage() {
    let monitor = LogicHealthMonitor::new(100, 3);
    let pattern = "^turn (on|off) (the )?(.+)$";
    for text in ["trun on the light", "tunr off the fan", "turn onn the heater"] {
        monitor
            .record_classification(text, &near_miss_outcome(pattern))
            .unwrap();
    }

    let report = monitor.generate_health_report().unwrap();
    let finding = report
        .findings
        .iter()
        .find(|f| f.code == "LOW_COVERAGE")
        .expect("expected a low-coverage finding");
    assert_eq!(finding.severity, FindingSeverity::Info);
    assert_eq!(finding.input_hash, None);
    assert!(finding.message.contains(pattern));

    // consistent inputs, so no inconsistency warning
    assert!(!report
        .findings
        .iter()
        .any(|f| f.code == "INCONSISTENT_CLASSIFICATION"));
}

#[test]
fn near_misses_below_threshold_stay_quiet() {
    let monitor = LogicHealthMonitor::new(100, 3);
    let pattern = "^turn (on|off) (the )?(.+)$";
    // two distinct inputs, plus a repeat that must not count twice
    for text in ["trun on the light", "tunr off the fan", "trun on the light"] {
        monitor
            .record_classification(text, &near_miss_outcome(pattern))
            .unwrap();
    }
    let report = monitor.generate_health_report().unwrap();
    assert!(!report.findings.iter().any(|f| f.code == "LOW_COVERAGE"));
}

#[test]
fn window_evicts_oldest_observations() {
    let monitor = LogicHealthMonitor::new(2, 3);
    monitor
        .record_classification(
            "first input",
            &outcome(IntentCategory::Query, None, ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "second input",
            &outcome(IntentCategory::Query, None, ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "third input",
            &outcome(IntentCategory::Query, None, ClassificationMethod::Pattern),
        )
        .unwrap();

    assert_eq!(monitor.check_consistency("first input").unwrap().observations, 0);
    assert_eq!(monitor.check_consistency("third input").unwrap().observations, 1);
    let report = monitor.generate_health_report().unwrap();
    assert_eq!(report.window_size, 2);
    assert_eq!(report.unique_inputs, 2);
}

#[test]
fn report_distributions_cover_all_observations() {
    let monitor = LogicHealthMonitor::default();
    monitor
        .record_classification(
            "turn on the light",
            &outcome(IntentCategory::Action, Some("light_control"), ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "how are you",
            &outcome(IntentCategory::Conversation, None, ClassificationMethod::Heuristic),
        )
        .unwrap();

    let report = monitor.generate_health_report().unwrap();
    assert_eq!(report.intent_distribution.get("ACTION"), Some(&1));
    assert_eq!(report.intent_distribution.get("CONVERSATION"), Some(&1));
    assert_eq!(report.method_distribution.get("pattern"), Some(&1));
    assert_eq!(report.method_distribution.get("heuristic"), Some(&1));
    assert!((report.avg_confidence - 0.9).abs() < 1e-9);
    assert!((report.consistency_score - 1.0).abs() < 1e-9);
}

#[test]
fn method_proportions_are_fractions_of_the_window() {
    let monitor = LogicHealthMonitor::default();
    monitor
        .record_classification(
            "turn on the light",
            &outcome(IntentCategory::Action, Some("light_control"), ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "turn off the light",
            &outcome(IntentCategory::Action, Some("light_control"), ClassificationMethod::Pattern),
        )
        .unwrap();
    monitor
        .record_classification(
            "how are you",
            &outcome(IntentCategory::Conversation, None, ClassificationMethod::Heuristic),
        )
        .unwrap();
    monitor
        .record_classification(
            "tell me a story",
            &outcome(IntentCategory::Conversation, None, ClassificationMethod::ModelBased),
        )
        .unwrap();

    let proportions = monitor.generate_health_report().unwrap().method_proportions();
    assert!((proportions["pattern"] - 0.5).abs() < 1e-9);
    assert!((proportions["heuristic"] - 0.25).abs() < 1e-9);
    assert!((proportions["model_based"] - 0.25).abs() < 1e-9);
    assert!((proportions.values().sum::<f64>() - 1.0).abs() < 1e-9);
}
