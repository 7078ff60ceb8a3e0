// capabilities-rs/src/patterns.rs
// Built-in pattern tables. Groups are tried highest priority first; a
// pattern win inherits the group's confidence.

use pattern_diagnostics::{GroupPriority, PatternDef, PatternGroup};
use shared_types::IntentCategory;

pub const EMERGENCY_CONFIDENCE: f64 = 0.98;
pub const INSTANT_CONFIDENCE: f64 = 0.95;
pub const ACTION_CONFIDENCE: f64 = 0.9;
pub const MEMORY_CONFIDENCE: f64 = 0.85;
pub const QUERY_CONFIDENCE: f64 = 0.7;

/// Map a pattern group name to its intent.
pub fn intent_for_group(group: &str) -> IntentCategory {
    match group {
        "emergency" => IntentCategory::Emergency,
        "instant" => IntentCategory::Instant,
        "action" => IntentCategory::Action,
        "memory" => IntentCategory::Memory,
        "query" => IntentCategory::Query,
        _ => IntentCategory::Unknown,
    }
}

pub fn default_pattern_groups() -> Vec<PatternGroup> {
    vec![
        PatternGroup {
            name: "emergency".to_string(),
            patterns: vec![
                PatternDef::new(r"\b(emergency|fire|smoke|intruder|burglar)\b", None),
                PatternDef::new(r"\bcall (911|112|999|an ambulance)\b", Some("call_services")),
                PatternDef::new(r"\b(i('ve| have)? fallen|i fell|can'?t get up)\b", Some("fall")),
                PatternDef::new(r"^help( me)?!*$", None),
            ],
        },
        PatternGroup {
            name: "instant".to_string(),
            patterns: vec![
                PatternDef::new(r"^what time is it\??$", Some("time")),
                PatternDef::new(r"^what('s| is) the time\??$", Some("time")),
                PatternDef::new(r"^what('s| is) (the date|today('s)? date)( today)?\??$", Some("date")),
                PatternDef::new(r"^what day (is it|is today)\??$", Some("weekday")),
            ],
        },
        PatternGroup {
            name: "action".to_string(),
            patterns: vec![
                PatternDef::new(r"^turn (on|off) (the )?(.+)$", Some("device_power")),
                PatternDef::new(r"^switch (on|off) (the )?(.+)$", Some("device_power")),
                PatternDef::new(r"^(dim|brighten) (the )?(.+)$", Some("light_level")),
                PatternDef::new(r"^set (the )?(.+) to (.+)$", Some("device_set")),
                PatternDef::new(r"^(lock|unlock) (the )?(.+)$", Some("lock_control")),
                PatternDef::new(r"^(play|pause|stop|resume) (.+)$", Some("media")),
                PatternDef::new(r"^(open|close) (the )?(.+)$", Some("cover_control")),
            ],
        },
        PatternGroup {
            name: "memory".to_string(),
            patterns: vec![
                PatternDef::new(r"^(please )?remember (that )?(.+)$", Some("store")),
                PatternDef::new(r"^what do you (remember|know) about (.+)$", Some("recall")),
                PatternDef::new(r"^(do you )?recall (.+)$", Some("recall")),
                PatternDef::new(r"^forget (about )?(.+)$", Some("forget")),
                PatternDef::new(r"^remind me (to|about) (.+)$", Some("store")),
            ],
        },
        PatternGroup {
            name: "query".to_string(),
            patterns: vec![
                PatternDef::new(r"^(what|who|where|when|why|how) .+\??$", None),
                PatternDef::new(r"^(is|are|was|were|do|does|did|can|could|will|would) .+\??$", None),
            ],
        },
    ]
}

pub fn default_group_priority() -> Vec<GroupPriority> {
    vec![
        GroupPriority::new("emergency", EMERGENCY_CONFIDENCE),
        GroupPriority::new("instant", INSTANT_CONFIDENCE),
        GroupPriority::new("action", ACTION_CONFIDENCE),
        GroupPriority::new("memory", MEMORY_CONFIDENCE),
        GroupPriority::new("query", QUERY_CONFIDENCE),
    ]
}
