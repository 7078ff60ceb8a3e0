// pattern-diagnostics-rs/src/suggest.rs
// Pattern suggestions generated from the surface structure of an input
// that matched nothing.

use serde::{Deserialize, Serialize};

use crate::analysis::tokenize;

const IMPERATIVE_VERBS: &[&str] = &[
    "turn", "switch", "set", "start", "stop", "play", "pause", "open", "close", "dim", "lock",
    "unlock", "mute", "unmute", "raise", "lower",
];

const INTERROGATIVES: &[&str] = &[
    "what", "is", "are", "how", "who", "where", "when", "why", "which", "can", "do", "does",
];

const MEMORY_KEYWORDS: &[&str] = &["remember", "recall", "forget", "remind"];

/// A generated pattern proposal for a pattern-table author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSuggestion {
    /// Which intent style the pattern would serve (ACTION, QUERY, MEMORY).
    pub intent_style: String,
    /// The proposed regex source.
    pub pattern: String,
    pub rationale: String,
}

/// Derive pattern suggestions from the text's surface structure.
pub fn suggest_patterns(normalized_text: &str) -> Vec<PatternSuggestion> {
    let tokens = tokenize(normalized_text);
    let mut suggestions = Vec::new();
    let Some(first) = tokens.first() else {
        return suggestions;
    };

    if IMPERATIVE_VERBS.contains(&first.as_str()) {
        suggestions.push(PatternSuggestion {
            intent_style: "ACTION".to_string(),
            pattern: format!(r"^{}\b.*$", first),
            rationale: format!("input opens with the imperative verb \"{}\"", first),
        });
    }

    if INTERROGATIVES.contains(&first.as_str()) {
        suggestions.push(PatternSuggestion {
            intent_style: "QUERY".to_string(),
            pattern: format!(r"^{}\b.*$", first),
            rationale: format!("input opens with the interrogative \"{}\"", first),
        });
    }

    if let Some(kw) = tokens
        .iter()
        .find(|t| MEMORY_KEYWORDS.contains(&t.as_str()))
    {
        suggestions.push(PatternSuggestion {
            intent_style: "MEMORY".to_string(),
            pattern: format!(r"\b{}\b", kw),
            rationale: format!("input contains the memory keyword \"{}\"", kw),
        });
    }

    suggestions
}
