//! config-rs/lib.rs
//! Shared configuration utilities for consistent service configuration.
//! Every helper reads an environment variable, validates it, and falls
//! back to the caller's default with a warning. Nothing here panics.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Read a string variable, falling back to `default` when unset.
pub fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read a truthy flag ("1", "true", "yes", "on", case-insensitive).
/// Unset or unrecognized values yield `default`.
pub fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(val) => {
            let v = val.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    log::warn!("Unrecognized value in {}, using default {}", name, default);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

/// Read an unsigned integer variable with proper fallback.
pub fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Invalid integer in {}, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Read a usize variable with proper fallback.
pub fn env_usize(name: &str, default: usize) -> usize {
    env_u64(name, default as u64) as usize
}

/// Read a float variable with proper fallback.
pub fn env_f64(name: &str, default: f64) -> f64 {
    match env::var(name) {
        Ok(val) => val.trim().parse::<f64>().unwrap_or_else(|_| {
            log::warn!("Invalid float in {}, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Resolve a data path under `HEARTH_DATA_DIR` (default `./data`).
pub fn data_path(relative: &str) -> PathBuf {
    let base = env::var("HEARTH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data"));
    base.join(relative)
}

/// Advisory per-stage soft deadlines for the pipeline.
///
/// These are observability budgets, not hard cancellation boundaries:
/// a stage that overruns is marked timed-out in its decision record and
/// the pipeline continues with the stage's safe default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBudgets {
    pub classify_ms: u64,
    pub retrieval_ms: u64,
    pub instant_ms: u64,
    pub action_ms: u64,
    pub conversation_ms: u64,
}

impl Default for StageBudgets {
    fn default() -> Self {
        StageBudgets {
            classify_ms: 500,
            retrieval_ms: 500,
            instant_ms: 100,
            action_ms: 2_000,
            conversation_ms: 5_000,
        }
    }
}

impl StageBudgets {
    /// Construct budgets from environment variables.
    ///
    /// - STAGE_BUDGET_CLASSIFY_MS (default 500)
    /// - STAGE_BUDGET_RETRIEVAL_MS (default 500)
    /// - STAGE_BUDGET_INSTANT_MS (default 100)
    /// - STAGE_BUDGET_ACTION_MS (default 2000)
    /// - STAGE_BUDGET_CONVERSATION_MS (default 5000)
    pub fn from_env() -> Self {
        let defaults = StageBudgets::default();
        StageBudgets {
            classify_ms: env_u64("STAGE_BUDGET_CLASSIFY_MS", defaults.classify_ms),
            retrieval_ms: env_u64("STAGE_BUDGET_RETRIEVAL_MS", defaults.retrieval_ms),
            instant_ms: env_u64("STAGE_BUDGET_INSTANT_MS", defaults.instant_ms),
            action_ms: env_u64("STAGE_BUDGET_ACTION_MS", defaults.action_ms),
            conversation_ms: env_u64("STAGE_BUDGET_CONVERSATION_MS", defaults.conversation_ms),
        }
    }

    pub fn classify(&self) -> Duration {
        Duration::from_millis(self.classify_ms)
    }

    pub fn retrieval(&self) -> Duration {
        Duration::from_millis(self.retrieval_ms)
    }

    pub fn instant(&self) -> Duration {
        Duration::from_millis(self.instant_ms)
    }

    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn conversation(&self) -> Duration {
        Duration::from_millis(self.conversation_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_bool_parses_truthy_values() {
        std::env::set_var("HEARTH_TEST_FLAG_A", "yes");
        std::env::set_var("HEARTH_TEST_FLAG_B", "0");
        std::env::set_var("HEARTH_TEST_FLAG_C", "maybe");
        assert!(env_bool("HEARTH_TEST_FLAG_A", false));
        assert!(!env_bool("HEARTH_TEST_FLAG_B", true));
        assert!(env_bool("HEARTH_TEST_FLAG_C", true));
        assert!(!env_bool("HEARTH_TEST_FLAG_UNSET", false));
    }

    #[test]
    fn env_u64_falls_back_on_garbage() {
        std::env::set_var("HEARTH_TEST_NUM", "not-a-number");
        assert_eq!(env_u64("HEARTH_TEST_NUM", 42), 42);
    }

    #[test]
    fn default_budget_values() {
        let budgets = StageBudgets::default();
        assert_eq!(budgets.classify_ms, 500);
        assert_eq!(budgets.retrieval_ms, 500);
        assert_eq!(budgets.instant_ms, 100);
        assert_eq!(budgets.action_ms, 2_000);
        assert_eq!(budgets.conversation_ms, 5_000);
    }
}
