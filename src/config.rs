//! Solver configuration, with an `SCHEDEX_<KEY>` environment overlay on top
//! of the programmatic defaults (grounded on the `KNHK_<SECTION>_<KEY>`
//! convention this crate's ambient tooling otherwise follows).

use std::env;

use crate::solver::ObjectivePolicy;

/// Tunables for one [`crate::solver::Solver`] run.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// z3 timeout in milliseconds; `None` means no timeout.
    pub timeout_ms: Option<u64>,
    /// Seed passed to z3's own `random_seed` parameter, for reproducible
    /// search order across runs.
    pub random_seed: Option<u32>,
    /// How the problem's objective list combines into one optimization run.
    pub objective_policy: ObjectivePolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            timeout_ms: Some(30_000),
            random_seed: None,
            objective_policy: ObjectivePolicy::default(),
        }
    }
}

impl SolverConfig {
    /// Start from [`Default`], then apply any `SCHEDEX_*` overrides found in
    /// the environment.
    pub fn from_env() -> Self {
        let mut config = SolverConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `SCHEDEX_TIMEOUT_MS`, `SCHEDEX_RANDOM_SEED` and
    /// `SCHEDEX_OBJECTIVE_POLICY` on top of the current values, ignoring
    /// unset or unparsable variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("SCHEDEX_TIMEOUT_MS") {
            match value.as_str() {
                "0" | "none" | "off" => self.timeout_ms = None,
                _ => {
                    if let Ok(ms) = value.parse() {
                        self.timeout_ms = Some(ms);
                    }
                }
            }
        }
        if let Ok(value) = env::var("SCHEDEX_RANDOM_SEED") {
            if let Ok(seed) = value.parse() {
                self.random_seed = Some(seed);
            }
        }
        if let Ok(value) = env::var("SCHEDEX_OBJECTIVE_POLICY") {
            self.objective_policy = match value.to_lowercase().as_str() {
                "single" => ObjectivePolicy::Single,
                "lexicographic" | "lex" => ObjectivePolicy::Lexicographic,
                "weighted_sum" | "weighted-sum" => ObjectivePolicy::WeightedSum,
                "pareto" => ObjectivePolicy::Pareto,
                _ => self.objective_policy,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded_and_single_objective() {
        let config = SolverConfig::default();
        assert_eq!(config.timeout_ms, Some(30_000));
        assert_eq!(config.objective_policy, ObjectivePolicy::Single);
    }

    #[test]
    fn timeout_override_parses_numeric_and_sentinel_values() {
        std::env::set_var("SCHEDEX_TIMEOUT_MS", "0");
        let config = SolverConfig::from_env();
        assert_eq!(config.timeout_ms, None);
        std::env::remove_var("SCHEDEX_TIMEOUT_MS");
    }
}
