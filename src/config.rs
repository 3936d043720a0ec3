use crate::api::ApiConfig;
use std::time::Duration;

/// Engine configuration: turn budgets, session lengths and the API client
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiConfig,
    /// Clock period; one tick takes one second off the turn timer
    pub tick: Duration,
    pub chain_turn_seconds: u32,
    pub spell_turn_seconds: u32,
    /// 0 leaves puzzles untimed
    pub puzzle_turn_seconds: u32,
    pub spell_total_questions: usize,
    pub puzzle_total_questions: usize,
    pub puzzle_max_attempts: u32,
    pub puzzle_start_age: u32,
    pub puzzle_user_id: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            tick: Duration::from_secs(1),
            chain_turn_seconds: 10,
            spell_turn_seconds: 30,
            puzzle_turn_seconds: 0,
            spell_total_questions: 10,
            puzzle_total_questions: 10,
            puzzle_max_attempts: 2,
            puzzle_start_age: 4,
            puzzle_user_id: 0,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let puzzle_start_age = env_parse("PUZZLE_START_AGE")
            .map(crate::games::puzzle::clamp_age)
            .unwrap_or(defaults.puzzle_start_age);

        Self {
            api: ApiConfig::from_env(),
            tick: env_parse("TICK_MILLIS")
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick),
            chain_turn_seconds: env_parse("CHAIN_TURN_SECONDS").unwrap_or(defaults.chain_turn_seconds),
            spell_turn_seconds: env_parse("SPELL_TURN_SECONDS").unwrap_or(defaults.spell_turn_seconds),
            puzzle_turn_seconds: env_parse("PUZZLE_TURN_SECONDS").unwrap_or(defaults.puzzle_turn_seconds),
            spell_total_questions: env_parse("SPELL_TOTAL_QUESTIONS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.spell_total_questions),
            puzzle_total_questions: env_parse("PUZZLE_TOTAL_QUESTIONS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.puzzle_total_questions),
            puzzle_max_attempts: env_parse("PUZZLE_MAX_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.puzzle_max_attempts),
            puzzle_start_age,
            puzzle_user_id: env_parse("PUZZLE_USER_ID").unwrap_or(defaults.puzzle_user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "TICK_MILLIS",
        "CHAIN_TURN_SECONDS",
        "SPELL_TURN_SECONDS",
        "PUZZLE_TURN_SECONDS",
        "SPELL_TOTAL_QUESTIONS",
        "PUZZLE_TOTAL_QUESTIONS",
        "PUZZLE_MAX_ATTEMPTS",
        "PUZZLE_START_AGE",
        "PUZZLE_USER_ID",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear();
        let config = EngineConfig::from_env();
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.chain_turn_seconds, 10);
        assert_eq!(config.spell_turn_seconds, 30);
        assert_eq!(config.puzzle_turn_seconds, 0);
        assert_eq!(config.puzzle_max_attempts, 2);
        assert_eq!(config.puzzle_start_age, 4);
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear();
        std::env::set_var("TICK_MILLIS", "250");
        std::env::set_var("CHAIN_TURN_SECONDS", "15");
        std::env::set_var("PUZZLE_START_AGE", "20");
        std::env::set_var("PUZZLE_USER_ID", "42");
        let config = EngineConfig::from_env();
        clear();

        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.chain_turn_seconds, 15);
        assert_eq!(config.puzzle_start_age, 13);
        assert_eq!(config.puzzle_user_id, 42);
    }

    #[test]
    #[serial]
    fn test_zero_counts_fall_back() {
        clear();
        std::env::set_var("TICK_MILLIS", "0");
        std::env::set_var("SPELL_TOTAL_QUESTIONS", "0");
        std::env::set_var("PUZZLE_MAX_ATTEMPTS", "0");
        let config = EngineConfig::from_env();
        clear();

        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.spell_total_questions, 10);
        assert_eq!(config.puzzle_max_attempts, 2);
    }
}
