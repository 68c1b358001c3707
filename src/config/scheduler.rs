//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of concurrently running work units.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;
/// Default seconds between "still running" status messages.
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 600;
/// Default seconds between "still running" warnings.
pub const DEFAULT_WARN_INTERVAL_SECS: u64 = 1_200;
/// Default bound on every blocking wait, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

/// Prefix for environment overrides read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "WORKPOOL_";

/// How dependency cycles are detected before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleCheck {
    /// Depth-first search over every open dependency edge.
    #[default]
    Full,
    /// Only reject pairs of units that list each other directly.
    Reciprocal,
}

/// Global run configuration, read-only once a scheduler is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum units running at once across all pools.
    pub max_concurrent: usize,
    /// Stop admitting units from a pool once it has a failed unit.
    pub stop_admission_on_failure: bool,
    /// Keep starting later pools after one did not succeed.
    pub start_next_pool_on_failure: bool,
    /// Flag a terminal aggregate failure in the returned outcome.
    pub exit_on_error: bool,
    /// Seconds between informational heartbeats for a long-running pool.
    pub status_interval_secs: u64,
    /// Seconds between warning heartbeats for a long-running pool.
    pub warn_interval_secs: u64,
    /// Upper bound for any blocking wait, in milliseconds.
    pub poll_interval_ms: u64,
    /// Cycle detection mode.
    pub cycle_check: CycleCheck,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            stop_admission_on_failure: false,
            start_next_pool_on_failure: true,
            exit_on_error: true,
            status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
            warn_interval_secs: DEFAULT_WARN_INTERVAL_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            cycle_check: CycleCheck::Full,
        }
    }
}

impl SchedulerConfig {
    /// Configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrently running units.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Stop admitting units from a pool after one fails.
    #[must_use]
    pub const fn with_stop_admission_on_failure(mut self, stop: bool) -> Self {
        self.stop_admission_on_failure = stop;
        self
    }

    /// Start the next pool even if the previous one did not succeed.
    #[must_use]
    pub const fn with_start_next_pool_on_failure(mut self, start_next: bool) -> Self {
        self.start_next_pool_on_failure = start_next;
        self
    }

    /// Report terminal aggregate failure to the caller.
    #[must_use]
    pub const fn with_exit_on_error(mut self, exit_on_error: bool) -> Self {
        self.exit_on_error = exit_on_error;
        self
    }

    /// Set the informational heartbeat interval.
    #[must_use]
    pub const fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval_secs = interval.as_secs();
        self
    }

    /// Set the warning heartbeat interval.
    #[must_use]
    pub const fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval_secs = interval.as_secs();
        self
    }

    /// Set the re-poll bound for blocking waits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Select the cycle detection mode.
    #[must_use]
    pub const fn with_cycle_check(mut self, cycle_check: CycleCheck) -> Self {
        self.cycle_check = cycle_check;
        self
    }

    /// Informational heartbeat interval.
    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    /// Warning heartbeat interval.
    #[must_use]
    pub const fn warn_interval(&self) -> Duration {
        Duration::from_secs(self.warn_interval_secs)
    }

    /// Re-poll bound for blocking waits.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.status_interval_secs == 0 {
            return Err("status_interval_secs must be greater than 0".into());
        }
        if self.warn_interval_secs == 0 {
            return Err("warn_interval_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `WORKPOOL_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary `WORKPOOL_*` key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = var("MAX_CONCURRENT") {
            cfg.max_concurrent = parse_value("MAX_CONCURRENT", &raw)?;
        }
        if let Some(raw) = var("STOP_ADMISSION_ON_FAILURE") {
            cfg.stop_admission_on_failure = parse_flag("STOP_ADMISSION_ON_FAILURE", &raw)?;
        }
        if let Some(raw) = var("START_NEXT_POOL_ON_FAILURE") {
            cfg.start_next_pool_on_failure = parse_flag("START_NEXT_POOL_ON_FAILURE", &raw)?;
        }
        if let Some(raw) = var("EXIT_ON_ERROR") {
            cfg.exit_on_error = parse_flag("EXIT_ON_ERROR", &raw)?;
        }
        if let Some(raw) = var("STATUS_INTERVAL_SECS") {
            cfg.status_interval_secs = parse_value("STATUS_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = var("WARN_INTERVAL_SECS") {
            cfg.warn_interval_secs = parse_value("WARN_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = var("POLL_INTERVAL_MS") {
            cfg.poll_interval_ms = parse_value("POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = var("CYCLE_CHECK") {
            cfg.cycle_check = match raw.trim().to_ascii_lowercase().as_str() {
                "full" => CycleCheck::Full,
                "reciprocal" => CycleCheck::Reciprocal,
                other => return Err(format!("{ENV_PREFIX}CYCLE_CHECK: unknown mode `{other}`")),
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{ENV_PREFIX}{name}: expected a boolean, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("WORKPOOL_MAX_CONCURRENT", "8"),
            ("WORKPOOL_EXIT_ON_ERROR", "false"),
            ("WORKPOOL_CYCLE_CHECK", "Reciprocal"),
        ]
        .into_iter()
        .collect();

        let cfg = SchedulerConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(cfg.max_concurrent, 8);
        assert!(!cfg.exit_on_error);
        assert_eq!(cfg.cycle_check, CycleCheck::Reciprocal);
        assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_lookup_rejects_bad_values() {
        let err = SchedulerConfig::from_lookup(|k| {
            (k == "WORKPOOL_STOP_ADMISSION_ON_FAILURE").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(err.contains("STOP_ADMISSION_ON_FAILURE"), "{err}");

        let err = SchedulerConfig::from_lookup(|k| {
            (k == "WORKPOOL_MAX_CONCURRENT").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(err.contains("max_concurrent"), "{err}");
    }

    #[test]
    fn test_builders_round_trip_durations() {
        let cfg = SchedulerConfig::new()
            .with_poll_interval(Duration::from_millis(250))
            .with_status_interval(Duration::from_secs(5))
            .with_warn_interval(Duration::from_secs(9));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.status_interval(), Duration::from_secs(5));
        assert_eq!(cfg.warn_interval(), Duration::from_secs(9));
    }
}
