// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration
//!
//! Every field has a default so an empty `[scheduler]` table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DAY: Duration = Duration::from_secs(86_400);

/// Bounds on instance generation; whichever limit binds first wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Horizon {
    /// Maximum number of future instances per template
    pub max_instances: usize,
    /// Maximum look-ahead from the generation start
    #[serde(with = "humantime_serde")]
    pub lookahead: Duration,
}

impl Horizon {
    pub fn new(max_instances: usize, days: u32) -> Self {
        Self {
            max_instances,
            lookahead: DAY * days,
        }
    }

    pub fn max_days(&self) -> u64 {
        self.lookahead.as_secs() / DAY.as_secs()
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self::new(30, 30)
    }
}

/// What to do when a task comes due while its previous run is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Record a skip and move on to the next occurrence
    #[default]
    Skip,
    /// Start another run alongside the one in flight
    Allow,
}

/// How to fire occurrences that were missed while the process was down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpPolicy {
    /// Fire once, then resume from the first occurrence after now
    #[default]
    Single,
    /// Fire each missed occurrence in order, at most `max_runs` in a row
    BoundedReplay { max_runs: u32 },
    /// Skip occurrences overdue by more than `grace`, then resume from now
    SkipMissed {
        #[serde(with = "humantime_serde")]
        grace: Duration,
    },
}

/// Scheduler tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub horizon: Horizon,
    /// Refill when future instances drop below this fraction of `max_instances`
    pub refill_threshold: f64,
    pub overlap: OverlapPolicy,
    pub catch_up: CatchUpPolicy,
    /// Capacity of the recent-executions ring buffer
    pub history_capacity: usize,
    /// Use the in-memory monitor; `false` selects the no-op monitor
    pub monitoring: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::default(),
            refill_threshold: 0.2,
            overlap: OverlapPolicy::default(),
            catch_up: CatchUpPolicy::default(),
            history_capacity: crate::monitor::DEFAULT_HISTORY_CAPACITY,
            monitoring: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: SchedulerConfig = toml::from_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.horizon.max_days(), 30);
        assert_eq!(config.history_capacity, 100);
    }

    #[test]
    fn parses_policies_and_humantime_durations() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            refill_threshold = 0.5
            overlap = "allow"
            catch_up = { skip_missed = { grace = "5m" } }

            [horizon]
            max_instances = 10
            lookahead = "2weeks"
            "#,
        )
        .unwrap();

        assert_eq!(config.overlap, OverlapPolicy::Allow);
        assert_eq!(
            config.catch_up,
            CatchUpPolicy::SkipMissed {
                grace: humantime::parse_duration("5m").unwrap()
            }
        );
        assert_eq!(config.horizon.max_instances, 10);
        assert_eq!(config.horizon.max_days(), 14);
    }

    #[test]
    fn parses_bounded_replay() {
        let config: SchedulerConfig =
            toml::from_str("catch_up = { bounded_replay = { max_runs = 3 } }").unwrap();
        assert_eq!(config.catch_up, CatchUpPolicy::BoundedReplay { max_runs: 3 });
    }
}
