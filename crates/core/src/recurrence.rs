// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurrence engine
//!
//! Turns a template's rule and time bounds into an ordered list of trigger
//! timestamps inside a window. Generation is pure: identical inputs always
//! yield identical output.

use crate::config::Horizon;
use crate::template::{RecurrenceRule, Template, TimeConfig};
use crate::time::{duration_millis, millis_of_day, week_start, Timestamp, Window, DAY_MS, WEEK_MS};
use thiserror::Error;

/// Malformed recurrence parameters; nothing is generated when returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("recurrence interval must be positive, got {0}")]
    NonPositiveInterval(i64),
    #[error("weekly rule needs at least one weekday")]
    EmptyWeekDays,
    #[error("end_at {end_at} is before start_at {start_at}")]
    EndBeforeStart {
        start_at: Timestamp,
        end_at: Timestamp,
    },
}

/// Output of a generation call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
    /// Trigger timestamps in ascending order
    pub timestamps: Vec<Timestamp>,
    /// More occurrences existed in the requested window than the horizon allowed
    pub truncated: bool,
}

/// Check a rule and its time bounds without generating anything
pub fn validate(rule: &RecurrenceRule, time: &TimeConfig) -> Result<(), ValidationError> {
    match rule {
        RecurrenceRule::Daily { interval } if *interval <= 0 => {
            return Err(ValidationError::NonPositiveInterval(*interval));
        }
        RecurrenceRule::Weekly { interval, .. } if *interval <= 0 => {
            return Err(ValidationError::NonPositiveInterval(*interval));
        }
        RecurrenceRule::Weekly { week_days, .. } if week_days.is_empty() => {
            return Err(ValidationError::EmptyWeekDays);
        }
        _ => {}
    }
    if let Some(end_at) = time.end_at {
        if end_at < time.start_at {
            return Err(ValidationError::EndBeforeStart {
                start_at: time.start_at,
                end_at,
            });
        }
    }
    Ok(())
}

/// Generates trigger timestamps, capped by a horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceEngine {
    horizon: Horizon,
}

impl RecurrenceEngine {
    pub fn new(horizon: Horizon) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Generate occurrences of `template` inside `window`, capped by the horizon
    pub fn generate(&self, template: &Template, window: Window) -> Result<Generation, ValidationError> {
        self.generate_limited(template, window, self.horizon.max_instances)
    }

    /// Like [`generate`](Self::generate) with a tighter count limit
    pub fn generate_limited(
        &self,
        template: &Template,
        window: Window,
        limit: usize,
    ) -> Result<Generation, ValidationError> {
        let generation = self.collect(template, window, limit)?;
        if generation.truncated {
            tracing::debug!(
                template = %template.id,
                generated = generation.timestamps.len(),
                max_instances = limit.min(self.horizon.max_instances),
                max_days = self.horizon.max_days(),
                "generation truncated at horizon"
            );
        }
        Ok(generation)
    }

    /// First occurrence strictly after `after`, looking at most one horizon ahead
    pub fn next_occurrence(
        &self,
        template: &Template,
        after: Timestamp,
    ) -> Result<Option<Timestamp>, ValidationError> {
        let start = after.saturating_add(1);
        let window = Window::new(
            start,
            start.saturating_add(duration_millis(self.horizon.lookahead)),
        );
        let generation = self.collect(template, window, 1)?;
        Ok(generation.timestamps.first().copied())
    }

    fn collect(
        &self,
        template: &Template,
        window: Window,
        limit: usize,
    ) -> Result<Generation, ValidationError> {
        validate(&template.rule, &template.time)?;

        let limit = limit.min(self.horizon.max_instances);
        let capped_end = window.clamp_span(self.horizon.lookahead).end;

        let mut timestamps = Vec::new();
        let mut truncated = false;
        for ts in occurrences(&template.rule, &template.time, window) {
            if ts >= capped_end || timestamps.len() >= limit {
                truncated = true;
                break;
            }
            timestamps.push(ts);
        }

        Ok(Generation {
            timestamps,
            truncated,
        })
    }
}

/// Lazily enumerate every occurrence of a (validated) rule inside `window`
fn occurrences(
    rule: &RecurrenceRule,
    time: &TimeConfig,
    window: Window,
) -> Box<dyn Iterator<Item = Timestamp>> {
    let lower = window.start.max(time.start_at);
    let upper = match time.end_at {
        Some(end_at) => window.end.min(end_at.saturating_add(1)),
        None => window.end,
    };
    if upper <= lower {
        return Box::new(std::iter::empty());
    }

    match rule {
        RecurrenceRule::Daily { interval } => {
            let step = interval.saturating_mul(DAY_MS);
            let start_at = time.start_at;
            // Index of the first occurrence at or after `lower`
            let gap = lower.saturating_sub(start_at).max(0);
            let first = gap / step + i64::from(gap % step != 0);
            Box::new(
                (first..)
                    .map(move |k| start_at.saturating_add(k.saturating_mul(step)))
                    .take_while(move |ts| *ts < upper),
            )
        }

        RecurrenceRule::Weekly {
            interval,
            week_days,
        } => {
            let mut offsets: Vec<i64> = week_days
                .iter()
                .map(|d| i64::from(d.num_days_from_monday()))
                .collect();
            offsets.sort_unstable();
            offsets.dedup();

            let anchor = week_start(time.start_at);
            let time_of_day = millis_of_day(time.start_at);
            let interval = *interval;

            // First week index at or after `lower`, rounded up to the interval
            let first_week = (week_start(lower) - anchor) / WEEK_MS;
            let first_week = match first_week % interval {
                0 => first_week,
                rem => first_week.saturating_add(interval - rem),
            };

            Box::new(
                (0..)
                    .map(move |n: i64| first_week.saturating_add(n.saturating_mul(interval)))
                    .flat_map(move |week| {
                        let base = anchor
                            .saturating_add(week.saturating_mul(WEEK_MS))
                            .saturating_add(time_of_day);
                        offsets
                            .clone()
                            .into_iter()
                            .map(move |off| base.saturating_add(off * DAY_MS))
                    })
                    .skip_while(move |ts| *ts < lower)
                    .take_while(move |ts| *ts < upper),
            )
        }

        RecurrenceRule::Custom { dates } => {
            let mut dates = dates.clone();
            dates.sort_unstable();
            dates.dedup();
            Box::new(
                dates
                    .into_iter()
                    .filter(move |ts| *ts >= lower)
                    .take_while(move |ts| *ts < upper),
            )
        }
    }
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
