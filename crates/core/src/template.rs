// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template state machine
//!
//! A template is a declarative recurring-task definition. It owns the
//! recurrence rule and time bounds, and records how far instance generation
//! has progressed (the watermark). Instances reference it by id only.
//! Pausing or archiving skips every open instance, so the watermark is
//! cleared and a later activation generates again from the current time.

use crate::effect::{Effect, Event};
use crate::time::Timestamp;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a template; doubles as the task id on the heap
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateStatus::Active => write!(f, "ACTIVE"),
            TemplateStatus::Paused => write!(f, "PAUSED"),
            TemplateStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

/// Recurrence rule shapes
///
/// Intervals are signed so malformed input survives deserialization and is
/// rejected by validation instead of by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Every `interval` days at the start time of day
    Daily { interval: i64 },
    /// On the given weekdays of every `interval`-th week
    Weekly {
        interval: i64,
        #[serde(default)]
        week_days: Vec<Weekday>,
    },
    /// An explicit list of trigger timestamps
    Custom {
        #[serde(default)]
        dates: Vec<Timestamp>,
    },
}

impl RecurrenceRule {
    pub fn daily(interval: i64) -> Self {
        RecurrenceRule::Daily { interval }
    }

    pub fn weekly(interval: i64, week_days: impl Into<Vec<Weekday>>) -> Self {
        RecurrenceRule::Weekly {
            interval,
            week_days: week_days.into(),
        }
    }

    pub fn custom(dates: impl Into<Vec<Timestamp>>) -> Self {
        RecurrenceRule::Custom {
            dates: dates.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecurrenceRule::Daily { .. } => "daily",
            RecurrenceRule::Weekly { .. } => "weekly",
            RecurrenceRule::Custom { .. } => "custom",
        }
    }
}

/// Time bounds of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// First possible occurrence; its UTC time of day anchors daily/weekly rules
    pub start_at: Timestamp,
    /// Last possible occurrence (inclusive)
    #[serde(default)]
    pub end_at: Option<Timestamp>,
}

impl TimeConfig {
    pub fn starting_at(start_at: Timestamp) -> Self {
        Self {
            start_at,
            end_at: None,
        }
    }

    pub fn until(mut self, end_at: Timestamp) -> Self {
        self.end_at = Some(end_at);
        self
    }
}

/// Events that can change a template's lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEvent {
    Activate,
    Pause,
    Archive,
}

/// A recurring-task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub rule: RecurrenceRule,
    pub time: TimeConfig,
    #[serde(default)]
    pub status: TemplateStatus,
    /// Furthest scheduled time already materialized as an instance
    #[serde(default)]
    pub watermark: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Template {
    /// Create a new ACTIVE template with nothing generated yet
    pub fn new(
        id: impl Into<TemplateId>,
        name: impl Into<String>,
        rule: RecurrenceRule,
        time: TimeConfig,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rule,
            time,
            status: TemplateStatus::Active,
            watermark: None,
            updated_at: None,
        }
    }

    pub fn with_status(mut self, status: TemplateStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == TemplateStatus::Active
    }

    pub fn is_archived(&self) -> bool {
        self.status == TemplateStatus::Archived
    }

    /// Pure transition returning new state and effects
    pub fn transition(&self, event: TemplateEvent, now: Timestamp) -> (Template, Vec<Effect>) {
        let id = self.id.clone();
        match (self.status, event) {
            (TemplateStatus::Paused, TemplateEvent::Activate) => {
                let template = Template {
                    status: TemplateStatus::Active,
                    updated_at: Some(now),
                    ..self.clone()
                };
                let effects = vec![
                    Effect::GenerateInstances {
                        template_id: id.clone(),
                    },
                    Effect::Schedule {
                        template_id: id.clone(),
                    },
                    Effect::Emit(Event::TemplateActivated { template_id: id }),
                ];
                (template, effects)
            }

            (TemplateStatus::Active, TemplateEvent::Pause) => {
                let template = Template {
                    status: TemplateStatus::Paused,
                    watermark: None,
                    updated_at: Some(now),
                    ..self.clone()
                };
                let effects = vec![
                    Effect::Cancel {
                        template_id: id.clone(),
                    },
                    Effect::SkipOpenInstances {
                        template_id: id.clone(),
                        reason: "template paused".to_string(),
                    },
                    Effect::Emit(Event::TemplatePaused { template_id: id }),
                ];
                (template, effects)
            }

            (TemplateStatus::Active | TemplateStatus::Paused, TemplateEvent::Archive) => {
                let template = Template {
                    status: TemplateStatus::Archived,
                    watermark: None,
                    updated_at: Some(now),
                    ..self.clone()
                };
                let effects = vec![
                    Effect::Cancel {
                        template_id: id.clone(),
                    },
                    Effect::SkipOpenInstances {
                        template_id: id.clone(),
                        reason: "template archived".to_string(),
                    },
                    Effect::Emit(Event::TemplateArchived { template_id: id }),
                ];
                (template, effects)
            }

            // Invalid transitions - no change
            _ => (self.clone(), vec![]),
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
