// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance state machine
//!
//! An instance is one concrete, time-stamped occurrence of a template.
//! Status only moves forward: PENDING → IN_PROGRESS → a terminal state,
//! and terminal states absorb every further event.

use crate::template::TemplateId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        InstanceId(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Status of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Expired,
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Completed | InstanceStatus::Skipped | InstanceStatus::Expired
        )
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceStatus::Pending => "PENDING",
            InstanceStatus::InProgress => "IN_PROGRESS",
            InstanceStatus::Completed => "COMPLETED",
            InstanceStatus::Skipped => "SKIPPED",
            InstanceStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

/// Events that can change instance status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceEvent {
    /// Dispatched for execution
    Start,
    /// Execution finished successfully
    Complete,
    /// Deliberately not run (overlap, missed tick, paused template)
    Skip { reason: String },
    /// Due time passed without a successful run
    Expire,
}

/// A concrete occurrence of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    pub scheduled_at: Timestamp,
    pub status: InstanceStatus,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub finished_at: Option<Timestamp>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Instance {
    /// Create a new instance in the Pending state
    pub fn new(
        id: impl Into<InstanceId>,
        template_id: TemplateId,
        scheduled_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            template_id,
            scheduled_at,
            status: InstanceStatus::Pending,
            started_at: None,
            finished_at: None,
            reason: None,
        }
    }

    /// Pure transition function; invalid transitions leave the instance unchanged
    pub fn transition(&self, event: InstanceEvent, now: Timestamp) -> Instance {
        match (self.status, event) {
            (InstanceStatus::Pending, InstanceEvent::Start) => Instance {
                status: InstanceStatus::InProgress,
                started_at: Some(now),
                ..self.clone()
            },

            (InstanceStatus::InProgress, InstanceEvent::Complete) => Instance {
                status: InstanceStatus::Completed,
                finished_at: Some(now),
                ..self.clone()
            },

            (InstanceStatus::Pending | InstanceStatus::InProgress, InstanceEvent::Skip { reason }) => {
                Instance {
                    status: InstanceStatus::Skipped,
                    finished_at: Some(now),
                    reason: Some(reason),
                    ..self.clone()
                }
            }

            (InstanceStatus::Pending | InstanceStatus::InProgress, InstanceEvent::Expire) => {
                Instance {
                    status: InstanceStatus::Expired,
                    finished_at: Some(now),
                    ..self.clone()
                }
            }

            _ => self.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending or in progress
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_pending(&self) -> bool {
        self.status == InstanceStatus::Pending
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
