// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::instance::InstanceId;
use crate::template::TemplateId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Effects are side effects that state machines request from the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Publish an event to the event sink
    Emit(Event),
    /// Materialize instances for a template up to its horizon
    GenerateInstances { template_id: TemplateId },
    /// Compute the template's next run and put it on the heap
    Schedule { template_id: TemplateId },
    /// Drop the template's heap entry, if any
    Cancel { template_id: TemplateId },
    /// Move every PENDING/IN_PROGRESS instance of the template to SKIPPED
    SkipOpenInstances {
        template_id: TemplateId,
        reason: String,
    },
}

/// How a batch of instances came to be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// First batch for a template that had no future instances
    Initial,
    /// Top-up after the future backlog fell below the refill threshold
    Refill,
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStrategy::Initial => write!(f, "initial"),
            GenerationStrategy::Refill => write!(f, "refill"),
        }
    }
}

/// Events published toward the outbound event sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    InstancesGenerated {
        template_id: TemplateId,
        count: usize,
        strategy: GenerationStrategy,
    },
    ExecutionSucceeded {
        task_id: TemplateId,
        task_name: String,
        instance_id: Option<InstanceId>,
        duration_ms: u64,
    },
    ExecutionFailed {
        task_id: TemplateId,
        task_name: String,
        instance_id: Option<InstanceId>,
        error: String,
        duration_ms: u64,
    },
    ExecutionSkipped {
        task_id: TemplateId,
        task_name: String,
        reason: String,
    },
    TemplateActivated {
        template_id: TemplateId,
    },
    TemplatePaused {
        template_id: TemplateId,
    },
    TemplateArchived {
        template_id: TemplateId,
    },
}

impl Event {
    /// Dotted event name used for routing and logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::InstancesGenerated { .. } => "instances.generated",
            Event::ExecutionSucceeded { .. } => "execution.success",
            Event::ExecutionFailed { .. } => "execution.failure",
            Event::ExecutionSkipped { .. } => "execution.skipped",
            Event::TemplateActivated { .. } => "template.activated",
            Event::TemplatePaused { .. } => "template.paused",
            Event::TemplateArchived { .. } => "template.archived",
        }
    }
}
