// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler

use cadence_core::{
    GenerateError, StorageError, TemplateEvent, TemplateId, TemplateStatus, ValidationError,
};
use thiserror::Error;

/// Errors surfaced to callers of the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid recurrence: {0}")]
    Validation(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),
    #[error("cannot {event:?} template {id} while {status}")]
    InvalidTransition {
        id: TemplateId,
        status: TemplateStatus,
        event: TemplateEvent,
    },
    #[error("scheduler stopped")]
    Stopped,
}

impl From<GenerateError> for SchedulerError {
    fn from(e: GenerateError) -> Self {
        match e {
            GenerateError::Validation(e) => SchedulerError::Validation(e),
            GenerateError::Storage(e) => SchedulerError::Storage(e),
        }
    }
}
