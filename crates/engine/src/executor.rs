// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task execution port
//!
//! The scheduler hands each due run to a [`TaskExecutor`] and never waits on
//! it inline; the outcome comes back later as a completion.

use async_trait::async_trait;
use cadence_core::{InstanceId, TemplateId, Timestamp};
use std::future::Future;
use thiserror::Error;

/// Everything an executor learns about a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub run_id: u64,
    pub template_id: TemplateId,
    pub task_name: String,
    /// Instance being executed; `None` for a run moved off its occurrence
    pub instance_id: Option<InstanceId>,
    pub scheduled_at: Timestamp,
    pub fired_at: Timestamp,
}

/// Errors reported by a task handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Failed(String),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task aborted: {0}")]
    Aborted(String),
}

impl ExecutionError {
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutionError::Failed(message.into())
    }
}

/// Runs the work behind a fired task
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    async fn execute(&self, ctx: ExecutionContext) -> Result<(), ExecutionError>;
}

/// Adapts an async closure into a [`TaskExecutor`]
pub struct FnExecutor<F> {
    f: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecutionError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskExecutor for FnExecutor<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExecutionError>> + Send + 'static,
{
    async fn execute(&self, ctx: ExecutionContext) -> Result<(), ExecutionError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
