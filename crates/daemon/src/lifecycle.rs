// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown

use crate::config::{ConfigError, DaemonConfig};
use async_trait::async_trait;
use cadence_core::time::format_rfc3339;
use cadence_core::{
    ExecutionMonitor, ExecutionStats, InMemoryMonitor, JsonRepository, NoOpMonitor, Repository,
    StorageError, SystemClock, Template, TracingEventSink, UuidIdGen,
};
use cadence_engine::{
    Coordinator, CoordinatorDeps, ExecutionContext, ExecutionError, Scheduler, SchedulerError,
    SchedulerHandle, TaskExecutor,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid log path: {0}")]
    InvalidLogPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Executor that records each firing in the log
pub struct LogExecutor;

#[async_trait]
impl TaskExecutor for LogExecutor {
    async fn execute(&self, ctx: ExecutionContext) -> Result<(), ExecutionError> {
        info!(
            run = ctx.run_id,
            template = %ctx.template_id,
            task = %ctx.task_name,
            instance = ctx.instance_id.as_ref().map(|id| id.to_string()),
            scheduled_at = %format_rfc3339(ctx.scheduled_at),
            lag_ms = ctx.fired_at - ctx.scheduled_at,
            "task fired"
        );
        Ok(())
    }
}

/// A running scheduler
pub struct Daemon {
    pub handle: SchedulerHandle,
    join: JoinHandle<()>,
}

impl Daemon {
    /// Stop the loop and return the final execution stats
    pub async fn shutdown(self) -> Result<ExecutionStats, DaemonError> {
        info!("Shutting down scheduler...");
        self.handle.shutdown().await?;
        self.join.await?;

        let stats = self.handle.get_execution_stats();
        info!(
            total = stats.total_executions,
            successful = stats.successful_executions,
            failed = stats.failed_executions,
            skipped = stats.skipped_executions,
            average_ms = stats.average_execution_duration,
            "final execution stats"
        );
        Ok(stats)
    }
}

/// Open storage, seed configured templates, recover, and start the loop
pub async fn startup(config: &DaemonConfig) -> Result<Daemon, DaemonError> {
    let dir = config.data_dir()?;
    let repo = JsonRepository::open(&dir)?;
    let seeded = seed_templates(&repo, config.templates())?;

    let monitor: Arc<dyn ExecutionMonitor> = if config.scheduler.monitoring {
        Arc::new(InMemoryMonitor::with_capacity(
            SystemClock,
            config.scheduler.history_capacity,
        ))
    } else {
        Arc::new(NoOpMonitor)
    };

    let mut coordinator = Coordinator::new(
        &config.scheduler,
        CoordinatorDeps {
            repo,
            clock: SystemClock,
            id_gen: UuidIdGen,
            monitor,
            sink: Arc::new(TracingEventSink),
        },
    );
    let scheduled = coordinator.recover()?;

    let (scheduler, handle) = Scheduler::new(coordinator, Arc::new(LogExecutor));
    let join = scheduler.spawn();

    info!(
        dir = %dir.display(),
        seeded,
        scheduled,
        "scheduler started"
    );
    Ok(Daemon { handle, join })
}

/// Store configured templates, keeping what storage already knows about them
///
/// The stored watermark survives so a restart does not regenerate instances.
/// Archived templates stay archived.
pub fn seed_templates<R: Repository>(
    repo: &R,
    templates: Vec<Template>,
) -> Result<usize, StorageError> {
    let mut seeded = 0;
    for mut template in templates {
        if let Some(stored) = repo.find_template(&template.id)? {
            if stored.is_archived() {
                warn!(template = %template.id, "ignoring configured template: archived in storage");
                continue;
            }
            template.watermark = stored.watermark;
            template.updated_at = stored.updated_at;
        }
        repo.save_template(&template)?;
        seeded += 1;
    }
    Ok(seeded)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
