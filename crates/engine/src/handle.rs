// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application-facing scheduler API

use crate::coordinator::LoopState;
use crate::error::SchedulerError;
use crate::scheduler::Command;
use cadence_core::{
    ExecutionMonitor, ExecutionRecord, ExecutionStats, Template, TemplateEvent, TemplateId,
    Timestamp,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle to a running scheduler
///
/// Heap mutations travel to the loop as commands. Monitor reads go straight
/// to the monitor, which is safe to share.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    monitor: Arc<dyn ExecutionMonitor>,
    state: watch::Receiver<LoopState>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        monitor: Arc<dyn ExecutionMonitor>,
        state: watch::Receiver<LoopState>,
    ) -> Self {
        Self {
            commands,
            monitor,
            state,
        }
    }

    /// Save and schedule a template; returns its next run time
    pub async fn schedule_template(
        &self,
        template: Template,
    ) -> Result<Option<Timestamp>, SchedulerError> {
        self.request(|reply| Command::Schedule { template, reply })
            .await?
    }

    /// Remove a template's pending entry; false if it had none
    pub async fn cancel_template(&self, id: &TemplateId) -> Result<bool, SchedulerError> {
        let id = id.clone();
        self.request(|reply| Command::Cancel { id, reply }).await
    }

    /// Move a template's pending entry; false if it had none
    pub async fn reschedule_template(
        &self,
        id: &TemplateId,
        next_run_at: Timestamp,
    ) -> Result<bool, SchedulerError> {
        let id = id.clone();
        self.request(|reply| Command::Reschedule {
            id,
            next_run_at,
            reply,
        })
        .await
    }

    pub async fn pause_template(&self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.lifecycle(id, TemplateEvent::Pause).await
    }

    pub async fn activate_template(&self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.lifecycle(id, TemplateEvent::Activate).await
    }

    pub async fn archive_template(&self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.lifecycle(id, TemplateEvent::Archive).await
    }

    pub fn get_execution_stats(&self) -> ExecutionStats {
        self.monitor.get_stats()
    }

    /// Most recent executions, newest last
    pub fn get_recent_executions(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.monitor.get_recent_records(limit)
    }

    /// Current loop state
    pub fn state(&self) -> LoopState {
        self.state.borrow().clone()
    }

    /// Subscribe to loop state changes
    pub fn watch_state(&self) -> watch::Receiver<LoopState> {
        self.state.clone()
    }

    /// Stop the loop; runs already dispatched are left to finish on their own
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn lifecycle(
        &self,
        id: &TemplateId,
        event: TemplateEvent,
    ) -> Result<Template, SchedulerError> {
        let id = id.clone();
        self.request(|reply| Command::Lifecycle { id, event, reply })
            .await?
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SchedulerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SchedulerError::Stopped)?;
        response.await.map_err(|_| SchedulerError::Stopped)
    }
}
