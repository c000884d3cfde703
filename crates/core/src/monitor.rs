// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution monitoring
//!
//! Records start/success/failure/skip per execution, keeps aggregate
//! counters and a bounded history of recent records.
//!
//! Two implementations share the [`ExecutionMonitor`] trait and can be
//! swapped without touching callers. [`InMemoryMonitor`] guards its state
//! with a mutex, so it is safe both when the coordinator serializes every
//! call and when worker tasks report outcomes concurrently.

use crate::clock::Clock;
use crate::template::TemplateId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Default capacity of the recent-executions ring buffer
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Outcome of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Started,
    Success,
    Failure,
    Skipped,
}

/// One execution, pending or finalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: TemplateId,
    pub task_name: String,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub duration_ms: Option<u64>,
    pub status: ExecutionStatus,
    /// Error message for failures, reason for skips
    pub message: Option<String>,
}

/// Aggregate counters over all finalized executions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub skipped_executions: u64,
    pub last_execution_at: Option<Timestamp>,
    /// Running mean over executions with a known duration, in milliseconds
    pub average_execution_duration: f64,
}

/// Sink for execution lifecycle records
pub trait ExecutionMonitor: Send + Sync {
    /// Start tracking an execution; a repeated start for the same task replaces the pending one
    fn record_execution_start(&self, task_id: &TemplateId, task_name: &str);

    /// Finalize as success; duration is derived from the pending start when not given
    fn record_execution_success(
        &self,
        task_id: &TemplateId,
        task_name: &str,
        duration: Option<Duration>,
    );

    /// Finalize as failure; duration is derived from the pending start when not given
    fn record_execution_failure(
        &self,
        task_id: &TemplateId,
        task_name: &str,
        error: &str,
        duration: Option<Duration>,
    );

    /// Finalize as skipped without a matching start
    fn record_execution_skipped(&self, task_id: &TemplateId, task_name: &str, reason: &str);

    /// Snapshot of the counters
    fn get_stats(&self) -> ExecutionStats;

    /// Up to `limit` most recent records, newest last
    fn get_recent_records(&self, limit: usize) -> Vec<ExecutionRecord>;
}

/// Monitor used when monitoring is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMonitor;

impl ExecutionMonitor for NoOpMonitor {
    fn record_execution_start(&self, _task_id: &TemplateId, _task_name: &str) {}

    fn record_execution_success(
        &self,
        _task_id: &TemplateId,
        _task_name: &str,
        _duration: Option<Duration>,
    ) {
    }

    fn record_execution_failure(
        &self,
        _task_id: &TemplateId,
        _task_name: &str,
        _error: &str,
        _duration: Option<Duration>,
    ) {
    }

    fn record_execution_skipped(&self, _task_id: &TemplateId, _task_name: &str, _reason: &str) {}

    fn get_stats(&self) -> ExecutionStats {
        ExecutionStats::default()
    }

    fn get_recent_records(&self, _limit: usize) -> Vec<ExecutionRecord> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    pending: HashMap<TemplateId, ExecutionRecord>,
    history: VecDeque<ExecutionRecord>,
    stats: ExecutionStats,
    /// Number of finalized executions that contributed to the mean
    timed: u64,
}

/// In-memory aggregating monitor
pub struct InMemoryMonitor<C: Clock> {
    clock: C,
    capacity: usize,
    state: Mutex<MonitorState>,
}

impl<C: Clock> InMemoryMonitor<C> {
    pub fn new(clock: C) -> Self {
        Self::with_capacity(clock, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(clock: C, capacity: usize) -> Self {
        Self {
            clock,
            capacity: capacity.max(1),
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Number of executions started but not yet finalized
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish(
        &self,
        task_id: &TemplateId,
        task_name: &str,
        status: ExecutionStatus,
        message: Option<String>,
        duration: Option<Duration>,
    ) {
        let now = self.clock.now();
        let mut state = self.lock();
        let pending = state.pending.remove(task_id);

        let started_at = pending.as_ref().map_or(now, |p| p.started_at);
        let duration_ms = duration
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .or_else(|| pending.map(|p| u64::try_from(now - p.started_at).unwrap_or(0)));

        let record = ExecutionRecord {
            task_id: task_id.clone(),
            task_name: task_name.to_string(),
            started_at,
            completed_at: Some(now),
            duration_ms,
            status,
            message,
        };
        self.push(&mut state, record);

        state.stats.total_executions += 1;
        match status {
            ExecutionStatus::Success => state.stats.successful_executions += 1,
            ExecutionStatus::Failure => state.stats.failed_executions += 1,
            ExecutionStatus::Skipped => state.stats.skipped_executions += 1,
            ExecutionStatus::Started => {}
        }
        state.stats.last_execution_at = Some(now);

        if status != ExecutionStatus::Skipped {
            if let Some(ms) = duration_ms {
                state.timed += 1;
                let avg = state.stats.average_execution_duration;
                state.stats.average_execution_duration = avg + (ms as f64 - avg) / state.timed as f64;
            }
        }
    }

    fn push(&self, state: &mut MonitorState, record: ExecutionRecord) {
        if state.history.len() >= self.capacity {
            state.history.pop_front();
        }
        state.history.push_back(record);
    }
}

impl<C: Clock> ExecutionMonitor for InMemoryMonitor<C> {
    fn record_execution_start(&self, task_id: &TemplateId, task_name: &str) {
        let record = ExecutionRecord {
            task_id: task_id.clone(),
            task_name: task_name.to_string(),
            started_at: self.clock.now(),
            completed_at: None,
            duration_ms: None,
            status: ExecutionStatus::Started,
            message: None,
        };
        self.lock().pending.insert(task_id.clone(), record);
    }

    fn record_execution_success(
        &self,
        task_id: &TemplateId,
        task_name: &str,
        duration: Option<Duration>,
    ) {
        self.finish(task_id, task_name, ExecutionStatus::Success, None, duration);
    }

    fn record_execution_failure(
        &self,
        task_id: &TemplateId,
        task_name: &str,
        error: &str,
        duration: Option<Duration>,
    ) {
        self.finish(
            task_id,
            task_name,
            ExecutionStatus::Failure,
            Some(error.to_string()),
            duration,
        );
    }

    fn record_execution_skipped(&self, task_id: &TemplateId, task_name: &str, reason: &str) {
        let now = self.clock.now();
        let mut state = self.lock();
        let record = ExecutionRecord {
            task_id: task_id.clone(),
            task_name: task_name.to_string(),
            started_at: now,
            completed_at: Some(now),
            duration_ms: None,
            status: ExecutionStatus::Skipped,
            message: Some(reason.to_string()),
        };
        self.push(&mut state, record);
        state.stats.total_executions += 1;
        state.stats.skipped_executions += 1;
        state.stats.last_execution_at = Some(now);
    }

    fn get_stats(&self) -> ExecutionStats {
        self.lock().stats.clone()
    }

    fn get_recent_records(&self, limit: usize) -> Vec<ExecutionRecord> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
