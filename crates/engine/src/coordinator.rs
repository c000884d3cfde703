// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling coordinator
//!
//! Owns the priority heap and makes every scheduling decision: which
//! templates are due, which instance a firing consumes, what happens to
//! missed or overlapping runs, and when the next occurrence goes back on the
//! heap. It is synchronous and reads time only through its [`Clock`], so the
//! async runner stays a thin shell that sleeps and forwards commands.

use crate::error::SchedulerError;
use crate::executor::{ExecutionContext, ExecutionError};
use cadence_core::time::duration_millis;
use cadence_core::{
    recurrence, CatchUpPolicy, Clock, Effect, Event, EventSink, ExecutionMonitor, ExecutionRecord,
    ExecutionStats, HeapItem, IdGen, Instance, InstanceEvent, InstanceGenerator, InstanceId,
    InstanceStatus, OverlapPolicy, PriorityHeap, Repository, SchedulerConfig, Template,
    TemplateEvent, TemplateId, Timestamp,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

const REASON_OVERLAP: &str = "previous run still in flight";
const REASON_MISSED: &str = "missed while scheduler was down";
const REASON_CANCELLED: &str = "cancelled";

/// Delay before a template that failed to fire is tried again
const FIRE_RETRY: Duration = Duration::from_secs(5);

/// Observable phase of the scheduler loop
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Nothing scheduled
    #[default]
    Idle,
    /// Sleeping until the earliest deadline
    Waiting { deadline: Timestamp },
    /// Handing out the templates that came due together
    Firing { batch: Vec<TemplateId> },
}

/// Outcome of one dispatched run, fed back by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub run_id: u64,
    pub duration: Duration,
    pub result: Result<(), ExecutionError>,
}

/// Collaborators injected into the coordinator
pub struct CoordinatorDeps<R, C, I> {
    pub repo: R,
    pub clock: C,
    pub id_gen: I,
    pub monitor: Arc<dyn ExecutionMonitor>,
    pub sink: Arc<dyn EventSink>,
}

/// A dispatched run awaiting its completion
#[derive(Debug, Clone)]
struct Run {
    template_id: TemplateId,
    task_name: String,
    instance_id: Option<InstanceId>,
}

/// An instance chosen to fire, or an off-schedule run with no instance
#[derive(Debug)]
struct Selected {
    instance: Option<Instance>,
    scheduled_at: Timestamp,
}

/// Single owner of the priority heap
pub struct Coordinator<R: Repository, C: Clock, I: IdGen> {
    heap: PriorityHeap,
    repo: R,
    clock: C,
    generator: InstanceGenerator<I>,
    monitor: Arc<dyn ExecutionMonitor>,
    sink: Arc<dyn EventSink>,
    overlap: OverlapPolicy,
    catch_up: CatchUpPolicy,
    in_flight: HashMap<u64, Run>,
    /// Runs cancelled while in flight; their outcome is ignored
    discarded: HashSet<u64>,
    /// Templates whose heap entry is a retry rather than an occurrence
    retrying: HashSet<TemplateId>,
    next_run_id: u64,
    state: LoopState,
}

impl<R, C, I> Coordinator<R, C, I>
where
    R: Repository,
    C: Clock,
    I: IdGen,
{
    pub fn new(config: &SchedulerConfig, deps: CoordinatorDeps<R, C, I>) -> Self {
        Self {
            heap: PriorityHeap::new(),
            repo: deps.repo,
            clock: deps.clock,
            generator: InstanceGenerator::new(config.horizon, config.refill_threshold, deps.id_gen),
            monitor: deps.monitor,
            sink: deps.sink,
            overlap: config.overlap,
            catch_up: config.catch_up,
            in_flight: HashMap::new(),
            discarded: HashSet::new(),
            retrying: HashSet::new(),
            next_run_id: 1,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn heap(&self) -> &PriorityHeap {
        &self.heap
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn monitor(&self) -> &Arc<dyn ExecutionMonitor> {
        &self.monitor
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn execution_stats(&self) -> ExecutionStats {
        self.monitor.get_stats()
    }

    pub fn recent_executions(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.monitor.get_recent_records(limit)
    }

    /// Schedule every ACTIVE template found in the repository
    ///
    /// Runs left IN_PROGRESS by a previous process can never complete, so
    /// they are expired first. A template that fails to schedule is logged
    /// and skipped so one bad record cannot keep the rest from running.
    pub fn recover(&mut self) -> Result<usize, SchedulerError> {
        let templates = self.repo.list_templates()?;
        let now = self.clock.now();
        let mut scheduled = 0;
        for template in templates.into_iter().filter(Template::is_active) {
            let id = template.id.clone();
            for stale in self
                .repo
                .find_by_template(&id)?
                .into_iter()
                .filter(|i| i.status == InstanceStatus::InProgress)
            {
                tracing::warn!(template = %id, instance = %stale.id, "expiring run interrupted by restart");
                self.repo
                    .save_instance(&stale.transition(InstanceEvent::Expire, now))?;
            }
            match self.schedule_template(template) {
                Ok(Some(_)) => scheduled += 1,
                Ok(None) => {}
                Err(e) => tracing::error!(template = %id, error = %e, "failed to recover template"),
            }
        }
        tracing::info!(scheduled, "recovered templates");
        Ok(scheduled)
    }

    /// Save a template, materialize its instances, and put its next run on the heap
    ///
    /// Returns the next run time, or `None` when the template is inactive or
    /// has no upcoming occurrence.
    pub fn schedule_template(
        &mut self,
        mut template: Template,
    ) -> Result<Option<Timestamp>, SchedulerError> {
        recurrence::validate(&template.rule, &template.time)?;

        // Re-scheduling a known template must not regenerate what is already stored
        if template.watermark.is_none() {
            if let Some(stored) = self.repo.find_template(&template.id)? {
                template.watermark = stored.watermark;
            }
        }
        self.repo.save_template(&template)?;

        if !template.is_active() {
            self.heap.remove(&template.id);
            return Ok(None);
        }

        let now = self.clock.now();
        self.generator
            .ensure_instances(&mut template, &self.repo, self.sink.as_ref(), now)?;
        self.arm_template(&template.id)
    }

    /// Remove a template's heap entry and abandon its in-flight runs
    ///
    /// Returns whether a heap entry was present.
    pub fn cancel_template(&mut self, id: &TemplateId) -> bool {
        let removed = self.heap.remove(id);
        self.retrying.remove(id);

        let runs: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, run)| run.template_id == *id)
            .map(|(run_id, _)| *run_id)
            .collect();
        let now = self.clock.now();
        for run_id in runs {
            let Some(run) = self.in_flight.remove(&run_id) else {
                continue;
            };
            self.discarded.insert(run_id);
            self.report_skip(&run.template_id, &run.task_name, REASON_CANCELLED);
            if let Some(instance_id) = &run.instance_id {
                let skip = InstanceEvent::Skip {
                    reason: REASON_CANCELLED.to_string(),
                };
                if let Err(e) = self.transition_instance(id, instance_id, skip, now) {
                    tracing::warn!(template = %id, error = %e, "failed to mark cancelled instance");
                }
            }
        }

        if removed {
            tracing::debug!(template = %id, "cancelled");
        }
        removed
    }

    /// Move a template's heap entry to a new time in place
    pub fn reschedule_template(&mut self, id: &TemplateId, next_run_at: Timestamp) -> bool {
        let updated = self.heap.update(id, next_run_at);
        if updated {
            self.retrying.remove(id);
            tracing::debug!(template = %id, next_run_at, "rescheduled");
        }
        updated
    }

    pub fn pause_template(&mut self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.apply_lifecycle(id, TemplateEvent::Pause)
    }

    pub fn activate_template(&mut self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.apply_lifecycle(id, TemplateEvent::Activate)
    }

    pub fn archive_template(&mut self, id: &TemplateId) -> Result<Template, SchedulerError> {
        self.apply_lifecycle(id, TemplateEvent::Archive)
    }

    /// Earliest deadline on the heap
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.heap.peek().map(|item| item.next_run_at)
    }

    /// Enter the wait state for the earliest deadline, or idle on an empty heap
    pub fn arm(&mut self) -> Option<Timestamp> {
        let deadline = self.next_deadline();
        self.state = match deadline {
            Some(deadline) => LoopState::Waiting { deadline },
            None => LoopState::Idle,
        };
        deadline
    }

    /// Pop every entry due at `now` and return the runs to hand out, in order
    ///
    /// A template that fails to fire goes back on the heap a few seconds
    /// later; the rest of the batch still fires.
    pub fn drain(&mut self, now: Timestamp) -> Vec<ExecutionContext> {
        let due = self.heap.drain_due(now);
        if due.is_empty() {
            return Vec::new();
        }

        self.state = LoopState::Firing {
            batch: due.iter().map(|item| item.task_id.clone()).collect(),
        };
        tracing::debug!(count = due.len(), now, "draining due templates");

        let mut dispatches = Vec::new();
        for item in due {
            match self.fire(&item, now) {
                Ok(runs) => dispatches.extend(runs),
                Err(e) => {
                    tracing::error!(template = %item.task_id, error = %e, "failed to fire template");
                    self.retry_later(&item.task_id, now);
                }
            }
        }
        dispatches
    }

    /// Record the outcome of a dispatched run
    pub fn complete(&mut self, completion: Completion) -> Result<(), SchedulerError> {
        if self.discarded.remove(&completion.run_id) {
            tracing::debug!(run_id = completion.run_id, "ignoring outcome of cancelled run");
            return Ok(());
        }
        let Some(run) = self.in_flight.remove(&completion.run_id) else {
            tracing::warn!(run_id = completion.run_id, "completion for unknown run");
            return Ok(());
        };

        let now = self.clock.now();
        let duration_ms = u64::try_from(completion.duration.as_millis()).unwrap_or(u64::MAX);
        let instance_event = match completion.result {
            Ok(()) => {
                self.monitor.record_execution_success(
                    &run.template_id,
                    &run.task_name,
                    Some(completion.duration),
                );
                tracing::info!(template = %run.template_id, duration_ms, "execution succeeded");
                self.sink.publish(Event::ExecutionSucceeded {
                    task_id: run.template_id.clone(),
                    task_name: run.task_name.clone(),
                    instance_id: run.instance_id.clone(),
                    duration_ms,
                });
                InstanceEvent::Complete
            }
            Err(e) => {
                let error = e.to_string();
                self.monitor.record_execution_failure(
                    &run.template_id,
                    &run.task_name,
                    &error,
                    Some(completion.duration),
                );
                tracing::error!(template = %run.template_id, %error, duration_ms, "execution failed");
                self.sink.publish(Event::ExecutionFailed {
                    task_id: run.template_id.clone(),
                    task_name: run.task_name.clone(),
                    instance_id: run.instance_id.clone(),
                    error,
                    duration_ms,
                });
                InstanceEvent::Expire
            }
        };

        if let Some(instance_id) = &run.instance_id {
            self.transition_instance(&run.template_id, instance_id, instance_event, now)?;
        }
        Ok(())
    }

    fn apply_lifecycle(
        &mut self,
        id: &TemplateId,
        event: TemplateEvent,
    ) -> Result<Template, SchedulerError> {
        let template = self
            .repo
            .find_template(id)?
            .ok_or_else(|| SchedulerError::TemplateNotFound(id.clone()))?;

        let now = self.clock.now();
        let (mut next, effects) = template.transition(event, now);
        if effects.is_empty() {
            return Err(SchedulerError::InvalidTransition {
                id: id.clone(),
                status: template.status,
                event,
            });
        }

        self.repo.save_template(&next)?;
        tracing::info!(template = %id, from = %template.status, to = %next.status, "template transition");

        for effect in effects {
            self.apply_effect(&mut next, effect, now)?;
        }
        Ok(next)
    }

    fn apply_effect(
        &mut self,
        template: &mut Template,
        effect: Effect,
        now: Timestamp,
    ) -> Result<(), SchedulerError> {
        match effect {
            Effect::Emit(event) => self.sink.publish(event),
            Effect::GenerateInstances { .. } => {
                self.generator
                    .ensure_instances(template, &self.repo, self.sink.as_ref(), now)?;
            }
            Effect::Schedule { template_id } => {
                self.arm_template(&template_id)?;
            }
            Effect::Cancel { template_id } => {
                self.cancel_template(&template_id);
            }
            Effect::SkipOpenInstances {
                template_id,
                reason,
            } => {
                let open = self.repo.find_by_template(&template_id)?;
                for instance in open.into_iter().filter(Instance::is_open) {
                    let skip = InstanceEvent::Skip {
                        reason: reason.clone(),
                    };
                    self.repo.save_instance(&instance.transition(skip, now))?;
                }
            }
        }
        Ok(())
    }

    /// Put a template's earliest pending instance on the heap, or drop its entry
    fn arm_template(&mut self, id: &TemplateId) -> Result<Option<Timestamp>, SchedulerError> {
        self.retrying.remove(id);
        let next = self
            .repo
            .find_by_template(id)?
            .into_iter()
            .find(Instance::is_pending)
            .map(|instance| instance.scheduled_at);

        match next {
            Some(at) => {
                self.heap.insert(HeapItem::new(id.clone(), at));
                tracing::debug!(template = %id, next_run_at = at, "scheduled");
            }
            None => {
                self.heap.remove(id);
                tracing::debug!(template = %id, "no upcoming occurrence");
            }
        }
        Ok(next)
    }

    fn fire(
        &mut self,
        item: &HeapItem,
        now: Timestamp,
    ) -> Result<Vec<ExecutionContext>, SchedulerError> {
        let retrying = self.retrying.remove(&item.task_id);
        let Some(mut template) = self.repo.find_template(&item.task_id)? else {
            tracing::warn!(template = %item.task_id, "dropping entry for unknown template");
            return Ok(Vec::new());
        };
        if !template.is_active() {
            tracing::debug!(template = %template.id, status = %template.status, "dropping entry for inactive template");
            return Ok(Vec::new());
        }

        let due: Vec<Instance> = self
            .repo
            .find_by_template(&template.id)?
            .into_iter()
            .filter(|i| i.is_pending() && i.scheduled_at <= now)
            .collect();
        if retrying && due.is_empty() {
            // A retry entry carries no occurrence of its own
            self.refill_and_arm(&mut template, now);
            return Ok(Vec::new());
        }
        let selected = self.select_runs(&template, due, item.next_run_at, now)?;

        let mut dispatches = Vec::new();
        if self.overlap == OverlapPolicy::Skip && self.is_in_flight(&template.id) {
            tracing::warn!(template = %template.id, "skipping run, previous run still in flight");
            for run in selected {
                self.skip_selected(&template, run, REASON_OVERLAP, now)?;
            }
        } else {
            for run in selected {
                dispatches.push(self.start_run(&template, run, now)?);
            }
        }

        // Everything due is now consumed, so the next pending instance is in the future
        self.refill_and_arm(&mut template, now);
        Ok(dispatches)
    }

    /// Top up instances and re-arm; runs already started are dispatched either way
    fn refill_and_arm(&mut self, template: &mut Template, now: Timestamp) {
        let refilled = self
            .generator
            .ensure_instances(template, &self.repo, self.sink.as_ref(), now);
        let rearmed = match refilled {
            Ok(_) => self.arm_template(&template.id).map(|_| ()),
            Err(e) => Err(SchedulerError::from(e)),
        };
        if let Err(e) = rearmed {
            tracing::error!(template = %template.id, error = %e, "failed to re-arm template");
            self.retry_later(&template.id, now);
        }
    }

    /// Put a template back on the heap after a storage failure
    fn retry_later(&mut self, id: &TemplateId, now: Timestamp) {
        if self.heap.has(id) {
            return;
        }
        let at = now.saturating_add(duration_millis(FIRE_RETRY));
        self.heap.insert(HeapItem::new(id.clone(), at));
        self.retrying.insert(id.clone());
        tracing::warn!(template = %id, retry_at = at, "retrying template");
    }

    /// Apply the catch-up policy to the instances due at `now`
    fn select_runs(
        &mut self,
        template: &Template,
        mut due: Vec<Instance>,
        entry_at: Timestamp,
        now: Timestamp,
    ) -> Result<Vec<Selected>, SchedulerError> {
        if due.is_empty() {
            // Entry was moved ahead of its occurrence
            return Ok(vec![Selected {
                instance: None,
                scheduled_at: entry_at,
            }]);
        }

        let replay = match self.catch_up {
            CatchUpPolicy::Single => due.split_off(due.len() - 1),
            CatchUpPolicy::BoundedReplay { max_runs } => {
                let keep = usize::try_from(max_runs.max(1))
                    .unwrap_or(usize::MAX)
                    .min(due.len());
                due.split_off(due.len() - keep)
            }
            CatchUpPolicy::SkipMissed { grace } => {
                let grace = duration_millis(grace);
                let (stale, mut fresh): (Vec<_>, Vec<_>) = due
                    .into_iter()
                    .partition(|i| now.saturating_sub(i.scheduled_at) > grace);
                for instance in stale {
                    let selected = Selected {
                        scheduled_at: instance.scheduled_at,
                        instance: Some(instance),
                    };
                    self.skip_selected(template, selected, REASON_MISSED, now)?;
                }
                let latest = fresh.pop();
                due = fresh;
                latest.into_iter().collect()
            }
        };

        for missed in due {
            tracing::debug!(template = %template.id, scheduled_at = missed.scheduled_at, "expiring missed occurrence");
            self.repo
                .save_instance(&missed.transition(InstanceEvent::Expire, now))?;
        }

        Ok(replay
            .into_iter()
            .map(|instance| Selected {
                scheduled_at: instance.scheduled_at,
                instance: Some(instance),
            })
            .collect())
    }

    fn start_run(
        &mut self,
        template: &Template,
        selected: Selected,
        now: Timestamp,
    ) -> Result<ExecutionContext, SchedulerError> {
        if let Some(instance) = &selected.instance {
            self.repo
                .save_instance(&instance.transition(InstanceEvent::Start, now))?;
        }
        self.monitor
            .record_execution_start(&template.id, &template.name);

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let instance_id = selected.instance.map(|i| i.id);
        self.in_flight.insert(
            run_id,
            Run {
                template_id: template.id.clone(),
                task_name: template.name.clone(),
                instance_id: instance_id.clone(),
            },
        );

        tracing::debug!(
            template = %template.id,
            run_id,
            scheduled_at = selected.scheduled_at,
            "dispatching"
        );
        Ok(ExecutionContext {
            run_id,
            template_id: template.id.clone(),
            task_name: template.name.clone(),
            instance_id,
            scheduled_at: selected.scheduled_at,
            fired_at: now,
        })
    }

    fn skip_selected(
        &mut self,
        template: &Template,
        selected: Selected,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), SchedulerError> {
        if let Some(instance) = selected.instance {
            let skip = InstanceEvent::Skip {
                reason: reason.to_string(),
            };
            self.repo.save_instance(&instance.transition(skip, now))?;
        }
        self.report_skip(&template.id, &template.name, reason);
        Ok(())
    }

    fn report_skip(&self, id: &TemplateId, name: &str, reason: &str) {
        self.monitor.record_execution_skipped(id, name, reason);
        self.sink.publish(Event::ExecutionSkipped {
            task_id: id.clone(),
            task_name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn is_in_flight(&self, id: &TemplateId) -> bool {
        self.in_flight.values().any(|run| run.template_id == *id)
    }

    fn transition_instance(
        &self,
        template_id: &TemplateId,
        instance_id: &InstanceId,
        event: InstanceEvent,
        now: Timestamp,
    ) -> Result<(), SchedulerError> {
        let found = self
            .repo
            .find_by_template(template_id)?
            .into_iter()
            .find(|i| i.id == *instance_id);
        match found {
            Some(instance) => self.repo.save_instance(&instance.transition(event, now))?,
            None => tracing::warn!(template = %template_id, instance = %instance_id, "instance not found"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
