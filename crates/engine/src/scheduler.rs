// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async scheduler loop
//!
//! A single tokio task owns the [`Coordinator`]. It sleeps until the earliest
//! deadline, and any command or completion wakes it early so a new earlier
//! deadline is picked up at once. Runs are spawned onto their own tasks and
//! report back through a completion channel; the loop never waits on them.

use crate::coordinator::{Completion, Coordinator, LoopState};
use crate::error::SchedulerError;
use crate::executor::{ExecutionContext, ExecutionError, TaskExecutor};
use crate::handle::SchedulerHandle;
use cadence_core::{Clock, IdGen, Repository, Template, TemplateEvent, TemplateId, Timestamp};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Requests sent from handles to the loop
pub(crate) enum Command {
    Schedule {
        template: Template,
        reply: oneshot::Sender<Result<Option<Timestamp>, SchedulerError>>,
    },
    Cancel {
        id: TemplateId,
        reply: oneshot::Sender<bool>,
    },
    Reschedule {
        id: TemplateId,
        next_run_at: Timestamp,
        reply: oneshot::Sender<bool>,
    },
    Lifecycle {
        id: TemplateId,
        event: TemplateEvent,
        reply: oneshot::Sender<Result<Template, SchedulerError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// The scheduler loop and its channels
pub struct Scheduler<R: Repository, C: Clock, I: IdGen> {
    coordinator: Coordinator<R, C, I>,
    executor: Arc<dyn TaskExecutor>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    state_tx: watch::Sender<LoopState>,
}

impl<R, C, I> Scheduler<R, C, I>
where
    R: Repository,
    C: Clock,
    I: IdGen,
{
    /// Wrap a coordinator, returning the loop and a handle to drive it
    pub fn new(
        coordinator: Coordinator<R, C, I>,
        executor: Arc<dyn TaskExecutor>,
    ) -> (Self, SchedulerHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(coordinator.state().clone());
        let handle = SchedulerHandle::new(commands_tx, Arc::clone(coordinator.monitor()), state_rx);
        let scheduler = Self {
            coordinator,
            executor,
            commands,
            completions_tx,
            completions_rx,
            state_tx,
        };
        (scheduler, handle)
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown is requested or every handle is dropped
    pub async fn run(mut self) {
        tracing::info!("scheduler loop started");

        loop {
            let deadline = self.coordinator.arm();
            self.publish_state();
            let delay = deadline.map(|at| {
                let wait = at.saturating_sub(self.coordinator.clock().now());
                Duration::from_millis(u64::try_from(wait).unwrap_or(0))
            });

            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("all handles dropped");
                        break;
                    };
                    if self.handle_command(command) {
                        break;
                    }
                }

                Some(completion) = self.completions_rx.recv() => {
                    if let Err(e) = self.coordinator.complete(completion) {
                        tracing::error!(error = %e, "failed to record completion");
                    }
                }

                _ = sleep_for(delay) => {
                    let now = self.coordinator.clock().now();
                    let runs = self.coordinator.drain(now);
                    self.publish_state();
                    for ctx in runs {
                        self.dispatch(ctx);
                    }
                }
            }
        }

        tracing::info!(
            in_flight = self.coordinator.in_flight_count(),
            "scheduler loop stopped"
        );
    }

    /// Apply a command; returns true when the loop should stop
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Schedule { template, reply } => {
                let _ = reply.send(self.coordinator.schedule_template(template));
            }
            Command::Cancel { id, reply } => {
                let _ = reply.send(self.coordinator.cancel_template(&id));
            }
            Command::Reschedule {
                id,
                next_run_at,
                reply,
            } => {
                let _ = reply.send(self.coordinator.reschedule_template(&id, next_run_at));
            }
            Command::Lifecycle { id, event, reply } => {
                let result = match event {
                    TemplateEvent::Activate => self.coordinator.activate_template(&id),
                    TemplateEvent::Pause => self.coordinator.pause_template(&id),
                    TemplateEvent::Archive => self.coordinator.archive_template(&id),
                };
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                tracing::info!("shutdown requested");
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    /// Hand a run to the executor on its own task
    ///
    /// The executor runs inside a nested task so a panic surfaces as a
    /// `JoinError` and is reported as a failed run.
    fn dispatch(&self, ctx: ExecutionContext) {
        let executor = Arc::clone(&self.executor);
        let completions = self.completions_tx.clone();
        let run_id = ctx.run_id;
        tokio::spawn(async move {
            let started = Instant::now();
            let result = match tokio::spawn(async move { executor.execute(ctx).await }).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ExecutionError::Panicked(panic_message(e.into_panic()))),
                Err(e) => Err(ExecutionError::Aborted(e.to_string())),
            };
            let _ = completions.send(Completion {
                run_id,
                duration: started.elapsed(),
                result,
            });
        });
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.coordinator.state().clone());
    }
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
