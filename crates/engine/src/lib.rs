// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cadence scheduler loop

mod coordinator;
mod error;
mod executor;
mod handle;
mod scheduler;

pub use coordinator::{Completion, Coordinator, CoordinatorDeps, LoopState};
pub use error::SchedulerError;
pub use executor::{ExecutionContext, ExecutionError, FnExecutor, TaskExecutor};
pub use handle::SchedulerHandle;
pub use scheduler::Scheduler;
