// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! cadence-core: recurring-task scheduling primitives
//!
//! This crate provides:
//! - Pure state machines for templates and instances
//! - The recurrence engine and instance generator
//! - The priority heap that orders upcoming runs
//! - Execution monitoring
//! - Repository and event-sink ports with in-memory and JSON implementations

pub mod clock;
pub mod config;
pub mod effect;
pub mod events;
pub mod generator;
pub mod heap;
pub mod id;
pub mod instance;
pub mod monitor;
pub mod recurrence;
pub mod storage;
pub mod template;
pub mod time;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{CatchUpPolicy, Horizon, OverlapPolicy, SchedulerConfig};
pub use effect::{Effect, Event, GenerationStrategy};
pub use events::{ChannelEventSink, EventSink, FakeEventSink, NoOpEventSink, TracingEventSink};
pub use generator::{GenerateError, GeneratedBatch, InstanceGenerator};
pub use heap::{HeapItem, PriorityHeap};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use instance::{Instance, InstanceEvent, InstanceId, InstanceStatus};
pub use monitor::{
    ExecutionMonitor, ExecutionRecord, ExecutionStats, ExecutionStatus, InMemoryMonitor,
    NoOpMonitor,
};
pub use recurrence::{Generation, RecurrenceEngine, ValidationError};
pub use storage::{JsonRepository, MemoryRepository, Repository, StorageError};
pub use template::{
    RecurrenceRule, Template, TemplateEvent, TemplateId, TemplateStatus, TimeConfig,
};
pub use time::{Timestamp, Window, DAY_MS, WEEK_MS};
