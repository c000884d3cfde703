// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event port
//!
//! The scheduler publishes domain events through an injected [`EventSink`]
//! and never depends on a particular pub/sub implementation.

use crate::effect::Event;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Sender for event delivery
pub type EventSender = mpsc::UnboundedSender<Event>;
/// Receiver for event delivery
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Capability to publish events; publishing never fails the caller
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: Event);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn publish(&self, event: Event) {
        (**self).publish(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn publish(&self, _event: Event) {}
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: EventSender,
}

impl ChannelEventSink {
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: Event) {
        // A dropped receiver just means nobody is listening
        let _ = self.tx.send(event);
    }
}

/// Writes every event as a structured log line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: Event) {
        match &event {
            Event::ExecutionFailed {
                task_id,
                task_name,
                error,
                ..
            } => {
                tracing::warn!(event = event.name(), task = %task_id, name = %task_name, %error);
            }
            _ => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                tracing::info!(event = event.name(), %payload);
            }
        }
    }
}

/// Records events for assertions in tests
#[derive(Debug, Clone, Default)]
pub struct FakeEventSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl FakeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Names of all events published so far
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }
}

impl EventSink for FakeEventSink {
    fn publish(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
