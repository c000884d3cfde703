// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance id minting
//!
//! Every generated occurrence is stored under its own id. Ids double as
//! record names in the JSON store, so generators only emit path-safe text.

use crate::instance::InstanceId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mints the id for each newly generated instance
pub trait IdGen: Clone + Send + Sync + 'static {
    fn mint(&self) -> InstanceId;
}

/// Random v4 UUIDs; ids stay unique across restarts
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn mint(&self) -> InstanceId {
        InstanceId(uuid::Uuid::new_v4().to_string())
    }
}

/// `{prefix}-{n}` ids counting from 1
///
/// Clones share the counter, so a generator handed to several owners never
/// repeats an id.
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("inst")
    }
}

impl IdGen for SequentialIdGen {
    fn mint(&self) -> InstanceId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        InstanceId(format!("{}-{n}", self.prefix))
    }
}
