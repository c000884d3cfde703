// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Min-heap of schedulable tasks keyed by next run time
//!
//! Holds at most one entry per task. Equal run times are ordered by a
//! monotonic insertion sequence, so firing order is deterministic.
//!
//! `remove` and `update` locate the entry with a linear scan.

use crate::template::TemplateId;
use crate::time::Timestamp;

/// A task's position in the schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapItem {
    pub task_id: TemplateId,
    pub next_run_at: Timestamp,
    /// Tie-breaker assigned by the heap on insert/update
    seq: u64,
}

impl HeapItem {
    pub fn new(task_id: impl Into<TemplateId>, next_run_at: Timestamp) -> Self {
        Self {
            task_id: task_id.into(),
            next_run_at,
            seq: 0,
        }
    }

    fn key(&self) -> (Timestamp, u64) {
        (self.next_run_at, self.seq)
    }
}

/// Array-backed binary min-heap
#[derive(Debug, Clone, Default)]
pub struct PriorityHeap {
    items: Vec<HeapItem>,
    next_seq: u64,
}

impl PriorityHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a heap from arbitrary items in O(n); later duplicates of a task win
    pub fn from_items(items: impl IntoIterator<Item = HeapItem>) -> Self {
        let mut heap = Self::new();
        for mut item in items {
            item.seq = heap.bump_seq();
            match heap.position(&item.task_id) {
                Some(idx) => heap.items[idx] = item,
                None => heap.items.push(item),
            }
        }
        for idx in (0..heap.items.len() / 2).rev() {
            heap.sift_down(idx);
        }
        heap
    }

    /// Insert a task; an existing entry for the same task is moved instead
    pub fn insert(&mut self, item: HeapItem) {
        if self.update(&item.task_id, item.next_run_at) {
            return;
        }
        let mut item = item;
        item.seq = self.bump_seq();
        self.items.push(item);
        let last = self.items.len() - 1;
        self.sift_up(last);
    }

    pub fn peek(&self) -> Option<&HeapItem> {
        self.items.first()
    }

    pub fn extract_min(&mut self) -> Option<HeapItem> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let min = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        min
    }

    /// Pop every item due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: Timestamp) -> Vec<HeapItem> {
        let mut due = Vec::new();
        while self.peek().is_some_and(|item| item.next_run_at <= now) {
            if let Some(item) = self.extract_min() {
                due.push(item);
            }
        }
        due
    }

    /// Remove a task's entry; `false` when the task is not on the heap
    pub fn remove(&mut self, task_id: &TemplateId) -> bool {
        let Some(idx) = self.position(task_id) else {
            return false;
        };
        let last = self.items.len() - 1;
        self.items.swap(idx, last);
        self.items.pop();
        if idx < self.items.len() {
            // The moved element may belong above or below its new slot
            self.sift_up(idx);
            self.sift_down(idx);
        }
        true
    }

    /// Move a task to a new run time; `false` when the task is not on the heap
    pub fn update(&mut self, task_id: &TemplateId, next_run_at: Timestamp) -> bool {
        let Some(idx) = self.position(task_id) else {
            return false;
        };
        let seq = self.bump_seq();
        self.items[idx].next_run_at = next_run_at;
        self.items[idx].seq = seq;
        self.sift_up(idx);
        self.sift_down(idx);
        true
    }

    pub fn has(&self, task_id: &TemplateId) -> bool {
        self.position(task_id).is_some()
    }

    pub fn find(&self, task_id: &TemplateId) -> Option<&HeapItem> {
        self.items.iter().find(|item| &item.task_id == task_id)
    }

    /// Copy of the backing array, in heap order
    pub fn to_vec(&self) -> Vec<HeapItem> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, task_id: &TemplateId) -> Option<usize> {
        self.items.iter().position(|item| &item.task_id == task_id)
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.items[idx].key() >= self.items[parent].key() {
                break;
            }
            self.items.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;
            if left < len && self.items[left].key() < self.items[smallest].key() {
                smallest = left;
            }
            if right < len && self.items[right].key() < self.items[smallest].key() {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.items.swap(idx, smallest);
            idx = smallest;
        }
    }

    #[cfg(test)]
    fn holds_invariant(&self) -> bool {
        (1..self.items.len()).all(|i| self.items[(i - 1) / 2].key() <= self.items[i].key())
    }
}

#[cfg(test)]
#[path = "heap_tests.rs"]
mod tests;
