// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance generation and refill policy
//!
//! Materializes recurrence output as PENDING instances, bounded by the
//! horizon, and decides when a template's future backlog is thin enough to
//! top up. Refilling below a threshold (instead of on every fire) keeps
//! generation batched without regenerating everything at once.

use crate::config::Horizon;
use crate::effect::{Event, GenerationStrategy};
use crate::events::EventSink;
use crate::id::IdGen;
use crate::instance::Instance;
use crate::recurrence::{self, RecurrenceEngine, ValidationError};
use crate::storage::{Repository, StorageError};
use crate::template::{Template, TemplateId};
use crate::time::{duration_millis, Timestamp, Window};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A planned batch of new instances for one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBatch {
    pub template_id: TemplateId,
    pub instances: Vec<Instance>,
    /// Watermark the template should carry once the batch is saved
    pub watermark: Option<Timestamp>,
    pub strategy: GenerationStrategy,
}

impl GeneratedBatch {
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Creates instances from templates
#[derive(Clone)]
pub struct InstanceGenerator<I: IdGen> {
    engine: RecurrenceEngine,
    refill_threshold: f64,
    id_gen: I,
}

impl<I: IdGen> InstanceGenerator<I> {
    pub fn new(horizon: Horizon, refill_threshold: f64, id_gen: I) -> Self {
        Self {
            engine: RecurrenceEngine::new(horizon),
            refill_threshold,
            id_gen,
        }
    }

    pub fn engine(&self) -> &RecurrenceEngine {
        &self.engine
    }

    /// Future-instance count below which a refill is due
    pub fn refill_threshold_count(&self) -> usize {
        let max = self.engine.horizon().max_instances.max(1);
        let raw = (max as f64 * self.refill_threshold).ceil();
        (raw as usize).clamp(1, max)
    }

    /// Whether a template with `future_count` open future instances needs more
    pub fn should_refill(&self, future_count: usize) -> bool {
        future_count < self.refill_threshold_count()
    }

    /// Plan new instances for a template without touching storage
    ///
    /// Validation runs first, so a malformed rule yields an error and no
    /// partial batch. Inactive templates get an empty batch.
    pub fn plan(
        &self,
        template: &Template,
        future_count: usize,
        now: Timestamp,
    ) -> Result<GeneratedBatch, ValidationError> {
        recurrence::validate(&template.rule, &template.time)?;

        let strategy = match template.watermark {
            None => GenerationStrategy::Initial,
            Some(_) => GenerationStrategy::Refill,
        };
        let mut batch = GeneratedBatch {
            template_id: template.id.clone(),
            instances: Vec::new(),
            watermark: template.watermark,
            strategy,
        };

        let budget = self
            .engine
            .horizon()
            .max_instances
            .saturating_sub(future_count);
        if !template.is_active() || budget == 0 {
            return Ok(batch);
        }

        let from = template
            .watermark
            .map_or(now, |w| now.max(w.saturating_add(1)));
        let horizon_end =
            now.saturating_add(duration_millis(self.engine.horizon().lookahead));
        let window = Window::new(from, horizon_end);
        if window.is_empty() {
            return Ok(batch);
        }

        let generation = self.engine.generate_limited(template, window, budget)?;
        batch.instances = generation
            .timestamps
            .iter()
            .map(|ts| Instance::new(self.id_gen.mint(), template.id.clone(), *ts))
            .collect();
        if let Some(last) = generation.timestamps.last() {
            batch.watermark = Some(*last);
        }
        Ok(batch)
    }

    /// Top up a template's instances if its backlog is below the threshold
    ///
    /// Saves the new instances and the advanced watermark, and publishes
    /// `InstancesGenerated`. Returns the number of instances created.
    pub fn ensure_instances<R: Repository, S: EventSink + ?Sized>(
        &self,
        template: &mut Template,
        repo: &R,
        sink: &S,
        now: Timestamp,
    ) -> Result<usize, GenerateError> {
        let future_count = repo.count_future_instances(&template.id, now)?;
        if template.watermark.is_some() && !self.should_refill(future_count) {
            return Ok(0);
        }

        let batch = self.plan(template, future_count, now)?;
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.instances.len();
        repo.save_instances(&batch.instances)?;
        template.watermark = batch.watermark;
        template.updated_at = Some(now);
        repo.save_template(template)?;

        tracing::debug!(
            template = %template.id,
            count,
            strategy = %batch.strategy,
            "instances generated"
        );
        sink.publish(Event::InstancesGenerated {
            template_id: template.id.clone(),
            count,
            strategy: batch.strategy,
        });
        Ok(count)
    }
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;
