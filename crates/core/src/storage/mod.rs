// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository port for templates and instances
//!
//! The scheduler only needs a handful of queries; how records are stored is
//! up to the implementation.

pub mod json;
pub mod memory;

pub use json::JsonRepository;
pub use memory::MemoryRepository;

use crate::instance::Instance;
use crate::template::{Template, TemplateId};
use crate::time::Timestamp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid record id: {0:?}")]
    InvalidId(String),
}

/// Persistence operations consumed by the scheduler
pub trait Repository: Clone + Send + Sync + 'static {
    fn save_template(&self, template: &Template) -> Result<(), StorageError>;

    fn find_template(&self, id: &TemplateId) -> Result<Option<Template>, StorageError>;

    fn list_templates(&self) -> Result<Vec<Template>, StorageError>;

    fn save_instance(&self, instance: &Instance) -> Result<(), StorageError>;

    fn save_instances(&self, instances: &[Instance]) -> Result<(), StorageError> {
        for instance in instances {
            self.save_instance(instance)?;
        }
        Ok(())
    }

    /// All instances of a template, ordered by scheduled time
    fn find_by_template(&self, template_id: &TemplateId) -> Result<Vec<Instance>, StorageError>;

    /// Non-terminal instances of a template scheduled at or after `from`
    fn count_future_instances(
        &self,
        template_id: &TemplateId,
        from: Timestamp,
    ) -> Result<usize, StorageError> {
        Ok(self
            .find_by_template(template_id)?
            .iter()
            .filter(|i| i.is_open() && i.scheduled_at >= from)
            .count())
    }
}
