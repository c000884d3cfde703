// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory repository

use super::{Repository, StorageError};
use crate::instance::{Instance, InstanceId};
use crate::template::{Template, TemplateId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Tables {
    templates: BTreeMap<TemplateId, Template>,
    instances: HashMap<TemplateId, BTreeMap<InstanceId, Instance>>,
}

/// Shared in-memory repository; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Repository for MemoryRepository {
    fn save_template(&self, template: &Template) -> Result<(), StorageError> {
        self.lock()
            .templates
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn find_template(&self, id: &TemplateId) -> Result<Option<Template>, StorageError> {
        Ok(self.lock().templates.get(id).cloned())
    }

    fn list_templates(&self) -> Result<Vec<Template>, StorageError> {
        Ok(self.lock().templates.values().cloned().collect())
    }

    fn save_instance(&self, instance: &Instance) -> Result<(), StorageError> {
        self.lock()
            .instances
            .entry(instance.template_id.clone())
            .or_default()
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    fn find_by_template(&self, template_id: &TemplateId) -> Result<Vec<Instance>, StorageError> {
        let mut instances: Vec<Instance> = self
            .lock()
            .instances
            .get(template_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        instances.sort_by(|a, b| (a.scheduled_at, &a.id).cmp(&(b.scheduled_at, &b.id)));
        Ok(instances)
    }
}
