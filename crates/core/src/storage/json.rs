// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based repository
//!
//! Layout under the base directory:
//! - `templates/<template-id>.json`
//! - `instances/<template-id>/<instance-id>.json`

use super::{Repository, StorageError};
use crate::instance::Instance;
use crate::template::{Template, TemplateId};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One JSON file per record
#[derive(Debug, Clone)]
pub struct JsonRepository {
    base_path: PathBuf,
}

impl JsonRepository {
    /// Open a repository at the given path, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join("templates"))?;
        fs::create_dir_all(base_path.join("instances"))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn template_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .base_path
            .join("templates")
            .join(format!("{}.json", checked(id)?)))
    }

    fn instance_dir(&self, template_id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join("instances").join(checked(template_id)?))
    }
}

/// Reject ids that would escape their directory
fn checked(id: &str) -> Result<&str, StorageError> {
    if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(id)
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Write to a temp file, then rename into place
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Read every `*.json` file in a directory; a missing directory is empty
fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StorageError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            records.push(read_json(&path)?);
        }
    }
    Ok(records)
}

impl Repository for JsonRepository {
    fn save_template(&self, template: &Template) -> Result<(), StorageError> {
        write_json(&self.template_path(template.id.as_str())?, template)
    }

    fn find_template(&self, id: &TemplateId) -> Result<Option<Template>, StorageError> {
        let path = self.template_path(id.as_str())?;
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn list_templates(&self) -> Result<Vec<Template>, StorageError> {
        let mut templates: Vec<Template> = read_dir_json(&self.base_path.join("templates"))?;
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    fn save_instance(&self, instance: &Instance) -> Result<(), StorageError> {
        let path = self
            .instance_dir(instance.template_id.as_str())?
            .join(format!("{}.json", checked(&instance.id.0)?));
        write_json(&path, instance)
    }

    fn find_by_template(&self, template_id: &TemplateId) -> Result<Vec<Instance>, StorageError> {
        let mut instances: Vec<Instance> =
            read_dir_json(&self.instance_dir(template_id.as_str())?)?;
        instances.sort_by(|a, b| (a.scheduled_at, &a.id).cmp(&(b.scheduled_at, &b.id)));
        Ok(instances)
    }
}
