// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! A single TOML file holds scheduler tuning, storage and logging settings,
//! and the templates seeded on startup. Every section is optional.

use cadence_core::recurrence::validate;
use cadence_core::{
    RecurrenceRule, SchedulerConfig, Template, TemplateId, TemplateStatus, TimeConfig, Timestamp,
    ValidationError,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up under the user config dir when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "cadenced.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("template {id}: {source}")]
    InvalidTemplate {
        id: String,
        source: ValidationError,
    },

    #[error("template {0} is defined more than once")]
    DuplicateTemplate(String),

    #[error("template id must not be empty")]
    EmptyTemplateId,

    #[error("scheduler.{field}: {reason}")]
    InvalidScheduler { field: &'static str, reason: String },

    #[error("could not determine data directory")]
    NoDataDir,
}

/// A point in time given either as epoch milliseconds or as RFC 3339
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimePoint {
    Millis(Timestamp),
    Rfc3339(DateTime<Utc>),
}

impl TimePoint {
    pub fn millis(self) -> Timestamp {
        match self {
            TimePoint::Millis(ms) => ms,
            TimePoint::Rfc3339(dt) => dt.timestamp_millis(),
        }
    }
}

/// A `[[templates]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    pub id: String,
    /// Defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    pub rule: RecurrenceRule,
    pub start_at: TimePoint,
    #[serde(default)]
    pub end_at: Option<TimePoint>,
    #[serde(default)]
    pub status: TemplateStatus,
}

impl TemplateSpec {
    pub fn time(&self) -> TimeConfig {
        TimeConfig {
            start_at: self.start_at.millis(),
            end_at: self.end_at.map(TimePoint::millis),
        }
    }

    pub fn to_template(&self) -> Template {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        Template::new(
            TemplateId::new(&self.id),
            name,
            self.rule.clone(),
            self.time(),
        )
        .with_status(self.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for template and instance records
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Log to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub templates: Vec<TemplateSpec>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`, or the default config file if one exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check scheduler knobs and every seeded template
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheduler = &self.scheduler;
        if scheduler.horizon.max_instances == 0 {
            return Err(invalid("horizon.max_instances", "must be at least 1"));
        }
        if scheduler.horizon.lookahead.is_zero() {
            return Err(invalid("horizon.lookahead", "must be positive"));
        }
        if !(scheduler.refill_threshold > 0.0 && scheduler.refill_threshold <= 1.0) {
            return Err(invalid(
                "refill_threshold",
                format!("must be in (0, 1], got {}", scheduler.refill_threshold),
            ));
        }
        if scheduler.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be at least 1"));
        }

        let mut seen = HashSet::new();
        for entry in &self.templates {
            if entry.id.trim().is_empty() {
                return Err(ConfigError::EmptyTemplateId);
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::DuplicateTemplate(entry.id.clone()));
            }
            validate(&entry.rule, &entry.time()).map_err(|source| ConfigError::InvalidTemplate {
                id: entry.id.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn templates(&self) -> Vec<Template> {
        self.templates.iter().map(TemplateSpec::to_template).collect()
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|dir| dir.join("cadence"))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cadence").join(DEFAULT_CONFIG_FILE))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidScheduler {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
