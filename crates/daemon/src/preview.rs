// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dry-run of instance generation for configured templates

use crate::config::DaemonConfig;
use cadence_core::time::{duration_millis, format_rfc3339};
use cadence_core::{RecurrenceEngine, TemplateId, Timestamp, ValidationError, Window};
use std::fmt;

/// One occurrence the engine would generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    pub template_id: TemplateId,
    pub at: Timestamp,
}

impl fmt::Display for PreviewLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.template_id, self.at, format_rfc3339(self.at))
    }
}

/// Occurrences of every configured template in one horizon from `from`
///
/// `limit` caps each template's list; the horizon's instance cap applies
/// either way.
pub fn preview(
    config: &DaemonConfig,
    from: Timestamp,
    limit: Option<usize>,
) -> Result<Vec<PreviewLine>, ValidationError> {
    let engine = RecurrenceEngine::new(config.scheduler.horizon);
    let limit = limit.unwrap_or(config.scheduler.horizon.max_instances);
    let window = Window::new(
        from,
        from.saturating_add(duration_millis(config.scheduler.horizon.lookahead)),
    );

    let mut lines = Vec::new();
    for template in config.templates() {
        let generation = engine.generate_limited(&template, window, limit)?;
        lines.extend(generation.timestamps.into_iter().map(|at| PreviewLine {
            template_id: template.id.clone(),
            at,
        }));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-01T00:00:00Z, a Monday
    const MONDAY: Timestamp = 1_704_067_200_000;

    fn config(text: &str) -> DaemonConfig {
        DaemonConfig::parse(text).unwrap()
    }

    #[test]
    fn lists_each_template_in_order() {
        let config = config(
            r#"
[[templates]]
id = "standup"
start_at = "2024-01-01T09:00:00Z"
rule = { type = "weekly", interval = 1, week_days = ["Mon", "Wed"] }

[[templates]]
id = "once"
start_at = 0
rule = { type = "custom", dates = [1704153600000] }
"#,
        );

        let lines = preview(&config, MONDAY, Some(3)).unwrap();
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "standup\t1704099600000\t2024-01-01T09:00:00.000Z",
                "standup\t1704272400000\t2024-01-03T09:00:00.000Z",
                "standup\t1704704400000\t2024-01-08T09:00:00.000Z",
                "once\t1704153600000\t2024-01-02T00:00:00.000Z",
            ]
        );
    }

    #[test]
    fn limit_defaults_to_the_horizon_cap() {
        let config = config(
            r#"
[scheduler.horizon]
max_instances = 4

[[templates]]
id = "daily"
start_at = 0
rule = { type = "daily", interval = 1 }
"#,
        );
        assert_eq!(preview(&config, MONDAY, None).unwrap().len(), 4);
        assert_eq!(preview(&config, MONDAY, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn invalid_rule_is_an_error() {
        let config = config(
            r#"
[[templates]]
id = "bad"
start_at = 0
rule = { type = "weekly", interval = 1, week_days = [] }
"#,
        );
        assert_eq!(
            preview(&config, MONDAY, None),
            Err(ValidationError::EmptyWeekDays)
        );
    }
}
