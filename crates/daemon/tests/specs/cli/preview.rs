//! Preview specs

use crate::prelude::*;

#[test]
fn preview_prints_each_occurrence() {
    let temp = Project::empty();
    let config = temp.config(TWO_TEMPLATES);

    temp.cadenced()
        .args(&[
            "preview",
            "--config",
            config.to_str().unwrap(),
            "--from",
            &MONDAY_MS.to_string(),
            "--limit",
            "3",
        ])
        .passes()
        .stdout_eq(
            "standup\t1704099600000\t2024-01-01T09:00:00.000Z\n\
             standup\t1704272400000\t2024-01-03T09:00:00.000Z\n\
             standup\t1704704400000\t2024-01-08T09:00:00.000Z\n\
             launch\t1704153600000\t2024-01-02T00:00:00.000Z\n",
        );
}

#[test]
fn preview_window_excludes_past_dates() {
    let temp = Project::empty();
    let config = temp.config(TWO_TEMPLATES);
    let after_launch = MONDAY_MS + 2 * 86_400_000;

    temp.cadenced()
        .args(&[
            "preview",
            "--config",
            config.to_str().unwrap(),
            "--from",
            &after_launch.to_string(),
            "--limit",
            "1",
        ])
        .passes()
        .stdout_eq("standup\t1704272400000\t2024-01-03T09:00:00.000Z\n");
}

#[test]
fn preview_rejects_invalid_templates() {
    let temp = Project::empty();
    let config = temp.config(
        r#"
[[templates]]
id = "zero"
start_at = 0
rule = { type = "daily", interval = 0 }
"#,
    );

    temp.cadenced()
        .args(&["preview", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("recurrence interval must be positive, got 0");
}
