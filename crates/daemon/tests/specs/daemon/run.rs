//! Daemon run specs
//!
//! Start `cadenced run`, watch its log, and stop it with a signal.

use crate::prelude::*;

fn fires_soon(delay_ms: i64) -> String {
    format!(
        r#"
[[templates]]
id = "soon"
name = "Soon"
start_at = 0
rule = {{ type = "custom", dates = [{}] }}
"#,
        now_ms() + delay_ms
    )
}

#[test]
fn run_fires_seeded_template_and_stops_on_sigterm() {
    let temp = Project::empty();
    let config = temp.config(&fires_soon(500));
    let mut daemon = Daemon::start(&temp, &config);

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || temp.log().contains("task fired")),
        "no firing logged:\n{}",
        temp.log()
    );

    daemon.signal("TERM");
    assert!(daemon.wait_success(SPEC_WAIT_MAX_MS), "daemon did not exit cleanly");

    let log = temp.log();
    assert!(log.contains("Received SIGTERM"), "log:\n{log}");
    assert!(log.contains("final execution stats"), "log:\n{log}");
    assert!(log.contains("Daemon stopped"), "log:\n{log}");
}

#[test]
fn run_stops_on_sigint() {
    let temp = Project::empty();
    let config = temp.config("");
    let mut daemon = Daemon::start(&temp, &config);

    assert!(wait_for(SPEC_WAIT_MAX_MS, || temp.log().contains("scheduler started")));
    daemon.signal("INT");
    assert!(daemon.wait_success(SPEC_WAIT_MAX_MS));
    assert!(temp.log().contains("Received SIGINT"));
}

#[test]
fn run_persists_templates_to_storage() {
    let temp = Project::empty();
    let config = temp.config(&fires_soon(3_600_000));
    let mut daemon = Daemon::start(&temp, &config);

    let stored = temp.path().join("data").join("templates").join("soon.json");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || stored.exists()));

    daemon.signal("TERM");
    assert!(daemon.wait_success(SPEC_WAIT_MAX_MS));
}

#[test]
fn run_refuses_invalid_config() {
    let temp = Project::empty();
    let config = temp.config(
        r#"
[scheduler]
refill_threshold = 2.0
"#,
    );

    temp.cadenced()
        .args(&["run", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("scheduler.refill_threshold");
}
