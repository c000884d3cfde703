//! Config check specs

use crate::prelude::*;

#[test]
fn valid_config_passes() {
    let temp = Project::empty();
    let config = temp.config(TWO_TEMPLATES);

    temp.cadenced()
        .args(&["check", "--config", config.to_str().unwrap()])
        .passes()
        .stdout_has("ok: 2 template(s)");
}

#[test]
fn invalid_rule_fails_with_the_reason() {
    let temp = Project::empty();
    let config = temp.config(
        r#"
[[templates]]
id = "broken"
start_at = 0
rule = { type = "weekly", interval = 1, week_days = [] }
"#,
    );

    temp.cadenced()
        .args(&["check", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("template broken: weekly rule needs at least one weekday");
}

#[test]
fn unparseable_config_fails() {
    let temp = Project::empty();
    let config = temp.file("cadenced.toml", "[scheduler\n");

    temp.cadenced()
        .args(&["check", "--config", config.to_str().unwrap()])
        .fails()
        .stderr_has("invalid config");
}

#[test]
fn missing_config_fails() {
    let temp = Project::empty();
    temp.cadenced()
        .args(&["check", "--config", "nope.toml"])
        .fails()
        .stderr_has("failed to read nope.toml");
}
