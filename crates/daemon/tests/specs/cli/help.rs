//! Help and argument specs

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    let temp = Project::empty();
    temp.cadenced()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("preview")
        .stdout_has("check");
}

#[test]
fn missing_subcommand_fails() {
    let temp = Project::empty();
    temp.cadenced().args(&[]).fails().stderr_has("Usage");
}

#[test]
fn preview_requires_a_config() {
    let temp = Project::empty();
    temp.cadenced()
        .args(&["preview"])
        .fails()
        .stderr_has("--config");
}
