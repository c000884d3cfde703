//! Shared helpers for cadenced specs

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

pub use predicates::prelude::*;

/// Upper bound for polling a condition in a spec
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// 2024-01-01T00:00:00Z, a Monday
pub const MONDAY_MS: i64 = 1_704_067_200_000;

/// A weekly template and a one-off, both around `MONDAY_MS`
pub const TWO_TEMPLATES: &str = r#"
[[templates]]
id = "standup"
name = "Daily standup"
start_at = "2024-01-01T09:00:00Z"
rule = { type = "weekly", interval = 1, week_days = ["Mon", "Wed"] }

[[templates]]
id = "launch"
start_at = 0
rule = { type = "custom", dates = [1704153600000] }
"#;

/// Scratch directory holding config, storage, and logs for one spec
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write `cadenced.toml` with storage and log paths inside the project
    pub fn config(&self, body: &str) -> PathBuf {
        let header = format!(
            "[storage]\ndir = {:?}\n\n[logging]\nlevel = \"info\"\nfile = {:?}\n",
            self.path().join("data").display().to_string(),
            self.log_path().display().to_string(),
        );
        self.file("cadenced.toml", &format!("{header}\n{body}"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("logs").join("cadenced.log")
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    pub fn cadenced(&self) -> CliBuilder {
        CliBuilder::new(self.path())
    }
}

/// Builder for a single cadenced invocation
pub struct CliBuilder {
    cmd: assert_cmd::Command,
}

impl CliBuilder {
    fn new(cwd: &Path) -> Self {
        let mut cmd = assert_cmd::Command::cargo_bin("cadenced").unwrap();
        cmd.current_dir(cwd).env_remove("RUST_LOG");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> RunAssert {
        RunAssert(self.cmd.assert().success())
    }

    pub fn fails(mut self) -> RunAssert {
        RunAssert(self.cmd.assert().failure())
    }
}

/// Finished invocation with fluent output checks
pub struct RunAssert(assert_cmd::assert::Assert);

impl RunAssert {
    pub fn stdout_has(self, expected: &str) -> Self {
        RunAssert(self.0.stdout(predicate::str::contains(expected)))
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        RunAssert(self.0.stderr(predicate::str::contains(expected)))
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.0.get_output().stdout).into_owned();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }
}

/// A `cadenced run` process, killed on drop if still alive
pub struct Daemon {
    child: Child,
}

impl Daemon {
    pub fn start(project: &Project, config: &Path) -> Self {
        let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("cadenced"))
            .args(["run", "--config"])
            .arg(config)
            .current_dir(project.path())
            .env_remove("RUST_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        Self { child }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send a signal by name (`TERM`, `INT`)
    pub fn signal(&self, name: &str) {
        let status = std::process::Command::new("kill")
            .arg(format!("-{name}"))
            .arg(self.pid().to_string())
            .status()
            .unwrap();
        assert!(status.success(), "kill -{name} failed");
    }

    /// Wait for exit; true when the process exited cleanly in time
    pub fn wait_success(&mut self, max_ms: u64) -> bool {
        wait_for(max_ms, || matches!(self.child.try_wait(), Ok(Some(_))))
            && matches!(self.child.try_wait(), Ok(Some(status)) if status.success())
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Poll `condition` every 50ms until it holds or `max_ms` elapses
pub fn wait_for(max_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

pub fn now_ms() -> i64 {
    i64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis(),
    )
    .unwrap()
}
