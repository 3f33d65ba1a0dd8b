//! Shared integration-test harness for running the `cyberlabs` binary
//! against an isolated data directory.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// A throwaway data directory plus helpers to invoke the CLI against it.
///
/// The directory is removed on drop.
pub struct CyberLabsCli {
    data_dir: TempDir,
    content: Option<PathBuf>,
}

impl CyberLabsCli {
    /// Uses the built-in catalog.
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().expect("failed to create temp data dir"),
            content: None,
        }
    }

    /// Uses the given fixture as the content pack.
    pub fn with_fixture(name: &str) -> Self {
        Self {
            content: Some(fixture_path(name)),
            ..Self::new()
        }
    }

    /// Path of the data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.path().to_path_buf()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cyberlabs"));
        cmd.args(args)
            .arg("--data-dir")
            .arg(self.data_dir.path())
            .args(["--color", "never"])
            .env_remove("CYBERLABS_CONTENT")
            .env_remove("CYBERLABS_DATA_DIR")
            .env_remove("CYBERLABS_LOG_LEVEL")
            .env("CYBERLABS_FEEDBACK_DELAY", "0s");
        if let Some(content) = &self.content {
            cmd.arg("--content").arg(content);
        }
        cmd
    }

    /// Runs a command to completion with empty stdin.
    #[allow(clippy::missing_panics_doc)]
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .stdin(Stdio::null())
            .output()
            .expect("failed to run cyberlabs")
    }

    /// Runs a command, feeding `input` on stdin.
    #[allow(clippy::missing_panics_doc)]
    pub fn run_with_input(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn cyberlabs");
        child
            .stdin
            .take()
            .expect("stdin not captured")
            .write_all(input.as_bytes())
            .expect("failed to write stdin");
        child.wait_with_output().expect("failed to wait for cyberlabs")
    }

    /// Runs a command and parses its stdout as JSON.
    #[allow(clippy::missing_panics_doc)]
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
    }
}

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Stdout as a lossy string.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr as a lossy string.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
