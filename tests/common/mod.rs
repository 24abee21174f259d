//! Common utilities for parley CLI integration tests

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Variables that must never leak from the developer's shell into a test run
const ISOLATED_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "PARLEY_SYSTEM_PROMPT",
    "PARLEY_LOG_TO_FILE",
    "RUST_LOG",
];

/// Unroutable endpoint so a test can never reach a real provider
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

/// Test configuration for integration tests.
///
/// Each test gets its own temporary directory, used both as the working
/// directory and as HOME, so no real `.env` file is picked up.
pub struct TestConfig {
    pub temp_dir: TempDir,
    pub parley_binary: PathBuf,
}

impl TestConfig {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            parley_binary: PathBuf::from(env!("CARGO_BIN_EXE_parley")),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a `.env` file into the working directory
    pub fn write_env_file(&self, content: &str) -> PathBuf {
        let path = self.temp_path().join(".env");
        fs::write(&path, content).expect("Failed to write .env file");
        path
    }

    /// Write `~/.parley/.env` inside the fake home directory
    pub fn write_home_env_file(&self, content: &str) -> PathBuf {
        let dir = self.temp_path().join("home").join(".parley");
        fs::create_dir_all(&dir).expect("Failed to create fake home");
        let path = dir.join(".env");
        fs::write(&path, content).expect("Failed to write home .env file");
        path
    }

    /// A parley command with an isolated environment
    pub fn parley_command(&self) -> Command {
        let home = self.temp_path().join("home");
        fs::create_dir_all(&home).expect("Failed to create fake home");

        let mut cmd = Command::new(&self.parley_binary);
        cmd.current_dir(self.temp_path())
            .env("HOME", &home)
            .env("USERPROFILE", &home)
            .env("PARLEY_OPENAI_BASE_URL", DEAD_ENDPOINT)
            .env("PARLEY_ANTHROPIC_BASE_URL", DEAD_ENDPOINT)
            .env("PARLEY_GEMINI_BASE_URL", DEAD_ENDPOINT);
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Run `cmd` feeding `input` on stdin and wait for it to exit
    pub fn run_with_input(&self, mut cmd: Command, input: &str) -> Output {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn parley");

        {
            // parley may exit before reading everything (e.g. missing key)
            let mut stdin = child.stdin.take().expect("stdin is piped");
            let _ = stdin.write_all(input.as_bytes());
        }

        child.wait_with_output().expect("Failed to wait for parley")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::new();
        assert!(config.temp_path().exists());
        assert!(config.parley_binary.file_name().is_some());
    }

    #[test]
    fn test_env_file_creation() {
        let config = TestConfig::new();
        let path = config.write_env_file("OPENAI_API_KEY=abc\n");
        assert_eq!(fs::read_to_string(path).unwrap(), "OPENAI_API_KEY=abc\n");
    }
}
