//! Integration tests for the parley CLI
//!
//! These drive the built binary end to end. Provider endpoints point at a
//! dead local port, so no test ever talks to a real service.

use std::str;

mod common;

use common::TestConfig;

#[test]
fn test_help_output() {
    let config = TestConfig::new();
    let output = config
        .parley_command()
        .arg("--help")
        .output()
        .expect("Failed to execute parley --help");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    for expected in ["gemini", "openai", "claude", "--model", "--temp"] {
        assert!(stdout.contains(expected), "help is missing {expected}");
    }
}

#[test]
fn test_version_output() {
    let config = TestConfig::new();
    let output = config
        .parley_command()
        .arg("--version")
        .output()
        .expect("Failed to execute parley --version");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("parley"));
}

#[test]
fn test_cancel_immediately_exits_cleanly() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.env("OPENAI_API_KEY", "sk-test");

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("gpt-3.5-turbo:"));
    assert!(!stdout.contains("No prompt provided!"));
}

#[test]
fn test_empty_prompt_prints_message_and_exits() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.env("OPENAI_API_KEY", "sk-test");

    let output = config.run_with_input(cmd, "\n");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("No prompt provided!"));
}

#[test]
fn test_model_alias_selects_upgraded_openai_model() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.env("OPENAI_API_KEY", "sk-test").args(["openai", "--model", "4"]);

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("gpt-4-turbo-preview:"));
}

#[test]
fn test_claude_label_drops_release_date() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.env("ANTHROPIC_API_KEY", "sk-ant-test").arg("claude");

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("claude-3-opus:"));
    assert!(!stdout.contains("20240229"));
}

#[test]
fn test_missing_api_key_fails_with_guidance() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.arg("claude");

    let output = config.run_with_input(cmd, "");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("ANTHROPIC_API_KEY"));
}

#[test]
fn test_api_key_from_env_file() {
    let config = TestConfig::new();
    config.write_env_file("GEMINI_API_KEY=from-dotenv\n");
    let mut cmd = config.parley_command();
    cmd.arg("gemini");

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("gemini-pro:"));
}

#[test]
fn test_api_key_from_home_env_file() {
    let config = TestConfig::new();
    config.write_home_env_file("GEMINI_API_KEY=from-home\n");
    let mut cmd = config.parley_command();
    cmd.arg("gemini");

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
}

#[test]
fn test_provider_failure_exits_with_error() {
    let config = TestConfig::new();
    let mut cmd = config.parley_command();
    cmd.env("OPENAI_API_KEY", "sk-test");

    let output = config.run_with_input(cmd, "hello\n");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_invalid_temperature_is_rejected() {
    let config = TestConfig::new();
    let output = config
        .parley_command()
        .args(["--temp", "warm"])
        .output()
        .expect("Failed to execute parley");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("--temp"));
}

#[test]
fn test_claude_temperature_above_one_is_rejected() {
    let config = TestConfig::new();
    let output = config
        .parley_command()
        .args(["claude", "--temp", "1.8"])
        .output()
        .expect("Failed to execute parley");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("--temp"));
    assert!(stderr.contains("between 0 and 1"));
}

#[test]
fn test_malformed_env_file_is_reported() {
    let config = TestConfig::new();
    config.write_env_file("OPENAI_API_KEY=\"unterminated\nX");
    let mut cmd = config.parley_command();
    cmd.env("OPENAI_API_KEY", "sk-test");

    let output = config.run_with_input(cmd, "");

    assert!(output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("Failed to load env file"));
    assert!(stderr.contains(".env"));
}

#[cfg(unix)]
#[test]
fn test_ctrl_c_at_prompt_exits_cleanly() {
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::Duration;

    let config = TestConfig::new();
    let mut child = config
        .parley_command()
        .env("OPENAI_API_KEY", "sk-test")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn parley");

    // Keep stdin open so the prompt is waiting on input, not on EOF
    let _stdin = child.stdin.take();
    thread::sleep(Duration::from_millis(1000));

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(status.success());

    let output = child.wait_with_output().expect("Failed to wait for parley");
    assert_eq!(output.status.code(), Some(0));
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("gpt-3.5-turbo:"));
}

#[test]
fn test_completions_generation() {
    let config = TestConfig::new();
    let output = config
        .parley_command()
        .args(["--completions", "bash"])
        .output()
        .expect("Failed to execute parley --completions");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("parley"));
}
