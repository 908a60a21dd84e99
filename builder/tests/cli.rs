//! CLI tests spawning the builder binary.
//!
//! The `run` test drives the real `CommandAgent` against a shell script that
//! plays both agents, so it exercises config loading, process handling and
//! the delivery record output end to end.

use std::fs;
use std::path::Path;
use std::process::Command;

use builder::exit_codes;
use builder::io::config::{BuilderConfig, load_config, write_config};
use builder::io::init::{InitOptions, init_builder};
use serde_json::Value;

fn builder_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_builder"));
    cmd.current_dir(root)
        .env_remove("RUST_LOG")
        .env("OPENAI_API_KEY", "sk-test");
    cmd
}

/// Answers the review call (recognised by `--output-schema`) with `$REPORT`
/// and every other call by writing a page into its working directory.
const FAKE_AGENT: &str = r#"#!/bin/sh
answer=""
schema=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-last-message) answer="$2"; shift 2 ;;
    --output-schema) schema="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cat > /dev/null
if [ -n "$schema" ]; then
  printf '%s' "$REPORT" > "$answer"
else
  echo '<h1>menu</h1>' > index.html
  printf 'built index.html' > "$answer"
fi
"#;

fn init_with_fake_agent(root: &Path) {
    let config_path = root.join("builder.toml");
    init_builder(&config_path, &InitOptions { force: false }).expect("init");
    let script = root.join("fake-agent.sh");
    fs::write(&script, FAKE_AGENT).expect("write fake agent");

    let mut cfg: BuilderConfig = toml::from_str(
        &fs::read_to_string(&config_path).expect("read config"),
    )
    .expect("parse config");
    cfg.agent.command = vec!["sh".to_string(), script.display().to_string()];
    cfg.agent.timeout_secs = 30;
    write_config(&config_path, &cfg).expect("write config");
}

#[test]
fn list_prints_seeded_skill() {
    let temp = tempfile::tempdir().expect("tempdir");
    let init = builder_cmd(temp.path()).arg("init").output().expect("builder init");
    assert_eq!(init.status.code(), Some(exit_codes::OK));

    let output = builder_cmd(temp.path()).arg("list").output().expect("builder list");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let first = stdout.lines().next().expect("one skill");
    assert!(first.starts_with("restaurant-menu\tRestaurant menu\t"));
}

#[test]
fn run_unknown_skill_is_invalid_and_creates_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_builder(&temp.path().join("builder.toml"), &InitOptions { force: false })
        .expect("init");

    let output = builder_cmd(temp.path())
        .args(["run", "portfolio", "--run-id", "never001"])
        .output()
        .expect("builder run");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("skill 'portfolio' not found"));

    let cfg = load_config(&temp.path().join("builder.toml")).expect("config");
    assert!(!cfg.workspace_dir.join("never001").exists());
}

#[test]
fn run_without_api_key_is_invalid_and_creates_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_builder(&temp.path().join("builder.toml"), &InitOptions { force: false })
        .expect("init");

    let output = builder_cmd(temp.path())
        .env_remove("OPENAI_API_KEY")
        .args(["run", "restaurant-menu", "--run-id", "nokey001"])
        .output()
        .expect("builder run");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_API_KEY is not set"));
    assert!(output.stdout.is_empty());

    let cfg = load_config(&temp.path().join("builder.toml")).expect("config");
    assert!(!cfg.workspace_dir.join("nokey001").exists());
}

#[cfg(unix)]
#[test]
fn run_prints_delivery_record() {
    let temp = tempfile::tempdir().expect("tempdir");
    let report = r#"{"passed":true,"score":93,"summary":"clean","issues":[],"fixed_files":[]}"#;
    init_with_fake_agent(temp.path());

    let output = builder_cmd(temp.path())
        .env("REPORT", report)
        .args(["run", "restaurant-menu", "中文，红色主题", "--run-id", "cli00001"])
        .output()
        .expect("builder run");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {stderr}");

    let record: Value = serde_json::from_slice(&output.stdout).expect("delivery json");
    assert_eq!(record["run_id"], "cli00001");
    assert_eq!(record["status"], "success");
    assert_eq!(record["skill"], "Restaurant menu");
    assert_eq!(record["stack"], "Vite + React + Tailwind CSS");
    assert_eq!(record["qa"]["score"], 93);
    assert_eq!(record["qa"]["critical_count"], 0);

    let cfg = load_config(&temp.path().join("builder.toml")).expect("config");
    assert!(cfg.workspace_dir.join("cli00001/index.html").is_file());
    let run_dir = cfg.runs_log_dir().join("cli00001");
    let prompt = fs::read_to_string(run_dir.join("generate.prompt.md")).expect("prompt");
    assert!(prompt.contains("中文，红色主题"));
    assert!(run_dir.join("delivery.json").is_file());
    assert!(stderr.contains("delivered: success"));
}

#[cfg(unix)]
#[test]
fn failing_agent_exits_with_delivery_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_with_fake_agent(temp.path());
    let cfg_path = temp.path().join("builder.toml");
    let mut cfg: BuilderConfig =
        toml::from_str(&fs::read_to_string(&cfg_path).expect("read")).expect("parse");
    cfg.agent.command = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
    write_config(&cfg_path, &cfg).expect("write config");

    let output = builder_cmd(temp.path())
        .args(["run", "restaurant-menu"])
        .output()
        .expect("builder run");
    assert_eq!(output.status.code(), Some(exit_codes::DELIVERY_FAILED));
    let record: Value = serde_json::from_slice(&output.stdout).expect("delivery json");
    assert_eq!(record["status"], "fail");
    assert!(record.get("qa").is_none());
    assert!(record["error"].as_str().expect("error").contains("generation agent failed"));
}
