//! Integration tests for the aseguro binary
//!
//! Everything here runs without an LLM service: the lexical gate, store
//! bookkeeping and argument handling never reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.yaml");
        let yaml = format!(
            "llm_service:\n  url: http://127.0.0.1:9\ncache_dir: {}\ndatabase_path: {}\n",
            dir.path().join("cache").display(),
            dir.path().join("passages.sqlite").display()
        );
        fs::write(&config, yaml).unwrap();
        Self { dir, config }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("aseguro").unwrap();
        cmd.env_remove("ASEGURO_DB")
            .env_remove("ASEGURO_CONFIG")
            .env("XDG_CACHE_HOME", self.dir.path().join("xdg-cache"))
            .env("XDG_DATA_HOME", self.dir.path().join("xdg-data"))
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("aseguro")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("ingest"));
}

#[test]
fn test_ask_blocked_term_offline() {
    let env = Env::new();
    env.cmd()
        .args(["ask", "quiero", "hackear", "el", "sistema"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[blocked]"))
        .stdout(predicate::str::contains("trigger: hackear"));
}

#[test]
fn test_ask_blocked_json() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["--format", "json", "ask", "como robar un auto"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["kind"], "blocked");
    assert_eq!(value["reason"]["gate"], "lexical");
    assert_eq!(value["reason"]["term"], "robar");
}

#[test]
fn test_compare_blocked_feature() {
    let env = Env::new();
    env.cmd()
        .args(["compare", "precios de la competencia", "-i", "RIMAC", "-i", "MAPFRE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trigger: competencia"));
}

#[test]
fn test_compare_requires_insurer() {
    let env = Env::new();
    env.cmd().args(["compare", "deducible"]).assert().failure();
}

#[test]
fn test_status_on_empty_store() {
    let env = Env::new();
    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Passages:        0"))
        .stdout(predicate::str::contains("passages.sqlite"));
}

#[test]
fn test_ingest_empty_file() {
    let env = Env::new();
    let file = env.dir.path().join("empty.jsonl");
    fs::write(&file, "\n\n").unwrap();

    env.cmd()
        .arg("ingest")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted:      0"));
}

#[test]
fn test_ingest_malformed_line_fails() {
    let env = Env::new();
    let file = env.dir.path().join("bad.jsonl");
    fs::write(&file, "{\"text\": \"ok\", \"insurer\": \"RIMAC\"}\nnot json\n").unwrap();

    env.cmd()
        .arg("ingest")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.jsonl:2"));
}

#[test]
fn test_ingest_missing_file_exit_code() {
    let env = Env::new();

    env.cmd()
        .arg("ingest")
        .arg(env.dir.path().join("absent.jsonl"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("absent.jsonl"));
}

#[test]
fn test_cache_clear_without_cache() {
    let env = Env::new();
    env.cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached 'security' corpus"))
        .stdout(predicate::str::contains("No cached 'chitchat' corpus"));
}

#[test]
fn test_invalid_config_exit_code() {
    let env = Env::new();
    fs::write(&env.config, "security:\n  threshold: 2.0\n").unwrap();

    env.cmd()
        .args(["ask", "hola"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("security.threshold"));
}
