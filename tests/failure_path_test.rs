use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SCRUBBED_ENV: [&str; 18] = [
    "DIARY_DB_URL",
    "DB_URL",
    "DIARY_DB_AUTH",
    "DIARY_MODELS",
    "DIARY_GENERATION_PROVIDER",
    "DIARY_CONFIG_PATH",
    "DIARY_LOGS_DIR",
    "DIARY_RANDOM_SEED",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "AI_API_KEY",
    "DEEPSEEK_API_KEY",
    "AI_BASE_URL",
    "HTTP_PROXY",
    "http_proxy",
    "ALL_PROXY",
    "all_proxy",
];

fn diary_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("diary-bot").expect("bin");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("DIARY_HOME", home.join("diary"));
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn run_fails_fast_without_store_url() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .arg("run")
        .assert()
        .code(1)
        .stderr(contains("store url missing"));
}

#[test]
fn bare_invocation_behaves_like_run() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .assert()
        .code(1)
        .stderr(contains("store url missing"));
}

#[test]
fn legacy_db_url_alias_is_honoured() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .env("DB_URL", "http://127.0.0.1:9")
        .env("DIARY_GENERATION_PROVIDER", "local")
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("publish=dry_run"));
}

#[test]
fn unreachable_store_still_produces_a_dry_run_entry() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .env("DIARY_DB_URL", "http://127.0.0.1:9")
        .env("DIARY_GENERATION_PROVIDER", "local")
        .args(["run", "--dry-run", "--seed", "42"])
        .assert()
        .success()
        .stdout(contains("history.entries=0"))
        .stdout(contains("tier=template"))
        .stdout(contains("publish=dry_run"))
        .stderr(contains("DIARY_WARN code=E002_HISTORY_FETCH_FAILED"));

    let audit = fs::read_to_string(tmp.path().join("diary/logs/audit.log")).expect("audit log");
    assert!(audit.contains("\"outcome\":\"dry_run\""));
}

#[test]
fn missing_credentials_skip_remote_tier() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .env("DIARY_DB_URL", "http://127.0.0.1:9")
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("tier=template"))
        .stderr(contains("skipped=no-credential-for-gemini"));
}

#[test]
fn malformed_config_file_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    let config_path = tmp.path().join("diary.toml");
    fs::write(&config_path, "[store\nurl=").expect("write config");

    diary_cmd(tmp.path())
        .env("DIARY_CONFIG_PATH", &config_path)
        .env("DIARY_DB_URL", "http://127.0.0.1:9")
        .arg("run")
        .assert()
        .code(1)
        .stderr(contains("failed to parse diary config"));
}

#[test]
fn out_of_range_values_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path())
        .env("DIARY_DB_URL", "http://127.0.0.1:9")
        .env("DIARY_QUOTE_PROBABILITY", "3")
        .args(["run", "--dry-run"])
        .assert()
        .code(1)
        .stderr(contains("quote probability"));
}
