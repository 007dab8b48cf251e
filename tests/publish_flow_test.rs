use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::tempdir;

const SCRUBBED_ENV: [&str; 25] = [
    "DIARY_DB_URL",
    "DB_URL",
    "DIARY_DB_AUTH",
    "DIARY_COLLECTION",
    "DIARY_QUERY_MODE",
    "DIARY_MODELS",
    "DIARY_GENERATION_PROVIDER",
    "DIARY_AUTHOR",
    "DIARY_SKIP_IF_DUPLICATE",
    "DIARY_PUBLISH_MODE",
    "DIARY_RANDOM_SEED",
    "DIARY_CONFIG_PATH",
    "DIARY_LOGS_DIR",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "AI_API_KEY",
    "DEEPSEEK_API_KEY",
    "AI_BASE_URL",
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

#[derive(Debug, Clone, Copy, Default)]
struct Behavior {
    fail_writes: bool,
    fail_generation: bool,
}

type Records = Arc<Mutex<BTreeMap<String, Value>>>;

/// Minimal stand-in for the Firebase REST endpoints plus an
/// OpenAI-compatible chat route. One request per connection.
struct FakeFirebase {
    url: String,
    records: Records,
}

impl FakeFirebase {
    fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let records: Records = Arc::new(Mutex::new(BTreeMap::new()));
        let shared = Arc::clone(&records);
        thread::spawn(move || {
            let mut next_id = 0u32;
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &shared, &mut next_id, behavior);
            }
        });
        Self { url, records }
    }

    fn seed(&self, id: &str, value: Value) {
        self.records
            .lock()
            .expect("records lock")
            .insert(id.to_string(), value);
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        self.records.lock().expect("records lock").clone()
    }
}

fn handle(stream: TcpStream, records: &Records, next_id: &mut u32, behavior: Behavior) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let (status, payload) = match (method.as_str(), path.as_str()) {
        ("GET", "/diary.json") => {
            let map = records.lock().expect("records lock");
            if map.is_empty() {
                ("200 OK", "null".to_string())
            } else {
                ("200 OK", serde_json::to_string(&*map).expect("serialize records"))
            }
        }
        ("POST", "/diary.json") if behavior.fail_writes => (
            "503 Service Unavailable",
            json!({"error": "unavailable"}).to_string(),
        ),
        ("POST", "/diary.json") => {
            let id = format!("-fake{}", *next_id);
            *next_id += 1;
            let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            records.lock().expect("records lock").insert(id.clone(), value);
            ("200 OK", json!({"name": id}).to_string())
        }
        ("PUT", p) if p.starts_with("/diary/") && p.ends_with(".json") => {
            let key = p.trim_start_matches("/diary/").trim_end_matches(".json");
            let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            records
                .lock()
                .expect("records lock")
                .insert(key.to_string(), value.clone());
            ("200 OK", value.to_string())
        }
        ("POST", "/v1/chat/completions") if behavior.fail_generation => (
            "500 Internal Server Error",
            json!({"error": "boom"}).to_string(),
        ),
        ("POST", "/v1/chat/completions") => (
            "200 OK",
            json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  Thinking of you from the fake model.  "}}
                ]
            })
            .to_string(),
        ),
        _ => ("404 Not Found", json!({"error": "not found"}).to_string()),
    };

    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.flush();
}

fn diary_cmd(home: &Path, store_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("diary-bot").expect("bin");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("DIARY_HOME", home.join("diary"))
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env("no_proxy", "127.0.0.1,localhost");
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    cmd.env("DIARY_DB_URL", store_url);
    cmd
}

#[test]
fn local_run_appends_then_skips_duplicate() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior::default());

    diary_cmd(tmp.path(), &server.url)
        .env("DIARY_GENERATION_PROVIDER", "local")
        .args(["run", "--seed", "3"])
        .assert()
        .success()
        .stdout(contains("tier=template"))
        .stdout(contains("publish=written id=-fake0"));

    let records = server.snapshot();
    assert_eq!(records.len(), 1);
    let saved = &records["-fake0"];
    assert_eq!(saved["author"], "hubby");
    assert_eq!(saved["tier"], "template");
    let content = saved["content"].as_str().expect("content");
    assert!(!content.is_empty());
    assert!(content.chars().count() <= 600);
    assert!(saved["dateKey"].as_str().expect("dateKey").len() == 10);

    diary_cmd(tmp.path(), &server.url)
        .env("DIARY_GENERATION_PROVIDER", "local")
        .args(["run", "--skip-if-duplicate"])
        .assert()
        .success()
        .stdout(contains("tier=none"))
        .stdout(contains("publish=skipped_duplicate existing_id=-fake0"));
    assert_eq!(server.snapshot().len(), 1);

    let audit = fs::read_to_string(tmp.path().join("diary/logs/audit.log")).expect("audit log");
    let outcomes: Vec<String> = audit
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("audit json");
            value["outcome"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(outcomes, vec!["written", "skipped_duplicate"]);
}

#[test]
fn remote_candidate_text_is_published_with_provenance() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior::default());

    diary_cmd(tmp.path(), &server.url)
        .env("DIARY_MODELS", "openai-compatible:fake-model")
        .env("AI_API_KEY", "test-key")
        .env("AI_BASE_URL", &server.url)
        .assert()
        .success()
        .stdout(contains("tier=remote"))
        .stdout(contains("source_id=openai-compatible:fake-model"))
        .stdout(contains("content=Thinking of you from the fake model."));

    let records = server.snapshot();
    let saved = &records["-fake0"];
    assert_eq!(saved["content"], "Thinking of you from the fake model.");
    assert_eq!(saved["tier"], "remote");
    assert_eq!(saved["sourceId"], "openai-compatible:fake-model");
}

#[test]
fn failing_remote_falls_back_to_templates() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior {
        fail_generation: true,
        ..Behavior::default()
    });

    diary_cmd(tmp.path(), &server.url)
        .env("DIARY_MODELS", "openai-compatible:fake-model")
        .env("AI_API_KEY", "test-key")
        .env("AI_BASE_URL", &server.url)
        .arg("run")
        .assert()
        .success()
        .stdout(contains("tier=template"))
        .stderr(contains("code=E004_GENERATION_ATTEMPT_FAILED"));

    assert_eq!(server.snapshot().len(), 1);
}

#[test]
fn overwrite_day_mode_keys_record_by_date() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior::default());

    for _ in 0..2 {
        diary_cmd(tmp.path(), &server.url)
            .env("DIARY_GENERATION_PROVIDER", "local")
            .args(["run", "--publish-mode", "overwrite-day"])
            .assert()
            .success();
    }

    let records = server.snapshot();
    assert_eq!(records.len(), 1);
    let (key, value) = records.iter().next().expect("one record");
    assert_eq!(Some(key.as_str()), value["dateKey"].as_str());
}

#[test]
fn write_failure_exits_with_report() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior {
        fail_writes: true,
        ..Behavior::default()
    });

    diary_cmd(tmp.path(), &server.url)
        .env("DIARY_GENERATION_PROVIDER", "local")
        .arg("run")
        .assert()
        .code(2)
        .stdout(contains("ok: false"))
        .stdout(contains("publish failed"))
        .stderr(contains("code=E005_PUBLISH_FAILED"));
}

#[test]
fn history_lists_one_day_in_timestamp_order() {
    let tmp = tempdir().expect("tempdir");
    let server = FakeFirebase::start(Behavior::default());
    server.seed(
        "-a",
        json!({"author": "hubby", "content": "late note", "dateKey": "2025-01-01", "time": "21:00:00", "timestampMs": 300}),
    );
    server.seed(
        "-b",
        json!({"author": "Amian", "content": "early note", "dateKey": "2025-01-01", "time": "08:00:00", "timestampMs": 100}),
    );
    server.seed(
        "-c",
        json!({"author": "hubby", "content": "other day", "dateKey": "2024-12-31"}),
    );

    let output = diary_cmd(tmp.path(), &server.url)
        .args(["history", "--date", "2025-01-01"])
        .assert()
        .success()
        .stdout(contains("entries=2"))
        .stdout(contains("other day").not())
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let early = text.find("early note").expect("early listed");
    let late = text.find("late note").expect("late listed");
    assert!(early < late);

    let json_out = diary_cmd(tmp.path(), &server.url)
        .args(["--json", "history", "--date", "2025-01-01"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&json_out).expect("json report");
    assert_eq!(report["command"], "history");
    assert_eq!(report["ok"], true);
}

#[test]
fn history_rejects_malformed_date() {
    let tmp = tempdir().expect("tempdir");
    diary_cmd(tmp.path(), "http://127.0.0.1:9")
        .args(["history", "--date", "2025/01/01"])
        .assert()
        .failure()
        .stderr(contains("invalid --date"));
}
