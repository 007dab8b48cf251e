use crate::diary::paths::DiaryPaths;
use crate::diary::pipeline::RunOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

const MAX_AUDIT_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_ms: i64,
    pub command: String,
    pub date_key: String,
    pub tier: String,
    pub source_id: Option<String>,
    pub outcome: String,
    pub content_chars: usize,
    pub build_id: String,
}

impl AuditEvent {
    pub fn from_run(command: &str, run: &RunOutcome) -> Self {
        Self {
            at_epoch_ms: Utc::now().timestamp_millis(),
            command: command.to_string(),
            date_key: run.time.date_key.clone(),
            tier: run
                .generated
                .as_ref()
                .map_or("none", |g| g.tier.label())
                .to_string(),
            source_id: run.generated.as_ref().and_then(|g| g.source_id.clone()),
            outcome: run
                .publish
                .as_ref()
                .map(|p| p.label().to_string())
                .unwrap_or_else(|| "dry_run".to_string()),
            content_chars: run.generated.as_ref().map_or(0, |g| g.text.chars().count()),
            build_id: env!("DIARY_BUILD_ID").to_string(),
        }
    }
}

pub fn append_event(paths: &DiaryPaths, event: &AuditEvent) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let line = format!("{}\n", serde_json::to_string(event)?);
    let path = paths.audit_log();
    maybe_rotate_log(&path);

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn maybe_rotate_log(path: &Path) {
    if let Ok(meta) = fs::metadata(path)
        && meta.len() >= MAX_AUDIT_LOG_SIZE
    {
        let backup = format!("{}.1", path.display());
        let _ = fs::rename(path, backup);
    }
}
