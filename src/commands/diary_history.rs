use crate::commands::CommandReport;
use crate::diary::clock::TimeContext;
use crate::diary::config::load_config;
use crate::diary::history::HistoryReader;
use crate::diary::paths::resolve_paths;
use crate::diary::store::FirebaseStore;
use anyhow::{Result, bail};
use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct DiaryHistoryOptions {
    pub date: Option<String>,
}

pub fn run(opts: &DiaryHistoryOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let store_url = cfg.require_store_url()?;

    let date_key = match opts.date.as_deref().map(str::trim) {
        Some(raw) => {
            if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
                bail!("invalid --date `{raw}`; expected YYYY-MM-DD");
            }
            raw.to_string()
        }
        None => TimeContext::now(cfg.utc_offset()?).date_key,
    };

    let store = FirebaseStore::new(
        store_url,
        &cfg.store.collection,
        cfg.credentials.db_auth.clone(),
        cfg.store.timeout_secs,
    )?;

    let mut report = CommandReport::new("history");
    report.detail(format!("date_key={date_key}"));

    match HistoryReader::new(&store, cfg.store.query_mode).try_fetch(&date_key) {
        Ok(entries) => {
            report.detail(format!("entries={}", entries.len()));
            for entry in entries {
                let tier = entry.tier.map(|t| t.label()).unwrap_or("unknown");
                let time = if entry.time.is_empty() { "--:--:--" } else { entry.time.as_str() };
                report.detail(format!(
                    "{time} [{tier}] {}: {}",
                    entry.author,
                    entry.content.replace('\n', " ")
                ));
            }
        }
        Err(err) => report.issue(format!("code={} {err}", err.code().as_str())),
    }

    Ok(report)
}
