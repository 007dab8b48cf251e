use crate::commands::CommandReport;
use crate::diary::config::{SECRET_ENV_KEYS, load_config, masked_env_secret};
use crate::diary::paths::resolve_paths;
use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub struct DiaryConfigOptions {
    pub show: bool,
}

pub fn run(opts: &DiaryConfigOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("config");
    let cfg = load_config(&paths)?;

    if cfg.require_store_url().is_err() {
        report.issue("store.url unset; set DIARY_DB_URL (or DB_URL) or [store].url in diary.toml");
    }

    if !opts.show {
        report.detail("config=valid");
        return Ok(report);
    }

    report.detail("resolution.order=defaults -> diary.toml -> environment -> flags");
    if paths.config_file.exists() {
        report.detail(format!("resolution.diary_toml={}", paths.config_file.display()));
    } else {
        report.detail(format!(
            "resolution.diary_toml=missing ({})",
            paths.config_file.display()
        ));
    }
    report.detail(format!("paths.diary_home={}", paths.diary_home.display()));
    report.detail(format!("paths.audit_log={}", paths.audit_log().display()));

    report.detail(format!(
        "store.url={}",
        cfg.store.url.as_deref().unwrap_or("unset")
    ));
    report.detail(format!("store.collection={}", cfg.store.collection));
    report.detail(format!("store.query_mode={:?}", cfg.store.query_mode));
    report.detail(format!("store.timeout_secs={}", cfg.store.timeout_secs));

    report.detail(format!("generation.provider={:?}", cfg.generation.provider));
    report.detail(format!("generation.models={}", cfg.generation.models.join(",")));
    report.detail(format!(
        "generation.timeout_secs={}",
        cfg.generation.timeout_secs
    ));
    report.detail(format!(
        "generation.temperature={:?}",
        cfg.generation.temperature
    ));
    report.detail(format!(
        "generation.max_output_tokens={:?}",
        cfg.generation.max_output_tokens
    ));
    report.detail(format!(
        "generation.quote_probability={}",
        cfg.generation.quote_probability
    ));

    report.detail(format!("entry.author={}", cfg.entry.author));
    report.detail(format!("entry.persona_name={}", cfg.entry.persona_name));
    report.detail(format!("entry.partner_name={}", cfg.entry.partner_name));
    report.detail(format!("entry.max_len={}", cfg.entry.max_len));
    report.detail(format!(
        "entry.utc_offset_hours={}",
        cfg.entry.utc_offset_hours
    ));
    report.detail(format!(
        "entry.skip_if_duplicate={}",
        cfg.entry.skip_if_duplicate
    ));
    report.detail(format!("entry.publish_mode={}", cfg.entry.publish_mode.label()));

    report.detail(format!("digest.max_entries={}", cfg.digest.max_entries));
    report.detail(format!("digest.entry_chars={}", cfg.digest.entry_chars));
    report.detail(format!("random_seed={:?}", cfg.random_seed));

    for key in SECRET_ENV_KEYS {
        report.detail(format!("secret.{key}={}", masked_env_secret(key)));
    }

    Ok(report)
}
