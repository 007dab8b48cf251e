use crate::commands::CommandReport;
use crate::diary::audit::{self, AuditEvent};
use crate::diary::clock::TimeContext;
use crate::diary::config::{PublishMode, load_config};
use crate::diary::generate::Cascade;
use crate::diary::paths::resolve_paths;
use crate::diary::pipeline::{RunOptions, RunOutcome, run_once};
use crate::diary::publish::PublishOutcome;
use crate::diary::store::FirebaseStore;
use crate::diary::warn;
use crate::error::DiaryErrorCode;
use crate::logging;
use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub struct DiaryRunOptions {
    pub skip_if_duplicate: bool,
    pub publish_mode: Option<PublishMode>,
    pub dry_run: bool,
    pub seed: Option<u64>,
}

pub fn run(opts: &DiaryRunOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let store_url = cfg.require_store_url()?;
    let offset = cfg.utc_offset()?;

    let store = FirebaseStore::new(
        store_url,
        &cfg.store.collection,
        cfg.credentials.db_auth.clone(),
        cfg.store.timeout_secs,
    )?;
    let cascade = Cascade::from_config(&cfg)?;

    let mut rng = match opts.seed.or(cfg.random_seed) {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let run_opts = RunOptions {
        skip_if_duplicate: opts.skip_if_duplicate || cfg.entry.skip_if_duplicate,
        publish_mode: opts.publish_mode.unwrap_or(cfg.entry.publish_mode),
        dry_run: opts.dry_run,
    };

    let time = TimeContext::now(offset);
    let attempts = cascade.labels().join(",");
    logging::info(
        "run",
        &[
            ("date", time.date_key.as_str()),
            ("time", time.time.as_str()),
            ("attempts", attempts.as_str()),
        ],
    );
    let outcome = run_once(&cfg, offset, &store, &cascade, &time, &mut rng, &run_opts);
    let publish = outcome.publish.as_ref().map_or("dry_run", PublishOutcome::label);
    logging::info(
        "done",
        &[
            ("publish", publish),
            ("ok", if outcome.ok() { "true" } else { "false" }),
        ],
    );

    let mut report = CommandReport::new("run");
    describe(&mut report, &outcome);

    if let Err(err) = audit::append_event(&paths, &AuditEvent::from_run("run", &outcome)) {
        warn::emit(warn::WarnEvent {
            code: DiaryErrorCode::E006AuditWriteFailed,
            stage: "audit",
            action: "append",
            date: &outcome.time.date_key,
            source: &paths.audit_log().display().to_string(),
            retry: "none",
            reason: "io",
            err: &format!("{err:#}"),
        });
        report.detail("audit=unavailable");
    } else {
        report.detail(format!("audit={}", paths.audit_log().display()));
    }

    Ok(report)
}

fn describe(report: &mut CommandReport, outcome: &RunOutcome) {
    report.detail(format!("date_key={}", outcome.time.date_key));
    report.detail(format!("time={}", outcome.time.time));
    report.detail(format!("history.entries={}", outcome.digest.count));
    match &outcome.generated {
        Some(generated) => {
            report.detail(format!("tier={}", generated.tier.label()));
            if let Some(source_id) = &generated.source_id {
                report.detail(format!("source_id={source_id}"));
            }
            report.detail(format!("content_chars={}", generated.text.chars().count()));
            report.detail(format!("content={}", generated.text));
        }
        None => report.detail("tier=none"),
    }

    match &outcome.publish {
        None => report.detail("publish=dry_run"),
        Some(PublishOutcome::Written { id }) => report.detail(format!("publish=written id={id}")),
        Some(PublishOutcome::SkippedDuplicate { existing_id }) => {
            report.detail(format!("publish=skipped_duplicate existing_id={existing_id}"))
        }
        Some(PublishOutcome::Failed { reason }) => {
            report.issue(format!("publish failed: {reason}"))
        }
    }
}
