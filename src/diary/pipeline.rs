use crate::diary::clock::TimeContext;
use crate::diary::config::{DiaryConfig, PublishMode};
use crate::diary::digest::{Digest, Summarizer};
use crate::diary::entry::Entry;
use crate::diary::generate::{Cascade, GenerationResult};
use crate::diary::history::HistoryReader;
use crate::diary::prompt::{GenerationContext, choose_mood_seed};
use crate::diary::publish::{PublishOutcome, PublishRequest, Publisher, same_author_entry};
use crate::diary::sanitize::sanitize;
use crate::diary::store::EntryStore;
use crate::logging;
use chrono::FixedOffset;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub skip_if_duplicate: bool,
    pub publish_mode: PublishMode,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(cfg: &DiaryConfig) -> Self {
        Self {
            skip_if_duplicate: cfg.entry.skip_if_duplicate,
            publish_mode: cfg.entry.publish_mode,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub time: TimeContext,
    pub digest: Digest,
    /// Sanitized entry text and its provenance. `None` when the run stopped
    /// at an existing entry from the same author.
    pub generated: Option<GenerationResult>,
    /// `None` on a dry run.
    pub publish: Option<PublishOutcome>,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        !self.publish.as_ref().is_some_and(PublishOutcome::is_failure)
    }
}

/// One pass: history, digest, generate, sanitize, publish. Never fails;
/// each stage degrades into the next. With `skip_if_duplicate` an entry by
/// the same author in the fetched day ends the run before generation.
pub fn run_once(
    cfg: &DiaryConfig,
    offset: FixedOffset,
    store: &dyn EntryStore,
    cascade: &Cascade,
    time: &TimeContext,
    rng: &mut fastrand::Rng,
    opts: &RunOptions,
) -> RunOutcome {
    let day = HistoryReader::new(store, cfg.store.query_mode).day(time);
    let count = day.entries.len().to_string();
    logging::info(
        "history",
        &[
            ("date", day.date_key.as_str()),
            ("display", day.display_date.as_str()),
            ("entries", count.as_str()),
        ],
    );

    let summarizer = Summarizer::new(cfg.digest.max_entries, cfg.digest.entry_chars);
    let digest = summarizer.summarize(&day.entries);

    // Same author already wrote today: stop before any model call.
    if opts.skip_if_duplicate
        && !opts.dry_run
        && let Some(existing_id) = same_author_entry(&day.entries, &cfg.entry.author)
    {
        logging::info(
            "publish",
            &[("outcome", "skipped_duplicate"), ("existing", existing_id.as_str())],
        );
        return RunOutcome {
            time: time.clone(),
            digest,
            generated: None,
            publish: Some(PublishOutcome::SkippedDuplicate { existing_id }),
        };
    }

    let mood_seed = choose_mood_seed(rng);
    let excerpt = summarizer.excerpt(&day.entries, rng);

    let ctx = GenerationContext {
        time,
        offset_label: TimeContext::offset_label(offset),
        digest: &digest,
        excerpt,
        mood_seed,
        persona_name: &cfg.entry.persona_name,
        partner_name: &cfg.entry.partner_name,
    };
    let generated = cascade.generate(&ctx, rng);
    logging::info(
        "generate",
        &[
            ("tier", generated.tier.label()),
            ("source", generated.source_id.as_deref().unwrap_or("none")),
        ],
    );

    let content = sanitize(&generated.text, cfg.entry.max_len);
    let mut entry = Entry::new(time, &cfg.entry.author, content.clone());
    entry.tier = Some(generated.tier);
    entry.source_id = generated.source_id.clone();

    let publish = if opts.dry_run {
        logging::info("publish", &[("skipped", "dry-run")]);
        None
    } else {
        let outcome = Publisher::new(store, cfg.store.query_mode).publish(&PublishRequest {
            entry,
            skip_if_duplicate: opts.skip_if_duplicate,
            mode: opts.publish_mode,
        });
        logging::info(
            "publish",
            &[("outcome", outcome.label()), ("mode", opts.publish_mode.label())],
        );
        Some(outcome)
    };

    RunOutcome {
        time: time.clone(),
        digest,
        generated: Some(GenerationResult {
            text: content,
            ..generated
        }),
        publish,
    }
}
