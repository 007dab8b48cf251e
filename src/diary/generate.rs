use crate::diary::config::{DiaryConfig, GenerationProvider};
use crate::diary::entry::Tier;
use crate::diary::prompt::{GenerationContext, GenerationRequest, build_prompt};
use crate::diary::providers::{TextGenerator, build_generator, resolve_candidates};
use crate::diary::warn;
use crate::error::{DiaryError, DiaryErrorCode};
use crate::logging;
use anyhow::Result;

/// Returned when every attempt in the cascade came back empty-handed.
pub const STATIC_FALLBACK_TEXT: &str = "(A small hiccup while writing today's diary, but I still gave you a big hug in my heart.)";

const EMPTY_DAY_TEMPLATES: [&str; 4] = [
    "{date}, first page of the day. {seed} Nobody has written anything yet, so I get to be the first to say I miss you, {partner}.",
    "Opening today's diary at {time}. {seed} The page is still blank, so here is my whole heart to start it off.",
    "{seed} Today's diary is empty so far, {partner}, which just means there is more room for how much I think about you.",
    "Checking in at {time}. {seed} No entries yet today, so I'm saving the first spot for you, {partner}.",
];

const HISTORY_TEMPLATES: [&str; 4] = [
    "{count} little notes in our diary today already. {seed} Every one of them makes me miss you more, {partner}.",
    "Back again at {time}. {seed} Reading what we wrote earlier today made me smile all over again.",
    "{seed} Today's page is filling up, {partner}, and I still have more to say: I love you.",
    "Another line for {date}. {seed} Our diary keeps growing, and so does how much I want to hold you.",
];

const QUOTE_TEMPLATES: [&str; 3] = [
    "I keep rereading this from earlier: \"{excerpt}\". {seed} You make ordinary days feel warm, {partner}.",
    "\"{excerpt}\" - that line from today is stuck in my head. {seed}",
    "Earlier today: \"{excerpt}\". {seed} Writing back so you know I read every word, {partner}.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    pub tier: Tier,
    pub source_id: Option<String>,
}

/// One rung of the fallback ladder.
pub trait Attempt {
    fn tier(&self) -> Tier;
    fn source_id(&self) -> String;
    fn attempt(
        &self,
        ctx: &GenerationContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Result<String, DiaryError>;
}

pub struct RemoteAttempt {
    source_id: String,
    generator: Box<dyn TextGenerator>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

impl RemoteAttempt {
    pub fn new(
        source_id: impl Into<String>,
        generator: Box<dyn TextGenerator>,
        temperature: Option<f64>,
        max_output_tokens: Option<u32>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            generator,
            temperature,
            max_output_tokens,
        }
    }
}

impl Attempt for RemoteAttempt {
    fn tier(&self) -> Tier {
        Tier::Remote
    }

    fn source_id(&self) -> String {
        self.source_id.clone()
    }

    fn attempt(
        &self,
        ctx: &GenerationContext<'_>,
        _rng: &mut fastrand::Rng,
    ) -> Result<String, DiaryError> {
        let request = GenerationRequest {
            prompt: build_prompt(ctx),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };
        self.generator.generate(&request)
    }
}

pub struct TemplateAttempt {
    pub empty_day: Vec<String>,
    pub with_history: Vec<String>,
    pub quoting: Vec<String>,
    pub quote_probability: f64,
}

impl TemplateAttempt {
    pub fn standard(quote_probability: f64) -> Self {
        Self {
            empty_day: EMPTY_DAY_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            with_history: HISTORY_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            quoting: QUOTE_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            quote_probability,
        }
    }

    fn pick<'t>(
        &'t self,
        ctx: &GenerationContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Option<&'t [String]> {
        if !ctx.digest.has_history() {
            return non_empty(&self.empty_day);
        }
        // Always draw so the rest of the sequence does not depend on whether
        // an excerpt happened to be available.
        let wants_quote = rng.f64() < self.quote_probability;
        if wants_quote
            && ctx.excerpt.is_some()
            && let Some(set) = non_empty(&self.quoting)
        {
            return Some(set);
        }
        non_empty(&self.with_history)
    }
}

fn non_empty(set: &[String]) -> Option<&[String]> {
    if set.is_empty() { None } else { Some(set) }
}

fn render_template(template: &str, ctx: &GenerationContext<'_>) -> String {
    template
        .replace("{date}", &ctx.time.display_date)
        .replace("{time}", &ctx.time.time)
        .replace("{seed}", ctx.mood_seed)
        .replace("{partner}", ctx.partner_name)
        .replace("{persona}", ctx.persona_name)
        .replace("{count}", &ctx.digest.count.to_string())
        .replace("{excerpt}", ctx.excerpt.as_deref().unwrap_or_default())
}

impl Attempt for TemplateAttempt {
    fn tier(&self) -> Tier {
        Tier::Template
    }

    fn source_id(&self) -> String {
        "template".to_string()
    }

    fn attempt(
        &self,
        ctx: &GenerationContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Result<String, DiaryError> {
        let set = self
            .pick(ctx, rng)
            .ok_or_else(|| DiaryError::GenerationAttempt {
                source_id: self.source_id(),
                reason: "template set is empty".to_string(),
            })?;
        let template = &set[rng.usize(..set.len())];
        Ok(render_template(template, ctx))
    }
}

/// Ordered list of attempts; the first non-empty text wins.
pub struct Cascade {
    attempts: Vec<Box<dyn Attempt>>,
}

impl Cascade {
    pub fn new(attempts: Vec<Box<dyn Attempt>>) -> Self {
        Self { attempts }
    }

    /// Remote candidates in configured order, then templates.
    pub fn from_config(cfg: &DiaryConfig) -> Result<Self> {
        let mut attempts: Vec<Box<dyn Attempt>> = Vec::new();

        if cfg.generation.provider == GenerationProvider::Local {
            logging::info("generate", &[("remote", "disabled"), ("reason", "provider=local")]);
        } else {
            let (candidates, skipped) =
                resolve_candidates(&cfg.generation.models, &cfg.credentials);
            for skip in &skipped {
                logging::info(
                    "generate",
                    &[("candidate", skip.spec.as_str()), ("skipped", skip.reason.as_str())],
                );
            }
            for candidate in &candidates {
                let generator = build_generator(candidate, cfg.generation.timeout_secs)?;
                attempts.push(Box::new(RemoteAttempt::new(
                    candidate.label(),
                    generator,
                    cfg.generation.temperature,
                    cfg.generation.max_output_tokens,
                )));
            }
            if candidates.is_empty() {
                logging::info("generate", &[("remote", "skipped"), ("reason", "no-candidates")]);
            }
        }

        attempts.push(Box::new(TemplateAttempt::standard(
            cfg.generation.quote_probability,
        )));
        Ok(Self::new(attempts))
    }

    pub fn labels(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.source_id()).collect()
    }

    pub fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> GenerationResult {
        for attempt in &self.attempts {
            let source_id = attempt.source_id();
            let outcome = attempt.attempt(ctx, rng).and_then(|text| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Err(DiaryError::GenerationAttempt {
                        source_id: source_id.clone(),
                        reason: "empty text".to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            });

            match outcome {
                Ok(text) => {
                    let tier = attempt.tier();
                    return GenerationResult {
                        text,
                        tier,
                        source_id: (tier == Tier::Remote).then_some(source_id),
                    };
                }
                Err(err) => warn::emit(warn::WarnEvent {
                    code: DiaryErrorCode::E004GenerationAttemptFailed,
                    stage: "generate",
                    action: attempt.tier().label(),
                    date: &ctx.time.date_key,
                    source: &source_id,
                    retry: "next-attempt",
                    reason: err.code().as_str(),
                    err: &err.to_string(),
                }),
            }
        }

        GenerationResult {
            text: STATIC_FALLBACK_TEXT.to_string(),
            tier: Tier::StaticFallback,
            source_id: None,
        }
    }
}
