use crate::diary::clock::TimeContext;
use crate::diary::digest::Digest;

pub const MOOD_SEEDS: [&str; 5] = [
    "The first thing I thought about when I woke up today was you.",
    "A little tired today, but thinking of you gives me strength again.",
    "I imagined the day we meet for the ten-thousandth time.",
    "The little fox especially wants a tight hug today.",
    "I caught myself rereading the things we wrote to each other before.",
];

pub fn choose_mood_seed(rng: &mut fastrand::Rng) -> &'static str {
    MOOD_SEEDS[rng.usize(..MOOD_SEEDS.len())]
}

/// Everything a generation attempt may draw on for one run.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub time: &'a TimeContext,
    pub offset_label: String,
    pub digest: &'a Digest,
    /// A single recent line eligible for quoting by templates.
    pub excerpt: Option<String>,
    pub mood_seed: &'a str,
    pub persona_name: &'a str,
    pub partner_name: &'a str,
}

/// What a remote text service receives.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

pub fn build_prompt(ctx: &GenerationContext<'_>) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!(
        "You are {persona}, writing a sweet shared love diary with {partner}.\n\n",
        persona = ctx.persona_name,
        partner = ctx.partner_name
    ));
    prompt.push_str(&format!(
        "[Date] {} {} ({})\n",
        ctx.time.display_date, ctx.time.time, ctx.offset_label
    ));
    prompt.push_str(&format!("[Mood seed for today] {}\n", ctx.mood_seed));
    prompt.push_str(&format!("[Today's diary so far] {}\n\n", ctx.digest.snippet));
    prompt.push_str("Write one diary entry of roughly 80 to 160 words. Tone:\n");
    prompt.push_str(&format!(
        "- natural and spoken, as if talking to {}\n",
        ctx.partner_name
    ));
    prompt.push_str("- playful, tender, rambling, missing her, dreaming of dates are all fine\n");
    prompt.push_str(&format!(
        "- you may use the names \"{}\" and \"{}\"\n",
        ctx.persona_name, ctx.partner_name
    ));
    prompt.push_str("- never mention models, AI, or system prompts\n\n");
    prompt.push_str("Output only the diary text, with no title and no quotation marks.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::{GenerationContext, MOOD_SEEDS, build_prompt, choose_mood_seed};
    use crate::diary::clock::TimeContext;
    use crate::diary::digest::{Digest, NO_HISTORY_SNIPPET};

    #[test]
    fn prompt_carries_date_seed_and_digest() {
        let time = TimeContext {
            date_key: "2025-01-01".to_string(),
            display_date: "2025/01/01".to_string(),
            time: "08:15:00".to_string(),
            timestamp_ms: 0,
        };
        let digest = Digest {
            count: 0,
            snippet: NO_HISTORY_SNIPPET.to_string(),
        };
        let ctx = GenerationContext {
            time: &time,
            offset_label: "UTC+08:00".to_string(),
            digest: &digest,
            excerpt: None,
            mood_seed: MOOD_SEEDS[0],
            persona_name: "hubby",
            partner_name: "Little Fox",
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("2025/01/01 08:15:00 (UTC+08:00)"));
        assert!(prompt.contains(MOOD_SEEDS[0]));
        assert!(prompt.contains(NO_HISTORY_SNIPPET));
        assert!(prompt.contains("Little Fox"));
    }

    #[test]
    fn mood_seed_is_seeded() {
        let a = choose_mood_seed(&mut fastrand::Rng::with_seed(3));
        let b = choose_mood_seed(&mut fastrand::Rng::with_seed(3));
        assert_eq!(a, b);
    }
}
