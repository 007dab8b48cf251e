use crate::diary::paths::DiaryPaths;
use crate::error::DiaryError;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_MODELS: [&str; 3] =
    ["gemini-2.5-pro", "gemini-1.5-pro", "gemini-1.5-flash-latest"];

pub const SECRET_ENV_KEYS: [&str; 7] = [
    "DIARY_DB_AUTH",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "AI_API_KEY",
    "DEEPSEEK_API_KEY",
    "AI_BASE_URL",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    #[default]
    Append,
    OverwriteDay,
}

impl PublishMode {
    pub fn label(self) -> &'static str {
        match self {
            PublishMode::Append => "append",
            PublishMode::OverwriteDay => "overwrite-day",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "append" | "push" => Some(PublishMode::Append),
            "overwrite-day" | "overwrite" | "keyed" => Some(PublishMode::OverwriteDay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub collection: String,
    pub query_mode: QueryMode,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            collection: "diary".to_string(),
            query_mode: QueryMode::Client,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    pub models: Vec<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub quote_probability: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Remote,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 60,
            temperature: None,
            max_output_tokens: None,
            quote_probability: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub author: String,
    pub persona_name: String,
    pub partner_name: String,
    pub max_len: usize,
    pub utc_offset_hours: i32,
    pub skip_if_duplicate: bool,
    pub publish_mode: PublishMode,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            author: "hubby".to_string(),
            persona_name: "hubby".to_string(),
            partner_name: "Little Fox".to_string(),
            max_len: 600,
            utc_offset_hours: 8,
            skip_if_duplicate: false,
            publish_mode: PublishMode::Append,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub max_entries: usize,
    pub entry_chars: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_entries: 3,
            entry_chars: 60,
        }
    }
}

/// Secrets resolved from the environment once at startup. Never read from
/// `diary.toml` and never serialized.
#[derive(Clone, Default)]
pub struct Credentials {
    pub db_auth: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ai_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub ai_base_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("db_auth", &masked_secret(self.db_auth.as_deref()))
            .field("gemini_api_key", &masked_secret(self.gemini_api_key.as_deref()))
            .field("openai_api_key", &masked_secret(self.openai_api_key.as_deref()))
            .field(
                "anthropic_api_key",
                &masked_secret(self.anthropic_api_key.as_deref()),
            )
            .field("ai_api_key", &masked_secret(self.ai_api_key.as_deref()))
            .field(
                "deepseek_api_key",
                &masked_secret(self.deepseek_api_key.as_deref()),
            )
            .field("ai_base_url", &self.ai_base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiaryConfig {
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub entry: EntryConfig,
    pub digest: DigestConfig,
    pub random_seed: Option<u64>,
    #[serde(skip)]
    pub credentials: Credentials,
}

impl DiaryConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, DiaryError> {
        FixedOffset::east_opt(self.entry.utc_offset_hours * 3600).ok_or_else(|| {
            DiaryError::Configuration(format!(
                "utc_offset_hours out of range: {}",
                self.entry.utc_offset_hours
            ))
        })
    }

    /// The store endpoint is the only required setting; everything else has a
    /// default.
    pub fn require_store_url(&self) -> Result<&str, DiaryError> {
        match self.store.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(DiaryError::Configuration(
                "store url missing; set DIARY_DB_URL (or DB_URL) or [store].url in diary.toml"
                    .to_string(),
            )),
        }
    }
}

pub fn masked_secret(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if v.chars().count() > 8 => {
            let head: String = v.chars().take(4).collect();
            format!("{head}****")
        }
        Some(v) if !v.is_empty() => "****".to_string(),
        _ => "unset".to_string(),
    }
}

pub fn masked_env_secret(key: &str) -> String {
    masked_secret(env::var(key).ok().as_deref())
}

fn env_non_empty(lookup: &dyn Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_u64(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: u64) -> u64 {
    env_non_empty(lookup, var)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn env_or_usize(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: usize) -> usize {
    env_non_empty(lookup, var)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(fallback)
}

fn env_or_i32(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: i32) -> i32 {
    env_non_empty(lookup, var)
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(fallback)
}

fn env_or_f64(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: f64) -> f64 {
    env_non_empty(lookup, var)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(fallback)
}

fn env_or_bool(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: bool) -> bool {
    match env_non_empty(lookup, var).as_deref() {
        Some("1" | "true" | "TRUE" | "yes" | "on") => true,
        Some("0" | "false" | "FALSE" | "no" | "off") => false,
        _ => fallback,
    }
}

fn env_or_string(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    env_non_empty(lookup, var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_csv(
    lookup: &dyn Fn(&str) -> Option<String>,
    var: &str,
    fallback: &[String],
) -> Vec<String> {
    let Some(raw) = env_non_empty(lookup, var) else {
        return fallback.to_vec();
    };
    let out = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();
    if out.is_empty() { fallback.to_vec() } else { out }
}

pub fn resolve_credentials(lookup: &dyn Fn(&str) -> Option<String>) -> Credentials {
    Credentials {
        db_auth: env_non_empty(lookup, "DIARY_DB_AUTH"),
        gemini_api_key: env_non_empty(lookup, "GEMINI_API_KEY"),
        openai_api_key: env_non_empty(lookup, "OPENAI_API_KEY"),
        anthropic_api_key: env_non_empty(lookup, "ANTHROPIC_API_KEY"),
        ai_api_key: env_non_empty(lookup, "AI_API_KEY"),
        deepseek_api_key: env_non_empty(lookup, "DEEPSEEK_API_KEY"),
        ai_base_url: env_non_empty(lookup, "AI_BASE_URL"),
    }
}

pub fn apply_env_overrides(cfg: &mut DiaryConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    if let Some(url) =
        env_non_empty(lookup, "DIARY_DB_URL").or_else(|| env_non_empty(lookup, "DB_URL"))
    {
        cfg.store.url = Some(url);
    }
    cfg.store.collection = env_or_string(lookup, "DIARY_COLLECTION", &cfg.store.collection);
    match env_non_empty(lookup, "DIARY_QUERY_MODE").as_deref() {
        Some(v) if v.eq_ignore_ascii_case("server") => cfg.store.query_mode = QueryMode::Server,
        Some(v) if v.eq_ignore_ascii_case("client") => cfg.store.query_mode = QueryMode::Client,
        _ => {}
    }
    cfg.store.timeout_secs = env_or_u64(lookup, "DIARY_STORE_TIMEOUT_SECS", cfg.store.timeout_secs);

    match env_non_empty(lookup, "DIARY_GENERATION_PROVIDER").as_deref() {
        Some(v) if v.eq_ignore_ascii_case("local") => {
            cfg.generation.provider = GenerationProvider::Local
        }
        Some(v) if v.eq_ignore_ascii_case("remote") => {
            cfg.generation.provider = GenerationProvider::Remote
        }
        _ => {}
    }
    cfg.generation.models = env_or_csv(lookup, "DIARY_MODELS", &cfg.generation.models);
    cfg.generation.timeout_secs = env_or_u64(
        lookup,
        "DIARY_GENERATION_TIMEOUT_SECS",
        cfg.generation.timeout_secs,
    );
    if let Some(temperature) =
        env_non_empty(lookup, "DIARY_TEMPERATURE").and_then(|v| v.parse::<f64>().ok())
    {
        cfg.generation.temperature = Some(temperature);
    }
    if let Some(max_tokens) =
        env_non_empty(lookup, "DIARY_MAX_OUTPUT_TOKENS").and_then(|v| v.parse::<u32>().ok())
    {
        cfg.generation.max_output_tokens = Some(max_tokens);
    }
    cfg.generation.quote_probability = env_or_f64(
        lookup,
        "DIARY_QUOTE_PROBABILITY",
        cfg.generation.quote_probability,
    );

    cfg.entry.author = env_or_string(lookup, "DIARY_AUTHOR", &cfg.entry.author);
    cfg.entry.persona_name = env_or_string(lookup, "DIARY_PERSONA_NAME", &cfg.entry.persona_name);
    cfg.entry.partner_name = env_or_string(lookup, "DIARY_PARTNER_NAME", &cfg.entry.partner_name);
    cfg.entry.max_len = env_or_usize(lookup, "DIARY_MAX_LEN", cfg.entry.max_len);
    cfg.entry.utc_offset_hours =
        env_or_i32(lookup, "DIARY_UTC_OFFSET_HOURS", cfg.entry.utc_offset_hours);
    cfg.entry.skip_if_duplicate =
        env_or_bool(lookup, "DIARY_SKIP_IF_DUPLICATE", cfg.entry.skip_if_duplicate);
    if let Some(mode) = env_non_empty(lookup, "DIARY_PUBLISH_MODE")
        .as_deref()
        .and_then(PublishMode::parse)
    {
        cfg.entry.publish_mode = mode;
    }

    cfg.digest.max_entries =
        env_or_usize(lookup, "DIARY_DIGEST_MAX_ENTRIES", cfg.digest.max_entries);
    cfg.digest.entry_chars =
        env_or_usize(lookup, "DIARY_DIGEST_ENTRY_CHARS", cfg.digest.entry_chars);

    if let Some(seed) =
        env_non_empty(lookup, "DIARY_RANDOM_SEED").and_then(|v| v.parse::<u64>().ok())
    {
        cfg.random_seed = Some(seed);
    }
}

pub fn validate(cfg: &DiaryConfig) -> Result<(), DiaryError> {
    let invalid = |msg: &str| -> Result<(), DiaryError> {
        Err(DiaryError::Configuration(msg.to_string()))
    };

    if let Some(url) = cfg.store.url.as_deref() {
        let trimmed = url.trim();
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return invalid("store url must start with http:// or https://");
        }
    }
    if cfg.store.collection.trim().is_empty() || cfg.store.collection.contains('/') {
        return invalid("store collection must be a single non-empty path segment");
    }
    if cfg.store.timeout_secs == 0 {
        return invalid("store timeout must be >= 1 second");
    }
    if cfg.generation.timeout_secs == 0 {
        return invalid("generation timeout must be >= 1 second");
    }
    if !(0.0..=1.0).contains(&cfg.generation.quote_probability) {
        return invalid("quote probability must be within 0.0..=1.0");
    }
    if let Some(temperature) = cfg.generation.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        return invalid("temperature must be within 0.0..=2.0");
    }
    if cfg.entry.author.trim().is_empty() {
        return invalid("entry author cannot be empty");
    }
    if cfg.entry.max_len < 16 {
        return invalid("entry max_len must be >= 16 characters");
    }
    if !(-12..=14).contains(&cfg.entry.utc_offset_hours) {
        return invalid("utc offset hours must be within -12..=14");
    }
    if cfg.digest.max_entries == 0 {
        return invalid("digest max_entries must be >= 1");
    }
    if cfg.digest.entry_chars < 8 {
        return invalid("digest entry_chars must be >= 8");
    }
    Ok(())
}

fn merge_file_config(path: &Path) -> Result<DiaryConfig> {
    if !path.exists() {
        return Ok(DiaryConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read diary config {}", path.display()))?;
    let parsed: DiaryConfig = toml::from_str(&raw).map_err(|err| {
        DiaryError::Configuration(format!(
            "failed to parse diary config {}: {err}",
            path.display()
        ))
    })?;
    Ok(parsed)
}

/// defaults -> diary.toml -> environment, then validation.
pub fn load_config_with(
    config_file: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<DiaryConfig> {
    let mut cfg = merge_file_config(config_file)?;
    apply_env_overrides(&mut cfg, lookup);
    cfg.credentials = resolve_credentials(lookup);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_config(paths: &DiaryPaths) -> Result<DiaryConfig> {
    load_config_with(&paths.config_file, &|key: &str| env::var(key).ok())
}
