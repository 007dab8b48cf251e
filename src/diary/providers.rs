use crate::diary::config::Credentials;
use crate::diary::prompt::GenerationRequest;
use crate::error::DiaryError;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 600;

/// One remote text service, reduced to prompt in, text out.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, DiaryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteProvider {
    OpenAi,
    Anthropic,
    Gemini,
    OpenAiCompatible,
}

impl RemoteProvider {
    pub fn label(self) -> &'static str {
        match self {
            RemoteProvider::OpenAi => "openai",
            RemoteProvider::Anthropic => "anthropic",
            RemoteProvider::Gemini => "gemini",
            RemoteProvider::OpenAiCompatible => "openai-compatible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub provider: RemoteProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl ModelCandidate {
    pub fn label(&self) -> String {
        format!("{}:{}", self.provider.label(), self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub spec: String,
    pub reason: String,
}

fn parse_provider_alias(raw: &str) -> Option<RemoteProvider> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "openai" => Some(RemoteProvider::OpenAi),
        "anthropic" | "claude" => Some(RemoteProvider::Anthropic),
        "gemini" | "google" => Some(RemoteProvider::Gemini),
        "openai-compatible" | "compatible" | "deepseek" => Some(RemoteProvider::OpenAiCompatible),
        _ => None,
    }
}

fn parse_prefixed_model(raw: &str) -> (Option<RemoteProvider>, String) {
    let trimmed = raw.trim();
    if let Some((prefix, model)) = trimmed.split_once(':')
        && let Some(provider) = parse_provider_alias(prefix)
    {
        return (Some(provider), model.trim().to_string());
    }
    (None, trimmed.to_string())
}

fn infer_provider_from_model(model: &str) -> Option<RemoteProvider> {
    let lower = model.trim().to_ascii_lowercase();
    if lower.starts_with("deepseek-") {
        return Some(RemoteProvider::OpenAiCompatible);
    }
    if lower.starts_with("claude-") {
        return Some(RemoteProvider::Anthropic);
    }
    if lower.starts_with("gemini-") {
        return Some(RemoteProvider::Gemini);
    }
    if lower.starts_with("gpt-")
        || lower.starts_with("o1")
        || lower.starts_with("o3")
        || lower.starts_with("o4")
    {
        return Some(RemoteProvider::OpenAi);
    }
    None
}

fn api_key_for(provider: RemoteProvider, creds: &Credentials) -> Option<String> {
    match provider {
        RemoteProvider::OpenAi => creds.openai_api_key.clone().or_else(|| creds.ai_api_key.clone()),
        RemoteProvider::Anthropic => creds
            .anthropic_api_key
            .clone()
            .or_else(|| creds.ai_api_key.clone()),
        RemoteProvider::Gemini => creds.gemini_api_key.clone().or_else(|| creds.ai_api_key.clone()),
        RemoteProvider::OpenAiCompatible => creds
            .ai_api_key
            .clone()
            .or_else(|| creds.deepseek_api_key.clone())
            .or_else(|| creds.openai_api_key.clone()),
    }
}

fn compatible_base_url(model: &str, creds: &Credentials) -> String {
    if let Some(base) = &creds.ai_base_url {
        return base.clone();
    }
    if model.trim().to_ascii_lowercase().starts_with("deepseek-") {
        return DEEPSEEK_BASE_URL.to_string();
    }
    OPENAI_BASE_URL.to_string()
}

/// Turn the configured model list into callable candidates, preserving order.
/// Entries without a known provider or without a credential are skipped.
pub fn resolve_candidates(
    models: &[String],
    creds: &Credentials,
) -> (Vec<ModelCandidate>, Vec<SkippedCandidate>) {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for spec in models {
        let (prefixed, model) = parse_prefixed_model(spec);
        if model.is_empty() {
            skipped.push(SkippedCandidate {
                spec: spec.clone(),
                reason: "empty-model-name".to_string(),
            });
            continue;
        }
        let Some(provider) = prefixed.or_else(|| infer_provider_from_model(&model)) else {
            skipped.push(SkippedCandidate {
                spec: spec.clone(),
                reason: "unknown-provider".to_string(),
            });
            continue;
        };
        let Some(api_key) = api_key_for(provider, creds) else {
            skipped.push(SkippedCandidate {
                spec: spec.clone(),
                reason: format!("no-credential-for-{}", provider.label()),
            });
            continue;
        };
        let base_url = match provider {
            RemoteProvider::OpenAiCompatible => Some(compatible_base_url(&model, creds)),
            _ => None,
        };
        candidates.push(ModelCandidate {
            provider,
            model,
            api_key,
            base_url,
        });
    }

    (candidates, skipped)
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build generation HTTP client")
}

pub fn build_generator(
    candidate: &ModelCandidate,
    timeout_secs: u64,
) -> Result<Box<dyn TextGenerator>> {
    let client = build_client(timeout_secs)?;
    let source_id = candidate.label();
    let generator: Box<dyn TextGenerator> = match candidate.provider {
        RemoteProvider::Gemini => Box::new(GeminiGenerator {
            client,
            source_id,
            api_key: candidate.api_key.clone(),
            model: candidate.model.clone(),
        }),
        RemoteProvider::OpenAi => Box::new(OpenAiGenerator {
            client,
            source_id,
            api_key: candidate.api_key.clone(),
            model: candidate.model.clone(),
        }),
        RemoteProvider::Anthropic => Box::new(AnthropicGenerator {
            client,
            source_id,
            api_key: candidate.api_key.clone(),
            model: candidate.model.clone(),
        }),
        RemoteProvider::OpenAiCompatible => Box::new(OpenAiCompatGenerator {
            client,
            source_id,
            api_key: candidate.api_key.clone(),
            model: candidate.model.clone(),
            base_url: candidate
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        }),
    };
    Ok(generator)
}

fn send_typed<T: DeserializeOwned>(
    source_id: &str,
    request: RequestBuilder,
) -> Result<T, DiaryError> {
    let attempt_error = |reason: String| DiaryError::GenerationAttempt {
        source_id: source_id.to_string(),
        reason,
    };
    // Query strings may carry credentials; keep URLs out of error text.
    let response = request.send().map_err(|err| {
        let timed_out = err.is_timeout();
        let err = err.without_url();
        if timed_out {
            attempt_error(format!("timed out: {err}"))
        } else {
            attempt_error(format!("request failed: {err}"))
        }
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(attempt_error(format!("status {status}")));
    }
    response.json::<T>().map_err(|err| {
        DiaryError::Parse(format!("{source_id} response: {}", err.without_url()))
    })
}

fn missing_text(source_id: &str) -> DiaryError {
    DiaryError::Parse(format!("{source_id} response missing text content"))
}

fn join_chunks(chunks: Vec<String>) -> Option<String> {
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

fn extract_gemini_text(resp: &GeminiResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    join_chunks(content.parts.iter().filter_map(|p| p.text.clone()).collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OpenAiOutputItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiOutputItem {
    #[serde(default)]
    content: Vec<TextPart>,
}

fn extract_openai_text(resp: &OpenAiResponse) -> Option<String> {
    if let Some(text) = &resp.output_text {
        return Some(text.clone());
    }
    join_chunks(
        resp.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|p| p.text.clone())
            .collect(),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    content: Vec<TextPart>,
}

fn extract_anthropic_text(resp: &AnthropicResponse) -> Option<String> {
    join_chunks(resp.content.iter().filter_map(|p| p.text.clone()).collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<TextPart>),
}

fn extract_chat_completion_text(resp: &ChatCompletionResponse) -> Option<String> {
    let content = resp.choices.first()?.message.as_ref()?.content.as_ref()?;
    match content {
        ChatContent::Text(text) => Some(text.clone()),
        ChatContent::Parts(parts) => {
            join_chunks(parts.iter().filter_map(|p| p.text.clone()).collect())
        }
    }
}

pub struct GeminiGenerator {
    client: Client,
    source_id: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    fn build_request(&self, request: &GenerationRequest) -> RequestBuilder {
        let url = format!("{GEMINI_BASE_URL}/{}:generateContent", self.model);
        let mut payload = serde_json::json!({
            "contents": [
                {
                    "parts": [
                        {"text": request.prompt}
                    ]
                }
            ]
        });
        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), temperature.into());
        }
        if let Some(max_tokens) = request.max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), max_tokens.into());
        }
        if !generation_config.is_empty() {
            payload["generationConfig"] = serde_json::Value::Object(generation_config);
        }

        self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, DiaryError> {
        let resp: GeminiResponse = send_typed(&self.source_id, self.build_request(request))?;
        extract_gemini_text(&resp).ok_or_else(|| missing_text(&self.source_id))
    }
}

pub struct OpenAiGenerator {
    client: Client,
    source_id: String,
    api_key: String,
    model: String,
}

impl TextGenerator for OpenAiGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, DiaryError> {
        let mut payload = serde_json::json!({
            "model": self.model,
            "input": request.prompt,
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = temperature.into();
        }
        if let Some(max_tokens) = request.max_output_tokens {
            payload["max_output_tokens"] = max_tokens.into();
        }

        let resp: OpenAiResponse = send_typed(
            &self.source_id,
            self.client
                .post(OPENAI_RESPONSES_URL)
                .bearer_auth(&self.api_key)
                .json(&payload),
        )?;
        extract_openai_text(&resp).ok_or_else(|| missing_text(&self.source_id))
    }
}

pub struct AnthropicGenerator {
    client: Client,
    source_id: String,
    api_key: String,
    model: String,
}

impl TextGenerator for AnthropicGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, DiaryError> {
        let mut payload = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_output_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = temperature.into();
        }

        let resp: AnthropicResponse = send_typed(
            &self.source_id,
            self.client
                .post(ANTHROPIC_MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&payload),
        )?;
        extract_anthropic_text(&resp).ok_or_else(|| missing_text(&self.source_id))
    }
}

pub struct OpenAiCompatGenerator {
    client: Client,
    source_id: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl TextGenerator for OpenAiCompatGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, DiaryError> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{base}/v1/chat/completions");
        let mut payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": request.prompt}
            ],
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = temperature.into();
        }
        if let Some(max_tokens) = request.max_output_tokens {
            payload["max_tokens"] = max_tokens.into();
        }

        let resp: ChatCompletionResponse = send_typed(
            &self.source_id,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&payload),
        )?;
        extract_chat_completion_text(&resp).ok_or_else(|| missing_text(&self.source_id))
    }
}
