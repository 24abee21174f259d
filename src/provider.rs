use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{self, Debug};

use crate::constants::{
    ANTHROPIC_API_KEY_ENV, ANTHROPIC_API_KEY_URL, CLAUDE_DEFAULT_MODEL, CLAUDE_MAX_TEMPERATURE,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GEMINI_API_KEY_ENV, GEMINI_API_KEY_URL,
    GEMINI_DEFAULT_MODEL, MAX_TEMPERATURE, OPENAI_API_KEY_ENV, OPENAI_API_KEY_URL,
    OPENAI_DEFAULT_MODEL, OPENAI_UPGRADE_ALIAS, OPENAI_UPGRADED_MODEL,
};
use crate::conversation::Transcript;
use crate::logging::{log_debug, log_error, log_info, log_trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl TokenUsage {
    pub fn format_short(&self) -> String {
        match (
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
        ) {
            (Some(p), Some(c), Some(t)) => format!("{}+{}={}", p, c, t),
            (Some(p), Some(c), None) => format!("{}+{}", p, c),
            (None, None, Some(t)) => format!("{}", t),
            _ => "N/A".to_string(),
        }
    }
}

/// Response from AI provider with content and usage information
#[derive(Debug, Clone)]
pub struct AiResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// The hosted services parley can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Claude,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::Claude];

    /// Subcommand name
    pub fn command_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn from_command_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.command_name() == name)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OPENAI_API_KEY_ENV,
            ProviderKind::Claude => ANTHROPIC_API_KEY_ENV,
            ProviderKind::Gemini => GEMINI_API_KEY_ENV,
        }
    }

    pub fn api_key_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OPENAI_API_KEY_URL,
            ProviderKind::Claude => ANTHROPIC_API_KEY_URL,
            ProviderKind::Gemini => GEMINI_API_KEY_URL,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OPENAI_DEFAULT_MODEL,
            ProviderKind::Claude => CLAUDE_DEFAULT_MODEL,
            ProviderKind::Gemini => GEMINI_DEFAULT_MODEL,
        }
    }

    /// Highest temperature the vendor accepts (the lower bound is always 0)
    pub fn max_temperature(&self) -> f64 {
        match self {
            ProviderKind::Claude => CLAUDE_MAX_TEMPERATURE,
            ProviderKind::OpenAi | ProviderKind::Gemini => MAX_TEMPERATURE,
        }
    }

    /// Map the `--model` flag to a concrete model identifier.
    /// OpenAI understands the shorthand `4` for its upgraded model.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|m| !m.is_empty()) {
            None => self.default_model().to_string(),
            Some(OPENAI_UPGRADE_ALIAS) if *self == ProviderKind::OpenAi => {
                OPENAI_UPGRADED_MODEL.to_string()
            }
            Some(model) => model.to_string(),
        }
    }

    /// Label shown at the input prompt. Claude model ids end in a release
    /// date (`claude-3-opus-20240229`) which is dropped from the label.
    pub fn prompt_label(&self, model: &str) -> String {
        match self {
            ProviderKind::Claude => match model.rsplit_once('-') {
                Some((head, tail))
                    if !head.is_empty()
                        && tail.len() == 8
                        && tail.chars().all(|c| c.is_ascii_digit()) =>
                {
                    head.to_string()
                }
                _ => model.to_string(),
            },
            _ => model.to_string(),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Model and sampling settings, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl InvocationOptions {
    pub fn resolve(
        kind: ProviderKind,
        model: Option<&str>,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            model: kind.resolve_model(model),
            temperature: temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system_prompt: system_prompt.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Generic AI provider trait for abstraction across different AI services
#[async_trait]
pub trait AiProvider: Debug + Send + Sync {
    /// Generate a reply conditioned on every turn of the transcript, in order.
    /// The last turn is the user prompt being answered.
    async fn generate(&mut self, transcript: &Transcript) -> Result<AiResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Get provider-specific information (e.g., "Gemini", "OpenAI", etc.)
    fn provider_name(&self) -> &'static str;
}

/// Record `prompt` as a user turn, ask the provider for a reply, and record the
/// reply as an assistant turn. On failure the user turn stays in place and no
/// assistant turn is added.
pub async fn exchange(
    provider: &mut dyn AiProvider,
    transcript: &mut Transcript,
    prompt: &str,
) -> Result<AiResponse> {
    transcript.push_user(prompt);

    log_info(&format!(
        "Sending {} turn(s) ({} chars) to {} using model: {}",
        transcript.len(),
        transcript.char_count(),
        provider.provider_name(),
        provider.model_name()
    ));

    let response = provider
        .generate(transcript)
        .await
        .with_context(|| format!("{} request failed", provider.provider_name()))?;

    log_debug(&format!(
        "Token usage: {}",
        response.usage.format_short()
    ));

    transcript.push_assistant(response.content.clone());
    Ok(response)
}

/// Configuration for creating AI providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub options: InvocationOptions,
    pub api_key: String,
}

/// Factory for creating AI providers
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_provider(config: ProviderConfig) -> Result<Box<dyn AiProvider>> {
        log_debug(&format!(
            "Creating {} provider with options: model={}, temperature={}, max_tokens={}",
            config.kind, config.options.model, config.options.temperature, config.options.max_tokens
        ));

        match config.kind {
            ProviderKind::OpenAi => Ok(Box::new(crate::openai::OpenAiClient::new(
                config.options,
                config.api_key,
            )?)),
            ProviderKind::Claude => Ok(Box::new(crate::claude::ClaudeClient::new(
                config.options,
                config.api_key,
            )?)),
            ProviderKind::Gemini => Ok(Box::new(crate::gemini::GeminiClient::new(
                config.options,
                config.api_key,
            )?)),
        }
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")
}

/// Send a JSON request and decode the JSON reply.
///
/// Non-success statuses become errors carrying the response body. 401 and 403
/// additionally print key guidance for `kind`.
pub(crate) async fn send_json<B, R>(
    kind: ProviderKind,
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R>
where
    B: Serialize + Debug + ?Sized,
    R: DeserializeOwned + Debug,
{
    log_trace(&format!("{kind} request body: {body:?}"));

    let response = request
        .json(body)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {kind} API"))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log_error(&format!("{kind} API error: {status} - {error_text}"));

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            crate::api_key::print_auth_error_help(kind);
            return Err(anyhow::anyhow!(
                "{kind} API rejected the key in {} with status {status}: {error_text}",
                kind.api_key_env()
            ));
        }

        return Err(anyhow::anyhow!(
            "{kind} API request failed with status {status}: {error_text}"
        ));
    }

    let parsed: R = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {kind} response"))?;

    log_trace(&format!("{kind} response: {parsed:?}"));
    Ok(parsed)
}

/// Reject empty or whitespace-only answers
pub(crate) fn ensure_content(kind: ProviderKind, content: String) -> Result<String> {
    if content.trim().is_empty() {
        log_error("Generated text is empty");
        return Err(anyhow::anyhow!(
            "No content was generated by {kind}. The response was empty or contained only whitespace."
        ));
    }

    log_info(&format!(
        "Received response from {kind} API, length: {}",
        content.len()
    ));
    Ok(content)
}
