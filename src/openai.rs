use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{OPENAI_BASE_URL, OPENAI_BASE_URL_ENV, OPENAI_TOP_P, get_base_url};
use crate::conversation::Transcript;
use crate::logging::{log_debug, log_info};
use crate::provider::{
    AiProvider, AiResponse, InvocationOptions, ProviderKind, TokenUsage, build_http_client,
    ensure_content, send_json,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    temperature: f64,
    top_p: f64,
    messages: Vec<OpenAiMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    options: InvocationOptions,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(options: InvocationOptions, api_key: String) -> Result<Self> {
        let base_url = get_base_url(OPENAI_BASE_URL_ENV, OPENAI_BASE_URL);
        Self::with_base_url(options, api_key, base_url)
    }

    pub fn with_base_url(
        options: InvocationOptions,
        api_key: String,
        base_url: String,
    ) -> Result<Self> {
        log_info(&format!(
            "Initializing OpenAI client with model: {} at {}",
            options.model, base_url
        ));

        Ok(Self {
            base_url,
            api_key,
            options,
            client: build_http_client()?,
        })
    }

    /// Flat role/content pairs, with the system prompt (if any) in front
    fn convert_transcript(
        transcript: &Transcript,
        system_prompt: Option<&str>,
    ) -> Vec<OpenAiMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);

        if let Some(system) = system_prompt {
            messages.push(OpenAiMessage {
                role: "system",
                content: system.to_string(),
            });
        }

        messages.extend(transcript.turns().iter().map(|turn| OpenAiMessage {
            role: turn.role().as_str(),
            content: turn.content().to_string(),
        }));

        messages
    }

    fn build_request(&self, transcript: &Transcript) -> OpenAiChatRequest {
        OpenAiChatRequest {
            model: self.options.model.clone(),
            temperature: self.options.temperature,
            top_p: OPENAI_TOP_P,
            messages: Self::convert_transcript(
                transcript,
                self.options.system_prompt.as_deref(),
            ),
        }
    }

    fn extract_response(response: OpenAiChatResponse) -> Result<AiResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .context("OpenAI response contained no choices")?
            .message
            .content
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(AiResponse {
            content: ensure_content(ProviderKind::OpenAi, content)?,
            usage,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn generate(&mut self, transcript: &Transcript) -> Result<AiResponse> {
        let endpoint = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request(transcript);

        log_debug(&format!(
            "Sending chat request to OpenAI API with {} message(s)",
            body.messages.len()
        ));

        let request = self.client.post(&endpoint).bearer_auth(&self.api_key);
        let response: OpenAiChatResponse = send_json(ProviderKind::OpenAi, request, &body).await?;

        Self::extract_response(response)
    }

    fn model_name(&self) -> &str {
        &self.options.model
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }
}
