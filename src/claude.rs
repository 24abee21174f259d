use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{ANTHROPIC_BASE_URL, ANTHROPIC_BASE_URL_ENV, ANTHROPIC_VERSION, get_base_url};
use crate::conversation::Transcript;
use crate::logging::{log_debug, log_info, log_warn};
use crate::provider::{
    AiProvider, AiResponse, InvocationOptions, ProviderKind, TokenUsage, build_http_client,
    ensure_content, send_json,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<ClaudeUsage>,
}

#[derive(Debug)]
pub struct ClaudeClient {
    base_url: String,
    api_key: String,
    options: InvocationOptions,
    client: reqwest::Client,
}

impl ClaudeClient {
    pub fn new(options: InvocationOptions, api_key: String) -> Result<Self> {
        let base_url = get_base_url(ANTHROPIC_BASE_URL_ENV, ANTHROPIC_BASE_URL);
        Self::with_base_url(options, api_key, base_url)
    }

    pub fn with_base_url(
        options: InvocationOptions,
        api_key: String,
        base_url: String,
    ) -> Result<Self> {
        log_info(&format!(
            "Initializing Claude client with model: {} at {}",
            options.model, base_url
        ));

        Ok(Self {
            base_url,
            api_key,
            options,
            client: build_http_client()?,
        })
    }

    fn convert_transcript(transcript: &Transcript) -> Vec<ClaudeMessage> {
        transcript
            .turns()
            .iter()
            .map(|turn| ClaudeMessage {
                role: turn.role().as_str(),
                content: turn.content().to_string(),
            })
            .collect()
    }

    fn build_request(&self, transcript: &Transcript) -> ClaudeRequest {
        ClaudeRequest {
            model: self.options.model.clone(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            system: self.options.system_prompt.clone(),
            messages: Self::convert_transcript(transcript),
        }
    }

    fn extract_response(response: ClaudeResponse) -> Result<AiResponse> {
        if response.stop_reason.as_deref() == Some("max_tokens") {
            log_warn("Claude stopped at max_tokens; the answer is truncated");
        }

        let content = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: match (u.input_tokens, u.output_tokens) {
                    (Some(i), Some(o)) => i.checked_add(o),
                    _ => None,
                },
            })
            .unwrap_or_default();

        Ok(AiResponse {
            content: ensure_content(ProviderKind::Claude, content)?,
            usage,
        })
    }
}

#[async_trait]
impl AiProvider for ClaudeClient {
    async fn generate(&mut self, transcript: &Transcript) -> Result<AiResponse> {
        let endpoint = format!("{}/v1/messages", self.base_url);
        let body = self.build_request(transcript);

        log_debug(&format!(
            "Sending messages request to Claude API with {} message(s)",
            body.messages.len()
        ));

        let request = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let response: ClaudeResponse = send_json(ProviderKind::Claude, request, &body).await?;

        Self::extract_response(response)
    }

    fn model_name(&self) -> &str {
        &self.options.model
    }

    fn provider_name(&self) -> &'static str {
        "Claude"
    }
}
