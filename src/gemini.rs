use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{GEMINI_BASE_URL, GEMINI_BASE_URL_ENV, get_base_url};
use crate::conversation::{Role, Transcript};
use crate::logging::{log_debug, log_info, log_warn};
use crate::provider::{
    AiProvider, AiResponse, InvocationOptions, ProviderKind, TokenUsage, build_http_client,
    ensure_content, send_json,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    options: InvocationOptions,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(options: InvocationOptions, api_key: String) -> Result<Self> {
        let base_url = get_base_url(GEMINI_BASE_URL_ENV, GEMINI_BASE_URL);
        Self::with_base_url(options, api_key, base_url)
    }

    pub fn with_base_url(
        options: InvocationOptions,
        api_key: String,
        base_url: String,
    ) -> Result<Self> {
        log_info(&format!(
            "Initializing Gemini client with model: {} at {}",
            options.model, base_url
        ));
        log_debug(&format!(
            "Gemini requests do not carry a temperature; ignoring {}",
            options.temperature
        ));

        Ok(Self {
            base_url,
            api_key,
            options,
            client: build_http_client()?,
        })
    }

    /// The model id is a single path segment; anything else in it is escaped
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.options.model)
        )
    }

    fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
        GeminiContent {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }

    /// Role/parts contents; Gemini calls the assistant side `model`
    fn convert_transcript(transcript: &Transcript) -> Vec<GeminiContent> {
        transcript
            .turns()
            .iter()
            .map(|turn| {
                let role = match turn.role() {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Self::text_content(Some(role), turn.content())
            })
            .collect()
    }

    fn build_request(&self, transcript: &Transcript) -> GeminiRequest {
        GeminiRequest {
            contents: Self::convert_transcript(transcript),
            system_instruction: self
                .options
                .system_prompt
                .as_deref()
                .map(|system| Self::text_content(None, system)),
        }
    }

    fn extract_response(response: GeminiResponse) -> Result<AiResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .context("Gemini response contained no candidates")?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && reason != "STOP"
        {
            log_warn(&format!("Gemini finished with reason: {reason}"));
        }

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(AiResponse {
            content: ensure_content(ProviderKind::Gemini, content)?,
            usage,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn generate(&mut self, transcript: &Transcript) -> Result<AiResponse> {
        let endpoint = self.endpoint();
        let body = self.build_request(transcript);

        log_debug(&format!(
            "Sending generateContent request to Gemini API with {} content(s)",
            body.contents.len()
        ));

        let request = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key);
        let response: GeminiResponse = send_json(ProviderKind::Gemini, request, &body).await?;

        Self::extract_response(response)
    }

    fn model_name(&self) -> &str {
        &self.options.model
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }
}
