use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use catchup_config::LlmConfig;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub trait LlmProvider {
    fn complete_with_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        self.complete_with_messages(&messages, max_tokens, temperature)
    }
}

pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    http: Client,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionPayload {
    #[serde(default)]
    choices: Vec<ChoicePayload>,
}

#[derive(Deserialize)]
struct ChoicePayload {
    message: Option<MessagePayload>,
}

#[derive(Deserialize)]
struct MessagePayload {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY not configured"))?;
        Self::new(
            api_key,
            &config.model,
            config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
        )
    }

    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .with_context(|| "failed to build LLM HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmProvider for OpenAiProvider {
    fn complete_with_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, messages = messages.len(), max_tokens, "requesting completion");

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                max_tokens,
                temperature,
            })
            .send()
            .with_context(|| "failed to execute completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            bail!("completion request failed: status={} body={}", status, body);
        }

        let payload: CompletionPayload = response
            .json()
            .with_context(|| "failed to decode completion response")?;
        first_choice_text(payload)
    }
}

fn first_choice_text(payload: CompletionPayload) -> Result<String> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| anyhow!("completion response contained no message"))
}
