//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions (plain text) and list models for the token check.
//! Calls are instrumented and log model names, latencies and token usage, never the key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::OpenAiSettings;
use crate::error::UpstreamError;
use crate::util::trunc_for_log;

const UA: &str = "pattern-quiz/0.1";

/// Sampling knobs for one completion call.
#[derive(Clone, Copy, Debug)]
pub struct ChatParams {
  pub temperature: f32,
  pub max_tokens: Option<u32>,
  pub presence_penalty: Option<f32>,
  pub frequency_penalty: Option<f32>,
}

impl ChatParams {
  pub const fn new(temperature: f32, max_tokens: u32) -> Self {
    Self { temperature, max_tokens: Some(max_tokens), presence_penalty: None, frequency_penalty: None }
  }

  pub const fn with_penalties(self, presence: f32, frequency: f32) -> Self {
    Self { presence_penalty: Some(presence), frequency_penalty: Some(frequency), ..self }
  }
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub fast_model: String,
}

impl OpenAI {
  pub fn new(settings: &OpenAiSettings) -> Result<Self, UpstreamError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      model: settings.model.clone(),
      fast_model: settings.fast_model.clone(),
    })
  }

  /// Plain-text chat completion; returns the trimmed first choice.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  pub async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    params: ChatParams,
  ) -> Result<String, UpstreamError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: params.temperature,
      max_tokens: params.max_tokens,
      presence_penalty: params.presence_penalty,
      frequency_penalty: params.frequency_penalty,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(UpstreamError::Api { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default().trim().to_string();

    debug!(elapsed = ?start.elapsed(), reply = %trunc_for_log(&text, 120), "Completion received");
    if text.is_empty() {
      return Err(UpstreamError::EmptyCompletion);
    }
    Ok(text)
  }

  /// GET /models; used to check the key. Returns at most `limit` entries.
  #[instrument(level = "info", skip(self))]
  pub async fn list_models(&self, limit: usize) -> Result<Vec<serde_json::Value>, UpstreamError> {
    let url = format!("{}/models", self.base_url);
    let res = self.client.get(&url)
      .header(USER_AGENT, UA)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(UpstreamError::Api { status, message });
    }

    let body: ModelList = res.json().await?;
    Ok(body.data.into_iter().take(limit).collect())
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  presence_penalty: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  frequency_penalty: Option<f32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ModelList {
  #[serde(default)] data: Vec<serde_json::Value>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
