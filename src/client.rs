//! HTTP client for the pattern service, used by the `play` front end.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::domain::{AiHint, Pattern, PatternType};
use crate::progress::Progress;
use crate::protocol::{GenerateErrorOut, HintIn};
use crate::session::local_hint;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("server returned {status}: {details}")]
  Server { status: u16, details: String },
}

#[derive(Clone)]
pub struct BackendClient {
  http: reqwest::Client,
  base_url: String,
}

impl BackendClient {
  pub fn new(base_url: &str) -> Result<Self, ClientError> {
    let http = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
    Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// A 500 that carries a `fallback` pattern still yields a playable pattern.
  #[instrument(level = "info", skip(self))]
  pub async fn generate_pattern(&self, kind: Option<PatternType>) -> Result<Pattern, ClientError> {
    let body = match kind {
      Some(k) => json!({ "type": k }),
      None => json!({}),
    };
    let res = self.http.post(format!("{}/generate-pattern", self.base_url)).json(&body).send().await?;
    let status = res.status();
    if status.is_success() {
      return Ok(res.json::<Pattern>().await?);
    }

    let text = res.text().await.unwrap_or_default();
    match serde_json::from_str::<GenerateErrorOut>(&text) {
      Ok(GenerateErrorOut { fallback: Some(p), details, .. }) => {
        warn!(target: "pattern_quiz", %details, "Using fallback pattern from server");
        Ok(p)
      }
      Ok(GenerateErrorOut { details, .. }) => Err(ClientError::Server { status: status.as_u16(), details }),
      Err(_) => Err(ClientError::Server { status: status.as_u16(), details: text }),
    }
  }

  /// Never fails: any server problem yields a locally synthesized hint.
  #[instrument(level = "info", skip(self, pattern), fields(kind = %pattern.kind))]
  pub async fn get_hint(&self, pattern: &Pattern, attempts: u32) -> AiHint {
    let body = HintIn { pattern: pattern.clone(), user_attempts: attempts };
    let url = format!("{}/get-hint", self.base_url);
    match self.post_json::<AiHint>(&url, &body).await {
      Ok(hint) => hint,
      Err(e) => {
        warn!(target: "pattern_quiz", error = %e, "Hint request failed; using local hint");
        local_hint(pattern, attempts)
      }
    }
  }

  /// Mirror one submission into a server-side user record.
  #[instrument(level = "info", skip(self))]
  pub async fn record_progress(&self, user_id: &str, attempts: u32, correct: bool) -> Result<Progress, ClientError> {
    let url = format!("{}/users/{}/progress", self.base_url, user_id);
    self.post_json(&url, &json!({ "attempts": attempts, "correct": correct })).await
  }

  async fn post_json<T: DeserializeOwned>(&self, url: &str, body: &impl serde::Serialize) -> Result<T, ClientError> {
    let res = self.http.post(url).json(body).send().await?;
    let status = res.status();
    if status != StatusCode::OK {
      let text = res.text().await.unwrap_or_default();
      let details = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("details").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(text);
      return Err(ClientError::Server { status: status.as_u16(), details });
    }
    Ok(res.json::<T>().await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;
  use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
  };

  fn sample() -> Pattern {
    Pattern {
      sequence: "A, C, E, G, ?".into(),
      answer: "I".into(),
      kind: PatternType::Logical,
      difficulty: Difficulty::Medium,
      hint: "skip letters".into(),
      explanation: None,
    }
  }

  #[tokio::test]
  async fn sends_requested_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/generate-pattern"))
      .and(body_partial_json(json!({ "type": "logical" })))
      .respond_with(ResponseTemplate::new(200).set_body_json(&sample()))
      .expect(1)
      .mount(&server)
      .await;

    let client = BackendClient::new(&server.uri()).unwrap();
    assert_eq!(client.generate_pattern(Some(PatternType::Logical)).await.unwrap(), sample());
  }

  #[tokio::test]
  async fn fallback_payload_is_playable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/generate-pattern"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({
        "error": "Error generating primary pattern",
        "details": "Invalid pattern format from AI: expected 5 fields, found 4",
        "fallback": sample()
      })))
      .mount(&server)
      .await;

    let client = BackendClient::new(&server.uri()).unwrap();
    assert_eq!(client.generate_pattern(None).await.unwrap().answer, "I");
  }

  #[tokio::test]
  async fn terminal_failure_reports_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({
        "error": "Failed to generate pattern",
        "details": "Both primary and fallback pattern generation failed"
      })))
      .mount(&server)
      .await;

    let client = BackendClient::new(&server.uri()).unwrap();
    match client.generate_pattern(None).await.unwrap_err() {
      ClientError::Server { status, details } => {
        assert_eq!(status, 500);
        assert!(details.contains("Both primary and fallback"));
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[tokio::test]
  async fn hint_falls_back_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/get-hint"))
      .and(body_partial_json(json!({ "userAttempts": 1 })))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "Error generating hint", "details": "boom" })))
      .expect(1)
      .mount(&server)
      .await;

    let client = BackendClient::new(&server.uri()).unwrap();
    let hint = client.get_hint(&sample(), 1).await;
    assert_eq!(hint.hint, "skip letters");
    assert!(hint.reasoning.starts_with("Local hint"));
  }

  #[tokio::test]
  async fn progress_is_mirrored_to_user_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/users/u1/progress"))
      .and(body_partial_json(json!({ "attempts": 2, "correct": true })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "totalScore": 6, "correctAnswers": 1, "gamesPlayed": 1, "averageAttempts": 2.0
      })))
      .mount(&server)
      .await;

    let client = BackendClient::new(&server.uri()).unwrap();
    let p = client.record_progress("u1", 2, true).await.unwrap();
    assert_eq!(p.total_score, 6);
  }
}
