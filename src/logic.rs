//! Core behaviors behind the HTTP handlers:
//!   - pattern generation (primary prompt, one simplified fallback, no backoff)
//!   - hint + confidence (two sequential calls, no retry)

use tracing::{error, info, instrument, warn};

use crate::domain::{AiHint, Pattern, PatternType};
use crate::error::{AttemptError, UpstreamError};
use crate::openai::{ChatParams, OpenAI};
use crate::pattern::{normalize, parse_completion};
use crate::state::AppState;
use crate::util::{fill_template, leading_number, trunc_for_log};

const PRIMARY_PARAMS: ChatParams = ChatParams::new(0.8, 150).with_penalties(0.6, 0.6);
const FALLBACK_PARAMS: ChatParams = ChatParams::new(0.5, 100);
const HINT_PARAMS: ChatParams = ChatParams::new(0.7, 150);
const CONFIDENCE_PARAMS: ChatParams = ChatParams::new(0.3, 10);

/// Used when the confidence reply holds no number.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// How a pattern request ended.
#[derive(Debug)]
pub enum Generated {
  /// The primary prompt produced a well-formed pattern.
  Primary(Pattern),
  /// The primary attempt failed and the simplified prompt produced one.
  Fallback { pattern: Pattern, primary_error: AttemptError },
}

/// Both attempts failed; no pattern exists.
#[derive(Debug)]
pub struct GenerationFailed {
  pub primary_error: AttemptError,
  pub fallback_error: AttemptError,
}

fn client(state: &AppState) -> Result<&OpenAI, UpstreamError> {
  state.openai.as_ref().ok_or(UpstreamError::NotConfigured)
}

/// One call + parse + validation for the given prompt pair.
async fn attempt(
  state: &AppState,
  requested: PatternType,
  system_tpl: &str,
  user_tpl: &str,
  params: ChatParams,
) -> Result<Pattern, AttemptError> {
  let oa = client(state)?;
  let vars = [("type", requested.as_str())];
  let system = fill_template(system_tpl, &vars);
  let user = fill_template(user_tpl, &vars);

  let text = oa.chat_plain(&oa.model, &system, &user, params).await?;
  info!(target: "pattern", reply = %trunc_for_log(&text, 200), "AI response");

  let raw = parse_completion(&text)?;
  Ok(normalize(raw, requested, state.enum_policy)?)
}

#[instrument(level = "info", skip(state), fields(requested = %requested))]
pub async fn generate_pattern(state: &AppState, requested: PatternType) -> Result<Generated, GenerationFailed> {
  let prompts = &state.prompts;
  let primary_error = match attempt(state, requested, &prompts.pattern_system, &prompts.pattern_user, PRIMARY_PARAMS).await {
    Ok(p) => {
      info!(target: "pattern", kind = %p.kind, difficulty = %p.difficulty, "Pattern generated");
      return Ok(Generated::Primary(p));
    }
    Err(e) => e,
  };

  warn!(target: "pattern", error = %primary_error, "Primary generation failed; trying fallback prompt");
  match attempt(state, requested, &prompts.fallback_system, &prompts.fallback_user, FALLBACK_PARAMS).await {
    Ok(pattern) => {
      info!(target: "pattern", kind = %pattern.kind, "Fallback pattern generated");
      Ok(Generated::Fallback { pattern, primary_error })
    }
    Err(fallback_error) => {
      error!(target: "pattern", primary = %primary_error, fallback = %fallback_error, "Both primary and fallback generation failed");
      Err(GenerationFailed { primary_error, fallback_error })
    }
  }
}

/// Hint for the current pattern, then the model's confidence in that hint.
#[instrument(level = "info", skip(state, pattern), fields(kind = %pattern.kind, %attempts))]
pub async fn get_hint(state: &AppState, pattern: &Pattern, attempts: u32) -> Result<AiHint, UpstreamError> {
  let oa = client(state)?;
  let prompts = &state.prompts;
  let attempts_s = attempts.to_string();

  let hint_user = fill_template(
    &prompts.hint_user,
    &[
      ("sequence", pattern.sequence.as_str()),
      ("type", pattern.kind.as_str()),
      ("attempts", attempts_s.as_str()),
      ("difficulty", pattern.difficulty.as_str()),
    ],
  );
  let hint = oa.chat_plain(&oa.model, &prompts.hint_system, &hint_user, HINT_PARAMS).await?;

  let confidence_user = fill_template(
    &prompts.confidence_user,
    &[("sequence", pattern.sequence.as_str()), ("hint", hint.as_str())],
  );
  let reply = oa.chat_plain(&oa.fast_model, &prompts.confidence_system, &confidence_user, CONFIDENCE_PARAMS).await?;
  let confidence = parse_confidence(&reply);

  info!(target: "pattern", confidence, "Hint served");
  Ok(AiHint {
    hint,
    confidence,
    reasoning: format!("AI analysis based on {} pattern and {} attempts", pattern.kind, attempts),
  })
}

/// Leading number of the reply clamped to [0, 1]; no number gives the default.
pub fn parse_confidence(reply: &str) -> f64 {
  match leading_number(reply) {
    Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
    _ => {
      warn!(target: "pattern", reply = %trunc_for_log(reply, 40), "Unparseable confidence; using default");
      DEFAULT_CONFIDENCE
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::config::{EnumPolicy, Prompts};
  use crate::domain::Difficulty;
  use crate::error::FormatError;
  use crate::openai::tests::{completion, test_settings};
  use crate::store::MemoryStore;
  use serde_json::json;
  use std::sync::Arc;
  use wiremock::{
    matchers::{body_partial_json, body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
  };

  pub(crate) fn test_state(base_url: &str) -> AppState {
    AppState {
      openai: Some(OpenAI::new(&test_settings(base_url)).unwrap()),
      prompts: Prompts::default(),
      store: Arc::new(MemoryStore::new()),
      enum_policy: EnumPolicy::Normalize,
    }
  }

  /// Primary answers with `primary`, the fallback prompt with `fallback`.
  pub(crate) async fn mount_generation(server: &MockServer, primary: &str, fallback: &str) {
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_string_contains("Generate a fallback pattern."))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(fallback)))
      .with_priority(1)
      .expect(1)
      .named("fallback")
      .mount(server)
      .await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(primary)))
      .expect(1)
      .named("primary")
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn well_formed_primary_skips_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_string_contains("college-level numeric pattern"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(
        "2, 4, 6, 8, ?|10|arithmetic progression|numeric|easy",
      )))
      .expect(1)
      .mount(&server)
      .await;

    let state = test_state(&server.uri());
    let Generated::Primary(p) = generate_pattern(&state, PatternType::Numeric).await.unwrap() else {
      panic!("expected primary pattern");
    };
    assert_eq!(p.sequence, "2, 4, 6, 8, ?");
    assert_eq!(p.answer, "10");
    assert_eq!(p.hint, "arithmetic progression");
    assert_eq!(p.kind, PatternType::Numeric);
    assert_eq!(p.difficulty, Difficulty::Easy);
  }

  #[tokio::test]
  async fn malformed_primary_uses_fallback_once() {
    let server = MockServer::start().await;
    mount_generation(&server, "2, 4, 6, 8, ?|10|arithmetic progression|numeric", "1, 2, 3, 4, ?|5|count up|numeric|Easy").await;

    let state = test_state(&server.uri());
    match generate_pattern(&state, PatternType::Numeric).await.unwrap() {
      Generated::Fallback { pattern, primary_error } => {
        assert_eq!(pattern.answer, "5");
        assert_eq!(pattern.difficulty, Difficulty::Easy);
        assert!(matches!(primary_error, AttemptError::Format(FormatError::WrongArity { found: 4 })));
      }
      other => panic!("expected fallback, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn both_malformed_is_terminal() {
    let server = MockServer::start().await;
    mount_generation(&server, "a|b|c|numeric", "nothing useful").await;

    let state = test_state(&server.uri());
    let failed = generate_pattern(&state, PatternType::Symbolic).await.unwrap_err();
    assert!(matches!(failed.primary_error, AttemptError::Format(_)));
    assert!(matches!(failed.fallback_error, AttemptError::Format(FormatError::WrongArity { found: 1 })));
  }

  #[tokio::test]
  async fn upstream_failure_also_triggers_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_string_contains("Generate a fallback pattern."))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("∑, ∏, ∫, ∂, ?|∮|calculus operators|symbolic|hard")))
      .with_priority(1)
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": { "message": "overloaded" } })))
      .expect(1)
      .mount(&server)
      .await;

    let state = test_state(&server.uri());
    match generate_pattern(&state, PatternType::Symbolic).await.unwrap() {
      Generated::Fallback { pattern, primary_error } => {
        assert_eq!(pattern.answer, "∮");
        assert!(matches!(primary_error, AttemptError::Upstream(UpstreamError::Api { status: 503, .. })));
      }
      other => panic!("expected fallback, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn generation_without_client_fails_both_attempts() {
    let mut state = test_state("http://127.0.0.1:9");
    state.openai = None;
    let failed = generate_pattern(&state, PatternType::Logical).await.unwrap_err();
    assert!(matches!(failed.fallback_error, AttemptError::Upstream(UpstreamError::NotConfigured)));
  }

  fn sample_pattern() -> Pattern {
    Pattern {
      sequence: "2, 4, 6, 8, ?".into(),
      answer: "10".into(),
      kind: PatternType::Numeric,
      difficulty: Difficulty::Easy,
      hint: "arithmetic progression".into(),
      explanation: None,
    }
  }

  #[tokio::test]
  async fn hint_then_confidence_are_sequential_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "gpt-3.5-turbo" })))
      .and(body_string_contains("Look at the gap between terms."))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("0.75")))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "gpt-4-turbo-preview" })))
      .and(body_string_contains("Previous attempts: 2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("Look at the gap between terms.")))
      .expect(1)
      .mount(&server)
      .await;

    let state = test_state(&server.uri());
    let hint = get_hint(&state, &sample_pattern(), 2).await.unwrap();
    assert_eq!(hint.hint, "Look at the gap between terms.");
    assert!((hint.confidence - 0.75).abs() < 1e-9);
    assert_eq!(hint.reasoning, "AI analysis based on numeric pattern and 2 attempts");
  }

  #[tokio::test]
  async fn hint_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "Incorrect API key" } })))
      .expect(1)
      .mount(&server)
      .await;

    let state = test_state(&server.uri());
    let err = get_hint(&state, &sample_pattern(), 1).await.unwrap_err();
    assert!(err.to_string().contains("Incorrect API key"));
  }

  #[test]
  fn confidence_parsing_clamps_and_defaults() {
    assert_eq!(parse_confidence("0.8"), 0.8);
    assert_eq!(parse_confidence("0.65 - the hint is decent"), 0.65);
    assert_eq!(parse_confidence("1.7"), 1.0);
    assert_eq!(parse_confidence("-0.2"), 0.0);
    assert_eq!(parse_confidence("0"), 0.0);
    assert_eq!(parse_confidence("Confidence: high"), DEFAULT_CONFIDENCE);
  }
}
