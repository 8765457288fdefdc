//! Pattern/hint endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::{rejection::JsonRejection, State},
  http::{Method, StatusCode, Uri},
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::domain::PatternType;
use crate::error::ApiError;
use crate::logic::{generate_pattern, get_hint, GenerationFailed, Generated};
use crate::protocol::*;
use crate::state::AppState;

const TOKEN_TIP: &str = "Check if token has correct permissions and starts with sk-";

#[instrument(level = "info")]
pub async fn http_root() -> impl IntoResponse {
  Json(RootOut {
    message: "Pattern Generator API is running",
    endpoints: Endpoints {
      generate_pattern: "POST /generate-pattern",
      get_hint: "POST /get-hint",
      test_openai: "GET /test-openai",
    },
  })
}

/// Healthy unless a configured database cannot be reached.
#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (status, database) = match state.store.ping().await {
    Ok(()) if state.store.backend() == "memory" => (StatusCode::OK, "memory"),
    Ok(()) => (StatusCode::OK, "connected"),
    Err(e) => {
      warn!(target: "store", error = %e, "Health check: database unreachable");
      (StatusCode::SERVICE_UNAVAILABLE, "disconnected")
    }
  };
  let body = HealthOut { ok: status == StatusCode::OK, database, openai: state.openai.is_some() };
  (status, Json(body))
}

/// Body is optional: absent, empty or `{}` all mean "pick a random type".
fn requested_type(body: &Bytes) -> Result<PatternType, ApiError> {
  let input = if body.iter().all(u8::is_ascii_whitespace) {
    GenerateIn::default()
  } else {
    serde_json::from_slice::<GenerateIn>(body).map_err(|e| ApiError::bad_request("Invalid request body", e))?
  };
  match input.kind.as_deref().map(str::trim) {
    None | Some("") => Ok(PatternType::random()),
    Some(t) if t.eq_ignore_ascii_case("random") => Ok(PatternType::random()),
    Some(t) => t.parse().map_err(|e| ApiError::bad_request("Invalid pattern type", e)),
  }
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_generate_pattern(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
  let requested = requested_type(&body)?;

  let response = match generate_pattern(&state, requested).await {
    Ok(Generated::Primary(pattern)) => {
      info!(target: "pattern", %requested, "HTTP pattern served");
      Json(pattern).into_response()
    }
    Ok(Generated::Fallback { pattern, primary_error }) => {
      let out = GenerateErrorOut {
        error: "Error generating primary pattern".into(),
        details: primary_error.to_string(),
        fallback: Some(pattern),
      };
      (StatusCode::INTERNAL_SERVER_ERROR, Json(out)).into_response()
    }
    Err(GenerationFailed { .. }) => {
      let out = GenerateErrorOut {
        error: "Failed to generate pattern".into(),
        details: "Both primary and fallback pattern generation failed".into(),
        fallback: None,
      };
      (StatusCode::INTERNAL_SERVER_ERROR, Json(out)).into_response()
    }
  };
  Ok(response)
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<HintIn>, JsonRejection>,
) -> Result<Json<crate::domain::AiHint>, ApiError> {
  let Json(body) = payload.map_err(|e| ApiError::bad_request("Invalid hint request", e.body_text()))?;
  let hint = get_hint(&state, &body.pattern, body.user_attempts)
    .await
    .map_err(|e| ApiError::upstream("Error generating hint", e))?;
  info!(target: "pattern", attempts = body.user_attempts, "HTTP hint served");
  Ok(Json(hint))
}

#[instrument(level = "info", skip(state))]
pub async fn http_test_openai(State(state): State<Arc<AppState>>) -> Result<Json<ModelsOut>, ApiError> {
  let unauthorized = |details: String| ApiError::Unauthorized {
    error: "Token invalid".into(),
    details,
    tip: TOKEN_TIP.into(),
  };
  let oa = state.openai.as_ref().ok_or_else(|| unauthorized("OPENAI_API_KEY is not configured".into()))?;
  let models = oa.list_models(5).await.map_err(|e| unauthorized(e.to_string()))?;
  Ok(Json(ModelsOut { status: "Token valid", models }))
}

pub async fn http_not_found(method: Method, uri: Uri) -> impl IntoResponse {
  (
    StatusCode::NOT_FOUND,
    Json(json!({ "error": "Not Found", "message": format!("Route {} {} not found", method, uri.path()) })),
  )
}
