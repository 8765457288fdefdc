//! Error taxonomy: completion endpoint failures, completion format failures,
//! persistence failures, and the HTTP-facing `ApiError`.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the completion endpoint.
#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("completion API is not configured (OPENAI_API_KEY missing)")]
  NotConfigured,

  #[error("completion API HTTP {status}: {message}")]
  Api { status: u16, message: String },

  #[error("completion API returned an empty completion")]
  EmptyCompletion,

  #[error("completion API request failed: {0}")]
  Http(#[from] reqwest::Error),
}

/// A completion that does not follow `sequence|answer|hint|type|difficulty`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
  #[error("Invalid pattern format from AI: expected 5 fields, found {found}")]
  WrongArity { found: usize },

  #[error("Missing required pattern component: {field}")]
  EmptyField { field: &'static str },

  #[error("Invalid {field} from AI: '{value}'")]
  InvalidValue { field: &'static str, value: String },
}

/// One attempt (primary or fallback) at producing a pattern.
#[derive(Debug, Error)]
pub enum AttemptError {
  #[error(transparent)]
  Upstream(#[from] UpstreamError),

  #[error(transparent)]
  Format(#[from] FormatError),
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database connection failed: {message}")]
  Connection { message: String },

  #[error("Database query failed: {message}")]
  Query { message: String },

  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },
}

/// Losing the server after the handle is cached is a connection failure (503),
/// not a query failure.
impl From<mongodb::error::Error> for StoreError {
  fn from(e: mongodb::error::Error) -> Self {
    use mongodb::error::ErrorKind;
    match e.kind.as_ref() {
      ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
        StoreError::Connection { message: e.to_string() }
      }
      _ => StoreError::Query { message: e.to_string() },
    }
  }
}

/// Errors rendered to HTTP callers as `{error, details}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{error}: {details}")]
  BadRequest { error: String, details: String },

  #[error("{error}: {details}")]
  Upstream { error: String, details: String },

  #[error("{error}: {details}")]
  Unauthorized { error: String, details: String, tip: String },

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ApiError {
  pub fn bad_request(error: impl Into<String>, details: impl ToString) -> Self {
    ApiError::BadRequest { error: error.into(), details: details.to_string() }
  }

  pub fn upstream(error: impl Into<String>, details: impl ToString) -> Self {
    ApiError::Upstream { error: error.into(), details: details.to_string() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::BadRequest { error, details } => (StatusCode::BAD_REQUEST, json!({ "error": error, "details": details })),
      ApiError::Upstream { error, details } => {
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": error, "details": details }))
      }
      ApiError::Unauthorized { error, details, tip } => {
        (StatusCode::UNAUTHORIZED, json!({ "error": error, "details": details, "tip": tip }))
      }
      ApiError::Store(e) => {
        let status = match e {
          StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
          StoreError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
          _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, json!({ "error": "Storage error", "details": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
