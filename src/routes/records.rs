//! `/users` and `/patterns` sub-routers backed by the record store.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Path, Query, State},
  http::StatusCode,
  routing::get,
  Json, Router,
};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{PatternRecord, PatternType, UserRecord};
use crate::error::{ApiError, StoreError};
use crate::progress::{points_for_attempt, Progress};
use crate::protocol::*;
use crate::state::AppState;

const DEFAULT_PAGE: usize = 20;

pub fn user_routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/", axum::routing::post(create_user))
    .route("/:id", get(get_user))
    .route("/:id/progress", get(get_progress).post(record_progress))
}

pub fn pattern_routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/", get(list_patterns).post(save_pattern))
    .route("/:id", get(get_pattern))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  payload.map(|Json(t)| t).map_err(|e| ApiError::bad_request("Invalid request body", e.body_text()))
}

async fn load_user(state: &AppState, id: &str) -> Result<UserRecord, ApiError> {
  state
    .store
    .get_user(id)
    .await?
    .ok_or_else(|| StoreError::NotFound { kind: "user", id: id.to_string() }.into())
}

#[instrument(level = "info", skip(state, payload))]
async fn create_user(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<CreateUserIn>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
  let input = body(payload)?;
  let username = input.username.trim();
  if username.is_empty() {
    return Err(ApiError::bad_request("Invalid user", "username must not be empty"));
  }
  let user = UserRecord {
    id: Uuid::new_v4().to_string(),
    username: username.to_string(),
    created_at: Utc::now(),
    progress: Progress::default(),
  };
  state.store.insert_user(user.clone()).await?;
  info!(target: "store", id = %user.id, "User created");
  Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(level = "info", skip(state))]
async fn get_user(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<UserRecord>, ApiError> {
  Ok(Json(load_user(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
async fn get_progress(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Progress>, ApiError> {
  Ok(Json(load_user(&state, &id).await?.progress))
}

/// Fold one answer submission into the stored progress; points follow the scoring rule.
#[instrument(level = "info", skip(state, payload))]
async fn record_progress(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  payload: Result<Json<ProgressIn>, JsonRejection>,
) -> Result<Json<Progress>, ApiError> {
  let input = body(payload)?;
  if input.attempts == 0 {
    return Err(ApiError::bad_request("Invalid progress", "attempts starts at 1"));
  }
  let points = if input.correct { points_for_attempt(input.attempts) } else { 0 };
  let progress = state.store.record_submission(&id, points, input.attempts, input.correct).await?;
  info!(target: "store", %id, points, correct = input.correct, "Progress recorded");
  Ok(Json(progress))
}

#[instrument(level = "info", skip(state, payload))]
async fn save_pattern(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<SavePatternIn>, JsonRejection>,
) -> Result<(StatusCode, Json<PatternRecord>), ApiError> {
  let input = body(payload)?;
  let p = &input.pattern;
  if p.sequence.trim().is_empty() || p.answer.trim().is_empty() {
    return Err(ApiError::bad_request("Invalid pattern", "sequence and answer must not be empty"));
  }
  if let Some(user_id) = &input.user_id {
    load_user(&state, user_id).await?;
  }
  let record = PatternRecord {
    id: Uuid::new_v4().to_string(),
    pattern: input.pattern,
    user_id: input.user_id,
    created_at: Utc::now(),
  };
  state.store.insert_pattern(record.clone()).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(level = "info", skip(state))]
async fn get_pattern(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<PatternRecord>, ApiError> {
  let record = state
    .store
    .get_pattern(&id)
    .await?
    .ok_or(StoreError::NotFound { kind: "pattern", id })?;
  Ok(Json(record))
}

#[instrument(level = "info", skip(state))]
async fn list_patterns(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PatternQuery>,
) -> Result<Json<PatternListOut>, ApiError> {
  let kind = match q.kind.as_deref() {
    None | Some("") => None,
    Some(t) => Some(t.parse::<PatternType>().map_err(|e| ApiError::bad_request("Invalid pattern type", e))?),
  };
  let limit = q.limit.unwrap_or(DEFAULT_PAGE).clamp(1, crate::store::MAX_PAGE);
  let patterns = state.store.recent_patterns(kind, limit).await?;
  Ok(Json(PatternListOut { patterns }))
}
