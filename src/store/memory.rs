use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{Store, StoreResult, MAX_PAGE};
use crate::domain::{PatternRecord, PatternType, UserRecord};
use crate::error::StoreError;
use crate::progress::Progress;

/// Process-local store; contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
  users: Arc<RwLock<HashMap<String, UserRecord>>>,
  patterns: Arc<RwLock<Vec<PatternRecord>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  fn backend(&self) -> &'static str {
    "memory"
  }

  async fn ping(&self) -> StoreResult<()> {
    Ok(())
  }

  #[instrument(level = "debug", skip(self, user), fields(id = %user.id))]
  async fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
    self.users.write().await.insert(user.id.clone(), user);
    Ok(())
  }

  async fn get_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
    Ok(self.users.read().await.get(id).cloned())
  }

  #[instrument(level = "debug", skip(self))]
  async fn record_submission(&self, id: &str, points: u32, attempts: u32, correct: bool) -> StoreResult<Progress> {
    let mut users = self.users.write().await;
    let user = users
      .get_mut(id)
      .ok_or_else(|| StoreError::NotFound { kind: "user", id: id.to_string() })?;
    user.progress.record(points, attempts, correct);
    Ok(user.progress.clone())
  }

  #[instrument(level = "debug", skip(self, record), fields(id = %record.id))]
  async fn insert_pattern(&self, record: PatternRecord) -> StoreResult<()> {
    self.patterns.write().await.push(record);
    Ok(())
  }

  async fn get_pattern(&self, id: &str) -> StoreResult<Option<PatternRecord>> {
    Ok(self.patterns.read().await.iter().find(|p| p.id == id).cloned())
  }

  async fn recent_patterns(&self, kind: Option<PatternType>, limit: usize) -> StoreResult<Vec<PatternRecord>> {
    let patterns = self.patterns.read().await;
    let mut out: Vec<PatternRecord> = patterns
      .iter()
      .filter(|p| kind.map_or(true, |k| p.pattern.kind == k))
      .cloned()
      .collect();
    // Stable sort keeps insertion order for equal timestamps; newest first.
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out.truncate(limit.min(MAX_PAGE));
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, Pattern};
  use chrono::{Duration, Utc};

  fn record(id: &str, kind: PatternType, age_secs: i64) -> PatternRecord {
    PatternRecord {
      id: id.into(),
      pattern: Pattern {
        sequence: "1, 2, 3, 4, ?".into(),
        answer: "5".into(),
        kind,
        difficulty: Difficulty::Easy,
        hint: "count".into(),
        explanation: None,
      },
      user_id: None,
      created_at: Utc::now() - Duration::seconds(age_secs),
    }
  }

  #[tokio::test]
  async fn progress_update_requires_existing_user() {
    let store = MemoryStore::new();
    let err = store.record_submission("ghost", 8, 1, true).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "user", .. }));

    store
      .insert_user(UserRecord { id: "u1".into(), username: "ada".into(), created_at: Utc::now(), progress: Progress::default() })
      .await
      .unwrap();
    let p = store.record_submission("u1", 8, 1, true).await.unwrap();
    assert_eq!(p.total_score, 8);
    assert_eq!(store.get_user("u1").await.unwrap().unwrap().progress, p);
  }

  #[tokio::test]
  async fn concurrent_submissions_are_both_counted() {
    let store = MemoryStore::new();
    store
      .insert_user(UserRecord { id: "u1".into(), username: "ada".into(), created_at: Utc::now(), progress: Progress::default() })
      .await
      .unwrap();

    let (a, b) = tokio::join!(store.record_submission("u1", 8, 1, true), store.record_submission("u1", 0, 2, false));
    a.unwrap();
    b.unwrap();

    let p = store.get_user("u1").await.unwrap().unwrap().progress;
    assert_eq!(p.games_played, 2);
    assert_eq!(p.correct_answers, 1);
    assert_eq!(p.total_score, 8);
    assert!((p.average_attempts - 1.5).abs() < 1e-9);
  }

  #[tokio::test]
  async fn recent_patterns_are_newest_first_and_filtered() {
    let store = MemoryStore::new();
    store.insert_pattern(record("old", PatternType::Numeric, 60)).await.unwrap();
    store.insert_pattern(record("new", PatternType::Numeric, 1)).await.unwrap();
    store.insert_pattern(record("sym", PatternType::Symbolic, 30)).await.unwrap();

    let all = store.recent_patterns(None, 10).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "sym", "old"]);

    let numeric = store.recent_patterns(Some(PatternType::Numeric), 1).await.unwrap();
    assert_eq!(numeric.len(), 1);
    assert_eq!(numeric[0].id, "new");

    assert!(store.get_pattern("sym").await.unwrap().is_some());
    assert!(store.get_pattern("nope").await.unwrap().is_none());
  }
}
