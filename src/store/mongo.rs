use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
  bson::{doc, Document},
  options::{ClientOptions, ReturnDocument},
  Client, Collection, Database,
};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use super::{Store, StoreResult, MAX_PAGE};
use crate::domain::{PatternRecord, PatternType, UserRecord};
use crate::error::StoreError;
use crate::progress::Progress;

const USERS: &str = "users";
const PATTERNS: &str = "patterns";

/// MongoDB-backed store. The database handle is created on first use and
/// reused by every later request; a failed connect is not cached.
pub struct MongoStore {
  uri: String,
  db_name: String,
  db: OnceCell<Database>,
}

impl MongoStore {
  pub fn new(uri: impl Into<String>, db_name: impl Into<String>) -> Self {
    Self { uri: uri.into(), db_name: db_name.into(), db: OnceCell::new() }
  }

  #[instrument(level = "info", skip(self), fields(db = %self.db_name))]
  async fn database(&self) -> StoreResult<&Database> {
    self
      .db
      .get_or_try_init(|| async {
        let mut options = ClientOptions::parse(&self.uri).await.map_err(connection_error)?;
        options.server_selection_timeout = Some(Duration::from_secs(5));
        options.app_name = Some("pattern-quiz".into());
        let client = Client::with_options(options).map_err(connection_error)?;
        let db = client.database(&self.db_name);
        db.run_command(doc! { "ping": 1 }).await.map_err(connection_error)?;
        info!(target: "store", db = %self.db_name, "MongoDB connected");
        Ok(db)
      })
      .await
  }

  async fn users(&self) -> StoreResult<Collection<UserRecord>> {
    Ok(self.database().await?.collection(USERS))
  }

  async fn patterns(&self) -> StoreResult<Collection<PatternRecord>> {
    Ok(self.database().await?.collection(PATTERNS))
  }
}

/// Single-stage pipeline update: every expression reads the pre-update
/// document, so the running mean uses the old `gamesPlayed`.
fn submission_update(points: u32, attempts: u32, correct: bool) -> Vec<Document> {
  let points = i64::from(points);
  let attempts = i64::from(attempts);
  let correct = i64::from(correct);
  let played = doc! { "$ifNull": ["$progress.gamesPlayed", 0] };
  let played_after = doc! { "$add": [played.clone(), 1_i64] };
  let mean = doc! { "$ifNull": ["$progress.averageAttempts", 0.0] };
  let attempts_sum = doc! { "$add": [{ "$multiply": [mean, played] }, attempts] };
  vec![doc! {
    "$set": {
      "progress.totalScore": { "$add": [{ "$ifNull": ["$progress.totalScore", 0] }, points] },
      "progress.correctAnswers": { "$add": [{ "$ifNull": ["$progress.correctAnswers", 0] }, correct] },
      "progress.gamesPlayed": played_after.clone(),
      "progress.averageAttempts": { "$divide": [attempts_sum, played_after] }
    }
  }]
}

fn connection_error(e: mongodb::error::Error) -> StoreError {
  error!(target: "store", error = %e, "MongoDB connection error");
  StoreError::Connection { message: e.to_string() }
}

#[async_trait]
impl Store for MongoStore {
  fn backend(&self) -> &'static str {
    "mongodb"
  }

  async fn ping(&self) -> StoreResult<()> {
    let db = self.database().await?;
    db.run_command(doc! { "ping": 1 }).await.map_err(connection_error)?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self, user), fields(id = %user.id))]
  async fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
    self.users().await?.insert_one(&user).await?;
    Ok(())
  }

  async fn get_user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
    Ok(self.users().await?.find_one(doc! { "id": id }).await?)
  }

  #[instrument(level = "debug", skip(self))]
  async fn record_submission(&self, id: &str, points: u32, attempts: u32, correct: bool) -> StoreResult<Progress> {
    let user = self
      .users()
      .await?
      .find_one_and_update(doc! { "id": id }, submission_update(points, attempts, correct))
      .return_document(ReturnDocument::After)
      .await?
      .ok_or_else(|| StoreError::NotFound { kind: "user", id: id.to_string() })?;
    Ok(user.progress)
  }

  #[instrument(level = "debug", skip(self, record), fields(id = %record.id))]
  async fn insert_pattern(&self, record: PatternRecord) -> StoreResult<()> {
    self.patterns().await?.insert_one(&record).await?;
    Ok(())
  }

  async fn get_pattern(&self, id: &str) -> StoreResult<Option<PatternRecord>> {
    Ok(self.patterns().await?.find_one(doc! { "id": id }).await?)
  }

  async fn recent_patterns(&self, kind: Option<PatternType>, limit: usize) -> StoreResult<Vec<PatternRecord>> {
    let filter = match kind {
      Some(k) => doc! { "pattern.type": k.as_str() },
      None => Document::new(),
    };
    let cursor = self
      .patterns()
      .await?
      .find(filter)
      .sort(doc! { "createdAt": -1 })
      .limit(limit.min(MAX_PAGE) as i64)
      .await?;
    Ok(cursor.try_collect::<Vec<_>>().await?)
  }
}
