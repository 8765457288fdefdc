//! Persistence for users and saved patterns.
//!
//! `MongoStore` is used when MONGODB_URI is configured; otherwise the service
//! keeps records in memory for the lifetime of the process.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;

use crate::domain::{PatternRecord, PatternType, UserRecord};
use crate::error::StoreError;
use crate::progress::Progress;

pub type StoreResult<T> = Result<T, StoreError>;

/// Largest page `recent_patterns` will return.
pub const MAX_PAGE: usize = 100;

#[async_trait]
pub trait Store: Send + Sync {
  /// Short backend name reported by /health ("mongodb" or "memory").
  fn backend(&self) -> &'static str;

  async fn ping(&self) -> StoreResult<()>;

  async fn insert_user(&self, user: UserRecord) -> StoreResult<()>;
  async fn get_user(&self, id: &str) -> StoreResult<Option<UserRecord>>;
  /// Fold one answer submission into the user's progress atomically and
  /// return the updated record.
  async fn record_submission(&self, id: &str, points: u32, attempts: u32, correct: bool) -> StoreResult<Progress>;

  async fn insert_pattern(&self, record: PatternRecord) -> StoreResult<()>;
  async fn get_pattern(&self, id: &str) -> StoreResult<Option<PatternRecord>>;
  /// Newest first, optionally restricted to one type.
  async fn recent_patterns(&self, kind: Option<PatternType>, limit: usize) -> StoreResult<Vec<PatternRecord>>;
}
