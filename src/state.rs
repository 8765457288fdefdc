//! Application state shared by every request: completion client, prompts,
//! the record store and the knobs that shape pattern validation.
//!
//! Requests share nothing mutable except what lives behind the store.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::{load_prompts, EnumPolicy, Prompts, Settings};
use crate::openai::OpenAI;
use crate::store::{MemoryStore, MongoStore, Store};

#[derive(Clone)]
pub struct AppState {
  pub openai: Option<OpenAI>,
  pub prompts: Prompts,
  pub store: Arc<dyn Store>,
  pub enum_policy: EnumPolicy,
}

impl AppState {
  /// Build state from settings: prompts, store backend, optional OpenAI client.
  #[instrument(level = "info", skip_all)]
  pub fn from_settings(settings: &Settings) -> Self {
    let prompts = load_prompts(settings.prompts_path.as_deref());

    let store: Arc<dyn Store> = match &settings.mongodb_uri {
      Some(uri) => {
        info!(target: "pattern_quiz", db = %settings.mongodb_db, "Using MongoDB store (connects on first use)");
        Arc::new(MongoStore::new(uri.clone(), settings.mongodb_db.clone()))
      }
      None => {
        info!(target: "pattern_quiz", "MONGODB_URI not set; records are kept in memory");
        Arc::new(MemoryStore::new())
      }
    };

    let openai = match &settings.openai {
      Some(cfg) => match OpenAI::new(cfg) {
        Ok(oa) => {
          info!(target: "pattern_quiz", base_url = %oa.base_url, model = %oa.model, fast_model = %oa.fast_model, "OpenAI enabled.");
          Some(oa)
        }
        Err(e) => {
          error!(target: "pattern_quiz", error = %e, "Failed to build OpenAI client; completion calls will fail");
          None
        }
      },
      None => {
        info!(target: "pattern_quiz", "OpenAI disabled (no OPENAI_API_KEY). Generation and hints will report errors.");
        None
      }
    };

    Self { openai, prompts, store, enum_policy: settings.enum_policy }
  }

  /// Spawn a background connect so the first request does not pay for it.
  /// Failures are logged; the handle is retried on the next request.
  pub fn warm_up(&self) {
    let store = self.store.clone();
    tokio::spawn(async move {
      if let Err(e) = store.ping().await {
        error!(target: "store", backend = store.backend(), error = %e, "Initial database connection failed");
      }
    });
  }
}
