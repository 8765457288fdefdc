//! Pattern Quiz · pattern generation and hint service
//!
//! - Axum HTTP API that proxies pattern and hint prompts to an OpenAI-compatible chat API
//! - User and saved-pattern records in MongoDB (or in memory without MONGODB_URI)
//! - `play` subcommand: a terminal front end for the same API
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables the completion client
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4-turbo-preview"
//!   OPENAI_FAST_MODEL   : default "gpt-3.5-turbo" (confidence rating)
//!   MONGODB_URI         : document store; records stay in memory without it
//!   NODE_ENV / APP_ENV  : "production" restricts CORS to ALLOWED_ORIGINS
//!   PATTERN_ENUM_POLICY : "normalize" (default) or "strict"
//!   PROMPTS_CONFIG_PATH : TOML with prompt overrides
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod progress;
mod config;
mod pattern;
mod openai;
mod store;
mod state;
mod protocol;
mod logic;
mod routes;
mod session;
mod choices;
mod client;
mod play;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Settings;
use crate::domain::PatternType;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "pattern-quiz", version, about = "Pattern completion quiz backed by an LLM")]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run the HTTP service (default).
  Serve,
  /// Play in the terminal against a running service.
  Play {
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,
    /// numeric, symbolic or logical; random when omitted.
    #[arg(long = "type")]
    kind: Option<PatternType>,
    #[arg(long, default_value = ".pattern-quiz-progress.json")]
    progress_file: PathBuf,
    /// Also record each submission on this server-side user.
    #[arg(long)]
    user: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      telemetry::init_tracing(telemetry::SERVE_FILTER);
      serve(Settings::from_env()).await
    }
    Command::Play { server, kind, progress_file, user } => {
      telemetry::init_tracing(telemetry::PLAY_FILTER);
      play::run(play::PlayOptions { server, kind, progress_path: progress_file, user_id: user }).await
    }
  }
}

async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
  // Shared state: completion client, prompts, record store.
  let state = Arc::new(AppState::from_settings(&settings));
  state.warm_up();

  let app = build_router(state, cors_layer(&settings));

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "pattern_quiz", %addr, production = settings.production, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "pattern_quiz", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "pattern_quiz", error = %e, "Failed to listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
}
