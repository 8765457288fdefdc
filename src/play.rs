//! Terminal front end: drives a `GameSession` against a running pattern service.
//!
//! Commands: `:new`, `:type <numeric|symbolic|logical|random>`, `:reveal`,
//! `:stats`, `:quit`; anything else is an answer ("1".."4" picks an option).

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use crate::choices::{multiple_choice, resolve_choice};
use crate::client::BackendClient;
use crate::domain::PatternType;
use crate::progress::Progress;
use crate::session::{GameSession, Submission};

pub struct PlayOptions {
  pub server: String,
  pub kind: Option<PatternType>,
  pub progress_path: PathBuf,
  pub user_id: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
  New,
  SetType(Option<PatternType>),
  Reveal,
  Stats,
  Quit,
  Answer(String),
  Unknown(String),
}

fn parse_command(line: &str) -> Command {
  let line = line.trim();
  let Some(rest) = line.strip_prefix(':') else {
    return Command::Answer(line.to_string());
  };
  let mut parts = rest.split_whitespace();
  match (parts.next(), parts.next()) {
    (Some("new" | "n"), _) => Command::New,
    (Some("reveal" | "r"), _) => Command::Reveal,
    (Some("stats" | "s"), _) => Command::Stats,
    (Some("quit" | "q"), _) => Command::Quit,
    (Some("type" | "t"), Some("random")) => Command::SetType(None),
    (Some("type" | "t"), Some(t)) => match t.parse() {
      Ok(k) => Command::SetType(Some(k)),
      Err(e) => Command::Unknown(e),
    },
    _ => Command::Unknown(format!("unknown command '{line}'")),
  }
}

fn print_stats(p: &Progress, score: u32) {
  println!("Score: {score}");
  println!(
    "Total score {} | success rate {}% | games played {} | avg. attempts {:.1}",
    p.total_score,
    p.success_rate(),
    p.games_played,
    p.average_attempts
  );
}

pub async fn run(opts: PlayOptions) -> Result<(), Box<dyn std::error::Error>> {
  let client = BackendClient::new(&opts.server)?;
  let progress = Progress::load(&opts.progress_path).unwrap_or_else(|e| {
    warn!(target: "pattern_quiz", path = %opts.progress_path.display(), error = %e, "Unreadable progress file; starting fresh");
    Progress::default()
  });
  let mut session = GameSession::new(progress);
  let mut kind = opts.kind;
  let mut options: Vec<String> = Vec::new();

  println!("Pattern Completion. Commands: :new  :type <t>  :reveal  :stats  :quit");

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut command = Command::New;
  loop {
    match command {
      Command::Quit => break,
      Command::New => match client.generate_pattern(kind).await {
        Ok(p) => {
          options = multiple_choice(&p, &mut rand::thread_rng());
          println!("\n[{} · {}]  {}", p.kind, p.difficulty, p.sequence);
          for (i, o) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, o);
          }
          session.load_pattern(p);
        }
        Err(e) => {
          error!(target: "pattern_quiz", error = %e, "Pattern generation failed");
          println!("Failed to generate pattern. Please try again.");
        }
      },
      Command::SetType(k) => {
        kind = k;
        println!("Pattern type: {}", k.map(|k| k.as_str()).unwrap_or("random"));
      }
      Command::Reveal => match session.reveal_answer() {
        Ok(fb) => {
          println!("{}", fb.message);
          if let Some(x) = &fb.explanation {
            println!("{x}");
          }
        }
        Err(e) => println!("{e}"),
      },
      Command::Stats => print_stats(session.progress(), session.score()),
      Command::Answer(input) => {
        let answer = resolve_choice(&input, &options);
        match session.submit(&answer) {
          Ok(outcome) => {
            if let Some(fb) = session.feedback() {
              println!("{}", fb.message);
            }
            let (attempts, correct) = match outcome {
              Submission::Correct { points, attempts } => {
                println!("+{points} points");
                (attempts, true)
              }
              Submission::Incorrect { attempts, reveal_unlocked } => {
                if let Some(p) = session.pattern().cloned() {
                  let hint = client.get_hint(&p, attempts).await;
                  println!("Hint ({:.0}% confidence): {}", hint.confidence * 100.0, hint.hint);
                  session.apply_hint(hint);
                }
                if !reveal_unlocked {
                  println!("{}", session.reveal_label());
                }
                (attempts, false)
              }
            };
            if let Err(e) = session.progress().save(&opts.progress_path) {
              warn!(target: "pattern_quiz", error = %e, "Failed to save progress");
            }
            if let Some(user_id) = &opts.user_id {
              if let Err(e) = client.record_progress(user_id, attempts, correct).await {
                warn!(target: "pattern_quiz", %user_id, error = %e, "Failed to sync progress");
              }
            }
          }
          Err(e) => println!("{e}"),
        }
      }
      Command::Unknown(msg) => println!("{msg}"),
    }

    match lines.next_line().await? {
      Some(line) if line.trim().is_empty() => command = Command::Unknown("Type an answer or a command.".into()),
      Some(line) => command = parse_command(&line),
      None => break,
    }
  }

  print_stats(session.progress(), session.score());
  Ok(())
}
