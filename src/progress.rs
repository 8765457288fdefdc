//! Scoring rule and the running progress statistics kept per player.

use std::{io, path::Path};

use serde::{Deserialize, Serialize};

/// Incorrect attempts needed before the answer may be revealed.
pub const REVEAL_AFTER_ATTEMPTS: u32 = 3;

/// Points for a correct answer on attempt `attempt` (1-based): `max(10 - 2a, 5)`.
pub fn points_for_attempt(attempt: u32) -> u32 {
  10u32.saturating_sub(attempt.saturating_mul(2)).max(5)
}

/// Case-insensitive, whitespace-trimmed answer comparison.
pub fn answers_match(expected: &str, given: &str) -> bool {
  expected.trim().to_lowercase() == given.trim().to_lowercase()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  pub total_score: u32,
  pub correct_answers: u32,
  pub games_played: u32,
  pub average_attempts: f64,
}

impl Progress {
  /// Fold one answer submission into the running statistics.
  /// Every submission counts as a play; `average_attempts` is the running mean
  /// of the attempt number reported with each submission.
  pub fn record(&mut self, points: u32, attempts: u32, correct: bool) {
    let previous = self.games_played as f64;
    self.games_played += 1;
    self.total_score += points;
    if correct {
      self.correct_answers += 1;
    }
    self.average_attempts = (self.average_attempts * previous + attempts as f64) / self.games_played as f64;
  }

  /// Success rate in whole percent; 0 before anything was played.
  pub fn success_rate(&self) -> u32 {
    if self.games_played == 0 {
      return 0;
    }
    ((self.correct_answers as f64 / self.games_played as f64) * 100.0).round() as u32
  }

  /// Read locally stored progress; a missing file is a fresh start.
  pub fn load(path: &Path) -> io::Result<Self> {
    match std::fs::read_to_string(path) {
      Ok(s) => Ok(serde_json::from_str(&s)?),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
      Err(e) => Err(e),
    }
  }

  pub fn save(&self, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)
  }
}
