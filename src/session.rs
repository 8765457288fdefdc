//! Client-side game flow over one active pattern.
//!
//! `Idle -> PatternShown -> submit -> Solved | PatternShown (+ hint)`, with a
//! reveal action that unlocks after three incorrect attempts.

use thiserror::Error;

use crate::domain::{AiHint, Pattern, PatternType};
use crate::progress::{answers_match, points_for_attempt, Progress, REVEAL_AFTER_ATTEMPTS};

const DEFAULT_EXPLANATION: &str = "Keep practicing to improve your pattern recognition!";
const LOCAL_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Idle,
  PatternShown,
  Solved,
  Revealed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
  Success,
  Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feedback {
  pub message: String,
  pub kind: FeedbackKind,
  pub explanation: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
  Correct { points: u32, attempts: u32 },
  /// The caller should fetch a hint for `attempts` and hand it to `apply_hint`.
  Incorrect { attempts: u32, reveal_unlocked: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("Please generate a pattern first.")]
  NoPattern,
  #[error("Enter an answer first.")]
  EmptyAnswer,
  #[error("Show Answer needs {remaining} more attempt(s)")]
  RevealLocked { remaining: u32 },
}

#[derive(Debug, Default)]
pub struct GameSession {
  pattern: Option<Pattern>,
  attempts: u32,
  score: u32,
  hint: Option<AiHint>,
  feedback: Option<Feedback>,
  progress: Progress,
  solved: bool,
  revealed: bool,
}

impl GameSession {
  pub fn new(progress: Progress) -> Self {
    Self { progress, ..Self::default() }
  }

  pub fn phase(&self) -> Phase {
    match (&self.pattern, self.solved, self.revealed) {
      (None, _, _) => Phase::Idle,
      (Some(_), true, _) => Phase::Solved,
      (Some(_), _, true) => Phase::Revealed,
      (Some(_), false, false) => Phase::PatternShown,
    }
  }

  pub fn pattern(&self) -> Option<&Pattern> { self.pattern.as_ref() }
  pub fn attempts(&self) -> u32 { self.attempts }
  pub fn score(&self) -> u32 { self.score }
  pub fn hint(&self) -> Option<&AiHint> { self.hint.as_ref() }
  pub fn feedback(&self) -> Option<&Feedback> { self.feedback.as_ref() }
  pub fn progress(&self) -> &Progress { &self.progress }

  /// Show a fresh pattern; per-pattern state starts over.
  pub fn load_pattern(&mut self, pattern: Pattern) {
    self.pattern = Some(pattern);
    self.attempts = 0;
    self.hint = None;
    self.feedback = None;
    self.solved = false;
    self.revealed = false;
  }

  pub fn submit(&mut self, answer: &str) -> Result<Submission, SessionError> {
    if self.phase() != Phase::PatternShown {
      return Err(SessionError::NoPattern);
    }
    if answer.trim().is_empty() {
      return Err(SessionError::EmptyAnswer);
    }
    let expected = self.pattern.as_ref().map(|p| p.answer.as_str()).unwrap_or_default();

    self.attempts += 1;
    let attempts = self.attempts;

    if answers_match(expected, answer) {
      let points = points_for_attempt(attempts);
      self.score += points;
      self.progress.record(points, attempts, true);
      self.feedback = Some(Feedback { message: "Correct! Well done!".into(), kind: FeedbackKind::Success, explanation: None });
      self.attempts = 0;
      self.solved = true;
      return Ok(Submission::Correct { points, attempts });
    }

    self.progress.record(0, attempts, false);
    let message = match attempts {
      1 => "Not quite right. Try looking at the pattern more carefully!",
      REVEAL_AFTER_ATTEMPTS => "Still incorrect. You can now use the Show Answer button below.",
      _ => "Still incorrect. Check the AI hint below for guidance!",
    };
    self.feedback = Some(Feedback { message: message.into(), kind: FeedbackKind::Error, explanation: None });
    Ok(Submission::Incorrect { attempts, reveal_unlocked: self.can_reveal() })
  }

  /// Attach the hint fetched after an incorrect submission.
  pub fn apply_hint(&mut self, hint: AiHint) {
    if self.phase() == Phase::PatternShown {
      self.hint = Some(hint);
    }
  }

  pub fn can_reveal(&self) -> bool {
    self.phase() == Phase::PatternShown && self.attempts >= REVEAL_AFTER_ATTEMPTS
  }

  pub fn reveal_label(&self) -> String {
    if self.attempts >= REVEAL_AFTER_ATTEMPTS {
      "Show Answer".into()
    } else {
      format!("Show Answer ({} more attempts needed)", REVEAL_AFTER_ATTEMPTS - self.attempts)
    }
  }

  pub fn reveal_answer(&mut self) -> Result<&Feedback, SessionError> {
    if self.phase() != Phase::PatternShown {
      return Err(SessionError::NoPattern);
    }
    if !self.can_reveal() {
      return Err(SessionError::RevealLocked { remaining: REVEAL_AFTER_ATTEMPTS - self.attempts });
    }
    let (answer, explanation) = match &self.pattern {
      Some(p) => (p.answer.clone(), p.explanation.clone().filter(|e| !e.is_empty())),
      None => return Err(SessionError::NoPattern),
    };
    self.revealed = true;
    Ok(&*self.feedback.insert(Feedback {
      message: format!("The correct answer is: {answer}"),
      kind: FeedbackKind::Error,
      explanation: Some(explanation.unwrap_or_else(|| DEFAULT_EXPLANATION.into())),
    }))
  }
}

/// Offline hint used when the backend cannot produce one. Gets more specific
/// with attempts and never contains the answer.
pub fn local_hint(pattern: &Pattern, attempts: u32) -> AiHint {
  let early = attempts < REVEAL_AFTER_ATTEMPTS;
  let hint = match pattern.kind {
    _ if attempts <= 1 && !pattern.hint.is_empty() => pattern.hint.clone(),
    PatternType::Numeric if early => "Look at the differences between consecutive numbers.".to_string(),
    PatternType::Numeric => {
      "Check whether the differences themselves form a pattern, or whether each term is a power or product of its position.".to_string()
    }
    PatternType::Symbolic if early => "Watch how each symbol changes form from one step to the next.".to_string(),
    PatternType::Symbolic => {
      "Group the symbols by family (sums and products, integrals and derivatives, set relations) and follow the progression.".to_string()
    }
    PatternType::Logical if early => "Think about what links each item to the next: order, category, or a rule.".to_string(),
    PatternType::Logical => "Name the rule for the first two items, then test it on the rest.".to_string(),
  };
  AiHint {
    hint,
    confidence: LOCAL_CONFIDENCE,
    reasoning: format!("Local hint based on {} pattern and {} attempts", pattern.kind, attempts),
  }
}
