//! Domain models: pattern classification, the pattern itself, AI hints and the
//! persisted user/pattern records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::progress::Progress;

/// What kind of sequence is presented to the user?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
  Numeric,
  Symbolic,
  Logical,
}

impl PatternType {
  pub const ALL: [PatternType; 3] = [PatternType::Numeric, PatternType::Symbolic, PatternType::Logical];

  pub fn as_str(&self) -> &'static str {
    match self {
      PatternType::Numeric => "numeric",
      PatternType::Symbolic => "symbolic",
      PatternType::Logical => "logical",
    }
  }

  /// Uniform pick used when the client does not ask for a type.
  pub fn random() -> Self {
    *Self::ALL.choose(&mut rand::thread_rng()).unwrap_or(&PatternType::Numeric)
  }
}

impl Default for PatternType {
  fn default() -> Self { PatternType::Numeric }
}

impl fmt::Display for PatternType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PatternType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "numeric" => Ok(PatternType::Numeric),
      "symbolic" => Ok(PatternType::Symbolic),
      "logical" => Ok(PatternType::Logical),
      other => Err(format!("unknown pattern type '{other}'")),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::Medium }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(format!("unknown difficulty '{other}'")),
    }
  }
}

/// A quiz sequence plus its answer, hint, classification and difficulty.
/// Immutable once handed to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
  pub sequence: String,
  pub answer: String,
  #[serde(rename = "type")]
  pub kind: PatternType,
  pub difficulty: Difficulty,
  #[serde(default)]
  pub hint: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

/// Per-attempt hint. `reasoning` is synthesized locally, never model output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiHint {
  pub hint: String,
  pub confidence: f64,
  pub reasoning: String,
}

/// Persisted user with the server-side mirror of their progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub id: String,
  pub username: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub progress: Progress,
}

/// A pattern a user chose to keep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
  pub id: String,
  pub pattern: Pattern,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn enums_parse_case_insensitively() {
    assert_eq!(" Symbolic ".parse::<PatternType>(), Ok(PatternType::Symbolic));
    assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
    assert!("fuzzy".parse::<PatternType>().is_err());
    assert!("extreme".parse::<Difficulty>().is_err());
  }

  #[test]
  fn pattern_uses_wire_field_names() {
    let p = Pattern {
      sequence: "2, 4, 6, 8, ?".into(),
      answer: "10".into(),
      kind: PatternType::Numeric,
      difficulty: Difficulty::Easy,
      hint: "arithmetic progression".into(),
      explanation: None,
    };
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(
      v,
      serde_json::json!({
        "sequence": "2, 4, 6, 8, ?",
        "answer": "10",
        "type": "numeric",
        "difficulty": "easy",
        "hint": "arithmetic progression"
      })
    );
  }

  #[test]
  fn random_type_is_one_of_the_three() {
    for _ in 0..20 {
      assert!(PatternType::ALL.contains(&PatternType::random()));
    }
  }
}
