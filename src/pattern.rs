//! Parsing of `sequence|answer|hint|type|difficulty` completions and their
//! normalization into a `Pattern`.

use tracing::warn;

use crate::config::EnumPolicy;
use crate::domain::{Difficulty, Pattern, PatternType};
use crate::error::FormatError;

pub const FIELD_NAMES: [&str; 5] = ["sequence", "answer", "hint", "type", "difficulty"];

/// The five trimmed segments of a completion, verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPattern {
  pub sequence: String,
  pub answer: String,
  pub hint: String,
  pub kind: String,
  pub difficulty: String,
}

/// Split on `|`, trim each segment, require exactly five non-empty segments.
pub fn parse_completion(text: &str) -> Result<RawPattern, FormatError> {
  let parts: Vec<&str> = text.trim().split('|').map(str::trim).collect();
  if parts.len() != FIELD_NAMES.len() {
    return Err(FormatError::WrongArity { found: parts.len() });
  }
  if let Some(i) = parts.iter().position(|p| p.is_empty()) {
    return Err(FormatError::EmptyField { field: FIELD_NAMES[i] });
  }
  Ok(RawPattern {
    sequence: parts[0].to_string(),
    answer: parts[1].to_string(),
    hint: parts[2].to_string(),
    kind: parts[3].to_string(),
    difficulty: parts[4].to_string(),
  })
}

/// Build the client-facing pattern.
///
/// The returned type is always the requested one (it is baked into the prompt);
/// a disagreeing model type is only logged. Difficulty is lower-cased and,
/// outside `easy|medium|hard`, either defaulted to `medium` or rejected per `policy`.
pub fn normalize(raw: RawPattern, requested: PatternType, policy: EnumPolicy) -> Result<Pattern, FormatError> {
  match raw.kind.parse::<PatternType>() {
    Ok(t) if t == requested => {}
    Ok(t) => warn!(target: "pattern", requested = %requested, reported = %t, "Model reported a different type; keeping requested"),
    Err(_) => {
      if policy == EnumPolicy::Strict {
        return Err(FormatError::InvalidValue { field: "type", value: raw.kind });
      }
      warn!(target: "pattern", reported = %raw.kind, "Model reported an unknown type; keeping requested");
    }
  }

  let difficulty = match raw.difficulty.parse::<Difficulty>() {
    Ok(d) => d,
    Err(_) if policy == EnumPolicy::Normalize => {
      warn!(target: "pattern", reported = %raw.difficulty, "Unknown difficulty; defaulting to medium");
      Difficulty::default()
    }
    Err(_) => return Err(FormatError::InvalidValue { field: "difficulty", value: raw.difficulty }),
  };

  Ok(Pattern {
    sequence: raw.sequence,
    answer: raw.answer,
    kind: requested,
    difficulty,
    hint: raw.hint,
    explanation: None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_and_trims_five_fields() {
    let raw = parse_completion("  2, 4, 6, 8, ? |10| arithmetic progression |numeric|Easy\n").unwrap();
    assert_eq!(raw.sequence, "2, 4, 6, 8, ?");
    assert_eq!(raw.answer, "10");
    assert_eq!(raw.hint, "arithmetic progression");
    assert_eq!(raw.kind, "numeric");
    assert_eq!(raw.difficulty, "Easy");
  }

  #[test]
  fn rejects_wrong_arity() {
    assert_eq!(
      parse_completion("2, 4, 6, 8, ?|10|arithmetic progression|numeric"),
      Err(FormatError::WrongArity { found: 4 })
    );
    assert_eq!(parse_completion("a|b|c|d|e|f"), Err(FormatError::WrongArity { found: 6 }));
    assert_eq!(parse_completion("no pipes at all"), Err(FormatError::WrongArity { found: 1 }));
  }

  #[test]
  fn rejects_empty_segments() {
    assert_eq!(parse_completion("a|  |c|numeric|easy"), Err(FormatError::EmptyField { field: "answer" }));
    assert_eq!(parse_completion("a|b|c|numeric|"), Err(FormatError::EmptyField { field: "difficulty" }));
  }

  #[test]
  fn normalizes_difficulty_case_and_keeps_requested_type() {
    let raw = parse_completion("A, C, E, G, ?|I|skip one letter|symbolic|HARD").unwrap();
    let p = normalize(raw, PatternType::Logical, EnumPolicy::Normalize).unwrap();
    assert_eq!(p.kind, PatternType::Logical);
    assert_eq!(p.difficulty, Difficulty::Hard);
  }

  #[test]
  fn unknown_difficulty_defaults_or_fails_by_policy() {
    let raw = parse_completion("1, 1, 2, 3, ?|5|fibonacci|numeric|brutal").unwrap();
    let p = normalize(raw.clone(), PatternType::Numeric, EnumPolicy::Normalize).unwrap();
    assert_eq!(p.difficulty, Difficulty::Medium);

    let err = normalize(raw, PatternType::Numeric, EnumPolicy::Strict).unwrap_err();
    assert_eq!(err, FormatError::InvalidValue { field: "difficulty", value: "brutal".into() });
  }

  #[test]
  fn strict_policy_rejects_unknown_type() {
    let raw = parse_completion("1, 1, 2, 3, ?|5|fibonacci|sequence|easy").unwrap();
    assert!(normalize(raw.clone(), PatternType::Numeric, EnumPolicy::Strict).is_err());
    assert!(normalize(raw, PatternType::Numeric, EnumPolicy::Normalize).is_ok());
  }
}
