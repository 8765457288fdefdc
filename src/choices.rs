//! Multiple-choice options for non-numeric patterns: the answer plus three
//! plausible distractors, shuffled.

use rand::{seq::SliceRandom, Rng};

use crate::domain::{Pattern, PatternType};
use crate::progress::answers_match;

const OPTION_COUNT: usize = 4;
const SYMBOL_POOL: [char; 6] = ['□', '○', '△', '◇', '♢', '♡'];
const MAX_DRAWS: usize = 256;

/// Numeric patterns are answered free-form and get no options.
pub fn multiple_choice<R: Rng + ?Sized>(pattern: &Pattern, rng: &mut R) -> Vec<String> {
  if pattern.kind == PatternType::Numeric {
    return Vec::new();
  }

  let answer = pattern.answer.as_str();
  let mut options = vec![answer.to_string()];
  let mut draws = 0;
  while options.len() < OPTION_COUNT && draws < MAX_DRAWS {
    draws += 1;
    let candidate = distractor(answer, pattern.kind, rng);
    if !options.contains(&candidate) {
      options.push(candidate);
    }
  }
  // Very short answers can exhaust the random space; pad deterministically.
  let mut n = 1;
  while options.len() < OPTION_COUNT {
    let candidate = format!("{answer}{}", SYMBOL_POOL[n % SYMBOL_POOL.len()].to_string().repeat(n));
    if !options.contains(&candidate) {
      options.push(candidate);
    }
    n += 1;
  }

  options.shuffle(rng);
  options
}

/// Each character survives with probability 1/2, otherwise it is swapped for
/// a pool symbol (symbolic) or a random lowercase letter (logical).
fn distractor<R: Rng + ?Sized>(answer: &str, kind: PatternType, rng: &mut R) -> String {
  answer
    .chars()
    .map(|ch| {
      if rng.gen_bool(0.5) {
        return ch;
      }
      match kind {
        PatternType::Symbolic => SYMBOL_POOL[rng.gen_range(0..SYMBOL_POOL.len())],
        _ => char::from(b'a' + rng.gen_range(0..26u8)),
      }
    })
    .collect()
}

/// Map a typed reply onto the options. A reply that matches an option's text
/// is taken as typed; otherwise "1".."4" selects by position.
pub fn resolve_choice(input: &str, options: &[String]) -> String {
  let input = input.trim();
  if options.iter().any(|o| answers_match(o, input)) {
    return input.to_string();
  }
  match input.parse::<usize>() {
    Ok(i) if (1..=options.len()).contains(&i) => options[i - 1].clone(),
    _ => input.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;
  use rand::{rngs::StdRng, SeedableRng};

  fn pattern(kind: PatternType, answer: &str) -> Pattern {
    Pattern {
      sequence: "?".into(),
      answer: answer.into(),
      kind,
      difficulty: Difficulty::Medium,
      hint: String::new(),
      explanation: None,
    }
  }

  #[test]
  fn numeric_patterns_have_no_options() {
    let mut rng = StdRng::seed_from_u64(7);
    assert!(multiple_choice(&pattern(PatternType::Numeric, "10"), &mut rng).is_empty());
  }

  #[test]
  fn four_distinct_options_including_answer() {
    let mut rng = StdRng::seed_from_u64(42);
    for (kind, answer) in [(PatternType::Symbolic, "∑∫∂"), (PatternType::Logical, "queue"), (PatternType::Logical, "x")] {
      let opts = multiple_choice(&pattern(kind, answer), &mut rng);
      assert_eq!(opts.len(), 4);
      assert!(opts.iter().any(|o| o == answer));
      let mut dedup = opts.clone();
      dedup.sort();
      dedup.dedup();
      assert_eq!(dedup.len(), 4, "options must be distinct: {opts:?}");
    }
  }

  #[test]
  fn symbolic_distractors_only_use_answer_or_pool_chars() {
    let mut rng = StdRng::seed_from_u64(3);
    let opts = multiple_choice(&pattern(PatternType::Symbolic, "∪∩"), &mut rng);
    for o in &opts {
      assert!(o.chars().all(|c| "∪∩".contains(c) || SYMBOL_POOL.contains(&c)), "{o}");
    }
  }

  #[test]
  fn numbered_replies_select_options() {
    let opts = vec!["a".to_string(), "b".to_string()];
    assert_eq!(resolve_choice(" 2 ", &opts), "b");
    assert_eq!(resolve_choice("3", &opts), "3");
    assert_eq!(resolve_choice("free text", &opts), "free text");
  }

  #[test]
  fn digit_answers_typed_literally_are_not_indexes() {
    let opts: Vec<String> = ["g", "s", "u", "3"].iter().map(|s| s.to_string()).collect();
    assert_eq!(resolve_choice(" 3 ", &opts), "3");
    assert_eq!(resolve_choice("2", &opts), "s");

    let mut session = crate::session::GameSession::default();
    session.load_pattern(pattern(PatternType::Logical, "3"));
    let answer = resolve_choice("3", &opts);
    assert!(matches!(session.submit(&answer), Ok(crate::session::Submission::Correct { .. })));
  }
}
