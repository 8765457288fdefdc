//! Service settings (environment) and prompt templates (defaults or TOML).
//!
//! Settings are read through a lookup function so tests can feed a map
//! instead of mutating the process environment.

use serde::Deserialize;
use tracing::{error, info, warn};

/// What to do with a difficulty the model made up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnumPolicy {
  /// Lower-case and substitute `medium` when outside the enumeration.
  Normalize,
  /// Treat it as a format failure (triggers the fallback path).
  Strict,
}

#[derive(Clone, Debug)]
pub struct OpenAiSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub fast_model: String,
  pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub mongodb_uri: Option<String>,
  pub mongodb_db: String,
  pub openai: Option<OpenAiSettings>,
  pub production: bool,
  pub allowed_origins: Vec<String>,
  pub enum_policy: EnumPolicy,
  pub prompts_path: Option<String>,
}

impl Settings {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = match get("PORT") {
      Some(p) => p.parse::<u16>().unwrap_or_else(|e| {
        warn!(target: "pattern_quiz", port = %p, error = %e, "Invalid PORT, using 3000");
        3000
      }),
      None => 3000,
    };

    let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
      api_key,
      base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
      model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4-turbo-preview".into()),
      fast_model: get("OPENAI_FAST_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".into()),
      timeout_secs: get("OPENAI_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(20),
    });

    let env_name = get("APP_ENV").or_else(|| get("NODE_ENV")).unwrap_or_default();

    let enum_policy = match get("PATTERN_ENUM_POLICY").as_deref() {
      Some("strict") => EnumPolicy::Strict,
      Some("normalize") | None => EnumPolicy::Normalize,
      Some(other) => {
        warn!(target: "pattern_quiz", policy = %other, "Unknown PATTERN_ENUM_POLICY, using 'normalize'");
        EnumPolicy::Normalize
      }
    };

    Self {
      port,
      mongodb_uri: get("MONGODB_URI"),
      mongodb_db: get("MONGODB_DB").unwrap_or_else(|| "pattern_quiz".into()),
      openai,
      production: env_name.eq_ignore_ascii_case("production"),
      allowed_origins: get("ALLOWED_ORIGINS")
        .map(|s| s.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
        .unwrap_or_default(),
      enum_policy,
      prompts_path: get("PROMPTS_CONFIG_PATH"),
    }
  }
}

/// Prompt templates. Placeholders: `{type}` for generation; `{sequence}`,
/// `{type}`, `{difficulty}`, `{attempts}` and `{hint}` for hint/confidence.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub pattern_system: String,
  pub pattern_user: String,
  pub fallback_system: String,
  pub fallback_user: String,
  pub hint_system: String,
  pub hint_user: String,
  pub confidence_system: String,
  pub confidence_user: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      pattern_system: "You are an advanced pattern generation system for college students.
Generate a challenging college-level pattern of type: {type}

For NUMERIC patterns:
- Use advanced mathematical concepts (calculus, number theory, complex functions)
- Include sequences that test mathematical understanding
- Consider using series, progressions, or mathematical relationships

For SYMBOLIC patterns:
- Use mathematical or logical symbols (∑, ∏, ∫, ∂, ∮, ∪, ∩, ⊂, ⊃, ∈, ∉, etc.)
- Create meaningful progressions in mathematical notation
- Consider patterns from set theory, calculus, or logic

For LOGICAL patterns:
- Use programming concepts, scientific terms, or academic sequences
- Create patterns that test understanding of relationships
- Consider computer science, mathematics, or scientific concepts

IMPORTANT:
1. Response must be in format: sequence|answer|hint|{type}|difficulty
2. Sequence should have 4 visible items and 1 hidden (?)
3. Make it challenging but solvable
4. Ensure hint is helpful but doesn't give away the answer
5. Difficulty must be one of: easy, medium, hard".into(),
      pattern_user: "Generate a challenging college-level {type} pattern. Respond only with the pattern in the specified format.".into(),
      fallback_system: "Generate a simple but engaging {type} pattern for error recovery.
Must follow format: sequence|answer|hint|{type}|difficulty
Keep it straightforward but interesting.".into(),
      fallback_user: "Generate a fallback pattern.".into(),
      hint_system: "You are an advanced pattern analysis assistant for college students.
Given a sequence and its type:
1. Analyze the pattern's underlying mathematical, logical, or symbolic structure
2. Provide progressive hints based on the number of previous attempts, the pattern complexity and academic level concepts
3. Never reveal the answer directly
4. Include relevant academic concepts in hints
5. Guide students toward understanding the pattern's logic".into(),
      hint_user: "Pattern: {sequence}\nType: {type}\nPrevious attempts: {attempts}\nDifficulty: {difficulty}\nProvide a helpful hint.".into(),
      confidence_system: "Rate the pattern complexity and hint effectiveness. Return only a number between 0 and 1.".into(),
      confidence_user: "Pattern: {sequence}\nHint given: \"{hint}\"\nRate confidence (0-1):".into(),
    }
  }
}

#[derive(Debug, Deserialize, Default)]
struct PromptsFile {
  #[serde(default)]
  prompts: Prompts,
}

/// Load prompt overrides from TOML. Missing keys keep their defaults; any IO
/// or parse error falls back to the built-in prompts.
pub fn load_prompts(path: Option<&str>) -> Prompts {
  let Some(path) = path else {
    return Prompts::default();
  };
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<PromptsFile>(&s) {
      Ok(file) => {
        info!(target: "pattern_quiz", %path, "Loaded prompt overrides (TOML)");
        file.prompts
      }
      Err(e) => {
        error!(target: "pattern_quiz", %path, error = %e, "Failed to parse prompts TOML; using defaults");
        Prompts::default()
      }
    },
    Err(e) => {
      error!(target: "pattern_quiz", %path, error = %e, "Failed to read prompts TOML; using defaults");
      Prompts::default()
    }
  }
}
