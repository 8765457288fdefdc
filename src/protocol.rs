//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable so backend and client can evolve independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Pattern, PatternRecord};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateIn {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Failure envelope for pattern generation; `fallback` is present only when
/// the simplified prompt still produced a usable pattern.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateErrorOut {
    pub error: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Pattern>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HintIn {
    pub pattern: Pattern,
    #[serde(rename = "userAttempts")]
    pub user_attempts: u32,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub database: &'static str,
    pub openai: bool,
}

#[derive(Serialize)]
pub struct RootOut {
    pub message: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub generate_pattern: &'static str,
    pub get_hint: &'static str,
    #[serde(rename = "testOpenAI")]
    pub test_openai: &'static str,
}

#[derive(Serialize)]
pub struct ModelsOut {
    pub status: &'static str,
    pub models: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserIn {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressIn {
    pub attempts: u32,
    pub correct: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePatternIn {
    pub pattern: Pattern,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct PatternListOut {
    pub patterns: Vec<PatternRecord>,
}
