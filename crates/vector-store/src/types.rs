use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which granularity a text unit covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    File,
    Function,
}

/// One embeddable excerpt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextUnit {
    /// `FILE::{path}` or `FUNC::{path}::{qualname}`
    pub uid: String,
    pub kind: UnitKind,
    pub file_path: String,
    pub qualified_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// A unit matched by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub uid: String,
    pub score: f32,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
}

/// Token accounting reported by a remote capability.
///
/// Chat-style backends report `prompt_tokens`/`completion_tokens`, newer ones
/// `input_tokens`/`output_tokens`; either pair is accepted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
}

impl TokenUsage {
    #[must_use]
    pub fn input(&self) -> u64 {
        self.prompt_tokens
            .filter(|n| *n > 0)
            .or(self.input_tokens)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn output(&self) -> u64 {
        self.completion_tokens
            .filter(|n| *n > 0)
            .or(self.output_tokens)
            .unwrap_or(0)
    }
}
