use crate::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Which embedding backend the driver wires in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbedBackend {
    /// Deterministic hash-seeded vectors, no network
    #[default]
    Stub,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

impl FromStr for EmbedBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown embedding backend '{other}'")),
        }
    }
}

/// Tunable heuristics used by the candidate generators.
///
/// Full-location candidates rank by match kind first (line anchor, function,
/// class element, module fallback); these magnitudes order candidates of the
/// same kind and cap the scores reported below a stronger group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub line_anchor_score: f64,
    pub line_anchor_confidence: f64,
    pub function_match_score: f64,
    pub class_element_score: f64,
    pub module_fallback_score: f64,
    pub qualname_token_bonus: f64,
    pub path_token_bonus: f64,
    pub neighbor_window: usize,
    pub neighbor_discount: f64,
    pub neighbor_floor: f64,
    pub partial_heuristic_confidence: f64,
    pub retrieval_pad_discount: f64,
    pub retrieval_pad_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            line_anchor_score: 0.8,
            line_anchor_confidence: 0.6,
            function_match_score: 0.9,
            class_element_score: 0.75,
            module_fallback_score: 0.3,
            qualname_token_bonus: 0.15,
            path_token_bonus: 0.05,
            neighbor_window: 60,
            neighbor_discount: 0.3,
            neighbor_floor: 0.2,
            partial_heuristic_confidence: 0.4,
            retrieval_pad_discount: 0.2,
            retrieval_pad_floor: 0.2,
        }
    }
}

/// Process-wide settings, built once by the driver and passed down explicitly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaultlocConfig {
    pub llm_model: String,
    pub llm_base_url: String,
    pub llm_max_retries: u32,
    pub llm_timeout_secs: u64,

    pub embed_model: String,
    pub embed_backend: EmbedBackend,
    pub embed_batch_size: usize,
    /// Vector size of the stub backend
    pub embed_dimension: usize,

    pub classification_temperature: f32,
    pub extraction_temperature: f32,
    pub reasoning_temperature: f32,

    /// Per-instance wall-clock limit
    pub time_limit_secs: u64,
    /// Per-instance spend limit
    pub cost_limit_usd: f64,
    pub price_input_per_1k: f64,
    pub price_output_per_1k: f64,

    pub max_files_for_embedding: usize,
    pub max_functions_for_embedding: usize,

    pub default_topk: usize,
    pub max_locations_per_group: usize,

    /// Ask the classification capability for a second opinion (recorded only)
    pub advisory_classification: bool,

    pub scoring: ScoringConfig,
}

impl Default for FaultlocConfig {
    fn default() -> Self {
        Self {
            llm_model: "gpt-4o-2024-05-13".to_string(),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_max_retries: 3,
            llm_timeout_secs: 120,
            embed_model: "text-embedding-3-small".to_string(),
            embed_backend: EmbedBackend::Stub,
            embed_batch_size: 16,
            embed_dimension: 384,
            classification_temperature: 0.0,
            extraction_temperature: 0.0,
            reasoning_temperature: 0.1,
            time_limit_secs: 3000,
            cost_limit_usd: 0.5,
            price_input_per_1k: 0.0,
            price_output_per_1k: 0.0,
            max_files_for_embedding: 4000,
            max_functions_for_embedding: 20000,
            default_topk: 2,
            max_locations_per_group: 20,
            advisory_classification: false,
            scoring: ScoringConfig::default(),
        }
    }
}

impl FaultlocConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LocatorError::ConfigError(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LocatorError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay `FL_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay `FL_*` variables from `lookup`.
    ///
    /// Blank values are ignored; unparseable ones keep the previous value.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("FL_LLM_MODEL") {
            self.llm_model = v;
        }
        if let Some(v) = get("FL_LLM_BASE_URL") {
            self.llm_base_url = v;
        }
        if let Some(v) = get("FL_EMBED_MODEL") {
            self.embed_model = v;
        }
        set_parsed(&get, "FL_EMBED_BACKEND", &mut self.embed_backend);
        set_parsed(&get, "FL_EMBED_BATCH_SIZE", &mut self.embed_batch_size);
        set_parsed(&get, "FL_CLASSIFY_TEMP", &mut self.classification_temperature);
        set_parsed(&get, "FL_EXTRACT_TEMP", &mut self.extraction_temperature);
        set_parsed(&get, "FL_REASON_TEMP", &mut self.reasoning_temperature);
        set_parsed(&get, "FL_TIME_LIMIT_SEC", &mut self.time_limit_secs);
        set_parsed(&get, "FL_COST_LIMIT_USD", &mut self.cost_limit_usd);
        set_parsed(&get, "FL_MAX_FILES_EMBED", &mut self.max_files_for_embedding);
        set_parsed(&get, "FL_MAX_FUNCS_EMBED", &mut self.max_functions_for_embedding);
        set_parsed(&get, "FL_TOPK", &mut self.default_topk);
        set_parsed(&get, "FL_MAX_LOCS_PER_GROUP", &mut self.max_locations_per_group);
        set_parsed(&get, "FL_PRICE_IN_1K", &mut self.price_input_per_1k);
        set_parsed(&get, "FL_PRICE_OUT_1K", &mut self.price_output_per_1k);
    }
}

fn set_parsed<T, G>(get: &G, key: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *slot = value,
        Err(e) => log::warn!("Ignoring {key}={raw}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = FaultlocConfig::from_toml_str(
            "llm_model = \"local-model\"\ncost_limit_usd = 2.5\n\n[scoring]\nneighbor_window = 10\n",
        )
        .unwrap();

        assert_eq!(config.llm_model, "local-model");
        assert_eq!(config.cost_limit_usd, 2.5);
        assert_eq!(config.scoring.neighbor_window, 10);
        assert_eq!(config.scoring.function_match_score, 0.9);
        assert_eq!(config.default_topk, 2);
        assert_eq!(config.embed_backend, EmbedBackend::Stub);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = FaultlocConfig::from_toml_str("default_topk = \"two\"").unwrap_err();
        assert!(matches!(err, LocatorError::ConfigError(_)));
    }

    #[test]
    fn env_overlay_parses_and_skips_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FL_TOPK", "5"),
            ("FL_TIME_LIMIT_SEC", "soon"),
            ("FL_EMBED_BACKEND", "HTTP"),
            ("FL_LLM_MODEL", "   "),
            ("FL_PRICE_IN_1K", "0.005"),
        ]);
        let mut config = FaultlocConfig::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.default_topk, 5);
        assert_eq!(config.time_limit_secs, 3000);
        assert_eq!(config.embed_backend, EmbedBackend::Http);
        assert_eq!(config.llm_model, "gpt-4o-2024-05-13");
        assert_eq!(config.price_input_per_1k, 0.005);
    }

    #[test]
    fn specific_signals_outrank_fallbacks() {
        let s = ScoringConfig::default();
        assert!(s.line_anchor_score > s.class_element_score);
        assert!(s.function_match_score > s.class_element_score);
        assert!(s.class_element_score > s.module_fallback_score);
    }
}
