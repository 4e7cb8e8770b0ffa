use faultloc_symbols::{Span, SymbolEntry, SymbolKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// How much location information an issue carries, strongest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    FullLocation,
    Partial,
    Hint,
    NoHint,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullLocation => "FULL_LOCATION",
            Self::Partial => "PARTIAL",
            Self::Hint => "HINT",
            Self::NoHint => "NO_HINT",
        }
    }

    /// Parse a capability-reported category; anything unrecognised is HINT
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "FULL_LOCATION" => Self::FullLocation,
            "PARTIAL" => Self::Partial,
            "NO_HINT" => Self::NoHint,
            _ => Self::Hint,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of editable unit a location points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Function,
    ClassElement,
    ModuleSymbol,
}

impl LocationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::ClassElement => "CLASS_ELEMENT",
            Self::ModuleSymbol => "MODULE_SYMBOL",
        }
    }
}

impl From<SymbolKind> for LocationKind {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => Self::Function,
            SymbolKind::ClassElement => Self::ClassElement,
            SymbolKind::Class | SymbolKind::ModuleSymbol => Self::ModuleSymbol,
        }
    }
}

/// One candidate edit point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuggyLocation {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    #[serde(rename = "file")]
    pub file_path: String,
    #[serde(rename = "qualname")]
    pub qualified_name: Option<String>,
    #[serde(with = "external_span")]
    pub span: Span,
    #[serde(default)]
    pub anchor_line: Option<usize>,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Map<String, Value>,
}

impl BuggyLocation {
    /// Location for an indexed symbol
    #[must_use]
    pub fn from_symbol(file: &str, entry: &SymbolEntry, confidence: f64) -> Self {
        Self {
            kind: entry.kind.into(),
            file_path: file.to_string(),
            qualified_name: Some(entry.qualified_name.clone()),
            span: entry.span,
            anchor_line: None,
            confidence,
            evidence: Map::new(),
        }
    }

    #[must_use]
    pub fn with_evidence(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    /// `(file, qualname)`, or `(file, kind)` for unnamed locations
    #[must_use]
    pub fn symbol_key(&self) -> (String, String) {
        (
            self.file_path.clone(),
            self.qualified_name
                .clone()
                .unwrap_or_else(|| self.kind.as_str().to_string()),
        )
    }
}

/// One ranked fix hypothesis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateGroup {
    /// 1-based, dense
    pub rank: usize,
    pub score: f64,
    #[serde(default)]
    pub rationale: Map<String, Value>,
    pub locations: Vec<BuggyLocation>,
}

impl CandidateGroup {
    #[must_use]
    pub fn new(rank: usize, score: f64, mode: &str, locations: Vec<BuggyLocation>) -> Self {
        let mut rationale = Map::new();
        rationale.insert("mode".to_string(), Value::String(mode.to_string()));
        Self {
            rank,
            score,
            rationale,
            locations,
        }
    }
}

/// Raw mentions reported by the extraction capability
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CueBundle {
    pub file_mentions: Vec<String>,
    pub module_mentions: Vec<String>,
    pub class_mentions: Vec<String>,
    pub function_mentions: Vec<String>,
    pub line_mentions: Vec<String>,
    pub other_clues: Vec<String>,
}

impl CueBundle {
    /// Lenient conversion from a capability response.
    ///
    /// Missing or non-list fields become empty; non-string items are
    /// stringified so line numbers given as integers survive.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let list = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(scalar_to_string).collect())
                .unwrap_or_default()
        };
        Self {
            file_mentions: list("file_mentions"),
            module_mentions: list("module_mentions"),
            class_mentions: list("class_mentions"),
            function_mentions: list("function_mentions"),
            line_mentions: list("line_mentions"),
            other_clues: list("other_clues"),
        }
    }
}

/// Stringify a JSON scalar; null and containers yield nothing
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Canonicalised cues used for resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedCues {
    pub file_candidates: Vec<String>,
    pub module_candidates: Vec<String>,
    pub class_candidates: Vec<String>,
    pub function_candidates: Vec<String>,
    pub line_numbers: Vec<usize>,
    pub raw: CueBundle,
}

impl NormalizedCues {
    /// Whether any location-shaped cue is present
    #[must_use]
    pub fn has_location_parts(&self) -> bool {
        !(self.file_candidates.is_empty()
            && self.module_candidates.is_empty()
            && self.class_candidates.is_empty()
            && self.function_candidates.is_empty()
            && self.line_numbers.is_empty())
    }
}

mod external_span {
    use faultloc_symbols::Span;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Repr {
        start: usize,
        end: usize,
    }

    pub fn serialize<S: Serializer>(span: &Span, serializer: S) -> Result<S::Ok, S::Error> {
        Repr {
            start: span.start_line,
            end: span.end_line,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Span, D::Error> {
        let repr = Repr::deserialize(deserializer)?;
        Ok(Span::new(repr.start, repr.end))
    }
}
