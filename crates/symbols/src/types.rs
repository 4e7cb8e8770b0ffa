use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive, 1-based line range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    /// Create a span, swapping the bounds if they arrive reversed
    #[must_use]
    pub const fn new(start_line: usize, end_line: usize) -> Self {
        if start_line <= end_line {
            Self {
                start_line,
                end_line,
            }
        } else {
            Self {
                start_line: end_line,
                end_line: start_line,
            }
        }
    }

    /// Span width as `end - start`
    #[must_use]
    pub const fn width(&self) -> usize {
        self.end_line - self.start_line
    }

    #[must_use]
    pub const fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Whether this span intersects `[lo, hi]`
    #[must_use]
    pub const fn overlaps(&self, lo: usize, hi: usize) -> bool {
        !(self.end_line < lo || self.start_line > hi)
    }
}

/// Kind of indexed code unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    /// Top-level function or method
    Function,
    /// Top-level class declaration
    Class,
    /// Non-function statement inside a class body
    ClassElement,
    /// Any other top-level statement
    ModuleSymbol,
}

impl SymbolKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Class => "CLASS",
            Self::ClassElement => "CLASS_ELEMENT",
            Self::ModuleSymbol => "MODULE_SYMBOL",
        }
    }
}

/// Kind-specific metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolMeta {
    /// Enclosing class for methods and class elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_class: Option<String>,

    /// Statement kind for synthetic entries (`Assign`, `Expr`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// Base class expressions for classes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
}

/// One entry of the symbol table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolEntry {
    pub kind: SymbolKind,

    /// Short name, or a synthetic `<module_symbol>#Kind#i` style name
    pub name: String,

    /// Dotted name (`module.Class.method`)
    pub qualified_name: String,

    pub span: Span,

    #[serde(default)]
    pub meta: SymbolMeta,
}

impl SymbolEntry {
    /// Trailing component of the qualified name
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

/// All symbols extracted from one source file, bucketed by kind in source order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSymbols {
    pub file: String,
    pub module: String,
    pub functions: Vec<SymbolEntry>,
    pub classes: Vec<SymbolEntry>,
    pub class_elements: Vec<SymbolEntry>,
    pub module_symbols: Vec<SymbolEntry>,
}

impl FileSymbols {
    #[must_use]
    pub fn new(file: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            module: module.into(),
            ..Self::default()
        }
    }

    /// Every editable entry (everything except pure class declarations)
    pub fn editable(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.functions
            .iter()
            .chain(self.class_elements.iter())
            .chain(self.module_symbols.iter())
    }

    /// Smallest-span editable symbol whose span contains `line`.
    ///
    /// Ties on width are broken by the smaller start line, then by bucket order
    /// (functions, class elements, module symbols).
    #[must_use]
    pub fn find_enclosing_symbol(&self, line: usize) -> Option<&SymbolEntry> {
        self.editable()
            .filter(|entry| entry.span.contains(line))
            .min_by_key(|entry| (entry.span.width(), entry.span.start_line))
    }

    /// Function entry with exactly this qualified name
    #[must_use]
    pub fn function_by_qualname(&self, qualified_name: &str) -> Option<&SymbolEntry> {
        self.functions
            .iter()
            .find(|f| f.qualified_name == qualified_name)
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.functions.len()
            + self.classes.len()
            + self.class_elements.len()
            + self.module_symbols.len()
    }
}

/// Symbol tables for a whole repository, keyed by repo-relative path
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolIndex {
    pub files: BTreeMap<String, FileSymbols>,
}

impl SymbolIndex {
    pub fn insert(&mut self, symbols: FileSymbols) {
        self.files.insert(symbols.file.clone(), symbols);
    }

    #[must_use]
    pub fn get(&self, file: &str) -> Option<&FileSymbols> {
        self.files.get(file)
    }

    /// `find_enclosing_symbol` for a file in the index
    #[must_use]
    pub fn find_enclosing_symbol(&self, file: &str, line: usize) -> Option<&SymbolEntry> {
        self.files.get(file)?.find_enclosing_symbol(line)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.files.values().map(FileSymbols::symbol_count).sum()
    }
}
