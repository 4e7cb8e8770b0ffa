//! # Faultloc Symbols
//!
//! Span-based symbol tables for Python sources.
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Tree-sitter Parsing → AST (files with syntax errors are rejected)
//!     │
//!     ├──> Statement classification
//!     │    └─> FunctionDecl | ClassDecl | Other
//!     │
//!     └──> Symbol table
//!          ├─> FUNCTION        module.func, module.Class.method
//!          ├─> CLASS           module.Class (+ bases)
//!          ├─> CLASS_ELEMENT   module.Class.<class_element>#Assign#0
//!          └─> MODULE_SYMBOL   module.<module_symbol>#Import#0
//! ```
//!
//! Every line-to-symbol mapping goes through [`FileSymbols::find_enclosing_symbol`]:
//! the smallest span containing the line wins, ties go to the smaller start line.
//!
//! ## Example
//!
//! ```rust
//! use faultloc_symbols::PythonAnalyzer;
//!
//! let mut analyzer = PythonAnalyzer::new().unwrap();
//! let parsed = analyzer
//!     .analyze("pkg/io.py", "pkg.io", "def read(path):\n    return open(path)\n")
//!     .unwrap();
//! let enclosing = parsed.symbols.find_enclosing_symbol(2).unwrap();
//! assert_eq!(enclosing.qualified_name, "pkg.io.read");
//! ```

mod ast_analyzer;
mod error;
mod imports;
mod statement;
mod types;

pub use ast_analyzer::{index_statements, ParsedFile, PythonAnalyzer};
pub use error::{Result, SymbolError};
pub use imports::ImportRef;
pub use statement::Statement;
pub use types::{FileSymbols, Span, SymbolEntry, SymbolIndex, SymbolKind, SymbolMeta};
