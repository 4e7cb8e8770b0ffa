use crate::error::{Result, SymbolError};
use crate::imports::{collect_imports, ImportRef};
use crate::statement::Statement;
use crate::types::{FileSymbols, SymbolEntry, SymbolKind, SymbolMeta};
use std::collections::HashMap;
use tree_sitter::Parser;

/// Symbols and raw imports extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub symbols: FileSymbols,
    pub imports: Vec<ImportRef>,
}

/// Tree-sitter based analyzer for Python sources
pub struct PythonAnalyzer {
    parser: Parser,
}

impl PythonAnalyzer {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| SymbolError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse `source` and build the symbol table for `file`.
    ///
    /// A tree with syntax errors is rejected so that callers skip the file
    /// instead of indexing a partial view of it.
    pub fn analyze(&mut self, file: &str, module: &str, source: &str) -> Result<ParsedFile> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SymbolError::parse(file, "parser returned no tree"))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(SymbolError::parse(file, "syntax errors in source"));
        }

        let bytes = source.as_bytes();
        let statements = Statement::collect(root, bytes);
        let symbols = index_statements(file, module, &statements);
        let imports = collect_imports(root, bytes);

        Ok(ParsedFile { symbols, imports })
    }
}

/// Build a file's symbol table from its classified top-level statements
#[must_use]
pub fn index_statements(file: &str, module: &str, statements: &[Statement]) -> FileSymbols {
    let mut out = FileSymbols::new(file, module);
    let mut names = QualnameAllocator::default();

    for stmt in statements {
        match stmt {
            Statement::FunctionDecl {
                name,
                is_async,
                span,
            } => out.functions.push(SymbolEntry {
                kind: SymbolKind::Function,
                name: name.clone(),
                qualified_name: names.unique(qualify(module, name)),
                span: *span,
                meta: SymbolMeta {
                    is_async: *is_async,
                    ..SymbolMeta::default()
                },
            }),
            Statement::ClassDecl {
                name,
                bases,
                span,
                members,
            } => {
                let class_qn = qualify(module, name);
                out.classes.push(SymbolEntry {
                    kind: SymbolKind::Class,
                    name: name.clone(),
                    qualified_name: class_qn.clone(),
                    span: *span,
                    meta: SymbolMeta {
                        bases: bases.clone(),
                        ..SymbolMeta::default()
                    },
                });

                let mut element_idx = 0;
                for member in members {
                    if let Statement::FunctionDecl {
                        name: method,
                        is_async,
                        span,
                    } = member
                    {
                        out.functions.push(SymbolEntry {
                            kind: SymbolKind::Function,
                            name: method.clone(),
                            qualified_name: names.unique(format!("{class_qn}.{method}")),
                            span: *span,
                            meta: SymbolMeta {
                                owner_class: Some(name.clone()),
                                is_async: *is_async,
                                ..SymbolMeta::default()
                            },
                        });
                    } else {
                        let synthetic =
                            format!("<class_element>#{}#{element_idx}", member.kind_name());
                        out.class_elements.push(SymbolEntry {
                            kind: SymbolKind::ClassElement,
                            qualified_name: names.unique(format!("{class_qn}.{synthetic}")),
                            name: synthetic,
                            span: member.span(),
                            meta: SymbolMeta {
                                owner_class: Some(name.clone()),
                                node_type: Some(member.kind_name().to_string()),
                                ..SymbolMeta::default()
                            },
                        });
                        element_idx += 1;
                    }
                }
            }
            Statement::Other { kind, span } => {
                let synthetic = format!("<module_symbol>#{kind}#{}", out.module_symbols.len());
                out.module_symbols.push(SymbolEntry {
                    kind: SymbolKind::ModuleSymbol,
                    qualified_name: qualify(module, &synthetic),
                    name: synthetic,
                    span: *span,
                    meta: SymbolMeta {
                        node_type: Some(kind.clone()),
                        ..SymbolMeta::default()
                    },
                });
            }
        }
    }

    out
}

fn qualify(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{module}.{name}")
    }
}

/// Keeps function and class-element qualified names unique within a file.
/// A redefinition (property setters, conditional overloads) gets `#n` appended.
#[derive(Default)]
struct QualnameAllocator {
    seen: HashMap<String, usize>,
}

impl QualnameAllocator {
    fn unique(&mut self, qualified_name: String) -> String {
        let count = self.seen.entry(qualified_name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            qualified_name
        } else {
            format!("{qualified_name}#{}", *count - 1)
        }
    }
}
