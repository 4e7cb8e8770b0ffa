use crate::types::Span;
use tree_sitter::Node;

/// A top-level (or class-body) statement, reduced to what indexing needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    FunctionDecl {
        name: String,
        is_async: bool,
        span: Span,
    },
    ClassDecl {
        name: String,
        bases: Vec<String>,
        span: Span,
        members: Vec<Statement>,
    },
    Other {
        kind: String,
        span: Span,
    },
}

impl Statement {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::FunctionDecl { span, .. }
            | Self::ClassDecl { span, .. }
            | Self::Other { span, .. } => *span,
        }
    }

    /// AST-style statement name used in synthetic symbol names
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::FunctionDecl { is_async: true, .. } => "AsyncFunctionDef",
            Self::FunctionDecl { .. } => "FunctionDef",
            Self::ClassDecl { .. } => "ClassDef",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Classify every statement directly under `block` (a `module` or `block` node)
    pub(crate) fn collect(block: Node, source: &[u8]) -> Vec<Self> {
        let mut cursor = block.walk();
        block
            .named_children(&mut cursor)
            .filter(|child| !child.is_extra())
            .map(|child| Self::from_node(child, source))
            .collect()
    }

    fn from_node(node: Node, source: &[u8]) -> Self {
        let span = node_span(node);
        let definition = if node.kind() == "decorated_definition" {
            node.child_by_field_name("definition").unwrap_or(node)
        } else {
            node
        };

        match definition.kind() {
            "function_definition" => Self::FunctionDecl {
                name: field_text(definition, "name", source),
                is_async: definition
                    .child(0)
                    .is_some_and(|first| first.kind() == "async"),
                span,
            },
            "class_definition" => {
                let bases = definition
                    .child_by_field_name("superclasses")
                    .map(|args| {
                        let mut cursor = args.walk();
                        args.named_children(&mut cursor)
                            .filter(|arg| !arg.is_extra())
                            .map(|arg| node_text(arg, source))
                            .collect()
                    })
                    .unwrap_or_default();
                let members = definition
                    .child_by_field_name("body")
                    .map(|body| Self::collect(body, source))
                    .unwrap_or_default();
                Self::ClassDecl {
                    name: field_text(definition, "name", source),
                    bases,
                    span,
                    members,
                }
            }
            _ => Self::Other {
                kind: statement_kind(node).to_string(),
                span,
            },
        }
    }
}

fn statement_kind(node: Node) -> &'static str {
    let starts_async = || node.child(0).is_some_and(|first| first.kind() == "async");
    match node.kind() {
        "expression_statement" => match node.named_child(0).map(|n| n.kind()) {
            Some("assignment") => {
                let annotated = node
                    .named_child(0)
                    .and_then(|assign| assign.child_by_field_name("type"))
                    .is_some();
                if annotated {
                    "AnnAssign"
                } else {
                    "Assign"
                }
            }
            Some("augmented_assignment") => "AugAssign",
            _ => "Expr",
        },
        "import_statement" => "Import",
        "import_from_statement" | "future_import_statement" => "ImportFrom",
        "if_statement" => "If",
        "for_statement" if starts_async() => "AsyncFor",
        "for_statement" => "For",
        "while_statement" => "While",
        "try_statement" => "Try",
        "with_statement" if starts_async() => "AsyncWith",
        "with_statement" => "With",
        "return_statement" => "Return",
        "pass_statement" => "Pass",
        "break_statement" => "Break",
        "continue_statement" => "Continue",
        "raise_statement" => "Raise",
        "assert_statement" => "Assert",
        "delete_statement" => "Delete",
        "global_statement" => "Global",
        "nonlocal_statement" => "Nonlocal",
        "match_statement" => "Match",
        "type_alias_statement" => "TypeAlias",
        _ => "Stmt",
    }
}

/// 1-based inclusive line span of a node
pub(crate) fn node_span(node: Node) -> Span {
    let start = node.start_position().row + 1;
    let end_pos = node.end_position();
    // A node ending at column 0 stops before that line begins.
    let end = if end_pos.column == 0 && end_pos.row > node.start_position().row {
        end_pos.row
    } else {
        end_pos.row + 1
    };
    Span::new(start, end)
}

pub(crate) fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

fn field_text(node: Node, field: &str, source: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source))
        .unwrap_or_default()
}
