use crate::statement::node_text;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// One module reference found in an import statement, before resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted module path as written (empty for `from . import x`)
    pub module: String,

    /// Number of leading dots for relative imports
    #[serde(default)]
    pub level: usize,

    /// Names imported by a `from` import
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl ImportRef {
    #[must_use]
    pub const fn is_relative(&self) -> bool {
        self.level > 0
    }
}

/// Collect imports from anywhere in the tree, including nested scopes
pub(crate) fn collect_imports(root: Node, source: &[u8]) -> Vec<ImportRef> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    if let Some(module) = dotted_name_of(name, source) {
                        out.push(ImportRef {
                            module,
                            level: 0,
                            names: Vec::new(),
                        });
                    }
                }
            }
            "import_from_statement" => {
                if let Some(import) = from_import(node, source) {
                    out.push(import);
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<_> = node.named_children(&mut cursor).collect();
                // Reverse so the stack pops children in source order.
                stack.extend(children.into_iter().rev());
            }
        }
    }
    out
}

fn from_import(node: Node, source: &[u8]) -> Option<ImportRef> {
    let module_node = node.child_by_field_name("module_name")?;
    let (module, level) = if module_node.kind() == "relative_import" {
        let mut level = 0;
        let mut module = String::new();
        let mut cursor = module_node.walk();
        for part in module_node.children(&mut cursor) {
            match part.kind() {
                "import_prefix" => level += node_text(part, source).chars().filter(|c| *c == '.').count(),
                "dotted_name" => module = node_text(part, source),
                _ => {}
            }
        }
        (module, level)
    } else {
        (node_text(module_node, source), 0)
    };

    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("name", &mut cursor)
        .filter_map(|name| dotted_name_of(name, source))
        .collect();

    Some(ImportRef {
        module,
        level,
        names,
    })
}

fn dotted_name_of(node: Node, source: &[u8]) -> Option<String> {
    let target = if node.kind() == "aliased_import" {
        node.child_by_field_name("name")?
    } else {
        node
    };
    let text = node_text(target, source);
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}
