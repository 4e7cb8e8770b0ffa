use crate::types::ImportGraph;
use faultloc_symbols::ImportRef;
use std::collections::BTreeSet;

/// Imports of one parsed module
#[derive(Debug, Clone)]
pub struct ModuleImports {
    pub module: String,
    /// True for `__init__.py` files, whose package is the module itself
    pub is_package: bool,
    pub imports: Vec<ImportRef>,
}

/// Resolves raw import references against the set of repository modules
pub struct ImportGraphBuilder {
    known_modules: BTreeSet<String>,
}

impl ImportGraphBuilder {
    pub fn new<I, S>(known_modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_modules: known_modules.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the graph; references that resolve to no repository module are dropped
    pub fn build(&self, modules: &[ModuleImports]) -> ImportGraph {
        let mut graph = ImportGraph::new();
        let mut dropped = 0usize;

        for entry in modules {
            if entry.module.is_empty() {
                continue;
            }
            graph.add_module(&entry.module);

            for import in &entry.imports {
                let targets = self.resolve_import(entry, import);
                if targets.is_empty() {
                    dropped += 1;
                }
                for target in targets {
                    graph.add_import(&entry.module, &target);
                }
            }
        }

        log::debug!(
            "Import graph: {} modules, {} edges, {} external references dropped",
            graph.node_count(),
            graph.edge_count(),
            dropped
        );
        graph
    }

    /// Repository modules referenced by one import statement
    pub fn resolve_import(&self, importer: &ModuleImports, import: &ImportRef) -> Vec<String> {
        let Some(base) = absolute_module(importer, import) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        if let Some(resolved) = self.resolve_reference(&base) {
            targets.push(resolved);
        }
        for name in &import.names {
            let candidate = if base.is_empty() {
                name.clone()
            } else {
                format!("{base}.{name}")
            };
            if self.known_modules.contains(&candidate) && !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
        targets
    }

    /// The module itself if known, else its longest known dotted prefix
    pub fn resolve_reference(&self, dotted: &str) -> Option<String> {
        if dotted.is_empty() {
            return None;
        }
        if self.known_modules.contains(dotted) {
            return Some(dotted.to_string());
        }
        let parts: Vec<&str> = dotted.split('.').collect();
        (1..parts.len())
            .rev()
            .map(|k| parts[..k].join("."))
            .find(|prefix| self.known_modules.contains(prefix))
    }
}

/// Turn a possibly relative import into an absolute dotted path.
/// Returns `None` when the relative import climbs above the repository root.
fn absolute_module(importer: &ModuleImports, import: &ImportRef) -> Option<String> {
    if !import.is_relative() {
        return Some(import.module.clone());
    }

    let mut package: Vec<&str> = if importer.module.is_empty() {
        Vec::new()
    } else {
        importer.module.split('.').collect()
    };
    if !importer.is_package {
        package.pop();
    }
    for _ in 1..import.level {
        package.pop()?;
    }

    let mut parts: Vec<&str> = package;
    if !import.module.is_empty() {
        parts.extend(import.module.split('.'));
    }
    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn import(module: &str, level: usize, names: &[&str]) -> ImportRef {
        ImportRef {
            module: module.to_string(),
            level,
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn builder() -> ImportGraphBuilder {
        ImportGraphBuilder::new(["pkg", "pkg.core", "pkg.core.engine", "pkg.util", "app"])
    }

    #[test]
    fn external_imports_are_dropped() {
        let importer = ModuleImports {
            module: "app".into(),
            is_package: false,
            imports: vec![import("os.path", 0, &[]), import("numpy", 0, &[])],
        };
        let graph = builder().build(&[importer]);
        assert!(graph.out_edges("app").is_empty());
        assert!(graph.contains("app"));
    }

    #[test]
    fn unknown_submodules_shorten_to_known_prefix() {
        assert_eq!(
            builder().resolve_reference("pkg.core.engine.Runner"),
            Some("pkg.core.engine".to_string())
        );
        assert_eq!(builder().resolve_reference("pkgx.core"), None);
    }

    #[test]
    fn from_imports_link_submodules() {
        let importer = ModuleImports {
            module: "app".into(),
            is_package: false,
            imports: vec![import("pkg", 0, &["util", "helper"])],
        };
        let graph = builder().build(&[importer]);
        assert_eq!(graph.out_edges("app"), vec!["pkg", "pkg.util"]);
    }

    #[test]
    fn relative_imports_resolve_against_package() {
        let engine = ModuleImports {
            module: "pkg.core.engine".into(),
            is_package: false,
            imports: vec![import("", 1, &["engine"]), import("util", 2, &[])],
        };
        let init = ModuleImports {
            module: "pkg".into(),
            is_package: true,
            imports: vec![import("core", 1, &["engine"])],
        };
        let graph = builder().build(&[engine, init]);

        assert_eq!(graph.out_edges("pkg.core.engine"), vec!["pkg.core", "pkg.util"]);
        assert_eq!(graph.out_edges("pkg"), vec!["pkg.core", "pkg.core.engine"]);
    }

    #[test]
    fn relative_import_above_root_is_dropped() {
        let importer = ModuleImports {
            module: "app".into(),
            is_package: false,
            imports: vec![import("x", 3, &[])],
        };
        assert!(builder().resolve_import(&importer, &importer.imports[0]).is_empty());
    }
}
