use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const INIT_FILE: &str = "__init__.py";

/// Lookup tables over the repository's indexed source files
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileIndex {
    /// Sorted repo-relative paths
    pub all_files: Vec<String>,

    /// `mod.py` -> every path with that basename
    pub basename_map: BTreeMap<String, Vec<String>>,

    /// Every `/`-aligned suffix (`sub/mod.py`, `mod.py`, ...) -> paths ending with it
    pub suffix_map: BTreeMap<String, Vec<String>>,

    pub module_to_path: BTreeMap<String, String>,
    pub path_to_module: BTreeMap<String, String>,
}

/// Dotted module name for a repo-relative path.
///
/// `pkg/__init__.py` names the package `pkg`; `pkg/mod.py` is `pkg.mod`.
#[must_use]
pub fn module_name_for_path(rel: &str) -> String {
    let stem = if rel == INIT_FILE {
        ""
    } else if let Some(package) = rel.strip_suffix("/__init__.py") {
        package
    } else {
        rel.strip_suffix(".py").unwrap_or(rel)
    };
    stem.replace('/', ".")
}

/// Whether the path is a package initializer
#[must_use]
pub fn is_package_path(rel: &str) -> bool {
    rel == INIT_FILE || rel.ends_with("/__init__.py")
}

impl FileIndex {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all_files: Vec<String> = paths.into_iter().map(Into::into).collect();
        all_files.sort();
        all_files.dedup();

        let mut index = Self::default();
        for rel in &all_files {
            let basename = rel.rsplit('/').next().unwrap_or(rel);
            index
                .basename_map
                .entry(basename.to_string())
                .or_default()
                .push(rel.clone());

            let parts: Vec<&str> = rel.split('/').collect();
            for i in 0..parts.len() {
                index
                    .suffix_map
                    .entry(parts[i..].join("/"))
                    .or_default()
                    .push(rel.clone());
            }

            let module = module_name_for_path(rel);
            index.path_to_module.insert(rel.clone(), module.clone());
            index.module_to_path.insert(module, rel.clone());
        }
        index.all_files = all_files;
        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all_files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_files.is_empty()
    }

    #[must_use]
    pub fn contains(&self, rel: &str) -> bool {
        self.path_to_module.contains_key(rel)
    }

    #[must_use]
    pub fn module_for(&self, rel: &str) -> Option<&str> {
        self.path_to_module.get(rel).map(String::as_str)
    }

    #[must_use]
    pub fn path_for_module(&self, module: &str) -> Option<&str> {
        self.module_to_path.get(module).map(String::as_str)
    }

    /// The first `n` indexed files in sorted order
    #[must_use]
    pub fn prefix(&self, n: usize) -> &[String] {
        &self.all_files[..n.min(self.all_files.len())]
    }

    /// Map free-form file/module mentions to concrete repo paths.
    ///
    /// Per candidate, in order: exact path, dotted module, basename expansion,
    /// suffix match, suffix match with `.py` appended. A bare `__init__.py`
    /// never expands; with a directory prefix it only goes through the suffix map.
    /// Output is deduplicated in first-seen order.
    #[must_use]
    pub fn resolve_file_candidates(&self, candidates: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        for raw in candidates {
            let normalized = raw.trim().replace('\\', "/");
            let candidate = normalized.strip_prefix("./").unwrap_or(&normalized);
            if candidate.is_empty() {
                continue;
            }

            if self.contains(candidate) {
                push_unique(&mut out, candidate);
                continue;
            }

            if let Some(path) = self.module_to_path.get(candidate) {
                push_unique(&mut out, path);
                continue;
            }

            let basename = candidate.rsplit('/').next().unwrap_or(candidate);
            if basename == INIT_FILE {
                if candidate.contains('/') {
                    for path in self.suffix_map.get(candidate).into_iter().flatten() {
                        push_unique(&mut out, path);
                    }
                }
                continue;
            }

            for path in self.basename_map.get(basename).into_iter().flatten() {
                push_unique(&mut out, path);
            }
            for path in self.suffix_map.get(candidate).into_iter().flatten() {
                push_unique(&mut out, path);
            }
            if !candidate.ends_with(".py") && candidate.contains('/') {
                let with_ext = format!("{candidate}.py");
                for path in self.suffix_map.get(&with_ext).into_iter().flatten() {
                    push_unique(&mut out, path);
                }
            }
        }

        out
    }
}

fn push_unique(out: &mut Vec<String>, path: &str) {
    if !out.iter().any(|p| p == path) {
        out.push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index() -> FileIndex {
        FileIndex::from_paths([
            "pkg/sub/mod.py",
            "pkg/sub/__init__.py",
            "pkg/__init__.py",
            "pkg/other/mod.py",
            "tools/run.py",
            "setup.py",
        ])
    }

    fn resolve(candidates: &[&str]) -> Vec<String> {
        let owned: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
        index().resolve_file_candidates(&owned)
    }

    #[test]
    fn module_names_follow_package_layout() {
        assert_eq!(module_name_for_path("pkg/sub/mod.py"), "pkg.sub.mod");
        assert_eq!(module_name_for_path("pkg/__init__.py"), "pkg");
        assert_eq!(module_name_for_path("__init__.py"), "");
        assert_eq!(module_name_for_path("setup.py"), "setup");
        assert!(is_package_path("pkg/__init__.py"));
        assert!(!is_package_path("pkg/init.py"));
    }

    #[test]
    fn dotted_module_resolves_to_single_path() {
        assert_eq!(resolve(&["pkg.sub.mod"]), vec!["pkg/sub/mod.py"]);
    }

    #[test]
    fn bare_init_never_expands() {
        assert!(resolve(&["__init__.py"]).is_empty());
        assert_eq!(resolve(&["sub/__init__.py"]), vec!["pkg/sub/__init__.py"]);
    }

    #[test]
    fn basename_expands_to_every_match() {
        assert_eq!(resolve(&["mod.py"]), vec!["pkg/other/mod.py", "pkg/sub/mod.py"]);
    }

    #[test]
    fn suffix_and_missing_extension() {
        // Basename expansion runs before the suffix match, so a partial path
        // still fans out to every file sharing its basename.
        assert_eq!(resolve(&["sub/mod.py"]), vec!["pkg/other/mod.py", "pkg/sub/mod.py"]);
        assert_eq!(resolve(&["tools/run"]), vec!["tools/run.py"]);
        assert_eq!(resolve(&[".\\tools\\run.py"]), vec!["tools/run.py"]);
        assert_eq!(resolve(&["./tools/run.py", "tools/run.py"]), vec!["tools/run.py"]);
    }

    #[test]
    fn unknown_candidates_resolve_to_nothing() {
        assert!(resolve(&["", "  ", "missing.py", "a.b.c"]).is_empty());
    }
}
