use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Scanner for Python source files under a repository root
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Repo-relative `/`-separated paths of every `*.py` file, sorted.
    ///
    /// Ignore files are not consulted; only the fixed noise directories are skipped.
    pub fn scan(&self) -> Vec<String> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false);
        let root = self.root.clone();
        builder.filter_entry(move |entry| !Self::is_noise_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() || !Self::is_python_file(entry.path()) {
                        continue;
                    }
                    if let Some(rel) = self.relative(entry.path()) {
                        files.push(rel);
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} Python files under {}", files.len(), self.root.display());
        files
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn is_python_file(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some("py")
    }

    fn is_noise_scope(path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => {
                let lowered = name.to_string_lossy().to_lowercase();
                NOISE_DIRS.iter().any(|noise| *noise == lowered)
            }
            _ => false,
        })
    }
}

const NOISE_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    "build",
    "dist",
    ".mypy_cache",
    ".pytest_cache",
];

#[cfg(test)]
mod tests {
    use super::FileScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_python_files_sorted_and_relative() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pkg/sub")).unwrap();
        fs::write(temp.path().join("pkg/sub/b.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("pkg/__init__.py"), "").unwrap();
        fs::write(temp.path().join("a.py"), "").unwrap();
        fs::write(temp.path().join("README.md"), "# hi").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        assert_eq!(files, vec!["a.py", "pkg/__init__.py", "pkg/sub/b.py"]);
    }

    #[test]
    fn skips_noise_directories_but_not_gitignored_files() {
        let temp = tempdir().unwrap();
        for dir in [".venv/lib", "Build", "src/__pycache__", "generated"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        fs::write(temp.path().join(".venv/lib/site.py"), "").unwrap();
        fs::write(temp.path().join("Build/out.py"), "").unwrap();
        fs::write(temp.path().join("src/__pycache__/c.py"), "").unwrap();
        fs::write(temp.path().join("generated/gen.py"), "").unwrap();
        fs::write(temp.path().join(".gitignore"), "generated/\n").unwrap();

        let files = FileScanner::new(temp.path()).scan();
        assert_eq!(files, vec!["generated/gen.py"]);
    }
}
