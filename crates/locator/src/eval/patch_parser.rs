use once_cell::sync::Lazy;
use regex::Regex;

static TARGET_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\+\+\s+b/(.+)$").expect("valid regex"));
static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@\s+-(\d+)(?:,(\d+))?\s+\+(\d+)(?:,(\d+))?\s+@@").expect("valid regex")
});

/// Changed lines of one hunk: added lines on the new side, removed on the old
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchHunk {
    pub file_path: String,
    pub added_lines: Vec<usize>,
    pub removed_lines: Vec<usize>,
}

/// Minimal unified-diff reader; hunks before any `+++ b/` header are ignored
#[must_use]
pub fn parse_unified_diff(patch: &str) -> Vec<PatchHunk> {
    let lines: Vec<&str> = patch.lines().collect();
    let mut hunks = Vec::new();
    let mut current_file: Option<String> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some(caps) = TARGET_FILE.captures(line) {
            current_file = Some(caps[1].trim().to_string());
            i += 1;
            continue;
        }
        let header = HUNK_HEADER.captures(line);
        let (Some(caps), Some(file)) = (header, current_file.as_ref()) else {
            i += 1;
            continue;
        };

        let mut old_line: usize = caps[1].parse().unwrap_or(0);
        let mut new_line: usize = caps[3].parse().unwrap_or(0);
        // An omitted count means one line
        let count = |m: Option<regex::Match<'_>>| -> usize {
            m.map_or(1, |m| m.as_str().parse().unwrap_or(0))
        };
        let mut old_left: usize = count(caps.get(2));
        let mut new_left: usize = count(caps.get(4));
        let mut hunk = PatchHunk {
            file_path: file.clone(),
            ..PatchHunk::default()
        };
        i += 1;
        while i < lines.len() && (old_left > 0 || new_left > 0) && !ends_hunk(lines[i]) {
            match lines[i].chars().next() {
                Some('+') => {
                    hunk.added_lines.push(new_line);
                    new_line += 1;
                    new_left = new_left.saturating_sub(1);
                }
                Some('-') => {
                    hunk.removed_lines.push(old_line);
                    old_line += 1;
                    old_left = old_left.saturating_sub(1);
                }
                // "\ No newline at end of file"
                Some('\\') => {}
                _ => {
                    old_line += 1;
                    new_line += 1;
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
            }
            i += 1;
        }
        hunks.push(hunk);
    }
    hunks
}

/// A new hunk or file section cut a hunk whose header overstated its length
fn ends_hunk(line: &str) -> bool {
    line.starts_with("@@") || line.starts_with("diff ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tracks_both_sides_of_a_hunk() {
        let patch = "\
diff --git a/pkg/mod.py b/pkg/mod.py
--- a/pkg/mod.py
+++ b/pkg/mod.py
@@ -10,4 +10,5 @@ def run():
     keep = 1
-    broken = 2
+    fixed = 2
+    extra = 3
     tail = 4
";
        let hunks = parse_unified_diff(patch);
        assert_eq!(
            hunks,
            vec![PatchHunk {
                file_path: "pkg/mod.py".to_string(),
                added_lines: vec![11, 12],
                removed_lines: vec![11],
            }]
        );
    }

    #[test]
    fn splits_files_and_hunks() {
        let patch = "\
+++ b/a.py
@@ -1 +1 @@
-x = 1
+x = 2
@@ -20,2 +20,2 @@
 ctx
-y
+z
+++ b/b.py
@@ -5,0 +6 @@
+new
";
        let hunks = parse_unified_diff(patch);
        let summary: Vec<(&str, Vec<usize>, Vec<usize>)> = hunks
            .iter()
            .map(|h| (h.file_path.as_str(), h.added_lines.clone(), h.removed_lines.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.py", vec![1], vec![1]),
                ("a.py", vec![21], vec![21]),
                ("b.py", vec![6], vec![]),
            ]
        );
    }

    #[test]
    fn body_lines_are_classified_by_first_character() {
        let patch = "\
--- a/cli.py
+++ b/cli.py
@@ -3,3 +3,3 @@
-    --- a/old_flag
+    ++ new_flag
\\ No newline at end of file
-- legacy separator
+++ b/not_a_header
 done
";
        let hunks = parse_unified_diff(patch);
        assert_eq!(
            hunks,
            vec![PatchHunk {
                file_path: "cli.py".to_string(),
                added_lines: vec![3, 4],
                removed_lines: vec![3, 4],
            }]
        );
    }

    #[test]
    fn hunks_without_a_target_file_are_ignored() {
        assert!(parse_unified_diff("@@ -1 +1 @@\n-a\n+b\n").is_empty());
    }
}
