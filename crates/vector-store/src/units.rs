use crate::types::{TextUnit, UnitKind};
use faultloc_indexer::RepoIndex;
use serde_json::{json, Map, Value};

/// Characters kept from the head of a file for its FILE unit
pub const FILE_EXCERPT_CHARS: usize = 8000;

/// Lines kept after a function's first line for its FUNCTION unit
pub const FUNCTION_EXCERPT_LINES: usize = 120;

/// Build FILE and FUNCTION units for the first `max_files` indexed files.
///
/// Function units are emitted per file in symbol-table order until
/// `max_functions` is reached. Files that cannot be read are skipped.
#[must_use]
pub fn build_units(index: &RepoIndex, max_files: usize, max_functions: usize) -> Vec<TextUnit> {
    let mut units = Vec::new();
    let mut function_count = 0;

    for rel in index.files.prefix(max_files) {
        let source = match index.read_source(rel) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Skipping unreadable file {rel}: {e}");
                continue;
            }
        };

        let mut meta = Map::new();
        meta.insert(
            "module".to_string(),
            Value::String(index.files.module_for(rel).unwrap_or_default().to_string()),
        );
        units.push(TextUnit {
            uid: format!("FILE::{rel}"),
            kind: UnitKind::File,
            file_path: rel.clone(),
            qualified_name: None,
            text: source.chars().take(FILE_EXCERPT_CHARS).collect(),
            meta,
        });

        let Some(symbols) = index.file_symbols(rel) else {
            continue;
        };
        if function_count >= max_functions {
            continue;
        }

        let lines: Vec<&str> = source.lines().collect();
        for function in &symbols.functions {
            if function_count >= max_functions {
                break;
            }
            let start = function.span.start_line.max(1);
            let end = function
                .span
                .end_line
                .min(start + FUNCTION_EXCERPT_LINES)
                .min(lines.len());
            let text = if start <= end {
                lines[start - 1..end].join("\n")
            } else {
                String::new()
            };

            let mut meta = Map::new();
            meta.insert(
                "span".to_string(),
                json!([function.span.start_line, function.span.end_line]),
            );
            meta.insert("name".to_string(), Value::String(function.name.clone()));
            units.push(TextUnit {
                uid: format!("FUNC::{rel}::{}", function.qualified_name),
                kind: UnitKind::Function,
                file_path: rel.clone(),
                qualified_name: Some(function.qualified_name.clone()),
                text,
                meta,
            });
            function_count += 1;
        }
    }

    log::debug!(
        "Built {} text units ({} functions)",
        units.len(),
        function_count
    );
    units
}
