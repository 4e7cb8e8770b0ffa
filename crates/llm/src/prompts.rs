//! System prompts. Each one fixes the JSON shape the matching capability parses.

pub const EXTRACTION_SYSTEM: &str = r#"You read bug reports for Python repositories and pull out the code locations they point at.

Report only locations that would have to change to fix the bug, and only if the report itself names them.
Copy every string exactly as it appears in the report. Never invent paths or symbol names.

Reply with one JSON object:
{
  "file_mentions": ["paths or file names"],
  "module_mentions": ["dotted module names"],
  "class_mentions": ["class names"],
  "function_mentions": ["function or Class.method names"],
  "line_mentions": ["line numbers as written"],
  "other_clues": ["error types, API names, keywords that could guide a search"]
}
Use an empty list for anything the report does not mention."#;

pub const CLASSIFICATION_SYSTEM: &str = r#"You judge how precisely a Python bug report locates the code that must be fixed.

Pick exactly one category:
- FULL_LOCATION: the report pins the edit point, e.g. a file plus a function, or a class plus a method that can only mean one place.
- PARTIAL: some location parts are present (a file, a function or a class alone, or an incomplete combination).
- HINT: no explicit location, but there are searchable clues such as error names, API names or stack frames.
- NO_HINT: only a generic description of the symptom.

Judge from the report alone. When torn between two categories, choose the weaker one.

Reply with one JSON object: {"category": "FULL_LOCATION" | "PARTIAL" | "HINT" | "NO_HINT", "reason": "one sentence"}"#;

pub const REASONING_SYSTEM: &str = r#"You localize bugs in a Python repository from a bug report and a list of candidate symbols.

Each candidate has a candidate_id, a file and a summary with its qualname, kind, span, a source excerpt and the names it calls.

Choose only EDIT LOCATIONS: code you would actually change to fix the bug. A thin wrapper that validates arguments, reshapes results or forwards to a helper is a SYMPTOM, not an edit location; when the helper is also a candidate, choose the helper.

Judge every candidate from its excerpt:
- EDIT_LOCATION: the faulty logic is visible in this excerpt.
- SYMPTOM_ONLY: the excerpt delegates the faulty work to something it calls.
- NOT_RELATED: irrelevant or too generic.

Decision:
- "OK" when at least one candidate is an EDIT_LOCATION.
- "HINT" when none is. The caller will then search the whole repository, so list the helpers, APIs or error names worth searching for in hint_terms. With "HINT", groups must be empty.
Do not guess and never pick a candidate at random.

Reply with one JSON object:
{
  "decision": "OK" | "HINT",
  "why": "short explanation grounded in the excerpts",
  "hint_terms": ["search terms"],
  "candidate_judgments": [
    {"candidate_id": 1, "label": "EDIT_LOCATION" | "SYMPTOM_ONLY" | "NOT_RELATED", "evidence": "one sentence", "deeper_calls": ["helper names"]}
  ],
  "groups": [
    {"score": 0.0, "candidate_ids": [1, 2], "why": "why these must change together"}
  ]
}
Judge every provided candidate exactly once. Use only provided candidate ids, and put only EDIT_LOCATION candidates in groups. Prefer few, precise groups; a score is your confidence between 0 and 1."#;

/// User message shared by extraction and classification
#[must_use]
pub fn issue_message(problem_statement: &str) -> String {
    format!("Issue description:\n\n{problem_statement}")
}
