use async_trait::async_trait;
use faultloc_locator::artifacts;
use faultloc_locator::{
    ArtifactSink, BudgetKind, CandidateReasoner, Capabilities, Category, CueBundle, CueExtractor,
    Extraction, FaultlocConfig, InstanceRequest, Locator, LocatorError, ReasoningRequest,
    ReasoningResponse,
};
use faultloc_vector_store::{StubEmbedder, TokenUsage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct ScriptedExtractor {
    cues: CueBundle,
    usage: Option<TokenUsage>,
}

#[async_trait]
impl CueExtractor for ScriptedExtractor {
    async fn extract(&self, _problem_statement: &str) -> faultloc_locator::Result<Extraction> {
        Ok(Extraction {
            cues: self.cues.clone(),
            usage: self.usage,
            raw: serde_json::to_value(&self.cues)?,
        })
    }
}

struct ScriptedReasoner {
    reply: Value,
    calls: Mutex<usize>,
}

#[async_trait]
impl CandidateReasoner for ScriptedReasoner {
    async fn reason(&self, _request: &ReasoningRequest) -> faultloc_locator::Result<ReasoningResponse> {
        *self.calls.lock().unwrap() += 1;
        Ok(ReasoningResponse::from_json(self.reply.clone(), None))
    }
}

#[derive(Default)]
struct MemorySink {
    docs: Mutex<BTreeMap<String, Value>>,
}

impl MemorySink {
    fn get(&self, name: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.docs.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn write_json(&self, name: &str, value: &Value) -> faultloc_locator::Result<()> {
        self.docs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    async fn write_text(&self, name: &str, text: &str) -> faultloc_locator::Result<()> {
        self.docs
            .lock()
            .unwrap()
            .insert(name.to_string(), Value::String(text.to_string()));
        Ok(())
    }
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn locator(cues: CueBundle, reply: Value) -> (Locator, Arc<ScriptedReasoner>) {
    locator_with(FaultlocConfig::default(), cues, None, reply)
}

fn locator_with(
    config: FaultlocConfig,
    cues: CueBundle,
    usage: Option<TokenUsage>,
    reply: Value,
) -> (Locator, Arc<ScriptedReasoner>) {
    let reasoner = Arc::new(ScriptedReasoner {
        reply,
        calls: Mutex::new(0),
    });
    let capabilities = Capabilities {
        extractor: Arc::new(ScriptedExtractor { cues, usage }),
        reasoner: reasoner.clone(),
        embedder: Arc::new(StubEmbedder::new(64)),
        advisor: None,
    };
    (Locator::new(config, capabilities), reasoner)
}

fn request<'a>(text: &'a str, patch: Option<&'a str>) -> InstanceRequest<'a> {
    InstanceRequest {
        instance_id: "demo__1",
        problem_statement: text,
        patch,
        topk: 2,
    }
}

fn single_function_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.py", "def foo():\n    return 1\n");
    temp
}

fn service_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "svc/__init__.py", "");
    write(
        root,
        "svc/parse.py",
        "from svc import tokens\n\ndef parse(text):\n    return tokens.split_all(text)\n\ndef parse_header(text):\n    return text[:10]\n",
    );
    write(
        root,
        "svc/tokens.py",
        "def split_all(text):\n    return text.split()\n\ndef join_all(parts):\n    return ' '.join(parts)\n",
    );
    temp
}

#[tokio::test]
async fn named_file_line_and_function_resolve_fully() {
    let repo = single_function_repo();
    let text = "bug in `a.py` at line 1, function foo";
    let (locator, reasoner) = locator(
        CueBundle {
            file_mentions: strings(&["a.py"]),
            function_mentions: strings(&["foo"]),
            line_mentions: strings(&["1"]),
            ..CueBundle::default()
        },
        json!({}),
    );
    let sink = MemorySink::default();

    let result = locator
        .run_instance(request(text, None), repo.path(), &sink)
        .await
        .unwrap();

    assert_eq!(result.category, Category::FullLocation);
    assert_eq!(result.candidates.len(), 1);
    let group = &result.candidates[0];
    assert_eq!(group.rank, 1);
    assert_eq!(group.locations[0].qualified_name.as_deref(), Some("a.foo"));
    assert_eq!(
        (group.locations[0].span.start_line, group.locations[0].span.end_line),
        (1, 2)
    );
    assert!(group.locations[0].confidence >= 0.6);
    assert_eq!(*reasoner.calls.lock().unwrap(), 0);

    let normalized = sink.get(artifacts::CUES_NORMALIZED).unwrap();
    assert_eq!(normalized["file_candidates"], json!(["a.py"]));
    assert_eq!(normalized["function_candidates"], json!(["foo"]));
    assert_eq!(normalized["line_numbers"], json!([1]));
    assert_eq!(
        sink.get(artifacts::CLASSIFIER).unwrap()["details"]["decision"]["rule"],
        json!("file+line")
    );
    for name in [
        artifacts::META,
        artifacts::PROBLEM_STATEMENT,
        artifacts::EXTRACTOR,
        artifacts::FILE_INDEX,
        artifacts::SYMBOL_INDEX,
        artifacts::IMPORT_GRAPH,
        artifacts::CANDIDATES,
    ] {
        assert!(sink.has(name), "missing {name}");
    }
    assert!(!sink.has(artifacts::RETRIEVAL));
    assert!(result.evaluation.is_none());
}

#[tokio::test]
async fn reference_patch_is_scored() {
    let repo = single_function_repo();
    let (locator, _) = locator(
        CueBundle {
            file_mentions: strings(&["a.py"]),
            line_mentions: strings(&["2"]),
            ..CueBundle::default()
        },
        json!({}),
    );
    let patch = "--- a/a.py\n+++ b/a.py\n@@ -1,2 +1,2 @@\n def foo():\n-    return 1\n+    return 2\n";
    let sink = MemorySink::default();

    let result = locator
        .run_instance(request("a.py line 2 is wrong", Some(patch)), repo.path(), &sink)
        .await
        .unwrap();

    let evaluation = result.evaluation.unwrap();
    assert_eq!(
        evaluation.gt_symbol_set,
        vec![("a.py".to_string(), "a.foo".to_string())]
    );
    assert_eq!(evaluation.exact_match_rank, Some(1));
    assert!(sink.has(artifacts::EVALUATION));
}

#[tokio::test]
async fn cue_free_issue_goes_through_retrieval() {
    let repo = service_repo();
    let (locator, reasoner) = locator(CueBundle::default(), json!({}));
    let sink = MemorySink::default();

    let result = locator
        .run_instance(
            request("whitespace handling is broken", None),
            repo.path(),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(result.category, Category::NoHint);
    assert_eq!(
        sink.get(artifacts::CLASSIFIER).unwrap()["details"]["decision"]["rule"],
        json!("no_parts")
    );
    assert!(sink.has(artifacts::RETRIEVAL_BUILD));
    assert!(sink.has(artifacts::RETRIEVAL));
    assert!(sink.has(artifacts::RETRIEVAL_EXPANDED));

    let ranks: Vec<usize> = result.candidates.iter().map(|g| g.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
    assert!(result.candidates[0].score >= result.candidates[1].score);
    for group in &result.candidates {
        assert_eq!(group.rationale["mode"], json!("RETRIEVAL"));
        assert!(group
            .locations
            .iter()
            .all(|l| (0.0..=1.0).contains(&l.confidence)));
    }
    assert_eq!(*reasoner.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn free_text_clues_promote_to_hint_without_expansion() {
    let repo = service_repo();
    let (locator, _) = locator(
        CueBundle {
            other_clues: strings(&["split"]),
            ..CueBundle::default()
        },
        json!({}),
    );
    let sink = MemorySink::default();

    let result = locator
        .run_instance(request("split drops tokens", None), repo.path(), &sink)
        .await
        .unwrap();

    assert_eq!(result.category, Category::Hint);
    assert_eq!(
        sink.get(artifacts::CLASSIFIER).unwrap()["details"]["decision"]["rule"],
        json!("other_clues_present")
    );
    assert!(sink.has(artifacts::RETRIEVAL));
    assert!(!sink.has(artifacts::RETRIEVAL_EXPANDED));
}

#[tokio::test]
async fn partial_reroutes_to_hint_when_reasoner_declines() {
    let repo = service_repo();
    let (locator, reasoner) = locator(
        CueBundle {
            function_mentions: strings(&["parse"]),
            ..CueBundle::default()
        },
        json!({
            "decision": "HINT",
            "why": "only call sites of the tokenizer",
            "hint_terms": ["split_all"],
            "groups": []
        }),
    );
    let sink = MemorySink::default();

    let result = locator
        .run_instance(request("parse loses words", None), repo.path(), &sink)
        .await
        .unwrap();

    assert_eq!(*reasoner.calls.lock().unwrap(), 1);
    assert_eq!(result.category, Category::Hint);
    let fallback = sink.get(artifacts::PARTIAL_FALLBACK).unwrap();
    assert_eq!(fallback["fallback_to"], json!("HINT"));
    assert_eq!(fallback["hint_terms"], json!(["split_all"]));
    assert_eq!(
        sink.get(artifacts::CLASSIFIER).unwrap()["details"]["decision"]["rule"],
        json!("partial_ast_fallback_to_hint")
    );
    assert_eq!(
        sink.get(artifacts::CANDIDATES).unwrap()["category"],
        json!("HINT")
    );
    assert!(!result.candidates.is_empty());
}

#[tokio::test]
async fn partial_uses_reasoner_groups() {
    let repo = service_repo();
    let (locator, _) = locator(
        CueBundle {
            file_mentions: strings(&["svc/parse.py"]),
            function_mentions: strings(&["parse"]),
            ..CueBundle::default()
        },
        json!({
            "decision": "OK",
            "groups": [{"score": 0.9, "candidate_ids": [2], "why": "slices a fixed width"}]
        }),
    );
    let sink = MemorySink::default();

    let result = locator
        .run_instance(request("parse breaks long headers", None), repo.path(), &sink)
        .await
        .unwrap();

    assert_eq!(result.category, Category::Partial);
    assert_eq!(result.candidates.len(), 1);
    assert_eq!(
        result.candidates[0].locations[0].qualified_name.as_deref(),
        Some("svc.parse.parse_header")
    );
    assert_eq!(result.candidates[0].rationale["mode"], json!("PARTIAL_AST"));
}

#[tokio::test]
async fn cost_overrun_aborts_the_instance() {
    let repo = single_function_repo();
    let config = FaultlocConfig {
        cost_limit_usd: 0.001,
        price_input_per_1k: 1.0,
        ..FaultlocConfig::default()
    };
    let usage = TokenUsage {
        prompt_tokens: Some(1000),
        ..TokenUsage::default()
    };
    let (locator, _) = locator_with(config, CueBundle::default(), Some(usage), json!({}));
    let sink = MemorySink::default();

    let err = locator
        .run_instance(request("anything", None), repo.path(), &sink)
        .await
        .unwrap_err();

    match err {
        LocatorError::Budget(exceeded) => assert_eq!(exceeded.kind, BudgetKind::Cost),
        other => panic!("expected a budget error, got {other}"),
    }
    assert!(sink.has(artifacts::EXTRACTOR));
    assert!(!sink.has(artifacts::CANDIDATES));
}
