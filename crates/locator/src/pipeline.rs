use crate::artifacts::{self, ArtifactSink};
use crate::budget::BudgetManager;
use crate::capabilities::{CandidateReasoner, ClassificationVerdict, CueExtractor, IssueClassifier};
use crate::classifier::{Classification, Classifier, DecisionRule};
use crate::config::FaultlocConfig;
use crate::cues::normalize_cues;
use crate::error::Result;
use crate::eval::{evaluate_against_patch, EvaluationReport};
use crate::full_location::FullLocationResolver;
use crate::hint::{expand_with_import_graph, hint_candidates, EXPANSION_FILE_CAP};
use crate::partial::{PartialOutcome, PartialReasoner};
use crate::retrieval::Retriever;
use crate::types::{CandidateGroup, Category};
use faultloc_indexer::{RepoIndex, RepoIndexer};
use faultloc_vector_store::Embedder;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// External capabilities wired in by the driver
#[derive(Clone)]
pub struct Capabilities {
    pub extractor: Arc<dyn CueExtractor>,
    pub reasoner: Arc<dyn CandidateReasoner>,
    pub embedder: Arc<dyn Embedder>,
    /// Consulted only when `advisory_classification` is on
    pub advisor: Option<Arc<dyn IssueClassifier>>,
}

/// One bug instance to localize
#[derive(Debug, Clone, Copy)]
pub struct InstanceRequest<'a> {
    pub instance_id: &'a str,
    pub problem_statement: &'a str,
    /// Reference fix, evaluated against the candidates when present
    pub patch: Option<&'a str>,
    pub topk: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceResult {
    pub instance_id: String,
    pub category: Category,
    pub topk: usize,
    pub candidates_path: Option<PathBuf>,
    pub candidates: Vec<CandidateGroup>,
    pub evaluation: Option<EvaluationReport>,
}

/// Classification-driven localization of one issue against one snapshot.
///
/// Each instance gets its own [`BudgetManager`]; a budget failure aborts
/// that instance only and surfaces as [`crate::LocatorError::Budget`].
pub struct Locator {
    config: FaultlocConfig,
    capabilities: Capabilities,
}

impl Locator {
    #[must_use]
    pub fn new(config: FaultlocConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FaultlocConfig {
        &self.config
    }

    /// Index `repo_path`, then localize
    pub async fn run_instance(
        &self,
        request: InstanceRequest<'_>,
        repo_path: &Path,
        sink: &dyn ArtifactSink,
    ) -> Result<InstanceResult> {
        let mut budget = self.start(&request, repo_path, sink).await?;
        let (index, stats) = RepoIndexer::new(repo_path)?.build().await?;
        log::info!(
            "{}: indexed {} files, {} symbols in {}ms",
            request.instance_id,
            stats.files,
            stats.symbols,
            stats.time_ms
        );
        self.locate(request, &index, &mut budget, sink).await
    }

    /// Localize against an index built earlier for the same snapshot
    pub async fn run_with_index(
        &self,
        request: InstanceRequest<'_>,
        index: &RepoIndex,
        sink: &dyn ArtifactSink,
    ) -> Result<InstanceResult> {
        let mut budget = self.start(&request, &index.root, sink).await?;
        self.locate(request, index, &mut budget, sink).await
    }

    async fn start(
        &self,
        request: &InstanceRequest<'_>,
        repo_path: &Path,
        sink: &dyn ArtifactSink,
    ) -> Result<BudgetManager> {
        let budget = BudgetManager::new(&self.config);
        sink.write_json(
            artifacts::META,
            &json!({
                "instance_id": request.instance_id,
                "repo_path": repo_path.display().to_string(),
                "budget": budget.snapshot(),
            }),
        )
        .await?;
        sink.write_text(artifacts::PROBLEM_STATEMENT, request.problem_statement)
            .await?;
        Ok(budget)
    }

    async fn locate(
        &self,
        request: InstanceRequest<'_>,
        index: &RepoIndex,
        budget: &mut BudgetManager,
        sink: &dyn ArtifactSink,
    ) -> Result<InstanceResult> {
        let text = request.problem_statement;

        sink.write_json(artifacts::FILE_INDEX, &serde_json::to_value(&index.files)?)
            .await?;
        sink.write_json(
            artifacts::IMPORT_GRAPH,
            &serde_json::to_value(index.imports.to_document())?,
        )
        .await?;
        sink.write_json(artifacts::SYMBOL_INDEX, &serde_json::to_value(&index.symbols)?)
            .await?;
        budget.ensure_within_budget()?;

        let extraction = self.capabilities.extractor.extract(text).await?;
        sink.write_json(
            artifacts::EXTRACTOR,
            &json!({
                "result": extraction.raw,
                "cues": extraction.cues,
                "usage": extraction.usage,
            }),
        )
        .await?;
        budget.add_cost_from_usage(extraction.usage.as_ref());
        budget.ensure_within_budget()?;

        let cues = normalize_cues(&extraction.cues, text);
        sink.write_json(artifacts::CUES_NORMALIZED, &serde_json::to_value(&cues)?)
            .await?;
        budget.ensure_within_budget()?;

        let mut classification = Classifier::new(index)
            .classify(&cues)
            .promote_with_clues(&cues.raw.other_clues);
        let advisory = self.advisory_verdict(text, budget).await?;
        write_classification(sink, &classification, advisory.as_ref()).await?;
        budget.ensure_within_budget()?;
        log::info!(
            "{}: {} via {}",
            request.instance_id,
            classification.category,
            classification.details.decision.rule
        );

        let scoring = &self.config.scoring;
        let max_locs = self.config.max_locations_per_group;
        let topk = request.topk;
        let candidates = match classification.category {
            Category::FullLocation => {
                FullLocationResolver::new(index, scoring).resolve(text, &cues, topk, max_locs)
            }
            Category::Partial => {
                let reasoner = PartialReasoner::new(index, scoring, self.capabilities.reasoner.as_ref());
                match reasoner.run(text, &cues, topk, max_locs, budget).await? {
                    PartialOutcome::Groups(groups) => groups,
                    PartialOutcome::Reroute(fallback) => {
                        sink.write_json(
                            artifacts::PARTIAL_FALLBACK,
                            &serde_json::to_value(&fallback)?,
                        )
                        .await?;
                        classification.category = Category::Hint;
                        classification.details.decision =
                            DecisionRule::named("partial_ast_fallback_to_hint");
                        write_classification(sink, &classification, advisory.as_ref()).await?;

                        let query = reroute_query(text, &fallback.hint_terms);
                        self.retrieve(index, &query, Category::Hint, topk, budget, sink)
                            .await?
                    }
                }
            }
            category @ (Category::Hint | Category::NoHint) => {
                self.retrieve(index, text, category, topk, budget, sink).await?
            }
        };
        budget.ensure_within_budget()?;

        sink.write_json(
            artifacts::CANDIDATES,
            &json!({
                "instance_id": request.instance_id,
                "category": classification.category,
                "candidates": candidates,
                "budget": budget.snapshot(),
            }),
        )
        .await?;

        let evaluation = match request.patch {
            Some(patch) => {
                let report = evaluate_against_patch(index, &candidates, patch);
                sink.write_json(artifacts::EVALUATION, &serde_json::to_value(&report)?)
                    .await?;
                Some(report)
            }
            None => None,
        };

        Ok(InstanceResult {
            instance_id: request.instance_id.to_string(),
            category: classification.category,
            topk,
            candidates_path: sink.location(artifacts::CANDIDATES),
            candidates,
            evaluation,
        })
    }

    async fn advisory_verdict(
        &self,
        text: &str,
        budget: &mut BudgetManager,
    ) -> Result<Option<ClassificationVerdict>> {
        let Some(advisor) = self.capabilities.advisor.as_ref() else {
            return Ok(None);
        };
        if !self.config.advisory_classification || !budget.allow_llm_refine() {
            return Ok(None);
        }
        let verdict = advisor.classify(text).await?;
        budget.add_cost_from_usage(verdict.usage.as_ref());
        budget.ensure_within_budget()?;
        log::debug!("Advisory category {} ({})", verdict.category, verdict.reason);
        Ok(Some(verdict))
    }

    async fn retrieve(
        &self,
        index: &RepoIndex,
        query: &str,
        category: Category,
        topk: usize,
        budget: &mut BudgetManager,
        sink: &dyn ArtifactSink,
    ) -> Result<Vec<CandidateGroup>> {
        let mut retriever = Retriever::new(
            self.capabilities.embedder.as_ref(),
            self.config.embed_batch_size,
        );
        let meta = retriever
            .build(
                index,
                self.config.max_files_for_embedding,
                self.config.max_functions_for_embedding,
                budget,
            )
            .await?;
        sink.write_json(
            artifacts::RETRIEVAL_BUILD,
            &json!({ "meta": meta, "budget": budget.snapshot() }),
        )
        .await?;
        budget.ensure_within_budget()?;

        let hits = retriever.query(query, budget).await?;
        sink.write_json(artifacts::RETRIEVAL, &serde_json::to_value(&hits)?)
            .await?;

        if category == Category::NoHint && budget.allow_retrieval_expand() {
            let expanded = expand_with_import_graph(&hits.file_hits, index, EXPANSION_FILE_CAP);
            sink.write_json(
                artifacts::RETRIEVAL_EXPANDED,
                &json!({ "expanded_files": expanded }),
            )
            .await?;
        }

        Ok(hint_candidates(
            index,
            &hits,
            &self.config.scoring,
            topk,
            self.config.max_locations_per_group,
        ))
    }
}

async fn write_classification(
    sink: &dyn ArtifactSink,
    classification: &Classification,
    advisory: Option<&ClassificationVerdict>,
) -> Result<()> {
    sink.write_json(
        artifacts::CLASSIFIER,
        &json!({
            "category": classification.category,
            "details": classification.details,
            "advisory": advisory,
        }),
    )
    .await
}

/// Retrieval query used after a PARTIAL reroute
#[must_use]
pub fn reroute_query(problem_statement: &str, hint_terms: &[String]) -> String {
    if hint_terms.is_empty() {
        return problem_statement.to_string();
    }
    format!(
        "{problem_statement}\n\nHint terms:\n- {}",
        hint_terms.join("\n- ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reroute_query_lists_terms() {
        assert_eq!(reroute_query("boom", &[]), "boom");
        assert_eq!(
            reroute_query("boom", &["split".to_string(), "join".to_string()]),
            "boom\n\nHint terms:\n- split\n- join"
        );
    }
}
