use crate::client::ChatClient;
use crate::error::LlmError;
use crate::prompts::{
    issue_message, CLASSIFICATION_SYSTEM, EXTRACTION_SYSTEM, REASONING_SYSTEM,
};
use async_trait::async_trait;
use faultloc_locator::{
    CandidateReasoner, Category, ClassificationVerdict, CueBundle, CueExtractor, Extraction,
    FaultlocConfig, IssueClassifier, LocatorError, ReasoningRequest, ReasoningResponse,
};
use serde_json::Value;
use std::sync::Arc;

fn stage_error(stage: &'static str) -> impl FnOnce(LlmError) -> LocatorError {
    move |e| LocatorError::capability(stage, e.to_string())
}

/// Cue extraction backed by a chat model
pub struct LlmCueExtractor {
    client: Arc<ChatClient>,
    temperature: f32,
}

impl LlmCueExtractor {
    #[must_use]
    pub fn new(client: Arc<ChatClient>, config: &FaultlocConfig) -> Self {
        Self {
            client,
            temperature: config.extraction_temperature,
        }
    }
}

#[async_trait]
impl CueExtractor for LlmCueExtractor {
    async fn extract(&self, problem_statement: &str) -> faultloc_locator::Result<Extraction> {
        let reply = self
            .client
            .chat_json(
                EXTRACTION_SYSTEM,
                &issue_message(problem_statement),
                self.temperature,
            )
            .await
            .map_err(stage_error("extraction"))?;

        Ok(Extraction {
            cues: CueBundle::from_json(&reply.content),
            usage: reply.usage,
            raw: reply.content,
        })
    }
}

/// Advisory category from a chat model
pub struct LlmIssueClassifier {
    client: Arc<ChatClient>,
    temperature: f32,
}

impl LlmIssueClassifier {
    #[must_use]
    pub fn new(client: Arc<ChatClient>, config: &FaultlocConfig) -> Self {
        Self {
            client,
            temperature: config.classification_temperature,
        }
    }
}

#[async_trait]
impl IssueClassifier for LlmIssueClassifier {
    async fn classify(
        &self,
        problem_statement: &str,
    ) -> faultloc_locator::Result<ClassificationVerdict> {
        let reply = self
            .client
            .chat_json(
                CLASSIFICATION_SYSTEM,
                &issue_message(problem_statement),
                self.temperature,
            )
            .await
            .map_err(stage_error("classification"))?;

        Ok(verdict_from_json(&reply.content, reply.usage))
    }
}

fn verdict_from_json(
    content: &Value,
    usage: Option<faultloc_vector_store::TokenUsage>,
) -> ClassificationVerdict {
    let category = content
        .get("category")
        .and_then(Value::as_str)
        .map_or(Category::Hint, Category::parse_lenient);
    let reason = content
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    ClassificationVerdict {
        category,
        reason,
        usage,
    }
}

/// Edit-location judgement over candidate summaries
pub struct LlmCandidateReasoner {
    client: Arc<ChatClient>,
    temperature: f32,
}

impl LlmCandidateReasoner {
    #[must_use]
    pub fn new(client: Arc<ChatClient>, config: &FaultlocConfig) -> Self {
        Self {
            client,
            temperature: config.reasoning_temperature,
        }
    }
}

#[async_trait]
impl CandidateReasoner for LlmCandidateReasoner {
    async fn reason(
        &self,
        request: &ReasoningRequest,
    ) -> faultloc_locator::Result<ReasoningResponse> {
        let user = serde_json::to_string_pretty(request)?;
        let reply = self
            .client
            .chat_json(REASONING_SYSTEM, &user, self.temperature)
            .await
            .map_err(stage_error("reasoning"))?;

        Ok(ReasoningResponse::from_json(reply.content, reply.usage))
    }
}
