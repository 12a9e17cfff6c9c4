use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::generator::{GenerationError, GenerationRequest, TextGenerator};
use crate::model::{AnalysisMode, AuditResult, BusinessContext, CodeAnalysis, KeywordData};
use crate::prompts;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no usable response from the generation service")]
    NoUsableResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("generation failed: {0}")]
    Generation(#[source] GenerationError),
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::EmptyResponse | GenerationError::StreamEnded => {
                EngineError::NoUsableResponse
            }
            other => EngineError::Generation(other),
        }
    }
}

/// The four request procedures. Each issues exactly one generation call; failures are
/// returned to the caller untouched, with no retry and no partial result.
#[derive(Clone)]
pub struct Engine {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl Engine {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn run_audit(
        &self,
        input: &str,
        mode: AnalysisMode,
        business: Option<&BusinessContext>,
    ) -> Result<AuditResult, EngineError> {
        if input.trim().is_empty() {
            return Err(EngineError::InvalidInput(match mode {
                AnalysisMode::Url => "url must not be empty".to_string(),
                AnalysisMode::Code => "source code must not be empty".to_string(),
            }));
        }

        let request = GenerationRequest::json(
            &self.model,
            prompts::SYSTEM_INSTRUCTION,
            prompts::audit_prompt(input, mode, business),
            prompts::audit_schema(),
        );
        let result: AuditResult = self.request_json(request, "audit").await?;

        if let Some((label, score)) = result.scores.out_of_range() {
            warn!(label, score, "audit score out of range");
            return Err(EngineError::MalformedResponse(format!(
                "{label} score {score} is outside 0-100"
            )));
        }

        info!(
            ?mode,
            recommendations = result.recommendations.len(),
            keywords = result.keywords.len(),
            "audit complete"
        );
        Ok(result)
    }

    pub async fn research_keywords(&self, seed: &str) -> Result<Vec<KeywordData>, EngineError> {
        if seed.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "seed keyword must not be empty".to_string(),
            ));
        }
        let request = GenerationRequest::json(
            &self.model,
            prompts::SYSTEM_INSTRUCTION,
            prompts::keyword_prompt(seed),
            prompts::keyword_list_schema(),
        );
        let keywords: Vec<KeywordData> = self.request_json(request, "keyword research").await?;
        info!(seed = seed.trim(), keywords = keywords.len(), "keyword research complete");
        Ok(keywords)
    }

    pub async fn generate_blog(&self, topic: &str, context: &str) -> Result<String, EngineError> {
        if topic.trim().is_empty() {
            return Err(EngineError::InvalidInput("topic must not be empty".to_string()));
        }
        let request = GenerationRequest::text(
            &self.model,
            prompts::SYSTEM_INSTRUCTION,
            prompts::blog_prompt(topic, context),
        );
        let text = self
            .generator
            .generate(request)
            .await
            .inspect_err(|e| warn!(error = %e, "blog generation failed"))?;
        if text.trim().is_empty() {
            return Err(EngineError::NoUsableResponse);
        }
        info!(topic = topic.trim(), chars = text.len(), "blog generated");
        Ok(text)
    }

    pub async fn fix_code(&self, code: &str, issues: &str) -> Result<CodeAnalysis, EngineError> {
        if code.trim().is_empty() {
            return Err(EngineError::InvalidInput("code must not be empty".to_string()));
        }
        let issues = match issues.trim() {
            "" => prompts::DEFAULT_FIX_ISSUES,
            trimmed => trimmed,
        };
        let request = GenerationRequest::json(
            &self.model,
            prompts::SYSTEM_INSTRUCTION,
            prompts::code_fix_prompt(code, issues),
            prompts::code_fix_schema(),
        );
        let analysis: CodeAnalysis = self.request_json(request, "code fix").await?;
        info!(
            issues = analysis.issues.len(),
            fixed = analysis.fixed_code.is_some(),
            "code fix complete"
        );
        Ok(analysis)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
        what: &'static str,
    ) -> Result<T, EngineError> {
        let text = self
            .generator
            .generate(request)
            .await
            .inspect_err(|e| warn!(error = %e, what, "generation failed"))?;
        if text.trim().is_empty() {
            return Err(EngineError::NoUsableResponse);
        }
        serde_json::from_str(text.trim()).map_err(|e| {
            warn!(error = %e, what, "response did not match the expected schema");
            EngineError::MalformedResponse(e.to_string())
        })
    }
}
