//! AI Generation Gateway
//!
//! The four remote operations the tutor depends on: learning-plan
//! generation, exercise generation, code improvement, and concept
//! explanation. Each is one request/response call: validate input,
//! render the prompt, complete, and schema-check the structured output
//! at the boundary. Malformed payloads are failures, never coerced.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

mod content;
mod exercise;
mod explain;
mod improve;
mod plan;

pub use content::{MAX_FETCHED_CONTENT_CHARS, fetch_url_content};
pub use exercise::{DEFAULT_SNIPPET, ExerciseRequest, GeneratedExercise, LearningMode};
pub use explain::{ConceptExplanation, ExplainRequest};
pub use improve::{ImproveRequest, Improvements};
pub use plan::{LearningPlan, LearningStep, PlanRequest};

use crate::llm::{CompletionResponse, LlmClient, LlmError};
use crate::prompts::PromptLoader;

/// Errors from gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected before any remote call was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The remote call succeeded but the payload violates the declared shape
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Prompt template error: {0}")]
    Template(String),
}

/// The AI generation boundary the session orchestrator depends on
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn generate_learning_plan(
        &self,
        request: PlanRequest,
    ) -> Result<LearningPlan, GatewayError>;

    async fn generate_exercise(
        &self,
        request: ExerciseRequest,
    ) -> Result<GeneratedExercise, GatewayError>;

    async fn improve_code(&self, request: ImproveRequest) -> Result<Improvements, GatewayError>;

    async fn explain_concept(
        &self,
        request: ExplainRequest,
    ) -> Result<ConceptExplanation, GatewayError>;
}

/// AiGateway implementation over an LlmClient and prompt templates
pub struct LlmGateway {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl LlmGateway {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    fn render_prompt<T: serde::Serialize>(
        &self,
        name: &str,
        context: &T,
    ) -> Result<String, GatewayError> {
        self.prompts
            .render(name, context)
            .map_err(|e| GatewayError::Template(e.to_string()))
    }

    /// Extract the named submit tool call, falling back to JSON in content
    fn structured_output<T: DeserializeOwned>(
        &self,
        response: CompletionResponse,
        tool_name: &str,
    ) -> Result<T, GatewayError> {
        for tool_call in &response.tool_calls {
            if tool_call.name == tool_name {
                debug!(%tool_name, "structured_output: found tool call");
                return serde_json::from_value(tool_call.input.clone())
                    .map_err(|e| GatewayError::MalformedResponse(format!("{tool_name}: {e}")));
            }
        }

        // Fallback: some models answer with bare JSON instead of a tool call
        if let Some(content) = &response.content
            && let Ok(value) = serde_json::from_str::<T>(content)
        {
            debug!(%tool_name, "structured_output: parsed JSON from content");
            return Ok(value);
        }

        Err(GatewayError::MalformedResponse(format!(
            "model did not call {tool_name}"
        )))
    }
}

#[async_trait]
impl AiGateway for LlmGateway {
    async fn generate_learning_plan(
        &self,
        request: PlanRequest,
    ) -> Result<LearningPlan, GatewayError> {
        plan::run(self, request).await
    }

    async fn generate_exercise(
        &self,
        request: ExerciseRequest,
    ) -> Result<GeneratedExercise, GatewayError> {
        exercise::run(self, request).await
    }

    async fn improve_code(&self, request: ImproveRequest) -> Result<Improvements, GatewayError> {
        improve::run(self, request).await
    }

    async fn explain_concept(
        &self,
        request: ExplainRequest,
    ) -> Result<ConceptExplanation, GatewayError> {
        explain::run(self, request).await
    }
}
