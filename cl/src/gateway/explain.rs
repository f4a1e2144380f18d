//! ExplainConcept operation
//!
//! Explains the active exercise's topic in simpler terms, broken into
//! digestible parts and tied back to the step's documentation/example.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GatewayError, LlmGateway};
use crate::llm::{CompletionRequest, Message, ToolDefinition};

/// Input for concept explanation
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    pub concept: String,
    pub documentation: String,
    pub example_code: String,
}

/// A three-part concept explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    /// Simplified explanation of the concept
    pub explanation: String,
    /// The concept broken into smaller parts
    pub breakdown: String,
    /// How the concept applies to the documentation and example code
    pub application: String,
}

#[derive(Serialize)]
struct ExplainPromptContext<'a> {
    concept: &'a str,
    documentation: &'a str,
    example_code: &'a str,
}

pub(super) async fn run(
    gw: &LlmGateway,
    request: ExplainRequest,
) -> Result<ConceptExplanation, GatewayError> {
    debug!(concept = %request.concept, "explain_concept: called");
    let system_prompt = gw.render_prompt(
        "explain-concept",
        &ExplainPromptContext {
            concept: &request.concept,
            documentation: &request.documentation,
            example_code: &request.example_code,
        },
    )?;

    let completion = CompletionRequest {
        system_prompt,
        messages: vec![Message::user("Explain the concept now.")],
        tools: vec![submit_tool()],
        max_tokens: gw.max_tokens,
    };

    let response = gw.llm.complete(completion).await?;
    gw.structured_output(response, "submit_explanation")
}

fn submit_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_explanation",
        "Submit the concept explanation. Call this once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "explanation": {
                    "type": "string",
                    "description": "A simplified explanation of the coding concept"
                },
                "breakdown": {
                    "type": "string",
                    "description": "The concept broken into smaller, more digestible parts"
                },
                "application": {
                    "type": "string",
                    "description": "How the concept applies to the provided documentation and example code"
                }
            },
            "required": ["explanation", "breakdown", "application"]
        }),
    )
}
