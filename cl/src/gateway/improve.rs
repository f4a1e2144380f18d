//! ImproveCode operation
//!
//! Reviews submitted code and returns improvement suggestions. Used by
//! both the improve and submit intents; correctness is judged locally by
//! the session, not here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GatewayError, LlmGateway};
use crate::llm::{CompletionRequest, Message, ToolDefinition};

/// Input for code improvement
#[derive(Debug, Clone, PartialEq)]
pub struct ImproveRequest {
    pub code: String,
    pub language: String,
    /// The coding question the code is trying to answer, when known
    pub question: Option<String>,
}

/// Improvement suggestions for a piece of code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub improvements: String,
}

#[derive(Serialize)]
struct ImprovePromptContext<'a> {
    language: &'a str,
    question: Option<&'a str>,
}

pub(super) async fn run(
    gw: &LlmGateway,
    request: ImproveRequest,
) -> Result<Improvements, GatewayError> {
    debug!(language = %request.language, code_len = request.code.len(), "improve_code: called");
    let system_prompt = gw.render_prompt(
        "improve-code",
        &ImprovePromptContext {
            language: &request.language,
            question: request.question.as_deref(),
        },
    )?;

    let completion = CompletionRequest {
        system_prompt,
        messages: vec![Message::user(format!(
            "```{}\n{}\n```",
            request.language, request.code
        ))],
        tools: vec![submit_tool()],
        max_tokens: gw.max_tokens,
    };

    let response = gw.llm.complete(completion).await?;
    gw.structured_output(response, "submit_improvements")
}

fn submit_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_improvements",
        "Submit improvement suggestions for the code. Call this once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "improvements": {
                    "type": "string",
                    "description": "Suggestions for improving the code"
                }
            },
            "required": ["improvements"]
        }),
    )
}
