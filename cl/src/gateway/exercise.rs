//! GenerateExercise operation
//!
//! Produces a question/snippet/solution triple for one topic. The
//! learning mode decides whether starter code is allowed at all.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GatewayError, LlmGateway};
use crate::llm::{CompletionRequest, Message, ToolDefinition};

/// Default starter snippet substituted when hand-holding output omits one
pub const DEFAULT_SNIPPET: &str = "# TODO: Write your code here, following the question.";

/// How much scaffolding an exercise provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningMode {
    /// Fill-in-the-blanks starter code
    HandHolding,
    /// Write everything from scratch; no starter code
    Challenge,
}

impl LearningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningMode::HandHolding => "hand-holding",
            LearningMode::Challenge => "challenge",
        }
    }

    /// Parse a mode name as written in config or user input
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hand-holding" => Some(LearningMode::HandHolding),
            "challenge" => Some(LearningMode::Challenge),
            _ => None,
        }
    }
}

impl std::fmt::Display for LearningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for exercise generation
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRequest {
    pub topic: String,
    pub documentation: String,
    pub example_code: String,
    pub mode: LearningMode,
}

/// Raw exercise as produced by the gateway, before session context is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExercise {
    pub question: String,
    #[serde(default)]
    pub code_snippet: Option<String>,
    pub solution: String,
}

#[derive(Serialize)]
struct ExercisePromptContext<'a> {
    topic: &'a str,
    documentation: &'a str,
    example_code: &'a str,
    learning_mode: &'a str,
    hand_holding: bool,
    challenge: bool,
}

impl<'a> ExercisePromptContext<'a> {
    fn new(request: &'a ExerciseRequest) -> Self {
        Self {
            topic: &request.topic,
            documentation: &request.documentation,
            example_code: &request.example_code,
            learning_mode: request.mode.as_str(),
            hand_holding: request.mode == LearningMode::HandHolding,
            challenge: request.mode == LearningMode::Challenge,
        }
    }
}

pub(super) async fn run(
    gw: &LlmGateway,
    request: ExerciseRequest,
) -> Result<GeneratedExercise, GatewayError> {
    debug!(topic = %request.topic, mode = %request.mode, "generate_exercise: called");
    let system_prompt = gw.render_prompt("exercise", &ExercisePromptContext::new(&request))?;

    let completion = CompletionRequest {
        system_prompt,
        messages: vec![Message::user("Generate the exercise now.")],
        tools: vec![submit_tool()],
        max_tokens: gw.max_tokens,
    };

    let response = gw.llm.complete(completion).await?;
    let exercise: GeneratedExercise = gw.structured_output(response, "submit_exercise")?;

    Ok(apply_mode_rules(exercise, request.mode))
}

/// Challenge mode never carries a snippet; hand-holding mode always does
pub(crate) fn apply_mode_rules(
    mut exercise: GeneratedExercise,
    mode: LearningMode,
) -> GeneratedExercise {
    match mode {
        LearningMode::Challenge => {
            exercise.code_snippet = None;
        }
        LearningMode::HandHolding => {
            let missing = exercise
                .code_snippet
                .as_deref()
                .is_none_or(|s| s.trim().is_empty());
            if missing {
                exercise.code_snippet = Some(DEFAULT_SNIPPET.to_string());
            }
        }
    }
    exercise
}

fn submit_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_exercise",
        "Submit the generated exercise. Call this once.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The coding exercise question"
                },
                "code_snippet": {
                    "type": "string",
                    "description": "Starter code with blanks to fill. Empty string in challenge mode."
                },
                "solution": {
                    "type": "string",
                    "description": "The complete solution to the exercise"
                }
            },
            "required": ["question", "solution"]
        }),
    )
}
