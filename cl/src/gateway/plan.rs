//! GenerateLearningPlan operation
//!
//! Assembles pasted content with text fetched from optional URLs, then
//! asks the model to decompose it into an ordered learning plan.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::content::fetch_url_content;
use super::{GatewayError, LlmGateway};
use crate::llm::{CompletionRequest, Message, ToolDefinition};

/// Input for learning-plan generation
///
/// At least one of the three fields must be non-empty.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    /// Pasted lecture notes, documentation, or other text
    pub content: Option<String>,
    /// URL to fetch additional documentation from
    pub documentation_url: Option<String>,
    /// URL to fetch code from (e.g. a raw file URL)
    pub code_url: Option<String>,
}

impl PlanRequest {
    /// True when no usable input was provided
    pub fn is_empty(&self) -> bool {
        fn blank(field: &Option<String>) -> bool {
            field.as_deref().is_none_or(|s| s.trim().is_empty())
        }
        blank(&self.content) && blank(&self.documentation_url) && blank(&self.code_url)
    }
}

/// An ordered learning plan derived from user content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub title: String,
    #[serde(rename = "learning_steps")]
    pub steps: Vec<LearningStep>,
}

/// One topic within a plan, addressed by position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStep {
    pub topic: String,
    pub description: String,
    #[serde(default)]
    pub extracted_documentation: Option<String>,
    #[serde(default)]
    pub extracted_example_code: Option<String>,
}

#[derive(Serialize)]
struct PlanPromptContext {}

pub(super) async fn run(
    gw: &LlmGateway,
    request: PlanRequest,
) -> Result<LearningPlan, GatewayError> {
    if request.is_empty() {
        return Err(GatewayError::InvalidInput(
            "Provide content, a documentation URL, or a code URL".to_string(),
        ));
    }

    let content = assemble_content(&request).await;
    if content.trim().is_empty() {
        return Err(GatewayError::InvalidInput(
            "No usable content after fetching URLs".to_string(),
        ));
    }

    let system_prompt = gw.render_prompt("learning-plan", &PlanPromptContext {})?;
    let completion = CompletionRequest {
        system_prompt,
        messages: vec![Message::user(format!(
            "Create a learning plan from this content:\n\n{content}"
        ))],
        tools: vec![submit_tool()],
        max_tokens: gw.max_tokens,
    };

    let response = gw.llm.complete(completion).await?;
    let plan: LearningPlan = gw.structured_output(response, "submit_learning_plan")?;

    info!(title = %plan.title, steps = plan.steps.len(), "learning plan generated");
    Ok(plan)
}

/// Concatenate pasted content with fetched URL sections
///
/// Fetch failures are soft: a bracketed marker is appended and assembly
/// continues, so one dead link does not sink the whole request.
async fn assemble_content(request: &PlanRequest) -> String {
    let mut assembled = request.content.clone().unwrap_or_default();

    if let Some(url) = url_field(&request.documentation_url) {
        assembled.push_str(&fetch_section(url, "Documentation").await);
    }
    if let Some(url) = url_field(&request.code_url) {
        assembled.push_str(&fetch_section(url, "Code").await);
    }

    assembled
}

fn url_field(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn fetch_section(url: &str, label: &str) -> String {
    match fetch_url_content(url).await {
        Ok(text) => {
            debug!(%url, %label, chars = text.len(), "fetch_section: fetched");
            format!("\n\n--- {label} from URL ({url}) ---\n{text}")
        }
        Err(e) => {
            debug!(%url, %label, error = %e, "fetch_section: fetch failed");
            format!("\n\n[Error fetching {label} from {url}: {e}]")
        }
    }
}

fn submit_tool() -> ToolDefinition {
    ToolDefinition::new(
        "submit_learning_plan",
        "Submit the learning plan. Call this once with the title and all steps.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Concise, descriptive title for the learning plan"
                },
                "learning_steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "topic": {
                                "type": "string",
                                "description": "Topic or concept for this step"
                            },
                            "description": {
                                "type": "string",
                                "description": "What to learn and how it relates to the content"
                            },
                            "extracted_documentation": {
                                "type": "string",
                                "description": "Key documentation snippet for this topic, if present in the content"
                            },
                            "extracted_example_code": {
                                "type": "string",
                                "description": "Relevant code example for this topic, if present in the content"
                            }
                        },
                        "required": ["topic", "description"]
                    },
                    "description": "Sequential learning steps, 3-7 for typical content"
                }
            },
            "required": ["title", "learning_steps"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::AiGateway;
    use crate::gateway::test_support::{gateway_with, text_response, tool_response};

    fn content_request(text: &str) -> PlanRequest {
        PlanRequest {
            content: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_request_is_empty() {
        assert!(PlanRequest::default().is_empty());
        assert!(content_request("   ").is_empty());
        assert!(!content_request("some notes").is_empty());
        assert!(
            !PlanRequest {
                documentation_url: Some("https://example.com".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_learning_plan_deserialize() {
        let json = r#"{
            "title": "Intro to Python",
            "learning_steps": [
                {"topic": "Variables", "description": "Storing data"},
                {
                    "topic": "Loops",
                    "description": "Repetition",
                    "extracted_example_code": "for i in range(3): print(i)"
                }
            ]
        }"#;

        let plan: LearningPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.title, "Intro to Python");
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.steps[0].extracted_documentation.is_none());
        assert!(plan.steps[1].extracted_example_code.is_some());
    }

    #[tokio::test]
    async fn test_empty_request_rejected_before_any_call() {
        let (gateway, client) = gateway_with(vec![]);
        let result = gateway.generate_learning_plan(PlanRequest::default()).await;

        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_from_tool_call() {
        let (gateway, client) = gateway_with(vec![tool_response(
            "submit_learning_plan",
            serde_json::json!({
                "title": "Intro",
                "learning_steps": [
                    {"topic": "Vars", "description": "Variables"}
                ]
            }),
        )]);

        let plan = gateway
            .generate_learning_plan(content_request("notes about variables"))
            .await
            .unwrap();

        assert_eq!(plan.title, "Intro");
        assert_eq!(plan.steps[0].topic, "Vars");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_plan_from_json_content_fallback() {
        let (gateway, _) = gateway_with(vec![text_response(
            r#"{"title": "Intro", "learning_steps": []}"#,
        )]);

        let plan = gateway
            .generate_learning_plan(content_request("notes"))
            .await
            .unwrap();

        // Zero steps is a degenerate success, not an error
        assert!(plan.steps.is_empty());
    }

    #[tokio::test]
    async fn test_non_array_steps_is_malformed() {
        let (gateway, _) = gateway_with(vec![tool_response(
            "submit_learning_plan",
            serde_json::json!({"title": "Intro", "learning_steps": "not an array"}),
        )]);

        let result = gateway
            .generate_learning_plan(content_request("notes"))
            .await;
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_missing_tool_call_is_malformed() {
        let (gateway, _) = gateway_with(vec![text_response("I can't do that")]);

        let result = gateway
            .generate_learning_plan(content_request("notes"))
            .await;
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }
}
