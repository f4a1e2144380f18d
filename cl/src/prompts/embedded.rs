//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Curriculum-designer prompt for learning-plan generation
pub const LEARNING_PLAN: &str = include_str!("../../prompts/learning-plan.pmt");

/// Exercise generator prompt (mode-aware)
pub const EXERCISE: &str = include_str!("../../prompts/exercise.pmt");

/// Code review prompt for improvement suggestions
pub const IMPROVE_CODE: &str = include_str!("../../prompts/improve-code.pmt");

/// Concept explanation prompt
pub const EXPLAIN_CONCEPT: &str = include_str!("../../prompts/explain-concept.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "learning-plan" => Some(LEARNING_PLAN),
        "exercise" => Some(EXERCISE),
        "improve-code" => Some(IMPROVE_CODE),
        "explain-concept" => Some(EXPLAIN_CONCEPT),
        _ => None,
    }
}
