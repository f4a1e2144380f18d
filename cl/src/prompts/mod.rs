//! Prompt templates for the AI gateway
//!
//! Handlebars templates with embedded defaults and filesystem overrides.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
