//! Learning-session orchestration
//!
//! The core of CodeLeap: a single state machine that owns all
//! client-visible session state and sequences content submission, plan
//! generation, per-step exercise fetches, code feedback, and concept
//! explanation over the AI gateway.

mod notice;
mod orchestrator;
mod state;

pub use notice::{Notice, Severity};
pub use orchestrator::{ExerciseFetch, Session};
pub use state::{
    DEFAULT_DOCUMENTATION, DEFAULT_EXAMPLE_CODE, DEFAULT_TOPIC, Exercise, Explanation, Feedback,
    LoadingFlags, Panel, SessionState, normalize_code,
};

pub use crate::gateway::LearningMode;
