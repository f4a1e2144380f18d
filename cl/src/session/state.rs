//! Session state snapshot types
//!
//! One `SessionState` value holds everything the presentation layer
//! renders. The orchestrator owns it exclusively for the lifetime of a
//! session; transitions replace fields wholesale, never partially.

use crate::gateway::{
    ConceptExplanation, GeneratedExercise, LearningMode, LearningPlan, LearningStep,
};

/// Fallback topic used before any plan exists
pub const DEFAULT_TOPIC: &str = "Basic Python Output and Variables";

/// Fallback documentation for steps that carry none, and for the default exercise
pub const DEFAULT_DOCUMENTATION: &str = "Python basics include variables for storing data (e.g., name = \"Alice\"), \
the print() function for displaying output (e.g., print(\"Hello\")), and f-strings for formatted output \
(e.g., print(f\"Hello, {name}\")). Arithmetic operations like addition (+), subtraction (-), \
multiplication (*), and division (/) are also fundamental.";

/// Fallback example code for steps that carry none, and for the default exercise
pub const DEFAULT_EXAMPLE_CODE: &str = r#"name = "World"
print(f"Hello, {name}!")
x = 10
y = 5
sum_result = x + y
print(f"The sum of {x} and {y} is {sum_result}")

# Try to make a variable for your favorite food and print it.
# Then, try to calculate 100 divided by 4 and print the result.
"#;

/// A three-part concept explanation (session-local alias)
pub type Explanation = ConceptExplanation;

/// A generated exercise plus the step context it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub question: String,
    /// Present only in hand-holding mode
    pub code_snippet: Option<String>,
    pub solution: String,
    pub topic: String,
    pub documentation: String,
    pub example_code: String,
}

impl Exercise {
    /// Attach step context to a gateway result
    pub fn from_generated(
        generated: GeneratedExercise,
        topic: &str,
        documentation: &str,
        example_code: &str,
    ) -> Self {
        Self {
            question: generated.question,
            code_snippet: generated.code_snippet,
            solution: generated.solution,
            topic: topic.to_string(),
            documentation: documentation.to_string(),
            example_code: example_code.to_string(),
        }
    }
}

/// Tutor feedback on improved or submitted code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feedback {
    pub message: Option<String>,
    pub suggestions: Option<String>,
    /// Present only after a submit; improve gives no verdict
    pub is_correct: Option<bool>,
}

/// Which panel fills the whole view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Exercise,
    Code,
}

/// Loading flags, one per in-flight operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub plan: bool,
    pub exercise: bool,
    pub improve: bool,
    pub submit: bool,
    pub explanation: bool,
}

/// Complete client-visible session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub plan: Option<LearningPlan>,
    /// Zero-based index into the plan; committed only after a successful fetch
    pub step_index: Option<usize>,
    pub exercise: Option<Exercise>,
    /// The user's editable code, seeded from the exercise
    pub code_buffer: String,
    pub feedback: Option<Feedback>,
    pub explanation: Option<Explanation>,
    pub mode: LearningMode,
    pub expanded_panel: Option<Panel>,
    pub loading: LoadingFlags,
}

impl SessionState {
    pub fn new(mode: LearningMode) -> Self {
        Self {
            plan: None,
            step_index: None,
            exercise: None,
            code_buffer: String::new(),
            feedback: None,
            explanation: None,
            mode,
            expanded_panel: None,
            loading: LoadingFlags::default(),
        }
    }

    /// The step the session is currently on, when one is active
    pub fn current_step(&self) -> Option<&LearningStep> {
        let plan = self.plan.as_ref()?;
        plan.steps.get(self.step_index?)
    }
}

/// Strip all whitespace for the syntactic correctness check
///
/// Purely textual: a semantically correct answer with different tokens
/// still compares unequal.
pub fn normalize_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}
