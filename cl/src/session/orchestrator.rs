//! Session orchestrator - the learning-session state machine
//!
//! Owns the session snapshot and the transition rules between states.
//! Every transition is an explicit method invoked by a user intent,
//! never inferred from field-change watchers. Exercise fetches are split
//! into begin/complete halves carrying a sequence token, so a slow fetch
//! that resolves after a newer selection is discarded instead of
//! clobbering current state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::gateway::{
    AiGateway, ExerciseRequest, ExplainRequest, GatewayError, GeneratedExercise, ImproveRequest,
    LearningMode, PlanRequest,
};

use super::notice::Notice;
use super::state::{
    DEFAULT_DOCUMENTATION, DEFAULT_EXAMPLE_CODE, DEFAULT_TOPIC, Exercise, Feedback, Panel,
    SessionState, normalize_code,
};

/// A dispatched exercise fetch awaiting reconciliation
///
/// The token identifies the latest fetch; a completion whose token is no
/// longer current is stale and must not touch state.
#[derive(Debug, Clone)]
pub struct ExerciseFetch {
    token: u64,
    /// Step the fetch targets; `None` for the default exercise
    step_index: Option<usize>,
    pub request: ExerciseRequest,
}

/// The learning-session state machine
pub struct Session {
    gateway: Arc<dyn AiGateway>,
    state: SessionState,
    /// Language exercises are generated and reviewed in
    language: String,
    /// Monotonic token; the latest dispatched exercise fetch owns the state
    fetch_seq: u64,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(gateway: Arc<dyn AiGateway>, mode: LearningMode, language: impl Into<String>) -> Self {
        Self {
            gateway,
            state: SessionState::new(mode),
            language: language.into(),
            fetch_seq: 0,
            notices: Vec::new(),
        }
    }

    /// Read-only view of the current snapshot
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drain notices accumulated since the last call
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn push(&mut self, notice: Notice) {
        debug!(severity = ?notice.severity, title = %notice.title, "notice");
        self.notices.push(notice);
    }

    // === Exercise fetch halves ===

    /// Phase one of an exercise fetch: validate, clear dependent state,
    /// mark loading, and claim the sequence token
    ///
    /// `step_index` of `None` requests the default exercise used while no
    /// plan exists. Returns `None` when validation rejects the intent; in
    /// that case nothing was mutated beyond a warning notice.
    pub fn begin_exercise_fetch(&mut self, step_index: Option<usize>) -> Option<ExerciseFetch> {
        let request = match step_index {
            Some(index) => {
                let step = self
                    .state
                    .plan
                    .as_ref()
                    .and_then(|plan| plan.steps.get(index))
                    .cloned();
                match step {
                    Some(step) => ExerciseRequest {
                        topic: step.topic,
                        documentation: non_blank(step.extracted_documentation.as_deref())
                            .unwrap_or(DEFAULT_DOCUMENTATION)
                            .to_string(),
                        example_code: non_blank(step.extracted_example_code.as_deref())
                            .unwrap_or(DEFAULT_EXAMPLE_CODE)
                            .to_string(),
                        mode: self.state.mode,
                    },
                    None => {
                        self.push(Notice::warning(
                            "Invalid Plan Step",
                            "Cannot fetch exercise for this step.",
                        ));
                        return None;
                    }
                }
            }
            None => ExerciseRequest {
                topic: DEFAULT_TOPIC.to_string(),
                documentation: DEFAULT_DOCUMENTATION.to_string(),
                example_code: DEFAULT_EXAMPLE_CODE.to_string(),
                mode: self.state.mode,
            },
        };

        self.state.loading.exercise = true;
        self.state.feedback = None;
        self.state.explanation = None;
        if step_index.is_some() {
            self.state.exercise = None;
            self.state.code_buffer.clear();
        }

        self.fetch_seq += 1;
        debug!(token = self.fetch_seq, ?step_index, "begin_exercise_fetch: dispatched");
        Some(ExerciseFetch {
            token: self.fetch_seq,
            step_index,
            request,
        })
    }

    /// Phase two: reconcile a finished fetch into the snapshot
    ///
    /// The step index commits only here, and only on success: a failed
    /// fetch never leaves a dangling index pointing at unfetched content.
    pub fn complete_exercise_fetch(
        &mut self,
        fetch: ExerciseFetch,
        result: Result<GeneratedExercise, GatewayError>,
    ) {
        if fetch.token != self.fetch_seq {
            // A newer fetch owns the state now, including the loading flag
            debug!(
                token = fetch.token,
                latest = self.fetch_seq,
                "complete_exercise_fetch: stale fetch discarded"
            );
            return;
        }

        self.state.loading.exercise = false;
        match result {
            Ok(generated) => {
                let exercise = Exercise::from_generated(
                    generated,
                    &fetch.request.topic,
                    &fetch.request.documentation,
                    &fetch.request.example_code,
                );
                self.state.code_buffer = seed_code_buffer(&exercise, self.state.mode);
                self.state.exercise = Some(exercise);
                if fetch.step_index.is_some() {
                    self.state.step_index = fetch.step_index;
                }
                info!(?fetch.step_index, "complete_exercise_fetch: exercise installed");
            }
            Err(e) => {
                if fetch.step_index.is_some() {
                    self.state.step_index = None;
                }
                warn!(error = %e, "complete_exercise_fetch: fetch failed");
                self.push(Notice::error("Error Generating Exercise", e.to_string()));
            }
        }
    }

    // === Transitions ===

    /// Load the default exercise used while no plan exists
    pub async fn load_default_exercise(&mut self) {
        let Some(fetch) = self.begin_exercise_fetch(None) else {
            return;
        };
        let result = self.gateway.generate_exercise(fetch.request.clone()).await;
        self.complete_exercise_fetch(fetch, result);
    }

    /// Generate a fresh learning plan from user content and/or URLs
    ///
    /// On success the first step is selected immediately; an empty plan
    /// stays in the no-step state with a warning. On failure the session
    /// reverts to no-plan and re-fetches the default exercise.
    pub async fn generate_plan(&mut self, request: PlanRequest) {
        if request.is_empty() {
            self.push(Notice::error(
                "Empty Content",
                "Paste some content or provide a URL to generate a plan.",
            ));
            return;
        }

        info!("generate_plan: dispatching");
        self.state.loading.plan = true;
        self.state.plan = None;
        self.state.step_index = None;
        self.state.exercise = None;
        self.state.code_buffer.clear();
        self.state.feedback = None;
        self.state.explanation = None;

        let result = self.gateway.generate_learning_plan(request).await;
        self.state.loading.plan = false;
        match result {
            Ok(plan) => {
                info!(title = %plan.title, steps = plan.steps.len(), "generate_plan: plan installed");
                let has_steps = !plan.steps.is_empty();
                self.state.plan = Some(plan);
                if has_steps {
                    self.select_step(0).await;
                } else {
                    self.push(Notice::warning(
                        "Empty Plan",
                        "The AI could not generate learning steps from the content.",
                    ));
                }
            }
            Err(e) => {
                warn!(error = %e, "generate_plan: failed");
                self.push(Notice::error("Error Generating Learning Plan", e.to_string()));
                self.load_default_exercise().await;
            }
        }
    }

    /// Select a plan step and fetch its exercise
    pub async fn select_step(&mut self, index: usize) {
        info!(index, "select_step");
        let Some(fetch) = self.begin_exercise_fetch(Some(index)) else {
            return;
        };
        let result = self.gateway.generate_exercise(fetch.request.clone()).await;
        self.complete_exercise_fetch(fetch, result);
    }

    /// Switch learning modes; the single place a mode change takes effect
    ///
    /// An active step is re-fetched under the new mode; with no plan the
    /// default exercise is re-fetched. A plan without an active step
    /// keeps its cleared panels.
    pub async fn change_mode(&mut self, mode: LearningMode) {
        if self.state.mode == mode {
            debug!(%mode, "change_mode: already active");
            return;
        }
        self.state.mode = mode;
        info!(%mode, "change_mode");

        if self.state.plan.is_some() {
            if let Some(index) = self.state.step_index {
                self.select_step(index).await;
            }
        } else {
            self.load_default_exercise().await;
        }
    }

    /// Advance to the next step; a no-op with a notice at the end
    pub async fn next_step(&mut self) {
        let step_count = self.state.plan.as_ref().map_or(0, |p| p.steps.len());
        match self.state.step_index {
            Some(index) if index + 1 < step_count => self.select_step(index + 1).await,
            _ => self.push(Notice::info(
                "End of Plan",
                "You've reached the last step of this learning plan.",
            )),
        }
    }

    /// Go back one step; a no-op with a notice at the start
    pub async fn prev_step(&mut self) {
        match self.state.step_index {
            Some(index) if index > 0 && self.state.plan.is_some() => {
                self.select_step(index - 1).await;
            }
            _ => self.push(Notice::info("Start of Plan", "You are at the first step.")),
        }
    }

    /// Simulated code run: log only, never mutates exercise or feedback
    pub fn run_code(&mut self, code: &str) {
        info!(code_len = code.len(), "run_code: simulated execution requested");
        self.push(Notice::info(
            "Code Run Requested",
            "Execution is simulated; nothing is evaluated.",
        ));
    }

    /// Ask for improvement suggestions on the given code
    ///
    /// Feedback is cleared before the call, so a failure leaves none.
    pub async fn improve_code(&mut self, code: &str) {
        let question = match &self.state.exercise {
            Some(exercise) => exercise.question.clone(),
            None => {
                self.push(Notice::error("No Exercise", "Load an exercise first."));
                return;
            }
        };

        self.state.loading.improve = true;
        self.state.feedback = None;

        let result = self
            .gateway
            .improve_code(ImproveRequest {
                code: code.to_string(),
                language: self.language.clone(),
                question: Some(question),
            })
            .await;
        self.state.loading.improve = false;
        match result {
            Ok(improvements) => {
                self.state.feedback = Some(Feedback {
                    suggestions: Some(improvements.improvements),
                    ..Default::default()
                });
                self.push(Notice::info(
                    "Suggestions Ready",
                    "Check the feedback panel for improvement tips.",
                ));
            }
            Err(e) => self.push(Notice::error("Error Getting Suggestions", e.to_string())),
        }
    }

    /// Submit code: improvement suggestions plus a purely syntactic
    /// whitespace-insensitive comparison against the stored solution
    pub async fn submit_code(&mut self, code: &str) {
        let (question, solution) = match &self.state.exercise {
            Some(exercise) => (exercise.question.clone(), exercise.solution.clone()),
            None => {
                self.push(Notice::error("No Exercise", "Load an exercise first."));
                return;
            }
        };

        self.state.loading.submit = true;
        self.state.feedback = None;

        let result = self
            .gateway
            .improve_code(ImproveRequest {
                code: code.to_string(),
                language: self.language.clone(),
                question: Some(question),
            })
            .await;
        self.state.loading.submit = false;
        match result {
            Ok(improvements) => {
                let is_correct = normalize_code(code) == normalize_code(&solution);
                let message = if is_correct {
                    "Your solution seems correct!"
                } else {
                    "Your solution might have some issues or could be improved. See suggestions."
                };
                self.state.feedback = Some(Feedback {
                    message: Some(message.to_string()),
                    suggestions: Some(improvements.improvements),
                    is_correct: Some(is_correct),
                });
                let title = if is_correct {
                    "Submission Correct!"
                } else {
                    "Submission Feedback"
                };
                self.push(Notice::info(title, "Check the feedback panel."));
            }
            Err(e) => self.push(Notice::error("Error Submitting Code", e.to_string())),
        }
    }

    /// Explain the active exercise's concept
    ///
    /// The explanation is cleared before the call; a failure leaves it
    /// cleared.
    pub async fn explain_concept(&mut self) {
        let request = match &self.state.exercise {
            Some(exercise) => ExplainRequest {
                concept: exercise.topic.clone(),
                documentation: exercise.documentation.clone(),
                example_code: exercise.example_code.clone(),
            },
            None => {
                self.push(Notice::error(
                    "No Exercise Context",
                    "Load an exercise to explain its concepts.",
                ));
                return;
            }
        };

        self.state.loading.explanation = true;
        self.state.explanation = None;

        let result = self.gateway.explain_concept(request).await;
        self.state.loading.explanation = false;
        match result {
            Ok(explanation) => {
                self.state.explanation = Some(explanation);
                self.push(Notice::info("Explanation Ready", "Check the explanation panel."));
            }
            Err(e) => self.push(Notice::error("Error Explaining Concept", e.to_string())),
        }
    }

    /// Exclusive panel expansion; selecting the expanded panel collapses it
    pub fn toggle_expand(&mut self, panel: Panel) {
        self.state.expanded_panel = if self.state.expanded_panel == Some(panel) {
            None
        } else {
            Some(panel)
        };
    }

    /// Replace the editable code buffer (user keystrokes)
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.state.code_buffer = code.into();
    }
}

fn non_blank(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.trim().is_empty())
}

/// Seed the editor from a fresh exercise
fn seed_code_buffer(exercise: &Exercise, mode: LearningMode) -> String {
    if let Some(snippet) = &exercise.code_snippet {
        return snippet.clone();
    }
    match mode {
        LearningMode::Challenge => challenge_scaffold(exercise),
        LearningMode::HandHolding => String::new(),
    }
}

/// Comment scaffold shown in challenge mode instead of starter code
fn challenge_scaffold(exercise: &Exercise) -> String {
    format!(
        "# Start coding for: {}\n# Documentation: {}...\n# Example: {}...\n",
        exercise.topic,
        prefix_chars(&exercise.documentation, 100),
        prefix_chars(&exercise.example_code, 100),
    )
}

fn prefix_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        ConceptExplanation, Improvements, LearningPlan, LearningStep,
    };
    use crate::session::notice::Severity;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted gateway: queued results per operation, with synthesized
    /// defaults for exercises so navigation tests stay terse
    #[derive(Default)]
    struct MockGateway {
        plan_results: Mutex<VecDeque<Result<LearningPlan, GatewayError>>>,
        exercise_results: Mutex<VecDeque<Result<GeneratedExercise, GatewayError>>>,
        improve_results: Mutex<VecDeque<Result<Improvements, GatewayError>>>,
        explain_results: Mutex<VecDeque<Result<ConceptExplanation, GatewayError>>>,
        plan_calls: AtomicUsize,
        exercise_calls: AtomicUsize,
        improve_calls: AtomicUsize,
        explain_calls: AtomicUsize,
        last_exercise_request: Mutex<Option<ExerciseRequest>>,
    }

    impl MockGateway {
        fn push_plan(&self, result: Result<LearningPlan, GatewayError>) {
            self.plan_results.lock().unwrap().push_back(result);
        }

        fn push_exercise(&self, result: Result<GeneratedExercise, GatewayError>) {
            self.exercise_results.lock().unwrap().push_back(result);
        }

        fn push_improve(&self, result: Result<Improvements, GatewayError>) {
            self.improve_results.lock().unwrap().push_back(result);
        }

        fn push_explain(&self, result: Result<ConceptExplanation, GatewayError>) {
            self.explain_results.lock().unwrap().push_back(result);
        }

        fn last_exercise_request(&self) -> Option<ExerciseRequest> {
            self.last_exercise_request.lock().unwrap().clone()
        }

        /// Mode-respecting default exercise, like the real gateway's
        /// post-processing guarantees
        fn default_exercise(request: &ExerciseRequest) -> GeneratedExercise {
            GeneratedExercise {
                question: format!("Practice {}", request.topic),
                code_snippet: match request.mode {
                    LearningMode::HandHolding => Some("x = ____  # fill in".to_string()),
                    LearningMode::Challenge => None,
                },
                solution: "x = 1".to_string(),
            }
        }
    }

    #[async_trait]
    impl AiGateway for MockGateway {
        async fn generate_learning_plan(
            &self,
            _request: PlanRequest,
        ) -> Result<LearningPlan, GatewayError> {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            self.plan_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(GatewayError::MalformedResponse("no scripted plan".to_string()))
                })
        }

        async fn generate_exercise(
            &self,
            request: ExerciseRequest,
        ) -> Result<GeneratedExercise, GatewayError> {
            self.exercise_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_exercise_request.lock().unwrap() = Some(request.clone());
            self.exercise_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::default_exercise(&request)))
        }

        async fn improve_code(&self, _request: ImproveRequest) -> Result<Improvements, GatewayError> {
            self.improve_calls.fetch_add(1, Ordering::SeqCst);
            self.improve_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(Improvements {
                        improvements: "Consider f-strings.".to_string(),
                    })
                })
        }

        async fn explain_concept(
            &self,
            _request: ExplainRequest,
        ) -> Result<ConceptExplanation, GatewayError> {
            self.explain_calls.fetch_add(1, Ordering::SeqCst);
            self.explain_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(ConceptExplanation {
                        explanation: "E".to_string(),
                        breakdown: "B".to_string(),
                        application: "A".to_string(),
                    })
                })
        }
    }

    fn session_with(gateway: Arc<MockGateway>, mode: LearningMode) -> Session {
        Session::new(gateway, mode, "python")
    }

    fn two_step_plan() -> LearningPlan {
        LearningPlan {
            title: "Intro".to_string(),
            steps: vec![
                LearningStep {
                    topic: "Vars".to_string(),
                    description: "Variables".to_string(),
                    ..Default::default()
                },
                LearningStep {
                    topic: "Loops".to_string(),
                    description: "Repetition".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    fn gateway_failure() -> GatewayError {
        GatewayError::Llm(crate::llm::LlmError::Timeout(std::time::Duration::from_secs(60)))
    }

    fn has_severity(notices: &[Notice], severity: Severity) -> bool {
        notices.iter().any(|n| n.severity == severity)
    }

    #[tokio::test]
    async fn test_load_default_exercise_uses_builtin_defaults() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.load_default_exercise().await;

        let state = session.state();
        let exercise = state.exercise.as_ref().unwrap();
        assert_eq!(exercise.topic, DEFAULT_TOPIC);
        assert_eq!(exercise.documentation, DEFAULT_DOCUMENTATION);
        assert!(!state.loading.exercise);
        assert_eq!(state.code_buffer, "x = ____  # fill in");

        let request = gateway.last_exercise_request().unwrap();
        assert_eq!(request.topic, DEFAULT_TOPIC);
        assert_eq!(request.mode, LearningMode::HandHolding);
    }

    #[tokio::test]
    async fn test_generate_plan_empty_input_makes_no_call() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.generate_plan(PlanRequest::default()).await;

        assert_eq!(gateway.plan_calls.load(Ordering::SeqCst), 0);
        assert!(session.state().plan.is_none());
        let notices = session.drain_notices();
        assert!(has_severity(&notices, Severity::Error));
        assert!(notices.iter().any(|n| n.title == "Empty Content"));
    }

    #[tokio::test]
    async fn test_generate_plan_success_selects_first_step() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session
            .generate_plan(PlanRequest {
                content: Some("notes about python".to_string()),
                ..Default::default()
            })
            .await;

        let state = session.state();
        assert_eq!(state.plan.as_ref().unwrap().title, "Intro");
        assert_eq!(state.step_index, Some(0));
        assert!(state.exercise.is_some());
        assert!(state.feedback.is_none());
        assert!(!state.loading.plan);
        assert!(!state.loading.exercise);
        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_plan_zero_steps_is_soft_warning() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(LearningPlan {
            title: "Empty".to_string(),
            steps: vec![],
        }));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        let state = session.state();
        assert!(state.plan.is_some());
        assert_eq!(state.step_index, None);
        assert!(state.exercise.is_none());
        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 0);

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Empty Plan"));
    }

    #[tokio::test]
    async fn test_generate_plan_failure_reverts_and_refetches_default() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Err(gateway_failure()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        let state = session.state();
        assert!(state.plan.is_none());
        assert_eq!(state.step_index, None);
        // Default exercise was re-fetched after the failure
        assert_eq!(state.exercise.as_ref().unwrap().topic, DEFAULT_TOPIC);
        assert!(!state.loading.plan);

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Error Generating Learning Plan"));
    }

    #[tokio::test]
    async fn test_select_step_out_of_range_is_rejected_without_mutation() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;
        session.drain_notices();

        let before_calls = gateway.exercise_calls.load(Ordering::SeqCst);
        session.select_step(7).await;

        let state = session.state();
        assert_eq!(state.step_index, Some(0));
        assert!(state.exercise.is_some());
        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), before_calls);

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Invalid Plan Step"));
    }

    #[tokio::test]
    async fn test_select_step_without_plan_is_rejected() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.select_step(0).await;

        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 0);
        let notices = session.drain_notices();
        assert!(has_severity(&notices, Severity::Warning));
    }

    #[tokio::test]
    async fn test_select_step_failure_resets_index() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        gateway.push_exercise(Err(gateway_failure()));
        session.select_step(1).await;

        let state = session.state();
        assert_eq!(state.step_index, None);
        assert!(state.exercise.is_none());
        assert!(!state.loading.exercise);

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Error Generating Exercise"));
    }

    #[tokio::test]
    async fn test_reselecting_same_step_requeries_gateway() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        session.select_step(0).await;

        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.state().step_index, Some(0));
        assert!(session.state().exercise.is_some());
    }

    #[tokio::test]
    async fn test_step_documentation_falls_back_to_defaults() {
        let gateway = Arc::new(MockGateway::default());
        let mut plan = two_step_plan();
        plan.steps[0].extracted_documentation = Some("custom docs".to_string());
        plan.steps[0].extracted_example_code = Some("   ".to_string());
        gateway.push_plan(Ok(plan));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        let request = gateway.last_exercise_request().unwrap();
        assert_eq!(request.documentation, "custom docs");
        // Blank extracted code falls back to the built-in example
        assert_eq!(request.example_code, DEFAULT_EXAMPLE_CODE);
    }

    #[tokio::test]
    async fn test_next_and_prev_walkthrough() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;
        session.drain_notices();

        session.next_step().await;
        assert_eq!(session.state().step_index, Some(1));

        // Next at the last step is rejected with "End of Plan"
        session.next_step().await;
        assert_eq!(session.state().step_index, Some(1));
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "End of Plan"));

        session.prev_step().await;
        assert_eq!(session.state().step_index, Some(0));

        session.prev_step().await;
        assert_eq!(session.state().step_index, Some(0));
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Start of Plan"));
    }

    #[tokio::test]
    async fn test_prev_without_plan_emits_notice() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);

        session.prev_step().await;
        session.next_step().await;

        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Start of Plan"));
        assert!(notices.iter().any(|n| n.title == "End of Plan"));
    }

    #[tokio::test]
    async fn test_change_mode_refetches_active_step() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        assert!(session.state().exercise.as_ref().unwrap().code_snippet.is_some());

        session.change_mode(LearningMode::Challenge).await;

        let state = session.state();
        assert_eq!(state.mode, LearningMode::Challenge);
        assert_eq!(state.step_index, Some(0));
        // Challenge exercises never carry a snippet
        assert!(state.exercise.as_ref().unwrap().code_snippet.is_none());
        assert!(state.code_buffer.starts_with("# Start coding for: Vars"));

        session.change_mode(LearningMode::HandHolding).await;
        let snippet = session.state().exercise.as_ref().unwrap().code_snippet.clone();
        assert!(snippet.is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_change_mode_same_mode_is_noop() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.change_mode(LearningMode::HandHolding).await;

        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_change_mode_without_plan_refetches_default() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session.load_default_exercise().await;

        session.change_mode(LearningMode::Challenge).await;

        let state = session.state();
        assert_eq!(state.exercise.as_ref().unwrap().topic, DEFAULT_TOPIC);
        assert!(state.exercise.as_ref().unwrap().code_snippet.is_none());
        assert_eq!(gateway.exercise_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_code_never_mutates_exercise_or_feedback() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);
        session.load_default_exercise().await;
        let exercise_before = session.state().exercise.clone();

        session.run_code("print('hello')");

        assert_eq!(session.state().exercise, exercise_before);
        assert!(session.state().feedback.is_none());
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Code Run Requested"));
    }

    #[tokio::test]
    async fn test_improve_requires_exercise() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.improve_code("x = 1").await;

        assert_eq!(gateway.improve_calls.load(Ordering::SeqCst), 0);
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "No Exercise"));
    }

    #[tokio::test]
    async fn test_improve_sets_suggestions_without_verdict() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);
        session.load_default_exercise().await;

        session.improve_code("x = 1").await;

        let feedback = session.state().feedback.as_ref().unwrap();
        assert_eq!(feedback.suggestions.as_deref(), Some("Consider f-strings."));
        assert!(feedback.message.is_none());
        assert!(feedback.is_correct.is_none());
    }

    #[tokio::test]
    async fn test_improve_failure_clears_feedback() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session.load_default_exercise().await;
        session.improve_code("x = 1").await;
        assert!(session.state().feedback.is_some());

        gateway.push_improve(Err(gateway_failure()));
        session.improve_code("x = 2").await;

        // Feedback was cleared optimistically before the failed call
        assert!(session.state().feedback.is_none());
        assert!(!session.state().loading.improve);
    }

    #[tokio::test]
    async fn test_submit_whitespace_insensitive_correct() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);
        session.load_default_exercise().await;

        // Solution in the default exercise is "x = 1"
        session.submit_code("x=1").await;
        let feedback = session.state().feedback.as_ref().unwrap();
        assert_eq!(feedback.is_correct, Some(true));
        assert!(feedback.message.as_deref().unwrap().contains("correct"));

        session.submit_code("  x \n=\t1  ").await;
        assert_eq!(session.state().feedback.as_ref().unwrap().is_correct, Some(true));
    }

    #[tokio::test]
    async fn test_submit_different_tokens_incorrect() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);
        session.load_default_exercise().await;

        // Semantically equivalent but textually different answers fail
        session.submit_code("x = 2 - 1").await;

        let feedback = session.state().feedback.as_ref().unwrap();
        assert_eq!(feedback.is_correct, Some(false));
        assert!(feedback.suggestions.is_some());
    }

    #[tokio::test]
    async fn test_submit_failure_leaves_no_feedback() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session.load_default_exercise().await;

        gateway.push_improve(Err(gateway_failure()));
        session.submit_code("x = 1").await;

        assert!(session.state().feedback.is_none());
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "Error Submitting Code"));
    }

    #[tokio::test]
    async fn test_explain_requires_exercise() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);

        session.explain_concept().await;

        assert_eq!(gateway.explain_calls.load(Ordering::SeqCst), 0);
        let notices = session.drain_notices();
        assert!(notices.iter().any(|n| n.title == "No Exercise Context"));
    }

    #[tokio::test]
    async fn test_explain_success_and_failure() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session.load_default_exercise().await;

        session.explain_concept().await;
        assert!(session.state().explanation.is_some());

        gateway.push_explain(Err(gateway_failure()));
        session.explain_concept().await;

        // Failure leaves the explanation cleared, not stale
        assert!(session.state().explanation.is_none());
        assert!(!session.state().loading.explanation);
    }

    #[tokio::test]
    async fn test_toggle_expand_is_exclusive_and_idempotent() {
        let gateway = Arc::new(MockGateway::default());
        let mut session = session_with(gateway, LearningMode::HandHolding);

        session.toggle_expand(Panel::Exercise);
        assert_eq!(session.state().expanded_panel, Some(Panel::Exercise));

        session.toggle_expand(Panel::Code);
        assert_eq!(session.state().expanded_panel, Some(Panel::Code));

        session.toggle_expand(Panel::Code);
        assert_eq!(session.state().expanded_panel, None);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;
        session.drain_notices();

        // Simulate two overlapping fetches resolving out of order
        let fetch_a = session.begin_exercise_fetch(Some(0)).unwrap();
        let fetch_b = session.begin_exercise_fetch(Some(1)).unwrap();

        let slow_result = Ok(GeneratedExercise {
            question: "stale question".to_string(),
            code_snippet: Some("stale".to_string()),
            solution: "stale".to_string(),
        });
        session.complete_exercise_fetch(fetch_a, slow_result);

        // The stale completion must not touch state: still loading, no exercise
        assert!(session.state().exercise.is_none());
        assert!(session.state().loading.exercise);

        let fresh_result = Ok(GeneratedExercise {
            question: "fresh question".to_string(),
            code_snippet: Some("fresh".to_string()),
            solution: "fresh".to_string(),
        });
        session.complete_exercise_fetch(fetch_b, fresh_result);

        let state = session.state();
        assert_eq!(state.step_index, Some(1));
        assert_eq!(state.exercise.as_ref().unwrap().question, "fresh question");
        assert!(!state.loading.exercise);
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_reset_index() {
        let gateway = Arc::new(MockGateway::default());
        gateway.push_plan(Ok(two_step_plan()));
        let mut session = session_with(gateway.clone(), LearningMode::HandHolding);
        session
            .generate_plan(PlanRequest {
                content: Some("notes".to_string()),
                ..Default::default()
            })
            .await;

        let fetch_a = session.begin_exercise_fetch(Some(1)).unwrap();
        let fetch_b = session.begin_exercise_fetch(Some(0)).unwrap();

        // Stale failure is discarded entirely - no notice, no index reset
        session.complete_exercise_fetch(fetch_a, Err(gateway_failure()));
        session.drain_notices();

        session.complete_exercise_fetch(
            fetch_b,
            Ok(GeneratedExercise {
                question: "q".to_string(),
                code_snippet: None,
                solution: "s".to_string(),
            }),
        );

        assert_eq!(session.state().step_index, Some(0));
        assert!(session.drain_notices().is_empty());
    }
}
