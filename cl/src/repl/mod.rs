//! Interactive session loop
//!
//! Stands in for the presentation panels: slash commands map one-to-one
//! onto orchestrator transitions, and drained notices render as colored
//! toasts. No orchestration rules live here.

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use feedbackstore::{FeedbackStore, NewFeedback, Rating};

use crate::gateway::PlanRequest;
use crate::session::{
    DEFAULT_TOPIC, LearningMode, Notice, Panel, Session, SessionState, Severity,
};

enum CommandResult {
    Continue,
    Quit,
}

/// Interactive REPL session over the orchestrator
pub struct ReplSession {
    session: Session,
    store: Option<FeedbackStore>,
    pending_doc_url: Option<String>,
    pending_code_url: Option<String>,
}

impl ReplSession {
    pub fn new(session: Session, store: Option<FeedbackStore>) -> Self {
        Self {
            session,
            store,
            pending_doc_url: None,
            pending_code_url: None,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        println!("{}", "Loading your first exercise...".dimmed());
        self.session.load_default_exercise().await;
        self.flush_notices();
        self.print_exercise();

        let mut rl =
            DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_command(input).await {
                            CommandResult::Continue => {}
                            CommandResult::Quit => break,
                        }
                    } else {
                        // Bare lines edit the code buffer
                        let mut code = self.session.state().code_buffer.clone();
                        if !code.is_empty() && !code.ends_with('\n') {
                            code.push('\n');
                        }
                        code.push_str(input);
                        self.session.set_code(code);
                    }
                    self.flush_notices();
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn handle_command(&mut self, input: &str) -> CommandResult {
        debug!(%input, "handle_command: called");
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return CommandResult::Quit,
            "/learn" => {
                let request = PlanRequest {
                    content: (!rest.is_empty()).then(|| rest.to_string()),
                    documentation_url: self.pending_doc_url.take(),
                    code_url: self.pending_code_url.take(),
                };
                self.session.generate_plan(request).await;
                self.print_plan();
                self.print_exercise();
            }
            "/url" => self.handle_url(rest),
            "/plan" => self.print_plan(),
            "/step" => match rest.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    self.session.select_step(n - 1).await;
                    self.print_exercise();
                }
                _ => println!("{}", "Usage: /step <number> (1-based)".yellow()),
            },
            "/next" => {
                self.session.next_step().await;
                self.print_exercise();
            }
            "/prev" => {
                self.session.prev_step().await;
                self.print_exercise();
            }
            "/mode" => match LearningMode::parse(rest) {
                Some(mode) => {
                    self.session.change_mode(mode).await;
                    self.print_exercise();
                }
                None => println!("{}", "Usage: /mode hand-holding|challenge".yellow()),
            },
            "/show" => {
                self.print_plan();
                self.print_exercise();
            }
            "/code" => {
                if rest == "clear" {
                    self.session.set_code(String::new());
                    println!("{}", "Code buffer cleared.".dimmed());
                } else {
                    self.print_code();
                }
            }
            "/run" => {
                let code = self.session.state().code_buffer.clone();
                self.session.run_code(&code);
            }
            "/improve" => {
                let code = self.session.state().code_buffer.clone();
                self.session.improve_code(&code).await;
                self.print_feedback();
            }
            "/submit" => {
                let code = self.session.state().code_buffer.clone();
                self.session.submit_code(&code).await;
                self.print_feedback();
            }
            "/explain" => {
                self.session.explain_concept().await;
                self.print_explanation();
            }
            "/expand" => match rest {
                "exercise" => self.session.toggle_expand(Panel::Exercise),
                "code" => self.session.toggle_expand(Panel::Code),
                _ => println!("{}", "Usage: /expand exercise|code".yellow()),
            },
            "/rate" => self.handle_rate(rest),
            _ => println!(
                "{}",
                format!("Unknown command: {}. Type /help for help.", cmd).yellow()
            ),
        }

        CommandResult::Continue
    }

    fn handle_url(&mut self, rest: &str) {
        match rest.split_once(char::is_whitespace) {
            Some(("doc", url)) => {
                self.pending_doc_url = Some(url.trim().to_string());
                println!("{}", "Documentation URL set for the next /learn.".dimmed());
            }
            Some(("code", url)) => {
                self.pending_code_url = Some(url.trim().to_string());
                println!("{}", "Code URL set for the next /learn.".dimmed());
            }
            _ => println!("{}", "Usage: /url doc|code <url>".yellow()),
        }
    }

    fn handle_rate(&mut self, rest: &str) {
        let Some(store) = &self.store else {
            println!("{}", "Feedback store is not available.".yellow());
            return;
        };

        let (rating_str, comment) = match rest.split_once(char::is_whitespace) {
            Some((r, c)) => (r, Some(c.trim().to_string())),
            None => (rest, None),
        };
        let rating = match rating_str {
            "up" => Rating::ThumbsUp,
            "down" => Rating::ThumbsDown,
            _ => {
                println!("{}", "Usage: /rate up|down [comment]".yellow());
                return;
            }
        };

        let state = self.session.state();
        let plan_id = state
            .plan
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let step_id = state.step_index.map(|i| i as i64);

        match store.store_feedback(NewFeedback {
            plan_id,
            step_id,
            rating,
            comment,
            user_id: None,
        }) {
            Ok(id) => println!("{} Feedback stored (entry {}).", "✓".green(), id),
            Err(e) => println!("{}", format!("Failed to store feedback: {}", e).red()),
        }
    }

    // === Rendering ===

    fn flush_notices(&mut self) {
        for notice in self.session.drain_notices() {
            print_notice(&notice);
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "CodeLeap Interactive Tutor".bright_cyan().bold());
        println!(
            "Paste content with {} to build a learning plan.",
            "/learn <text>".yellow()
        );
        println!(
            "Type {} for help, {} to quit",
            "/help".yellow(),
            "/quit".yellow()
        );
        println!();
    }

    fn print_help(&self) {
        println!("{}", "Commands:".bold());
        println!("  /learn <text>          Generate a learning plan from pasted content");
        println!("  /url doc|code <url>    Attach a URL to the next /learn");
        println!("  /plan                  Show the current plan and step");
        println!("  /step <n>              Jump to step n");
        println!("  /next, /prev           Move between steps");
        println!("  /mode <m>              Switch hand-holding|challenge mode");
        println!("  /show                  Show plan and exercise");
        println!("  /code [clear]          Show (or clear) the code buffer");
        println!("  <text>                 Bare lines append to the code buffer");
        println!("  /run                   Simulate running the code");
        println!("  /improve               Ask for improvement suggestions");
        println!("  /submit                Submit the code for checking");
        println!("  /explain               Explain the current concept");
        println!("  /expand exercise|code  Toggle panel expansion");
        println!("  /rate up|down [text]   Rate the current plan/step");
        println!("  /quit                  Exit");
    }

    fn print_plan(&self) {
        let state = self.session.state();
        let Some(plan) = &state.plan else {
            return;
        };

        println!();
        println!("{} {}", "Learning Plan:".bold(), plan.title.bright_cyan());
        for (i, step) in plan.steps.iter().enumerate() {
            let marker = if state.step_index == Some(i) {
                ">".bright_green()
            } else {
                " ".normal()
            };
            println!("{} Step {}: {}", marker, i + 1, step.topic);
            if state.step_index == Some(i) {
                println!("    {}", step.description.dimmed());
            }
        }
        println!();
    }

    fn print_exercise(&self) {
        let state = self.session.state();
        let Some(exercise) = &state.exercise else {
            return;
        };

        println!();
        println!("{} {}", "Topic:".bold(), exercise.topic);
        println!("{}", "Question:".bold());
        println!("{}", exercise.question);
        if let Some(snippet) = &exercise.code_snippet {
            println!("{}", "Starter code:".bold());
            println!("{}", snippet.dimmed());
        } else {
            println!("{}", "(challenge mode: write your code from scratch)".dimmed());
        }
        println!();
    }

    fn print_code(&self) {
        let code = &self.session.state().code_buffer;
        if code.is_empty() {
            println!("{}", "(code buffer is empty)".dimmed());
        } else {
            println!("{}", code);
        }
    }

    fn print_feedback(&self) {
        let state = self.session.state();
        let Some(feedback) = &state.feedback else {
            return;
        };

        println!();
        if let Some(correct) = feedback.is_correct {
            if correct {
                println!("{}", "✓ Correct!".green().bold());
            } else {
                println!("{}", "✗ Not quite.".red().bold());
            }
        }
        if let Some(message) = &feedback.message {
            println!("{}", message);
        }
        if let Some(suggestions) = &feedback.suggestions {
            println!("{}", "Suggestions:".bold());
            println!("{}", suggestions);
        }
        println!();
    }

    fn print_explanation(&self) {
        let state = self.session.state();
        let Some(explanation) = &state.explanation else {
            return;
        };

        println!();
        println!("{}", "Explanation:".bold());
        println!("{}", explanation.explanation);
        println!("{}", "Breakdown:".bold());
        println!("{}", explanation.breakdown);
        println!("{}", "Application:".bold());
        println!("{}", explanation.application);
        println!();
    }
}

fn print_notice(notice: &Notice) {
    let title = match notice.severity {
        Severity::Info => notice.title.cyan(),
        Severity::Warning => notice.title.yellow(),
        Severity::Error => notice.title.red(),
    };
    println!("{}: {}", title.bold(), notice.detail);
}

/// Accessor used by main for startup diagnostics
pub fn describe_state(state: &SessionState) -> String {
    format!(
        "mode={} plan={} step={:?}",
        state.mode,
        state.plan.as_ref().map(|p| p.title.as_str()).unwrap_or("-"),
        state.step_index
    )
}
