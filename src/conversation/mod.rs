//! The conversation state machine.
//!
//! One [`ConversationLoop`] drives one user session: it sends the history to
//! the LLM, resolves each returned requirement strictly in emission order
//! (policy → confirmation → before-hooks → primitive → after-hooks), appends
//! the batch of results as a user turn, and repeats until the LLM returns a
//! final answer. Every denial, veto, and execution error stays contained in
//! its own requirement's result; only protocol errors and transport failures
//! abort the loop.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::AccordConfig;
use crate::error::{AccordError, AccordResult};
use crate::eventlog::{EventLogger, LogEntry, LogLevel};
use crate::hook::{HookContext, HookRegistry};
use crate::policy::{expand_path, PathPolicy};
use crate::prompt::UserPrompt;
use crate::provider::LlmClient;
use crate::schema::{
    Requirement, RequirementKind, RequirementResult, MessageHistory, UserMessage,
};
use crate::vexec::CommandRunner;
use crate::vfs::Filesystem;

/// States of the conversation loop.
///
/// `AwaitingPrompt → AwaitingLlmResponse → ResolvingRequirements →
/// SendingResults → AwaitingLlmResponse …`, terminating with `Done` when the
/// LLM returns a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingPrompt,
    AwaitingLlmResponse,
    ResolvingRequirements,
    SendingResults,
    Done,
}

/// The session driver composing policy, hooks, schema, and collaborators.
pub struct ConversationLoop {
    session_id: String,
    config: Arc<AccordConfig>,
    policy: Arc<PathPolicy>,
    hooks: Arc<HookRegistry>,
    llm: Arc<dyn LlmClient>,
    fs: Arc<dyn Filesystem>,
    runner: Arc<dyn CommandRunner>,
    prompt: Arc<dyn UserPrompt>,
    logger: Arc<EventLogger>,
    history: MessageHistory,
    state: LoopState,
}

impl ConversationLoop {
    /// Build a loop over the given collaborators. The path policy is parsed
    /// from the config here so malformed rules fail before the session starts.
    pub fn new(
        config: Arc<AccordConfig>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        fs: Arc<dyn Filesystem>,
        runner: Arc<dyn CommandRunner>,
        prompt: Arc<dyn UserPrompt>,
    ) -> AccordResult<Self> {
        let policy = Arc::new(config.policy()?);
        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            policy,
            hooks: Arc::new(HookRegistry::new()),
            logger: Arc::new(EventLogger::new()),
            history: MessageHistory::new(system_prompt),
            state: LoopState::AwaitingPrompt,
            config,
            llm,
            fs,
            runner,
            prompt,
        })
    }

    /// Attach a hook registry. Must happen before [`run`](Self::run); the
    /// registry is frozen for the session.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_logger(mut self, logger: Arc<EventLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Run the conversation for one user prompt until the LLM produces a
    /// final answer. Returns that answer.
    pub async fn run(&mut self, user_prompt: &str) -> AccordResult<String> {
        self.history.push_user(UserMessage::prompt(user_prompt));

        loop {
            self.state = LoopState::AwaitingLlmResponse;
            let message = self.llm.complete(&self.history).await.inspect_err(|e| {
                self.log(LogLevel::Error, "llm", &format!("transport failure: {e}"));
            })?;

            // Malformed responses abort the turn before anything executes.
            message.validate().inspect_err(|e| {
                self.log(LogLevel::Error, "conversation", &e.to_string());
            })?;

            if let Some(comment) = &message.comment {
                self.prompt.show(comment);
            }
            self.history.push_assistant(message.clone());

            if let Some(answer) = &message.answer {
                self.state = LoopState::Done;
                self.log(LogLevel::Info, "conversation", "final answer received");
                return Ok(answer.clone());
            }

            self.state = LoopState::ResolvingRequirements;
            let requirements = message.requirements().to_vec();
            let mut results = Vec::with_capacity(requirements.len());
            for requirement in &requirements {
                results.push(self.resolve(requirement).await);
            }

            self.state = LoopState::SendingResults;
            self.history.push_user(UserMessage::with_results(results));
        }
    }

    /// Resolve one requirement to exactly one result. Never fails: every
    /// denial, veto, and execution error becomes that requirement's result.
    async fn resolve(&self, requirement: &Requirement) -> RequirementResult {
        let ctx = HookContext {
            session_id: self.session_id.clone(),
            config: self.config.clone(),
        };

        // Disabled commands short-circuit before policy, hooks, and the user.
        if requirement.kind() == RequirementKind::Command && !self.config.allow_commands {
            return self.deny(requirement, "commands are disabled by configuration");
        }

        if let (Some(path), Some(level)) = (requirement.path(), requirement.min_level()) {
            if !self.policy.is_allowed(path, level) {
                let reason = AccordError::PermissionDenied {
                    path: path.to_string(),
                    level,
                }
                .to_string();
                return self.deny(requirement, &reason);
            }
        }

        self.prompt.show(&format!("[ {} ]", requirement.kind()));
        self.prompt.show(&format!("  {}", requirement.comment().trim()));
        let approved = self
            .prompt
            .confirm(&format!("  ? Allow {}", requirement.describe()))
            .await;
        if !approved {
            let reason = AccordError::UserDenied(requirement.describe()).to_string();
            return self.deny(requirement, &reason);
        }

        let result = match self.hooks.run_before(&ctx, requirement).await {
            Err(e) => {
                // A failing hook ends this requirement's resolution; the
                // after-phase is skipped too.
                return self.fail(requirement, &format!("before-hook failed: {e}"));
            }
            Ok(Some(veto)) => {
                self.log(
                    LogLevel::Info,
                    "hook",
                    &format!("before-hook vetoed {}", requirement.describe()),
                );
                veto
            }
            Ok(None) => match self.execute(requirement).await {
                Ok(result) => result,
                Err(e) => self.fail(requirement, &e.to_string()),
            },
        };

        match self.hooks.run_after(&ctx, requirement, result).await {
            Ok(result) => {
                if let Some(error) = result.error() {
                    self.prompt.show(&format!("  ! {error}"));
                }
                result
            }
            Err(e) => self.fail(requirement, &format!("after-hook failed: {e}")),
        }
    }

    /// Invoke the matching primitive and wrap its output.
    async fn execute(&self, requirement: &Requirement) -> AccordResult<RequirementResult> {
        match requirement {
            Requirement::FileRead { path, .. } => {
                let target = expand_path(Path::new(path)).to_string_lossy().into_owned();
                let metadata = self.fs.read_metadata(&target).await?;
                if metadata.is_directory {
                    // Directories have no content; answer with the listing.
                    let listing = self.fs.read_dir(&target).await?;
                    Ok(RequirementResult::FileRead {
                        requirement: requirement.clone(),
                        accepted: true,
                        content: None,
                        encoding: None,
                        metadata: Some(metadata),
                        listing: Some(listing),
                        error: None,
                    })
                } else {
                    let (content, encoding) = self.fs.read_content(&target).await?;
                    self.show_block(&content);
                    Ok(RequirementResult::FileRead {
                        requirement: requirement.clone(),
                        accepted: true,
                        content: Some(content),
                        encoding: Some(encoding),
                        metadata: Some(metadata),
                        listing: None,
                        error: None,
                    })
                }
            }
            Requirement::FileMetadata { path, .. } => {
                let target = expand_path(Path::new(path)).to_string_lossy().into_owned();
                let metadata = self.fs.read_metadata(&target).await?;
                let listing = if metadata.is_directory {
                    Some(self.fs.read_dir(&target).await?)
                } else {
                    None
                };
                Ok(RequirementResult::FileMetadata {
                    requirement: requirement.clone(),
                    accepted: true,
                    metadata: Some(metadata),
                    listing,
                    error: None,
                })
            }
            Requirement::Command { command, .. } => {
                let output = self
                    .runner
                    .run(command, self.config.command_timeout())
                    .await?;
                let stdout = output.stdout.trim_end().to_string();
                let stderr = output.stderr.trim_end().to_string();
                if !stdout.is_empty() {
                    self.show_block(&stdout);
                }
                Ok(RequirementResult::Command {
                    requirement: requirement.clone(),
                    accepted: true,
                    success: output.success(),
                    stdout: (!stdout.is_empty()).then_some(stdout),
                    stderr: (!stderr.is_empty()).then_some(stderr),
                    error: None,
                })
            }
        }
    }

    fn deny(&self, requirement: &Requirement, reason: &str) -> RequirementResult {
        self.prompt
            .show(&format!("  Denied {}: {reason}", requirement.describe()));
        self.log(
            LogLevel::Warn,
            "conversation",
            &format!("denied {}: {reason}", requirement.describe()),
        );
        RequirementResult::denied(requirement, reason)
    }

    fn fail(&self, requirement: &Requirement, reason: &str) -> RequirementResult {
        self.prompt
            .show(&format!("  Failed {}: {reason}", requirement.describe()));
        self.log(
            LogLevel::Error,
            "conversation",
            &format!("failed {}: {reason}", requirement.describe()),
        );
        RequirementResult::failed(requirement, reason)
    }

    fn log(&self, level: LogLevel, source: &str, message: &str) {
        self.logger
            .log(&LogEntry::new(level, source, message).with_session(self.session_id.clone()));
    }

    /// Echo content to the user, truncated to the configured limit.
    fn show_block(&self, text: &str) {
        self.prompt
            .show(&truncate_output(text, self.config.max_output_chars));
    }
}

/// Truncate `text` to at most `max_chars`, marking the cut.
fn truncate_output(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}... (truncated)")
}
