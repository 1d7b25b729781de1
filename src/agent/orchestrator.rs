//! Per-turn state machine that turns model intents into approved actions.
//!
//! A round makes at most two exploratory model queries (the initial one and
//! one after requested reads) plus one report query after execution. Every
//! write, script run and git command in a round is listed in one action plan
//! that the operator approves or declines as a whole.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::conversation::ConversationTurn;
use super::gateway::ModelGateway;
use super::logging::{LogEntry, SessionLogger};
use super::protocol::{parse_response, FileWriteRequest, Intent};
use super::system_prompt::{agent_system_prompt, build_context, report_system_prompt};
use crate::config::AppConfig;
use crate::error::WorkspaceError;
use crate::exec::{ExecutionResult, GitRunner, ScriptSandbox};
use crate::safety::command_filter::mentions_vcs;
use crate::safety::WorkspaceGuard;
use crate::ui::{style, Operator};

/// Model queries a single round may make, report included.
pub const MAX_QUERIES_PER_ROUND: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingModel,
    ParsedIntent,
    AwaitingModelAfterReads,
    ParsedIntentFinal,
    Planning,
    AwaitingApproval,
    Executing,
    AwaitingModelAfterExecution,
    Reporting,
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The model returned nothing usable.
    NoResponse,
    /// The operator declined the action plan; nothing was changed.
    Declined,
    /// Ended with the intent's own response text, if it had any.
    Responded(Option<String>),
    /// Actions ran and the model narrated their results.
    Reported(String),
}

impl RoundOutcome {
    fn label(&self) -> &'static str {
        match self {
            RoundOutcome::NoResponse => "no_response",
            RoundOutcome::Declined => "declined",
            RoundOutcome::Responded(_) => "responded",
            RoundOutcome::Reported(_) => "reported",
        }
    }
}

/// A write request whose path has been validated against the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWrite {
    /// Path relative to the workspace root, `/`-separated.
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub content: String,
    pub existed: bool,
    /// What the model asked for, before any renaming.
    pub requested_path: String,
}

/// Drives one conversation against one workspace.
pub struct Orchestrator<G, O> {
    config: AppConfig,
    gateway: G,
    operator: O,
    guard: WorkspaceGuard,
    sandbox: ScriptSandbox,
    git: GitRunner,
    conversation: Vec<ConversationTurn>,
    state: TurnState,
    round: u64,
    queries_this_round: usize,
    logger: Option<SessionLogger>,
}

impl<G: ModelGateway, O: Operator> Orchestrator<G, O> {
    /// Create the workspace root if needed and open the session transcript.
    /// A transcript that cannot be opened is warned about and skipped.
    pub fn new(config: AppConfig, gateway: G, operator: O) -> anyhow::Result<Self> {
        let guard = WorkspaceGuard::new(&config.workspace, &config.script_extension).map_err(|e| {
            anyhow::anyhow!(
                "Failed to open workspace {}: {e}",
                config.workspace.display()
            )
        })?;
        let sandbox = ScriptSandbox::new(&config, guard.canonical_root());
        let git = GitRunner::new(guard.canonical_root());

        let logger = match &config.session_log_dir {
            Some(dir) => match SessionLogger::new(dir) {
                Ok(mut logger) => {
                    if let Err(e) = logger.log_session_start(&config.model, guard.canonical_root()) {
                        tracing::warn!("Failed to write session log: {e}");
                    }
                    Some(logger)
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), "Session log disabled: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config,
            gateway,
            operator,
            guard,
            sandbox,
            git,
            conversation: Vec::new(),
            state: TurnState::Idle,
            round: 0,
            queries_this_round: 0,
            logger,
        })
    }

    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn workspace(&self) -> &WorkspaceGuard {
        &self.guard
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn session_log_path(&self) -> Option<&std::path::Path> {
        self.logger.as_ref().map(SessionLogger::log_path)
    }

    /// Record the end of the session in the transcript.
    pub fn end_session(&mut self, reason: &str) {
        let rounds = self.round;
        if let Some(logger) = &mut self.logger {
            if let Err(e) = logger.log_session_end(rounds, reason) {
                tracing::warn!("Failed to write session log: {e}");
            }
        }
    }

    /// Run one full round for `input`.
    pub async fn handle_input(&mut self, input: &str) -> RoundOutcome {
        self.round += 1;
        self.queries_this_round = 0;
        self.conversation.push(ConversationTurn::user(input));
        self.log(LogEntry::user_input(self.round, input));

        self.set_state(TurnState::AwaitingModel);
        let agent_prompt =
            agent_system_prompt(&self.config.interpreter, &self.config.script_extension);
        let Some(reply) = self.query(&agent_prompt, "initial").await else {
            return self.finish(RoundOutcome::NoResponse);
        };
        let mut intent = interpret(&reply);
        self.set_state(TurnState::ParsedIntent);

        let mut reserved = BTreeSet::new();
        let mut suggestions = BTreeMap::new();

        if !intent.reads().is_empty() {
            if let Some(plan) = &intent.plan {
                self.operator.show(&format!("\n{}\n{plan}", style::header("Plan:")));
            }
            self.perform_reads(intent.reads(), input, &mut reserved, &mut suggestions);

            self.set_state(TurnState::AwaitingModelAfterReads);
            let Some(reply) = self.query(&agent_prompt, "after_reads").await else {
                return self.finish(RoundOutcome::NoResponse);
            };
            intent = interpret(&reply);
            self.set_state(TurnState::ParsedIntentFinal);
            if !intent.reads().is_empty() {
                tracing::debug!(count = intent.reads().len(), "Ignoring reads requested after the read round");
            }
        }

        self.set_state(TurnState::Planning);
        let writes = self.normalize_writes(intent.writes(), input, &mut reserved, &mut suggestions);
        let git_allowed = mentions_vcs(input);
        if !git_allowed && !intent.commands().is_empty() {
            tracing::info!(commands = ?intent.commands(), "Ignoring commands; the request did not mention git");
        }
        let commands: &[String] = if git_allowed { intent.commands() } else { &[] };
        let actions = self.action_plan(&writes, commands);

        self.present(&intent, &actions, &writes);

        if !actions.is_empty() {
            self.set_state(TurnState::AwaitingApproval);
            if !self.operator.confirm("Apply this plan?") {
                self.operator.show(&style::yellow("Plan declined. Nothing was changed."));
                self.log(LogEntry::plan_declined(self.round, &actions));
                return self.finish(RoundOutcome::Declined);
            }
        }

        self.set_state(TurnState::Executing);
        let written = self.apply_writes(&writes);
        let mut results = self.run_scripts(&writes, &written).await;
        for command in commands {
            let result = self.git.run(command, &mut self.operator).await;
            self.operator.show(&result.summary());
            self.log(LogEntry::execution(self.round, &result));
            results.push(result);
        }

        if results.iter().any(|r| !r.skipped) {
            let summary = results
                .iter()
                .map(ExecutionResult::summary)
                .collect::<Vec<_>>()
                .join("\n");
            self.conversation
                .push(ConversationTurn::user(format!("EXECUTION RESULTS:\n{summary}")));

            self.set_state(TurnState::AwaitingModelAfterExecution);
            if let Some(reply) = self.query(&report_system_prompt(), "report").await {
                self.set_state(TurnState::Reporting);
                let narration = interpret(&reply).response.unwrap_or(reply);
                self.speak(&narration);
                return self.finish(RoundOutcome::Reported(narration));
            }
        }

        self.set_state(TurnState::Reporting);
        if let Some(response) = &intent.response {
            self.speak(response);
        }
        self.finish(RoundOutcome::Responded(intent.response))
    }

    async fn query(&mut self, system_prompt: &str, phase: &str) -> Option<String> {
        if self.queries_this_round >= MAX_QUERIES_PER_ROUND {
            tracing::warn!(phase, "Query budget for this round exhausted");
            return None;
        }
        self.queries_this_round += 1;

        let tree = self.guard.list_tree(self.config.tree_depth);
        let context = build_context(&self.conversation, &tree, self.config.max_tree_entries);
        let reply = self
            .gateway
            .chat(&self.config.model, system_prompt, &context)
            .await
            .filter(|text| !text.trim().is_empty());

        match &reply {
            Some(text) => self.log(LogEntry::model_response(self.round, phase, text)),
            None => {
                tracing::warn!(phase, "No response from model");
                self.operator.show(&style::error("No response from the model."));
            }
        }
        reply
    }

    /// Append one synthetic user turn per requested read.
    fn perform_reads(
        &mut self,
        paths: &[String],
        input: &str,
        reserved: &mut BTreeSet<String>,
        suggestions: &mut BTreeMap<String, String>,
    ) {
        for path in paths {
            match self.guard.read(path) {
                Ok(content) => {
                    self.operator.show(&style::dim(format!("Reading {path}")));
                    self.conversation
                        .push(ConversationTurn::user(format!("FILE CONTENT ({path}):\n{content}")));
                    self.log(LogEntry::file_read(self.round, path, true, None));
                }
                Err(WorkspaceError::NotFound { .. }) => {
                    let dir = self.requested_dir(path);
                    let name = self.guard.suggest_filename_in(&dir, input, reserved);
                    reserved.insert(name.clone());
                    suggestions.insert(path.clone(), name.clone());
                    self.operator
                        .show(&style::dim(format!("{path} does not exist; suggested {name}")));
                    self.conversation.push(ConversationTurn::user(format!(
                        "FILE NOT FOUND ({path}). Suggested path: {name}"
                    )));
                    self.log(LogEntry::file_read(self.round, path, false, None));
                }
                Err(e) => {
                    self.operator.show(&style::error(&e));
                    let label = if e.is_access_denied() {
                        "ACCESS DENIED"
                    } else {
                        "FILE NOT READABLE"
                    };
                    self.conversation
                        .push(ConversationTurn::user(format!("{label} ({path}): {e}")));
                    self.log(LogEntry::file_read(self.round, path, false, Some(e.to_string())));
                }
            }
        }
    }

    /// Relative parent directory of a requested path, empty for the root.
    fn requested_dir(&self, path: &str) -> String {
        self.guard
            .resolve_path(path)
            .ok()
            .and_then(|full| full.parent().map(|dir| self.guard.relative(dir)))
            .unwrap_or_default()
    }

    /// Validate write paths and rename requests for files that do not exist.
    ///
    /// Escaping paths are dropped and reported. A new file keeps the parent
    /// directory the model asked for but gets a name derived from the user's
    /// request, unique against disk and everything reserved this round. A
    /// name suggested during the read round is used as is, whether the model
    /// writes to the missing path or to the suggestion itself.
    fn normalize_writes(
        &mut self,
        requests: &[FileWriteRequest],
        input: &str,
        reserved: &mut BTreeSet<String>,
        suggestions: &mut BTreeMap<String, String>,
    ) -> Vec<ResolvedWrite> {
        let mut writes = Vec::new();

        for request in requests {
            let resolved = match self.guard.resolve_path(&request.path) {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.operator.show(&style::error(&e));
                    self.log(LogEntry::file_write(
                        self.round,
                        &request.path,
                        false,
                        Some(e.to_string()),
                    ));
                    continue;
                }
            };

            if resolved.is_file() {
                writes.push(ResolvedWrite {
                    rel_path: self.guard.relative(&resolved),
                    abs_path: resolved,
                    content: request.content.clone(),
                    existed: true,
                    requested_path: request.path.clone(),
                });
                continue;
            }

            let name = match take_suggestion(suggestions, &request.path) {
                Some(name) => name,
                None => {
                    let dir = resolved
                        .parent()
                        .map(|dir| self.guard.relative(dir))
                        .unwrap_or_default();
                    let name = self.guard.suggest_filename_in(&dir, input, reserved);
                    reserved.insert(name.clone());
                    name
                }
            };
            let abs_path = match self.guard.resolve_path(&name) {
                Ok(abs_path) => abs_path,
                Err(e) => {
                    self.operator.show(&style::error(&e));
                    continue;
                }
            };
            if name != request.path {
                tracing::debug!(requested = %request.path, resolved = %name, "Renamed new file");
            }
            writes.push(ResolvedWrite {
                rel_path: name,
                abs_path,
                content: request.content.clone(),
                existed: false,
                requested_path: request.path.clone(),
            });
        }

        writes
    }

    fn action_plan(&self, writes: &[ResolvedWrite], commands: &[String]) -> Vec<String> {
        let mut actions = Vec::new();
        for write in writes {
            let verb = if write.existed { "update" } else { "create" };
            actions.push(format!("{verb} file {}", write.rel_path));
            if self.sandbox.would_run(&write.rel_path, &write.content) {
                actions.push(format!("run {}", self.sandbox.command_for(&write.rel_path)));
            }
        }
        if writes.is_empty() && !commands.is_empty() {
            actions.push(format!("run git commands: {}", commands.join(", ")));
        }
        actions
    }

    /// Show the model's plan, the action plan and one diff per write.
    fn present(&mut self, intent: &Intent, actions: &[String], writes: &[ResolvedWrite]) {
        if let Some(plan) = &intent.plan {
            self.operator.show(&format!("\n{}\n{plan}", style::header("Plan:")));
        }
        if actions.is_empty() {
            return;
        }

        let listing = actions
            .iter()
            .map(|action| format!("  {} {action}", style::accent("-")))
            .collect::<Vec<_>>()
            .join("\n");
        self.operator
            .show(&format!("\n{}\n{listing}", style::header("Actions:")));

        for write in writes {
            let diff = match self.guard.diff(&write.rel_path, &write.content) {
                Ok(diff) => diff,
                Err(e) => {
                    tracing::warn!(path = %write.rel_path, "Could not diff: {e}");
                    String::new()
                }
            };
            let body = if diff.is_empty() {
                style::dim("(no changes)")
            } else {
                style::diff(diff)
            };
            self.operator.show(&format!(
                "\n{}\n{body}",
                style::yellow(format!("Proposed changes to {}:", write.rel_path))
            ));
        }
    }

    /// Write every approved file, continuing past failures. Returns the
    /// relative paths that were actually written.
    fn apply_writes(&mut self, writes: &[ResolvedWrite]) -> BTreeSet<String> {
        let mut written = BTreeSet::new();
        for write in writes {
            match self.guard.write(&write.rel_path, &write.content) {
                Ok(_) => {
                    let verb = if write.existed { "Updated" } else { "Created" };
                    self.operator
                        .show(&style::success(format!("{verb} {}", write.rel_path)));
                    self.log(LogEntry::file_write(self.round, &write.rel_path, !write.existed, None));
                    written.insert(write.rel_path.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %write.rel_path, "Write failed: {e}");
                    self.operator.show(&style::error(&e));
                    self.log(LogEntry::file_write(
                        self.round,
                        &write.rel_path,
                        !write.existed,
                        Some(e.to_string()),
                    ));
                }
            }
        }
        written
    }

    async fn run_scripts(
        &mut self,
        writes: &[ResolvedWrite],
        written: &BTreeSet<String>,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::new();
        for write in writes {
            if !written.contains(&write.rel_path) || !self.sandbox.has_script_extension(&write.rel_path) {
                continue;
            }
            let result = self.sandbox.run(&write.rel_path, &write.content, written).await;
            if !result.skipped {
                self.operator.show(&result.summary());
            }
            self.log(LogEntry::execution(self.round, &result));
            results.push(result);
        }
        results
    }

    fn speak(&mut self, text: &str) {
        self.operator.show(&format!("\n{text}"));
        self.conversation.push(ConversationTurn::assistant(text));
    }

    fn finish(&mut self, outcome: RoundOutcome) -> RoundOutcome {
        self.log(LogEntry::round_end(self.round, outcome.label()));
        self.set_state(TurnState::Idle);
        outcome
    }

    fn set_state(&mut self, next: TurnState) {
        tracing::debug!(from = ?self.state, to = ?next, round = self.round, "Turn state");
        self.state = next;
    }

    fn log(&mut self, entry: LogEntry) {
        if let Some(logger) = &mut self.logger {
            if let Err(e) = logger.log_event(&entry) {
                tracing::warn!("Failed to write session log: {e}");
            }
        }
    }
}

/// Claim the read-round suggestion for `path`, keyed either by the missing
/// path that was read or by the suggested name.
fn take_suggestion(suggestions: &mut BTreeMap<String, String>, path: &str) -> Option<String> {
    if let Some(name) = suggestions.remove(path) {
        return Some(name);
    }
    let path = path.trim().trim_start_matches("./");
    let missing = suggestions
        .iter()
        .find(|(_, name)| name.as_str() == path)
        .map(|(missing, _)| missing.clone())?;
    suggestions.remove(&missing)
}

/// Parse a reply, treating label-free text as the response itself.
fn interpret(reply: &str) -> Intent {
    let intent = parse_response(reply);
    if intent.is_empty() && !reply.trim().is_empty() {
        return Intent {
            response: Some(reply.trim().to_string()),
            ..Default::default()
        };
    }
    intent
}
