//! Scripted doubles for the model and the operator.
//!
//! Shared by the integration tests; each test binary uses a subset.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;

use vibecode::agent::ModelGateway;
use vibecode::config::merge::{DEFAULT_MAX_TREE_ENTRIES, DEFAULT_MODEL, DEFAULT_TREE_DEPTH};
use vibecode::config::AppConfig;
use vibecode::ui::Operator;

/// Configuration rooted at `workspace` that runs scripts with `cat`, so
/// tests see the script text as its output without needing Ruby.
pub fn test_config(workspace: &Path) -> AppConfig {
    AppConfig {
        model: DEFAULT_MODEL.to_string(),
        workspace: workspace.to_path_buf(),
        tree_depth: DEFAULT_TREE_DEPTH,
        max_tree_entries: DEFAULT_MAX_TREE_ENTRIES,
        script_extension: "rb".to_string(),
        interpreter: "cat".to_string(),
        script_timeout_secs: 10,
        session_log_dir: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub model: String,
    pub system_prompt: String,
    pub context: String,
}

/// Replies with queued answers in order; `None` once the queue runs dry.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: VecDeque<Option<String>>,
    pub calls: Vec<GatewayCall>,
}

impl ScriptedGateway {
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(replies: I) -> Self {
        Self::with_replies(replies.into_iter().map(|r| Some(r.to_string())))
    }

    /// Queue replies where `None` stands for an empty model answer.
    pub fn with_replies<I: IntoIterator<Item = Option<String>>>(replies: I) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            calls: Vec::new(),
        }
    }
}

impl ModelGateway for ScriptedGateway {
    async fn chat(&mut self, model: &str, system_prompt: &str, context: &str) -> Option<String> {
        self.calls.push(GatewayCall {
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            context: context.to_string(),
        });
        self.replies.pop_front().flatten()
    }
}

/// Answers confirmations from a queue (no once it runs dry) and records
/// everything it is shown.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<bool>,
    pub prompts: Vec<String>,
    pub shown: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I: IntoIterator<Item = bool>>(answers: I) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
            shown: Vec::new(),
        }
    }

    /// Everything shown so far, one entry per line.
    pub fn transcript(&self) -> String {
        self.shown.join("\n")
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or(false)
    }

    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }
}
