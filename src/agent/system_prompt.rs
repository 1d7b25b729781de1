//! System prompts and the per-query context block.
//!
//! The model sees no chat history of its own: every query carries the whole
//! conversation flattened into one user message, followed by a snapshot of
//! the workspace tree.

use super::conversation::ConversationTurn;
use super::protocol::{FileWriteRequest, Intent};

/// Closing line of every context block.
pub const FORMAT_REMINDER: &str = "Respond using the required structured format.";

/// Wire-format illustration embedded in the agent prompt.
fn format_example(extension: &str) -> String {
    Intent {
        plan: Some("Brief reasoning about what you will do".to_string()),
        read_requests: Some(vec!["path/to/existing_file".to_string()]),
        write_requests: Some(vec![FileWriteRequest {
            path: format!("path/to/file.{extension}"),
            content: "full updated file contents".to_string(),
        }]),
        commands: Some(vec!["git status".to_string(), "git add .".to_string()]),
        response: Some("What you want to tell the user".to_string()),
    }
    .to_wire()
}

/// Prompt for exploratory queries, where the model may read, write and
/// request commands.
pub fn agent_system_prompt(interpreter: &str, extension: &str) -> String {
    let example = format_example(extension);
    format!(
        "\
You are Vibecode, a terminal coding agent working inside one project directory.

You can:
- Read project files
- Create or modify files
- Have new .{extension} scripts run with `{interpreter}` after the user approves
- Run git commands, when the user asks for git

ALWAYS respond in this format. Omit any section you do not need:

{example}

Rules:
- Only reference files that exist, or create new ones
- Do not invent paths; paths are relative to the project root
- Give the complete file contents in every FILE block
- Prefer reading files before editing them
- Keep edits minimal and complete
- Only `git` commands are accepted in COMMANDS"
    )
}

/// Prompt for the final query of a round, after actions have run.
pub fn report_system_prompt() -> String {
    "\
You are Vibecode, a terminal coding agent. The actions for this request have
already been carried out and their results are in the conversation.

Summarize for the user what happened, including program output and any
errors, in a few sentences.

Do not request file reads. Do not write files. Do not issue commands.
Respond with:

RESPONSE:
your summary"
        .to_string()
}

/// Flatten the conversation and the tree snapshot into one context block.
///
/// At most `max_tree_entries` tree lines are included; a marker line notes
/// how many were left out.
pub fn build_context(turns: &[ConversationTurn], tree: &[String], max_tree_entries: usize) -> String {
    let conversation = turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut tree_lines: Vec<String> = tree.iter().take(max_tree_entries).cloned().collect();
    if tree.len() > max_tree_entries {
        tree_lines.push(format!("... ({} more entries)", tree.len() - max_tree_entries));
    }
    let tree_text = if tree_lines.is_empty() {
        "(empty)".to_string()
    } else {
        tree_lines.join("\n")
    };

    format!(
        "Conversation so far:\n{conversation}\n\nProject file tree:\n{tree_text}\n\n{FORMAT_REMINDER}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::protocol::parse_response;

    #[test]
    fn agent_prompt_example_is_parseable() {
        let prompt = agent_system_prompt("ruby", "rb");
        let intent = parse_response(&prompt);
        assert_eq!(intent.writes()[0].path, "path/to/file.rb");
        assert_eq!(intent.commands(), ["git status", "git add ."]);
        assert!(prompt.contains("`ruby`"));
    }

    #[test]
    fn report_prompt_forbids_actions() {
        let prompt = report_system_prompt();
        assert!(prompt.contains("Do not request file reads"));
        assert!(prompt.contains("Do not write files"));
        assert!(prompt.contains("Do not issue commands"));
    }

    #[test]
    fn context_lists_turns_in_order_and_ends_with_reminder() {
        let turns = vec![
            ConversationTurn::user("show me the readme"),
            ConversationTurn::user("FILE CONTENT (README.md):\n# Demo"),
            ConversationTurn::assistant("It is a demo."),
        ];
        let ctx = build_context(&turns, &["README.md".to_string()], 10);

        let first = ctx.find("USER: show me the readme").unwrap();
        let second = ctx.find("USER: FILE CONTENT (README.md):").unwrap();
        let third = ctx.find("ASSISTANT: It is a demo.").unwrap();
        assert!(first < second && second < third);
        assert!(ctx.contains("Project file tree:\nREADME.md\n"));
        assert!(ctx.trim_end().ends_with(FORMAT_REMINDER));
    }

    #[test]
    fn context_truncates_large_trees() {
        let tree: Vec<String> = (0..5).map(|i| format!("f{i}.rb")).collect();
        let ctx = build_context(&[], &tree, 2);
        assert!(ctx.contains("f0.rb\nf1.rb\n... (3 more entries)"));
        assert!(!ctx.contains("f2.rb"));
    }

    #[test]
    fn empty_tree_is_marked() {
        let ctx = build_context(&[ConversationTurn::user("hi")], &[], 200);
        assert!(ctx.contains("Project file tree:\n(empty)"));
    }
}
