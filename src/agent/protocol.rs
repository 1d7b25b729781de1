//! Labeled-section wire protocol between the agent and the model.
//!
//! The model answers in plain text using uppercase labels at the start of a
//! line:
//!
//! ~~~text
//! PLAN:
//! Create a greeting script.
//!
//! FILES_TO_READ:
//! README.md
//!
//! FILE: hello_world.rb
//! ```ruby
//! puts "Hello, world!"
//! ```
//!
//! COMMANDS:
//! git status
//!
//! RESPONSE:
//! Done.
//! ~~~
//!
//! [`parse_response`] is a small line scanner. It never fails: a missing
//! label is an absent field, and a malformed `FILE` block is dropped on its
//! own without affecting the rest of the response.

use serde::Serialize;

const FENCE: &str = "```";

/// A file the model wants written, before path validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWriteRequest {
    pub path: String,
    pub content: String,
}

/// Structured form of one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub plan: Option<String>,
    pub read_requests: Option<Vec<String>>,
    pub write_requests: Option<Vec<FileWriteRequest>>,
    pub commands: Option<Vec<String>>,
    pub response: Option<String>,
}

impl Intent {
    /// True if the intent asks for a read, a write or a command.
    pub fn is_actionable(&self) -> bool {
        self.read_requests.is_some() || self.write_requests.is_some() || self.commands.is_some()
    }

    /// True if no field at all was recognized.
    pub fn is_empty(&self) -> bool {
        !self.is_actionable() && self.plan.is_none() && self.response.is_none()
    }

    pub fn reads(&self) -> &[String] {
        self.read_requests.as_deref().unwrap_or_default()
    }

    pub fn writes(&self) -> &[FileWriteRequest] {
        self.write_requests.as_deref().unwrap_or_default()
    }

    pub fn commands(&self) -> &[String] {
        self.commands.as_deref().unwrap_or_default()
    }

    /// Render the intent in canonical wire form.
    ///
    /// Sections appear in protocol order separated by blank lines; absent
    /// fields are omitted entirely.
    pub fn to_wire(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(plan) = &self.plan {
            sections.push(format!("PLAN:\n{plan}"));
        }
        if let Some(reads) = &self.read_requests {
            sections.push(format!("FILES_TO_READ:\n{}", reads.join("\n")));
        }
        for file in self.writes() {
            sections.push(format!("FILE: {}\n{FENCE}\n{}\n{FENCE}", file.path, file.content));
        }
        if let Some(commands) = &self.commands {
            sections.push(format!("COMMANDS:\n{}", commands.join("\n")));
        }
        if let Some(response) = &self.response {
            sections.push(format!("RESPONSE:\n{response}"));
        }

        sections.join("\n\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Plan,
    FilesToRead,
    File,
    Commands,
    Response,
}

impl Label {
    const ALL: [(Label, &'static str); 5] = [
        (Label::Plan, "PLAN:"),
        (Label::FilesToRead, "FILES_TO_READ:"),
        (Label::File, "FILE:"),
        (Label::Commands, "COMMANDS:"),
        (Label::Response, "RESPONSE:"),
    ];
}

/// Recognize a label at the start of `line`, returning the label and the
/// remainder of the line after the colon.
fn match_label(line: &str) -> Option<(Label, &str)> {
    let trimmed = line.trim_start();
    Label::ALL.iter().find_map(|(label, tag)| {
        trimmed
            .strip_prefix(tag)
            .map(|rest| (*label, rest))
    })
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

fn is_closing_fence(line: &str) -> bool {
    line.trim() == FENCE
}

/// Index of the first bare fence at or after `from`. Everything before it,
/// labels included, is fenced content.
fn find_closing_fence(lines: &[&str], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&j| is_closing_fence(lines[j]))
}

/// Parse raw model text into an [`Intent`].
pub fn parse_response(text: &str) -> Intent {
    let lines: Vec<&str> = text.lines().collect();
    let mut intent = Intent::default();
    let mut i = 0;

    while i < lines.len() {
        let Some((label, rest)) = match_label(lines[i]) else {
            i += 1;
            continue;
        };

        i = match label {
            Label::File => scan_file_block(&lines, i, rest, &mut intent),
            Label::Plan => {
                let (body, next) = section_body(&lines, i, rest);
                set_text(&mut intent.plan, &body);
                next
            }
            Label::Response => {
                let (body, next) = section_body(&lines, i, rest);
                set_text(&mut intent.response, &body);
                next
            }
            Label::FilesToRead => {
                let (body, next) = section_body(&lines, i, rest);
                extend_list(&mut intent.read_requests, &body);
                next
            }
            Label::Commands => {
                let (body, next) = section_body(&lines, i, rest);
                extend_list(&mut intent.commands, &body);
                next
            }
        };
    }

    intent
}

/// Collect the body of the section whose label sits on line `start`: the
/// remainder of the label line plus every line up to the next label outside
/// a closed fence.
fn section_body<'a>(lines: &[&'a str], start: usize, rest: &'a str) -> (Vec<&'a str>, usize) {
    let mut body = Vec::new();
    if !rest.trim().is_empty() {
        body.push(rest);
    }
    let mut i = start + 1;
    while i < lines.len() && match_label(lines[i]).is_none() {
        if is_fence(lines[i]) {
            if let Some(close) = find_closing_fence(lines, i + 1) {
                body.extend_from_slice(&lines[i..=close]);
                i = close + 1;
                continue;
            }
        }
        body.push(lines[i]);
        i += 1;
    }
    (body, i)
}

/// First occurrence of a scalar section wins; blank bodies count as absent.
fn set_text(slot: &mut Option<String>, body: &[&str]) {
    if slot.is_some() {
        return;
    }
    let text = body.join("\n").trim().to_string();
    if !text.is_empty() {
        *slot = Some(text);
    }
}

fn extend_list(slot: &mut Option<Vec<String>>, body: &[&str]) {
    let items: Vec<String> = body
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.starts_with(FENCE))
        .map(|line| line.strip_prefix("- ").unwrap_or(line).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return;
    }
    slot.get_or_insert_with(Vec::new).extend(items);
}

/// Scan one `FILE:` block starting at `start`. Returns the index at which
/// scanning should resume.
///
/// The path is taken from the label line, or from the next non-blank line
/// when the label line is empty. A block without an opening fence, or whose
/// fence never closes, is dropped.
fn scan_file_block(lines: &[&str], start: usize, rest: &str, intent: &mut Intent) -> usize {
    let mut i = start + 1;

    let mut path = clean_path(rest);
    if path.is_empty() {
        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }
        if i >= lines.len() || is_fence(lines[i]) || match_label(lines[i]).is_some() {
            tracing::debug!("FILE block without a path dropped");
            return i;
        }
        path = clean_path(lines[i]);
        i += 1;
    }

    while i < lines.len() && lines[i].trim().is_empty() {
        i += 1;
    }
    if i >= lines.len() || !is_fence(lines[i]) {
        tracing::debug!(path = %path, "FILE block without a fenced body dropped");
        return i;
    }

    let body_start = i + 1;
    let Some(close) = find_closing_fence(lines, body_start) else {
        tracing::debug!(path = %path, "Unterminated fence; FILE block dropped");
        return body_start;
    };

    let content = lines[body_start..close].join("\n").trim_end().to_string();
    intent
        .write_requests
        .get_or_insert_with(Vec::new)
        .push(FileWriteRequest { path, content });

    close + 1
}

fn clean_path(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'')
        .trim()
        .to_string()
}
