//! JSONL session transcript.
//!
//! Each session produces `session-{timestamp}.jsonl` in the configured log
//! directory, one self-describing event per line. Writes are synchronous and
//! flushed after every event so a crash loses nothing already logged.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::exec::ExecutionResult;

/// Current UTC time as ISO 8601 with milliseconds.
fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// One transcript line, tagged with `event_type`.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LogEntry {
    SessionStart {
        timestamp: String,
        model: String,
        workspace: String,
    },
    UserInput {
        timestamp: String,
        round: u64,
        content: String,
    },
    /// Raw model reply; `phase` is `initial`, `after_reads` or `report`.
    ModelResponse {
        timestamp: String,
        round: u64,
        phase: String,
        content: String,
    },
    FileRead {
        timestamp: String,
        round: u64,
        path: String,
        found: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    FileWrite {
        timestamp: String,
        round: u64,
        path: String,
        created: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Execution {
        timestamp: String,
        round: u64,
        #[serde(flatten)]
        result: ExecutionResult,
    },
    PlanDeclined {
        timestamp: String,
        round: u64,
        actions: Vec<String>,
    },
    RoundEnd {
        timestamp: String,
        round: u64,
        outcome: String,
    },
    SessionEnd {
        timestamp: String,
        total_rounds: u64,
        reason: String,
    },
}

impl LogEntry {
    pub fn user_input(round: u64, content: &str) -> Self {
        Self::UserInput {
            timestamp: now_iso(),
            round,
            content: content.to_string(),
        }
    }

    pub fn model_response(round: u64, phase: &str, content: &str) -> Self {
        Self::ModelResponse {
            timestamp: now_iso(),
            round,
            phase: phase.to_string(),
            content: content.to_string(),
        }
    }

    pub fn file_read(round: u64, path: &str, found: bool, error: Option<String>) -> Self {
        Self::FileRead {
            timestamp: now_iso(),
            round,
            path: path.to_string(),
            found,
            error,
        }
    }

    pub fn file_write(round: u64, path: &str, created: bool, error: Option<String>) -> Self {
        Self::FileWrite {
            timestamp: now_iso(),
            round,
            path: path.to_string(),
            created,
            error,
        }
    }

    pub fn execution(round: u64, result: &ExecutionResult) -> Self {
        Self::Execution {
            timestamp: now_iso(),
            round,
            result: result.clone(),
        }
    }

    pub fn plan_declined(round: u64, actions: &[String]) -> Self {
        Self::PlanDeclined {
            timestamp: now_iso(),
            round,
            actions: actions.to_vec(),
        }
    }

    pub fn round_end(round: u64, outcome: &str) -> Self {
        Self::RoundEnd {
            timestamp: now_iso(),
            round,
            outcome: outcome.to_string(),
        }
    }
}

/// Append-only JSONL writer for one session.
pub struct SessionLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
}

impl SessionLogger {
    /// Create the log directory if needed and open a fresh session file in
    /// it. Colons are kept out of the file name.
    pub fn new(log_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let session_id = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let log_path = log_dir.join(format!("session-{session_id}.jsonl"));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
        })
    }

    /// Serialize `event` as one line and flush.
    pub fn log_event(&mut self, event: &LogEntry) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log_session_start(&mut self, model: &str, workspace: &Path) -> anyhow::Result<()> {
        self.log_event(&LogEntry::SessionStart {
            timestamp: now_iso(),
            model: model.to_string(),
            workspace: workspace.display().to_string(),
        })
    }

    pub fn log_session_end(&mut self, total_rounds: u64, reason: &str) -> anyhow::Result<()> {
        self.log_event(&LogEntry::SessionEnd {
            timestamp: now_iso(),
            total_rounds,
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn make_logger() -> (SessionLogger, TempDir) {
        let tmp = TempDir::new().expect("tempdir");
        let logger = SessionLogger::new(&tmp.path().join("logs")).expect("SessionLogger::new");
        (logger, tmp)
    }

    fn read_lines(logger: &SessionLogger) -> Vec<serde_json::Value> {
        let file = fs::File::open(logger.log_path()).expect("open log");
        std::io::BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.expect("read line")).expect("valid JSON"))
            .collect()
    }

    #[test]
    fn creates_session_file_in_log_dir() {
        let (logger, tmp) = make_logger();
        let log_path = logger.log_path().to_owned();

        assert!(log_path.exists());
        assert!(log_path.starts_with(tmp.path().join("logs")));

        let name = log_path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("session-"));
        assert!(name.ends_with(".jsonl"));
        assert!(!name.contains(':'));
    }

    #[test]
    fn session_start_and_end_are_tagged() {
        let (mut logger, _tmp) = make_logger();
        logger
            .log_session_start("qwen3-coder:latest", Path::new("/tmp/project"))
            .unwrap();
        logger.log_session_end(3, "exit").unwrap();

        let lines = read_lines(&logger);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "session_start");
        assert_eq!(lines[0]["model"], "qwen3-coder:latest");
        assert_eq!(lines[0]["workspace"], "/tmp/project");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["event_type"], "session_end");
        assert_eq!(lines[1]["total_rounds"], 3);
    }

    #[test]
    fn execution_result_fields_are_flattened() {
        let (mut logger, _tmp) = make_logger();
        let result = ExecutionResult {
            command: "ruby hello.rb".into(),
            stdout: "hi\n".into(),
            exit_status: Some(0),
            ..Default::default()
        };
        logger.log_event(&LogEntry::execution(1, &result)).unwrap();

        let lines = read_lines(&logger);
        assert_eq!(lines[0]["event_type"], "execution");
        assert_eq!(lines[0]["round"], 1);
        assert_eq!(lines[0]["command"], "ruby hello.rb");
        assert_eq!(lines[0]["exit_status"], 0);
        assert_eq!(lines[0]["skipped"], false);
    }

    #[test]
    fn file_events_omit_absent_error() {
        let (mut logger, _tmp) = make_logger();
        logger
            .log_event(&LogEntry::file_write(2, "a.rb", true, None))
            .unwrap();
        logger
            .log_event(&LogEntry::file_read(2, "missing.rb", false, Some("File does not exist".into())))
            .unwrap();

        let lines = read_lines(&logger);
        assert_eq!(lines[0]["event_type"], "file_write");
        assert!(lines[0].get("error").is_none());
        assert_eq!(lines[1]["event_type"], "file_read");
        assert_eq!(lines[1]["found"], false);
        assert_eq!(lines[1]["error"], "File does not exist");
    }

    #[test]
    fn declined_plan_and_round_end() {
        let (mut logger, _tmp) = make_logger();
        logger
            .log_event(&LogEntry::plan_declined(4, &["create file a.rb".to_string()]))
            .unwrap();
        logger.log_event(&LogEntry::round_end(4, "declined")).unwrap();

        let lines = read_lines(&logger);
        assert_eq!(lines[0]["event_type"], "plan_declined");
        assert_eq!(lines[0]["actions"][0], "create file a.rb");
        assert_eq!(lines[1]["event_type"], "round_end");
        assert_eq!(lines[1]["outcome"], "declined");
    }
}
