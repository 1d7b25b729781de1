//! Interactive prompt loop.

use std::io::{self, BufRead, Write};

use super::gateway::ModelGateway;
use super::orchestrator::Orchestrator;
use crate::ui::{style, Operator};

pub const PROMPT: &str = "vibecode> ";

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Quit => "quit",
            ExitReason::EndOfInput => "eof",
        }
    }
}

/// True for the words that end a session.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}

/// Read lines from `input` and hand each non-blank one to the orchestrator
/// until `exit`, `quit` or end of input.
pub async fn run<G, O, R>(orchestrator: &mut Orchestrator<G, O>, mut input: R) -> io::Result<ExitReason>
where
    G: ModelGateway,
    O: Operator,
    R: BufRead,
{
    let reason = loop {
        print!("\n{}", style::accent(PROMPT));
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            break ExitReason::EndOfInput;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit_command(line) {
            break ExitReason::Quit;
        }

        let outcome = orchestrator.handle_input(line).await;
        tracing::debug!(?outcome, "Round finished");
    };

    orchestrator.end_session(reason.as_str());
    Ok(reason)
}
