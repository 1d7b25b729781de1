use dialoguer::Confirm;

use super::style;

/// The human at the terminal: answers yes/no questions and reads output.
pub trait Operator {
    /// Ask one yes/no question. Anything other than an explicit yes is no.
    fn confirm(&mut self, prompt: &str) -> bool;

    fn show(&mut self, text: &str);
}

/// Operator backed by the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn confirm(&mut self, prompt: &str) -> bool {
        match Confirm::new()
            .with_prompt(format!("  {}", style::accent(prompt)))
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Approval prompt failed, treating as no: {e}");
                false
            }
        }
    }

    fn show(&mut self, text: &str) {
        println!("{text}");
    }
}
