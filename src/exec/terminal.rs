//! Terminal hand-off for interactive child processes.

use std::io::Write;

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{self, SetArg, Termios};

/// Saves the terminal's line discipline on creation and puts it back on drop.
///
/// Hold one for the whole lifetime of an interactive child. Because the
/// restore happens in `Drop`, it also runs when the run errors out or
/// unwinds from a panic.
pub struct TerminalGuard {
    saved: Option<Termios>,
}

impl TerminalGuard {
    /// Snapshot the current terminal attributes and leave raw mode so the
    /// child starts from a cooked terminal. When stdin is not a terminal
    /// there is nothing to save and the guard is inert.
    pub fn acquire() -> Self {
        let saved = match termios::tcgetattr(std::io::stdin()) {
            Ok(attrs) => Some(attrs),
            Err(e) => {
                tracing::debug!("stdin is not a terminal ({e}); nothing to restore");
                None
            }
        };

        if saved.is_some() {
            if let Err(e) = crossterm::terminal::disable_raw_mode() {
                tracing::debug!("Could not leave raw mode: {e}");
            }
        }
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        Self { saved }
    }

    pub fn is_terminal(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let Some(saved) = &self.saved else {
            return;
        };

        if let Err(e) = termios::tcsetattr(std::io::stdin(), SetArg::TCSANOW, saved) {
            tracing::warn!("Failed to restore terminal attributes: {e}");
        }
        // The child may have hidden the cursor or left the screen mid-line.
        let mut stdout = std::io::stdout();
        let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
        let _ = stdout.flush();
        let _ = std::io::stderr().flush();
        tracing::debug!("Terminal restored after interactive process");
    }
}

/// Ignores SIGINT in this process until dropped, then puts the previous
/// disposition back.
///
/// Create it after the child is spawned: an ignored disposition survives
/// `exec`, and the child must still get Ctrl-C from the foreground process
/// group.
pub struct InterruptGuard {
    previous: Option<SigAction>,
}

impl InterruptGuard {
    pub fn ignore() -> Self {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: SIG_IGN installs no handler code.
        let previous = match unsafe { signal::sigaction(Signal::SIGINT, &ignore) } {
            Ok(previous) => Some(previous),
            Err(e) => {
                tracing::warn!("Could not ignore SIGINT: {e}");
                None
            }
        };
        Self { previous }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        let Some(previous) = &self.previous else {
            return;
        };
        // SAFETY: restores the disposition that was in place before `ignore`.
        if let Err(e) = unsafe { signal::sigaction(Signal::SIGINT, previous) } {
            tracing::warn!("Failed to restore SIGINT handling: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_without_terminal_is_inert() {
        // Under the test harness stdin is usually not a tty; either way
        // creating and dropping the guard must not panic.
        let guard = TerminalGuard::acquire();
        let _ = guard.is_terminal();
        drop(guard);
    }

    #[test]
    fn interrupt_guard_restores_previous_disposition() {
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        let current = || {
            // SAFETY: swaps dispositions only.
            let previous = unsafe { signal::sigaction(Signal::SIGINT, &default) }.unwrap();
            unsafe { signal::sigaction(Signal::SIGINT, &previous) }.unwrap();
            previous.handler()
        };
        let before = current();

        let guard = InterruptGuard::ignore();
        assert_eq!(current(), SigHandler::SigIgn);
        drop(guard);

        assert_eq!(current(), before);
    }
}
