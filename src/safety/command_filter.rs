use serde::Serialize;

/// The only program the agent may invoke as a command.
pub const VCS_PROGRAM: &str = "git";

/// Read-only subcommands that run without asking.
pub const SAFE_SUBCOMMANDS: &[&str] = &["status", "diff", "log", "branch", "remote", "fetch", "pull"];

/// Subcommands known to change the repository. Anything else is treated the
/// same way.
pub const MUTATING_SUBCOMMANDS: &[&str] = &[
    "add", "commit", "push", "checkout", "merge", "rebase", "reset", "rm", "stash", "tag",
];

/// How much trust a command gets before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Runs immediately; output is shown.
    Safe,
    /// Runs only after one explicit approval.
    Confirm,
    /// Never runs.
    Rejected,
}

/// Classify an already-split command line.
///
/// Anything that is not `git` is rejected. Global options ahead of the
/// subcommand (`git -C /elsewhere ...`) are not recognized and fall to
/// `Confirm` like any unknown subcommand.
pub fn classify<S: AsRef<str>>(words: &[S]) -> TrustTier {
    let Some(program) = words.first() else {
        return TrustTier::Rejected;
    };
    if program.as_ref() != VCS_PROGRAM {
        return TrustTier::Rejected;
    }

    match words.get(1).map(|w| w.as_ref()) {
        Some(sub) if SAFE_SUBCOMMANDS.contains(&sub) => TrustTier::Safe,
        Some(sub) if MUTATING_SUBCOMMANDS.contains(&sub) => TrustTier::Confirm,
        _ => TrustTier::Confirm,
    }
}

/// Split `command` with shell quoting rules and classify it.
///
/// Returns the words alongside the tier. A string that cannot be split
/// (unbalanced quotes) is rejected.
pub fn classify_command(command: &str) -> (Vec<String>, TrustTier) {
    match shell_words::split(command) {
        Ok(words) => {
            let tier = classify(&words);
            (words, tier)
        }
        Err(e) => {
            tracing::debug!(command, "Unparseable command rejected: {e}");
            (Vec::new(), TrustTier::Rejected)
        }
    }
}

/// True if free-form user text mentions the version-control tool by name.
pub fn mentions_vcs(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(VCS_PROGRAM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_commit_message_stays_one_word() {
        let (words, tier) = classify_command("git commit -m \"first version\"");
        assert_eq!(words, ["git", "commit", "-m", "first version"]);
        assert_eq!(tier, TrustTier::Confirm);
    }

    #[test]
    fn unbalanced_quotes_rejected() {
        let (words, tier) = classify_command("git commit -m \"oops");
        assert!(words.is_empty());
        assert_eq!(tier, TrustTier::Rejected);
    }

    #[test]
    fn mentions_vcs_matches_whole_word_only() {
        assert!(mentions_vcs("please git commit this"));
        assert!(mentions_vcs("Run GIT status"));
        assert!(!mentions_vcs("show me the digit counter"));
        assert!(!mentions_vcs("github link"));
    }
}
