use vibecode::safety::command_filter::{
    classify, classify_command, TrustTier, MUTATING_SUBCOMMANDS, SAFE_SUBCOMMANDS,
};

// ─── Safe ────────────────────────────────────────────────────────────

#[test]
fn read_only_subcommands_are_safe() {
    for sub in ["status", "diff", "log", "branch", "remote", "fetch", "pull"] {
        assert_eq!(classify(&["git", sub]), TrustTier::Safe, "git {sub}");
    }
    assert_eq!(SAFE_SUBCOMMANDS.len(), 7);
}

#[test]
fn safe_subcommand_with_arguments_stays_safe() {
    let (_, tier) = classify_command("git log --oneline -n 5");
    assert_eq!(tier, TrustTier::Safe);
}

// ─── Confirm ─────────────────────────────────────────────────────────

#[test]
fn mutating_subcommands_need_confirmation() {
    for &sub in MUTATING_SUBCOMMANDS {
        assert_eq!(classify(&["git", sub]), TrustTier::Confirm, "git {sub}");
    }
}

#[test]
fn unknown_subcommand_needs_confirmation() {
    assert_eq!(classify(&["git", "gc", "--aggressive"]), TrustTier::Confirm);
    assert_eq!(classify(&["git", "clean", "-fdx"]), TrustTier::Confirm);
}

#[test]
fn bare_git_needs_confirmation() {
    assert_eq!(classify(&["git"]), TrustTier::Confirm);
}

#[test]
fn global_options_before_subcommand_need_confirmation() {
    assert_eq!(classify_command("git -C /elsewhere status").1, TrustTier::Confirm);
    assert_eq!(classify_command("git -c core.pager=cat log").1, TrustTier::Confirm);
}

#[test]
fn subcommand_match_is_exact() {
    assert_eq!(classify(&["git", "Status"]), TrustTier::Confirm);
    assert_eq!(classify(&["git", "status-all"]), TrustTier::Confirm);
}

// ─── Rejected ────────────────────────────────────────────────────────

#[test]
fn other_programs_are_rejected() {
    for cmd in ["ls -la", "rm -rf /", "ruby hello.rb", "sudo git status", "/usr/bin/git status"] {
        assert_eq!(classify_command(cmd).1, TrustTier::Rejected, "{cmd}");
    }
}

#[test]
fn empty_command_is_rejected() {
    let empty: [&str; 0] = [];
    assert_eq!(classify(&empty), TrustTier::Rejected);
    assert_eq!(classify_command("   ").1, TrustTier::Rejected);
}

#[test]
fn shell_operators_do_not_chain() {
    let (words, tier) = classify_command("git status && rm -rf .");
    assert_eq!(tier, TrustTier::Safe);
    // The operator is just another argument to git; no shell runs it.
    assert!(words.contains(&"&&".to_string()));
}
