use std::collections::BTreeSet;
use std::fs;

use tempfile::TempDir;
use vibecode::error::WorkspaceError;
use vibecode::safety::workspace::WorkspaceGuard;

// ─── Helper ───────────────────────────────────────────────────────────

fn setup_workspace() -> (TempDir, WorkspaceGuard) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let guard = WorkspaceGuard::new(tmp.path(), "rb").expect("guard");
    (tmp, guard)
}

fn assert_denied(result: Result<impl std::fmt::Debug, WorkspaceError>) {
    match result {
        Err(WorkspaceError::AccessDenied { .. }) => {}
        other => panic!("expected AccessDenied, got {other:?}"),
    }
}

// ─── Containment ─────────────────────────────────────────────────────

#[test]
fn parent_traversal_is_denied() {
    let (_tmp, guard) = setup_workspace();
    assert_denied(guard.resolve_path("../outside.rb"));
    assert_denied(guard.resolve_path("lib/../../outside.rb"));
}

#[test]
fn absolute_path_outside_root_is_denied() {
    let (_tmp, guard) = setup_workspace();
    assert_denied(guard.resolve_path("/etc/passwd"));
}

#[test]
fn absolute_path_inside_root_is_allowed() {
    let (_tmp, guard) = setup_workspace();
    let inside = guard.canonical_root().join("a.rb");
    let resolved = guard.resolve_path(inside.to_str().unwrap()).unwrap();
    assert_eq!(resolved, inside);
}

#[test]
fn denied_write_touches_nothing() {
    let (tmp, guard) = setup_workspace();
    let sibling = tmp.path().parent().unwrap().join("vibecode-escaped.rb");

    assert_denied(guard.write("../vibecode-escaped.rb", "puts 1"));
    assert!(!sibling.exists());
}

#[test]
fn denied_read_reports_access_denied() {
    let (_tmp, guard) = setup_workspace();
    assert_denied(guard.read("../../etc/hostname"));
}

#[cfg(unix)]
#[test]
fn symlink_to_outside_is_denied() {
    let (_tmp, guard) = setup_workspace();
    let outside = tempfile::tempdir().unwrap();
    fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), guard.canonical_root().join("link")).unwrap();

    assert_denied(guard.read("link/secret.txt"));
    assert_denied(guard.write("link/new.rb", "puts 1"));
    assert!(!outside.path().join("new.rb").exists());
}

// ─── Reads, writes and diffs ─────────────────────────────────────────

#[test]
fn missing_file_is_not_found() {
    let (_tmp, guard) = setup_workspace();
    match guard.read("missing.rb") {
        Err(WorkspaceError::NotFound { path }) => assert_eq!(path, "missing.rb"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(!guard.exists("missing.rb"));
}

#[test]
fn write_creates_parent_directories() {
    let (tmp, guard) = setup_workspace();
    guard.write("lib/deep/util.rb", "def util; end\n").unwrap();
    assert_eq!(
        fs::read_to_string(tmp.path().join("lib/deep/util.rb")).unwrap(),
        "def util; end\n"
    );
}

#[test]
fn identical_content_yields_empty_diff() {
    let (_tmp, guard) = setup_workspace();
    let content = "puts \"hi\"\n";

    assert!(!guard.diff("hi.rb", content).unwrap().is_empty());
    guard.write("hi.rb", content).unwrap();
    assert_eq!(guard.diff("hi.rb", content).unwrap(), "");
}

#[test]
fn diff_against_missing_file_adds_every_line() {
    let (_tmp, guard) = setup_workspace();
    let diff = guard.diff("new.rb", "a\nb\n").unwrap();
    assert!(diff.contains("+a"));
    assert!(diff.contains("+b"));
}

// ─── Tree listing ────────────────────────────────────────────────────

#[test]
fn tree_is_sorted_depth_bounded_and_hides_git() {
    let (tmp, guard) = setup_workspace();
    fs::create_dir_all(tmp.path().join(".git/objects")).unwrap();
    fs::create_dir_all(tmp.path().join("a/b/c/d")).unwrap();
    fs::write(tmp.path().join("z.rb"), "").unwrap();
    fs::write(tmp.path().join("a/b/c/d/deep.rb"), "").unwrap();

    let tree = guard.list_tree(2);

    assert!(tree.iter().all(|p| !p.starts_with(".git")));
    assert!(tree.contains(&"a/b/c".to_string()));
    assert!(!tree.contains(&"a/b/c/d".to_string()));
    let mut sorted = tree.clone();
    sorted.sort();
    assert_eq!(tree, sorted);
    assert_eq!(tree.last().map(String::as_str), Some("z.rb"));
}

// ─── Filename synthesis ──────────────────────────────────────────────

#[test]
fn suggestion_uses_priority_keywords() {
    let (_tmp, guard) = setup_workspace();
    assert_eq!(
        guard.suggest_filename("say hello world", &BTreeSet::new()),
        "hello_world.rb"
    );
}

#[test]
fn suggestion_skips_existing_numbered_files() {
    let (tmp, guard) = setup_workspace();
    fs::write(tmp.path().join("hello_world.rb"), "").unwrap();
    fs::write(tmp.path().join("hello_world_2.rb"), "").unwrap();

    assert_eq!(
        guard.suggest_filename("say hello world", &BTreeSet::new()),
        "hello_world_3.rb"
    );
}

#[test]
fn suggestion_skips_names_reserved_this_round() {
    let (_tmp, guard) = setup_workspace();
    let reserved: BTreeSet<String> = ["hello_world.rb".to_string()].into();
    assert_eq!(
        guard.suggest_filename("say hello world", &reserved),
        "hello_world_2.rb"
    );
}

#[test]
fn suggestion_falls_back_to_default_stem() {
    let (_tmp, guard) = setup_workspace();
    assert_eq!(guard.suggest_filename("", &BTreeSet::new()), "script.rb");
}
