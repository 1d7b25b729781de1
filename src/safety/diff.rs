//! Line-based unified diff used to preview proposed file edits.

/// Lines of unchanged context shown around each change.
const CONTEXT_LINES: usize = 3;

/// Above this many cells the LCS table is skipped and the whole file is shown
/// as replaced.
const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

impl Op {
    fn is_change(self) -> bool {
        !matches!(self, Op::Equal(..))
    }
}

/// Produce a unified diff between `old` and `new`.
///
/// Returns an empty string when the contents have identical lines.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let ops = edit_script(&old_lines, &new_lines);
    if !ops.iter().any(|op| op.is_change()) {
        return String::new();
    }

    // (old, new) lines consumed before each op index.
    let mut consumed = Vec::with_capacity(ops.len() + 1);
    let (mut o, mut n) = (0usize, 0usize);
    for op in &ops {
        consumed.push((o, n));
        match op {
            Op::Equal(..) => {
                o += 1;
                n += 1;
            }
            Op::Delete(_) => o += 1,
            Op::Insert(_) => n += 1,
        }
    }
    consumed.push((o, n));

    let mut out = format!("--- a/{path}\n+++ b/{path}\n");
    for (start, end) in hunk_ranges(&ops) {
        let (old_before, new_before) = consumed[start];
        let (old_after, new_after) = consumed[end];
        let old_count = old_after - old_before;
        let new_count = new_after - new_before;
        let old_start = if old_count == 0 { old_before } else { old_before + 1 };
        let new_start = if new_count == 0 { new_before } else { new_before + 1 };

        out.push_str(&format!(
            "@@ -{old_start},{old_count} +{new_start},{new_count} @@\n"
        ));
        for op in &ops[start..end] {
            let line = match *op {
                Op::Equal(i, _) => format!(" {}", old_lines[i]),
                Op::Delete(i) => format!("-{}", old_lines[i]),
                Op::Insert(j) => format!("+{}", new_lines[j]),
            };
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Minimal edit script via a longest-common-subsequence table.
fn edit_script(old: &[&str], new: &[&str]) -> Vec<Op> {
    let (m, n) = (old.len(), new.len());

    if m.saturating_mul(n) > MAX_LCS_CELLS {
        return (0..m)
            .map(Op::Delete)
            .chain((0..n).map(Op::Insert))
            .collect();
    }

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(m + n);
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if old[i] == new[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(i));
            i += 1;
        } else {
            ops.push(Op::Insert(j));
            j += 1;
        }
    }
    ops.extend((i..m).map(Op::Delete));
    ops.extend((j..n).map(Op::Insert));
    ops
}

/// Group changes into `[start, end)` op ranges padded with context, merging
/// hunks whose context would overlap.
fn hunk_ranges(ops: &[Op]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if !op.is_change() {
            continue;
        }
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + 1 + CONTEXT_LINES).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_empty_diff() {
        assert_eq!(unified_diff("a.rb", "puts 1\nputs 2\n", "puts 1\nputs 2\n"), "");
    }

    #[test]
    fn new_file_is_all_additions() {
        let diff = unified_diff("hello.rb", "", "puts \"hi\"\nputs \"bye\"");
        assert_eq!(
            diff,
            "--- a/hello.rb\n+++ b/hello.rb\n@@ -0,0 +1,2 @@\n+puts \"hi\"\n+puts \"bye\"\n"
        );
    }

    #[test]
    fn single_line_change_with_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nfive\n6\n7\n8\n9\n";
        let diff = unified_diff("n.txt", old, new);
        assert_eq!(
            diff,
            "--- a/n.txt\n+++ b/n.txt\n@@ -2,7 +2,7 @@\n 2\n 3\n 4\n-5\n+five\n 6\n 7\n 8\n"
        );
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let old: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let new: String = (1..=20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                19 => "nineteen\n".to_string(),
                _ => format!("{i}\n"),
            })
            .collect();
        let diff = unified_diff("f", &old, &new);
        assert_eq!(diff.matches("@@ -").count(), 2);
    }

    #[test]
    fn deleting_everything() {
        let diff = unified_diff("gone.rb", "a\nb\n", "");
        assert!(diff.contains("@@ -1,2 +0,0 @@"));
        assert!(diff.contains("-a\n-b\n"));
    }
}
