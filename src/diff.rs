//! Unified diff rendering and display clean-up.

use similar::{ChangeTag, TextDiff};

/// Renders a unified diff between two versions of a file.
///
/// When `label` is given it is used for both the `---` and `+++` headers;
/// without one the diff starts directly at the first `@@` hunk header.
/// Identical inputs produce an empty string.
///
/// # Example
///
/// ```
/// # use fuzzedit::render_unified_diff;
/// let diff = render_unified_diff("a\nb\n", "a\nc\n", Some("notes.txt"), 3);
/// assert!(diff.starts_with("--- notes.txt\n+++ notes.txt\n@@"));
/// assert!(diff.contains("-b\n+c\n"));
/// ```
pub fn render_unified_diff(old: &str, new: &str, label: Option<&str>, context_radius: usize) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut unified = diff.unified_diff();
    unified.context_radius(context_radius);
    if let Some(label) = label {
        unified.header(label, label);
    }
    unified.to_string()
}

/// Counts the lines added and removed by a line-level diff of two texts.
///
/// Returns `(additions, deletions)`.
///
/// # Example
///
/// ```
/// # use fuzzedit::count_line_changes;
/// assert_eq!(count_line_changes("a\nb\nc\n", "a\nB\nc\nd\n"), (2, 1));
/// ```
pub fn count_line_changes(old: &str, new: &str) -> (usize, usize) {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}

/// Whether a diff line carries file content, as opposed to a file or hunk header.
fn is_content_line(line: &str) -> bool {
    line.starts_with(['+', '-', ' ']) && !line.starts_with("---") && !line.starts_with("+++")
}

fn leading_whitespace(text: &str) -> usize {
    text.chars().take_while(|c| c.is_whitespace()).count()
}

/// Strips the indentation shared by every content line of a unified diff.
///
/// Deeply nested code produces diffs where every line starts with the same
/// run of spaces. This finds the smallest indentation among the non-blank
/// `+`, `-` and context lines (the `---`/`+++` headers are ignored) and
/// removes that many characters after the marker on every content line.
/// Markers, hunk headers and file headers are left in place. If any content
/// line is unindented, the diff is returned unchanged.
///
/// # Example
///
/// ```
/// # use fuzzedit::trim_diff;
/// let diff = "--- a.rs\n+++ a.rs\n@@ -1,2 +1,2 @@\n         let x = 1;\n-        x\n+        x + 1\n";
/// assert_eq!(
///     trim_diff(diff),
///     "--- a.rs\n+++ a.rs\n@@ -1,2 +1,2 @@\n let x = 1;\n-x\n+x + 1\n"
/// );
/// ```
pub fn trim_diff(diff: &str) -> String {
    let lines: Vec<&str> = diff.split('\n').collect();

    let min_indent = lines
        .iter()
        .filter(|line| is_content_line(line))
        .map(|line| &line[1..])
        .filter(|content| !content.trim().is_empty())
        .map(leading_whitespace)
        .min();

    let min_indent = match min_indent {
        Some(indent) if indent > 0 => indent,
        _ => return diff.to_string(),
    };

    lines
        .iter()
        .map(|line| {
            if !is_content_line(line) {
                return line.to_string();
            }
            let (marker, content) = line.split_at(1);
            let stripped = content
                .char_indices()
                .nth(min_indent)
                .map_or("", |(index, _)| &content[index..]);
            format!("{marker}{stripped}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
