//! Candidate generators for the match cascade.
//!
//! Every strategy has the same shape: given the full document and the
//! caller's search text, it lazily yields literal substrings that might be
//! what the caller meant. Strategies never decide anything on their own; the
//! resolution engine in the crate root checks each candidate against the
//! document and stops pulling as soon as one is accepted.

use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt;
use std::iter;
use std::ops::Range;
use std::sync::OnceLock;

use crate::similarity::line_similarity;

/// A lazy, single-pass stream of candidate spans produced by a [`Strategy`].
pub type Candidates<'a> = Box<dyn Iterator<Item = Cow<'a, str>> + 'a>;

const SINGLE_CANDIDATE_SIMILARITY_THRESHOLD: f64 = 0.0;
const MULTIPLE_CANDIDATES_SIMILARITY_THRESHOLD: f64 = 0.3;

/// One of the nine matching algorithms, listed in cascade order.
///
/// The order of [`Strategy::ALL`] is the order the resolution engine tries
/// them in: exact containment first, then line-oriented heuristics, then
/// the looser substring and regex based ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The search text itself.
    Exact,
    /// Line windows that match once every line is trimmed.
    LineTrimmed,
    /// Blocks bounded by matching first and last lines, ranked by the
    /// similarity of their interior lines.
    BlockAnchor,
    /// Lines or blocks that match after collapsing whitespace runs.
    WhitespaceNormalized,
    /// Blocks that match after removing their common indentation.
    IndentationFlexible,
    /// Text that matches once backslash escapes are interpreted.
    EscapeNormalized,
    /// The search text without its surrounding whitespace.
    TrimmedBoundary,
    /// Anchor-bounded blocks whose interior lines mostly match.
    ContextAware,
    /// The search text once per literal occurrence.
    MultiOccurrence,
}

impl Strategy {
    /// Every strategy, in the fixed order the resolution engine uses.
    pub const ALL: [Strategy; 9] = [
        Strategy::Exact,
        Strategy::LineTrimmed,
        Strategy::BlockAnchor,
        Strategy::WhitespaceNormalized,
        Strategy::IndentationFlexible,
        Strategy::EscapeNormalized,
        Strategy::TrimmedBoundary,
        Strategy::ContextAware,
        Strategy::MultiOccurrence,
    ];

    /// A short, stable name for logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::LineTrimmed => "line-trimmed",
            Strategy::BlockAnchor => "block-anchor",
            Strategy::WhitespaceNormalized => "whitespace-normalized",
            Strategy::IndentationFlexible => "indentation-flexible",
            Strategy::EscapeNormalized => "escape-normalized",
            Strategy::TrimmedBoundary => "trimmed-boundary",
            Strategy::ContextAware => "context-aware",
            Strategy::MultiOccurrence => "multi-occurrence",
        }
    }

    /// Produces this strategy's candidates for `search` within `content`.
    ///
    /// Nothing is computed until the returned iterator is polled, so a
    /// caller that stops early never pays for the remaining work.
    ///
    /// # Example
    ///
    /// ```
    /// # use fuzzedit::Strategy;
    /// let content = "fn main() {\n    run();\n}\n";
    /// let found: Vec<_> = Strategy::LineTrimmed
    ///     .candidates(content, "fn main() {\n  run();\n}")
    ///     .collect();
    /// assert_eq!(found, vec!["fn main() {\n    run();\n}"]);
    /// ```
    pub fn candidates<'a>(self, content: &'a str, search: &'a str) -> Candidates<'a> {
        match self {
            Strategy::Exact => exact(search),
            Strategy::LineTrimmed => line_trimmed(content, search),
            Strategy::BlockAnchor => block_anchor(content, search),
            Strategy::WhitespaceNormalized => whitespace_normalized(content, search),
            Strategy::IndentationFlexible => indentation_flexible(content, search),
            Strategy::EscapeNormalized => escape_normalized(content, search),
            Strategy::TrimmedBoundary => trimmed_boundary(content, search),
            Strategy::ContextAware => context_aware(content, search),
            Strategy::MultiOccurrence => multi_occurrence(content, search),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Line bookkeeping ---

/// The document split on `\n`, with the byte offset of every line so that
/// any run of lines can be handed back as a slice of the original text.
struct LineTable<'a> {
    content: &'a str,
    lines: Vec<&'a str>,
    offsets: Vec<usize>,
}

impl<'a> LineTable<'a> {
    fn new(content: &'a str) -> Self {
        let lines: Vec<&'a str> = content.split('\n').collect();
        let mut offsets = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in &lines {
            offsets.push(offset);
            offset += line.len() + 1;
        }
        Self {
            content,
            lines,
            offsets,
        }
    }

    /// Start indices of every window of `size` consecutive lines.
    fn window_starts(&self, size: usize) -> Range<usize> {
        if size == 0 || size > self.lines.len() {
            return 0..0;
        }
        0..self.lines.len() - size + 1
    }

    /// The literal text of lines `start..=end`, without the newline after `end`.
    fn span(&self, start: usize, end: usize) -> &'a str {
        let content: &'a str = self.content;
        let from = self.offsets[start];
        let to = self.offsets[end] + self.lines[end].len();
        &content[from..to]
    }

    fn block(&self, start: usize, size: usize) -> &'a str {
        self.span(start, start + size - 1)
    }
}

/// Splits the search text into lines, dropping the empty line left behind
/// by a trailing newline.
fn search_lines(search: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = search.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

// --- Strategies ---

fn exact<'a>(search: &'a str) -> Candidates<'a> {
    Box::new(iter::once(Cow::Borrowed(search)))
}

fn line_trimmed<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    let table = LineTable::new(content);
    let wanted = search_lines(search);
    let size = wanted.len();
    let starts = table.window_starts(size);

    Box::new(starts.filter_map(move |start| {
        let window = &table.lines[start..start + size];
        window
            .iter()
            .zip(&wanted)
            .all(|(line, want)| line.trim() == want.trim())
            .then(|| Cow::Borrowed(table.block(start, size)))
    }))
}

fn block_anchor<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    if line_count(search) < 3 {
        return Box::new(iter::empty());
    }
    Box::new(iter::once_with(move || best_anchored_block(content, search)).flatten())
}

/// Finds every window bounded by the search text's first and last lines and
/// picks the one whose interior looks most like the search text.
fn best_anchored_block<'a>(content: &'a str, search: &'a str) -> Option<Cow<'a, str>> {
    let table = LineTable::new(content);
    let wanted = search_lines(search);
    let first = wanted.first()?.trim();
    let last = wanted.last()?.trim();

    let anchors: Vec<(usize, usize)> = table
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == first)
        .filter_map(|(start, _)| {
            table
                .lines
                .iter()
                .enumerate()
                .skip(start + 2)
                .find(|(_, line)| line.trim() == last)
                .map(|(end, _)| (start, end))
        })
        .collect();
    trace!("      Block anchors found: {:?}", anchors);

    match anchors.as_slice() {
        [] => None,
        &[(start, end)] => {
            // A lone anchor pair is trusted; the score only feeds the log.
            let similarity = interior_similarity(
                &table.lines[start..=end],
                &wanted,
                Some(SINGLE_CANDIDATE_SIMILARITY_THRESHOLD),
            );
            trace!(
                "      Single anchor window at lines {}-{} (similarity {:.3}).",
                start + 1,
                end + 1,
                similarity
            );
            (similarity >= SINGLE_CANDIDATE_SIMILARITY_THRESHOLD)
                .then(|| Cow::Borrowed(table.span(start, end)))
        }
        _ => {
            let scores = score_anchor_windows(&table, &anchors, &wanted);

            let mut best: Option<(usize, f64)> = None;
            for (index, score) in scores.into_iter().enumerate() {
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((index, score));
                }
            }
            let (index, score) = best?;
            let (start, end) = anchors[index];
            trace!(
                "      Best of {} anchor windows is lines {}-{} (similarity {:.3}, threshold {:.2}).",
                anchors.len(),
                start + 1,
                end + 1,
                score,
                MULTIPLE_CANDIDATES_SIMILARITY_THRESHOLD
            );
            (score >= MULTIPLE_CANDIDATES_SIMILARITY_THRESHOLD)
                .then(|| Cow::Borrowed(table.span(start, end)))
        }
    }
}

#[cfg(feature = "parallel")]
fn score_anchor_windows(table: &LineTable<'_>, anchors: &[(usize, usize)], wanted: &[&str]) -> Vec<f64> {
    anchors
        .par_iter()
        .map(|&(start, end)| interior_similarity(&table.lines[start..=end], wanted, None))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn score_anchor_windows(table: &LineTable<'_>, anchors: &[(usize, usize)], wanted: &[&str]) -> Vec<f64> {
    anchors
        .iter()
        .map(|&(start, end)| interior_similarity(&table.lines[start..=end], wanted, None))
        .collect()
}

/// Averages the similarity of the interior lines of an anchored window
/// against the search lines. Pairs that are blank on both sides do not
/// count. With `accept_at`, stops as soon as the running average reaches it.
fn interior_similarity(window: &[&str], wanted: &[&str], accept_at: Option<f64>) -> f64 {
    let interior = window.len().min(wanted.len()).saturating_sub(2);
    let pairs: Vec<(&str, &str)> = (1..=interior)
        .map(|k| (window[k].trim(), wanted[k].trim()))
        .filter(|(actual, expected)| !actual.is_empty() || !expected.is_empty())
        .collect();
    if pairs.is_empty() {
        return 1.0;
    }

    let count = pairs.len() as f64;
    let mut similarity = 0.0;
    for (actual, expected) in pairs {
        similarity += line_similarity(actual, expected) / count;
        if accept_at.is_some_and(|threshold| similarity >= threshold) {
            break;
        }
    }
    similarity
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn whitespace_normalized<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    let normalized = normalize_whitespace(search);
    let words: Vec<String> = search.split_whitespace().map(regex::escape).collect();
    let pattern = if words.is_empty() {
        None
    } else {
        Regex::new(&words.join(r"\s+")).ok()
    };

    let line_target = normalized.clone();
    let single_lines = content.split('\n').filter_map(move |line| {
        let normalized_line = normalize_whitespace(line);
        if normalized_line == line_target {
            return Some(Cow::Borrowed(line));
        }
        if !normalized_line.contains(line_target.as_str()) {
            return None;
        }
        pattern
            .as_ref()?
            .find(line)
            .map(|found| Cow::Borrowed(found.as_str()))
    });

    let size = line_count(search);
    let blocks: Candidates<'a> = if size > 1 {
        let table = LineTable::new(content);
        let starts = table.window_starts(size);
        Box::new(starts.filter_map(move |start| {
            let block = table.block(start, size);
            (normalize_whitespace(block) == normalized).then_some(Cow::Borrowed(block))
        }))
    } else {
        Box::new(iter::empty())
    };

    Box::new(single_lines.chain(blocks))
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn skip_chars(text: &str, count: usize) -> &str {
    text.char_indices()
        .nth(count)
        .map_or("", |(index, _)| &text[index..])
}

/// Removes the indentation shared by every non-blank line. Blank lines are
/// kept as they are.
fn deindent(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(min_indent) = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_whitespace(line))
        .min()
    else {
        return text.to_string();
    };

    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                *line
            } else {
                skip_chars(line, min_indent)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indentation_flexible<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    let target = deindent(search);
    let size = line_count(search);
    let table = LineTable::new(content);
    let starts = table.window_starts(size);

    Box::new(starts.filter_map(move |start| {
        let block = table.block(start, size);
        (deindent(block) == target).then_some(Cow::Borrowed(block))
    }))
}

fn escape_sequence() -> &'static Regex {
    static ESCAPE_SEQUENCE: OnceLock<Regex> = OnceLock::new();
    ESCAPE_SEQUENCE.get_or_init(|| {
        Regex::new(r#"\\(n|t|r|'|"|`|\\|\n|\$)"#).expect("escape sequence pattern is valid")
    })
}

/// Interprets the backslash escapes a model tends to leave in quoted code.
fn unescape(text: &str) -> Cow<'_, str> {
    escape_sequence().replace_all(text, |caps: &Captures<'_>| match &caps[1] {
        "n" | "\n" => "\n".to_string(),
        "t" => "\t".to_string(),
        "r" => "\r".to_string(),
        other => other.to_string(),
    })
}

fn escape_normalized<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    let target = unescape(search);
    let literal = content
        .find(&*target)
        .map(|index| Cow::Borrowed(&content[index..index + target.len()]));

    let size = line_count(&target);
    let table = LineTable::new(content);
    let starts = table.window_starts(size);
    let blocks = starts.filter_map(move |start| {
        let block = table.block(start, size);
        (unescape(block) == target).then_some(Cow::Borrowed(block))
    });

    Box::new(literal.into_iter().chain(blocks))
}

fn trimmed_boundary<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    let trimmed = search.trim();
    if trimmed == search {
        return Box::new(iter::empty());
    }

    let literal = content.contains(trimmed).then_some(Cow::Borrowed(trimmed));

    let size = line_count(search);
    let table = LineTable::new(content);
    let starts = table.window_starts(size);
    let blocks = starts.filter_map(move |start| {
        let block = table.block(start, size);
        (block.trim() == trimmed).then_some(Cow::Borrowed(block))
    });

    Box::new(literal.into_iter().chain(blocks))
}

fn context_aware<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    if line_count(search) < 3 {
        return Box::new(iter::empty());
    }

    let wanted = search_lines(search);
    let first = wanted.first().copied().unwrap_or_default().trim();
    let last = wanted.last().copied().unwrap_or_default().trim();
    let table = LineTable::new(content);
    let starts = 0..table.lines.len();

    Box::new(starts.filter_map(move |start| {
        if table.lines[start].trim() != first {
            return None;
        }
        // First fit: only the nearest closing line is considered per anchor.
        let end = (start + 2..table.lines.len()).find(|&end| table.lines[end].trim() == last)?;
        let window = &table.lines[start..=end];
        if window.len() != wanted.len() {
            return None;
        }

        let (matching, compared) = window[1..window.len() - 1]
            .iter()
            .zip(&wanted[1..])
            .map(|(actual, expected)| (actual.trim(), expected.trim()))
            .filter(|(actual, expected)| !actual.is_empty() || !expected.is_empty())
            .fold((0usize, 0usize), |(matching, compared), (actual, expected)| {
                (matching + usize::from(actual == expected), compared + 1)
            });

        (compared == 0 || matching * 2 >= compared)
            .then(|| Cow::Borrowed(table.span(start, end)))
    }))
}

fn multi_occurrence<'a>(content: &'a str, search: &'a str) -> Candidates<'a> {
    if search.is_empty() {
        return Box::new(iter::empty());
    }
    Box::new(
        content
            .match_indices(search)
            .map(move |_| Cow::Borrowed(search)),
    )
}
