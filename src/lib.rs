//! A fuzzy search-and-replace engine for applying model-proposed edits.
//!
//! `fuzzedit` takes an edit of the form "replace this text with that text"
//! and applies it to a file, even when the quoted text does not match the
//! file byte-for-byte. Language models routinely get indentation, trailing
//! whitespace or escaping slightly wrong when they quote code back; this
//! crate finds the span they meant, and refuses to guess when more than one
//! span fits.
//!
//! ## Getting Started
//!
//! The core entry point is [`apply_edit`], a pure function over strings.
//!
//! ```rust
//! use fuzzedit::{apply_edit, Strategy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let content = "fn main() {\n    println!(\"Hello, world!\");\n}\n";
//!
//! // The quoted text is indented with two spaces instead of four.
//! let old = "fn main() {\n  println!(\"Hello, world!\");\n}";
//! let new = "fn main() {\n    println!(\"Hello, fuzzedit!\");\n}";
//!
//! let result = apply_edit(content, old, new, false)?;
//! assert_eq!(
//!     result.new_content,
//!     "fn main() {\n    println!(\"Hello, fuzzedit!\");\n}\n"
//! );
//! assert_eq!(result.strategy, Some(Strategy::LineTrimmed));
//! assert_eq!((result.additions, result.deletions), (1, 1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### The Match Cascade
//!
//! Locating the text is done by nine [`Strategy`] values tried in a fixed
//! order, from exact containment to progressively looser normalizations
//! (trimmed lines, anchor blocks, collapsed whitespace, de-indentation,
//! unescaping, trimmed boundaries, context windows). Each strategy lazily
//! proposes *candidates*: literal substrings of the file.
//!
//! - A candidate that does not occur in the file is skipped.
//! - A candidate that occurs exactly once is accepted and the cascade stops.
//! - A candidate that occurs more than once is skipped unless replace-all was
//!   requested; a later strategy may still produce a unique one.
//!
//! If nothing is ever found the edit fails with [`EditError::NotFound`]; if
//! something was found but never uniquely, it fails with
//! [`EditError::Ambiguous`]. Either way the content is untouched.
//!
//! ### Tools
//!
//! The [`tool`] module wraps the engine for use by an agent: it resolves
//! paths against a repository root, refuses paths that escape it, reads and
//! writes through a [`tool::FileStore`], and formats the result for a chat
//! transcript.
//!
//! ## Feature Flags
//!
//! ### `parallel`
//!
//! - **Enabled by default.**
//! - Scores competing anchor-bounded blocks on [`rayon`](https://crates.io/crates/rayon)'s
//!   thread pool. The winner is still chosen sequentially, so results do not
//!   depend on thread scheduling.
//! - Disable with `default-features = false` for targets without threads.
use log::{debug, trace, warn};
use std::borrow::Cow;
use thiserror::Error;

mod diff;
mod similarity;
mod strategies;
pub mod tool;

pub use diff::{count_line_changes, render_unified_diff, trim_diff};
pub use similarity::{edit_distance, line_similarity};
pub use strategies::{Candidates, Strategy};

// --- Error Types ---

/// The reasons an edit can be rejected.
///
/// All of them are terminal: the content is never modified when one of these
/// is returned. The messages are written for the agent that proposed the edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// `old_string` and `new_string` are identical, so the edit would be a no-op.
    #[error("old_string and new_string must be different")]
    InvalidRequest,
    /// No strategy located `old_string` anywhere in the content.
    ///
    /// Strategies never match empty text, so an `old_string` made only of
    /// whitespace ends here rather than in [`EditError::Ambiguous`].
    #[error("old_string not found in content")]
    NotFound,
    /// `old_string` was located, but only in places that occur more than once.
    #[error(
        "Found multiple matches for old_string. Provide more surrounding lines in old_string to identify the correct match."
    )]
    Ambiguous,
}

// --- Options ---

/// Options for configuring how an edit is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    /// Replace every occurrence of the matched text instead of requiring a
    /// unique one.
    pub replace_all: bool,
    /// Number of unchanged lines shown around each change in the diff.
    pub context_radius: usize,
    /// Name used in the `---`/`+++` headers of the diff. Without one the diff
    /// has no file headers.
    pub diff_label: Option<String>,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            replace_all: false,
            context_radius: 3,
            diff_label: None,
        }
    }
}

impl EditOptions {
    /// Creates a new builder for `EditOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use fuzzedit::EditOptions;
    /// let options = EditOptions::builder()
    ///     .replace_all(true)
    ///     .context_radius(1)
    ///     .diff_label("src/lib.rs")
    ///     .build();
    ///
    /// assert!(options.replace_all);
    /// assert_eq!(options.context_radius, 1);
    /// assert_eq!(options.diff_label.as_deref(), Some("src/lib.rs"));
    /// ```
    pub fn builder() -> EditOptionsBuilder {
        EditOptionsBuilder::default()
    }
}

/// A builder for creating `EditOptions`.
#[derive(Debug, Clone, Default)]
pub struct EditOptionsBuilder {
    replace_all: Option<bool>,
    context_radius: Option<usize>,
    diff_label: Option<String>,
}

impl EditOptionsBuilder {
    /// Replace every occurrence of the matched text.
    pub fn replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = Some(replace_all);
        self
    }

    /// Sets the number of context lines around each change in the diff.
    pub fn context_radius(mut self, context_radius: usize) -> Self {
        self.context_radius = Some(context_radius);
        self
    }

    /// Sets the file name used in the diff headers.
    pub fn diff_label(mut self, label: impl Into<String>) -> Self {
        self.diff_label = Some(label.into());
        self
    }

    /// Builds the `EditOptions`.
    pub fn build(self) -> EditOptions {
        let default = EditOptions::default();
        EditOptions {
            replace_all: self.replace_all.unwrap_or(default.replace_all),
            context_radius: self.context_radius.unwrap_or(default.context_radius),
            diff_label: self.diff_label.or(default.diff_label),
        }
    }
}

// --- Data Structures ---

/// The span the cascade settled on for an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a> {
    /// The literal text in the content that will be replaced.
    pub text: Cow<'a, str>,
    /// The strategy that proposed it.
    pub strategy: Strategy,
    /// How many times `text` occurs in the content. Always `1` unless
    /// replace-all was requested.
    pub occurrences: usize,
}

/// The outcome of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    /// The content before the edit.
    pub original_content: String,
    /// The content after the edit.
    pub new_content: String,
    /// A unified diff from `original_content` to `new_content`.
    pub diff: String,
    /// Number of lines added, per a line-level diff.
    pub additions: usize,
    /// Number of lines removed, per a line-level diff.
    pub deletions: usize,
    /// The strategy that located the replaced text. `None` for the
    /// whole-content path taken when `old_string` is empty.
    pub strategy: Option<Strategy>,
    /// How many spans were replaced.
    pub replacements: usize,
}

// --- Core Logic ---

/// A trait for engines that decide which span of the content an edit targets.
///
/// This keeps the resolution step pluggable: [`apply_edit_with`] accepts any
/// implementation, while [`apply_edit`] uses [`CascadeMatcher`].
pub trait MatchFinder {
    /// Locates the span of `content` that `search` refers to.
    ///
    /// # Returns
    ///
    /// - `Ok(Match)` with the literal text to replace.
    /// - `Err(EditError::NotFound)` if nothing resembling `search` exists.
    /// - `Err(EditError::Ambiguous)` if matches exist but none is unique and
    ///   `replace_all` is `false`.
    fn find_match<'a>(
        &self,
        content: &'a str,
        search: &'a str,
        replace_all: bool,
    ) -> Result<Match<'a>, EditError>;
}

/// The default matcher: runs every [`Strategy`] in [`Strategy::ALL`] order
/// and accepts the first candidate that occurs exactly once (or at all, under
/// replace-all).
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeMatcher;

impl MatchFinder for CascadeMatcher {
    fn find_match<'a>(
        &self,
        content: &'a str,
        search: &'a str,
        replace_all: bool,
    ) -> Result<Match<'a>, EditError> {
        trace!(
            "  Resolving a {}-line search text against {} lines of content (replace_all={}).",
            search.split('\n').count(),
            content.split('\n').count(),
            replace_all
        );

        let mut found_any = false;
        for strategy in Strategy::ALL {
            trace!("    Trying {} strategy...", strategy);
            for candidate in strategy.candidates(content, search) {
                if candidate.is_empty() {
                    trace!("      Skipping empty candidate.");
                    continue;
                }
                let Some(first) = content.find(&*candidate) else {
                    continue;
                };
                found_any = true;

                if replace_all {
                    let occurrences = content.matches(&*candidate).count();
                    debug!(
                        "    Accepted {} candidate for replace-all ({} occurrence(s)).",
                        strategy, occurrences
                    );
                    return Ok(Match {
                        text: candidate,
                        strategy,
                        occurrences,
                    });
                }

                let last = content.rfind(&*candidate).unwrap_or(first);
                if first != last {
                    trace!(
                        "      {} candidate occurs more than once (bytes {} and {}). Skipping.",
                        strategy,
                        first,
                        last
                    );
                    continue;
                }

                debug!(
                    "    Accepted unique {} candidate at byte {} ({} byte(s)).",
                    strategy,
                    first,
                    candidate.len()
                );
                return Ok(Match {
                    text: candidate,
                    strategy,
                    occurrences: 1,
                });
            }
        }

        if found_any {
            warn!("    Search text matched, but never uniquely.");
            Err(EditError::Ambiguous)
        } else {
            debug!("    No strategy located the search text.");
            Err(EditError::NotFound)
        }
    }
}

/// Finds the span of `content` that `search` refers to, using the default
/// cascade.
///
/// This is useful for tools that want to know where an edit would land
/// without performing it.
///
/// # Example
///
/// ```
/// # use fuzzedit::{find_match, EditError, Strategy};
/// let content = "let a = 1;\nlet b = 2;\nlet a = 1;\n";
///
/// let found = find_match(content, "let b =   2;", false).unwrap();
/// assert_eq!(found.text, "let b = 2;");
/// assert_eq!(found.strategy, Strategy::WhitespaceNormalized);
///
/// assert_eq!(find_match(content, "let a = 1;", false), Err(EditError::Ambiguous));
/// assert_eq!(find_match(content, "let c = 3;", false), Err(EditError::NotFound));
/// ```
pub fn find_match<'a>(
    content: &'a str,
    search: &'a str,
    replace_all: bool,
) -> Result<Match<'a>, EditError> {
    CascadeMatcher.find_match(content, search, replace_all)
}

/// Replaces an accepted span in `content`.
///
/// The span is located again by literal search rather than by a stored
/// offset. Without `replace_all` it must occur exactly once, or the content
/// is left alone and an error is returned.
///
/// # Example
///
/// ```
/// # use fuzzedit::{replace_match, EditError};
/// assert_eq!(replace_match("a b a", "b", "c", false), Ok("a c a".to_string()));
/// assert_eq!(replace_match("a b a", "a", "c", true), Ok("c b c".to_string()));
/// assert_eq!(replace_match("a b a", "a", "c", false), Err(EditError::Ambiguous));
/// ```
pub fn replace_match(
    content: &str,
    matched: &str,
    replacement: &str,
    replace_all: bool,
) -> Result<String, EditError> {
    if matched.is_empty() {
        return Err(EditError::NotFound);
    }
    if replace_all {
        return Ok(content.replace(matched, replacement));
    }

    let first = content.find(matched).ok_or(EditError::NotFound)?;
    if content.rfind(matched) != Some(first) {
        return Err(EditError::Ambiguous);
    }

    let mut new_content = String::with_capacity(content.len() - matched.len() + replacement.len());
    new_content.push_str(&content[..first]);
    new_content.push_str(replacement);
    new_content.push_str(&content[first + matched.len()..]);
    Ok(new_content)
}

/// Applies an edit to `content`, replacing the text `old_string` refers to
/// with `new_string`.
///
/// This is the pure, in-memory core of the crate. It performs no I/O.
///
/// An empty `old_string` is the whole-content path used to create files:
/// the new content is `new_string` as given, whatever `content` held.
///
/// # Errors
///
/// - [`EditError::InvalidRequest`] if `old_string == new_string`.
/// - [`EditError::NotFound`] if no strategy located `old_string`.
/// - [`EditError::Ambiguous`] if it was located only in places that occur
///   more than once and `replace_all` is `false`.
///
/// # Example
///
/// ```
/// # use fuzzedit::apply_edit;
/// let content = "foo\nbar foo\nfoo\n";
/// let result = apply_edit(content, "foo", "baz", true).unwrap();
/// assert_eq!(result.new_content, "baz\nbar baz\nbaz\n");
/// assert_eq!(result.replacements, 3);
/// assert_eq!((result.additions, result.deletions), (3, 3));
/// ```
pub fn apply_edit(
    content: &str,
    old_string: &str,
    new_string: &str,
    replace_all: bool,
) -> Result<PatchResult, EditError> {
    let options = EditOptions {
        replace_all,
        ..EditOptions::default()
    };
    apply_edit_with_options(content, old_string, new_string, &options)
}

/// Applies an edit using the given [`EditOptions`].
///
/// # Example
///
/// ```
/// # use fuzzedit::{apply_edit_with_options, EditOptions};
/// let options = EditOptions::builder().diff_label("greeting.txt").build();
/// let result = apply_edit_with_options("Hello, world!\n", "world", "there", &options).unwrap();
/// assert_eq!(result.new_content, "Hello, there!\n");
/// assert!(result.diff.starts_with("--- greeting.txt\n+++ greeting.txt\n"));
/// ```
pub fn apply_edit_with_options(
    content: &str,
    old_string: &str,
    new_string: &str,
    options: &EditOptions,
) -> Result<PatchResult, EditError> {
    apply_edit_with(&CascadeMatcher, content, old_string, new_string, options)
}

/// Applies an edit, locating the target span with a custom [`MatchFinder`].
pub fn apply_edit_with<F: MatchFinder>(
    finder: &F,
    content: &str,
    old_string: &str,
    new_string: &str,
    options: &EditOptions,
) -> Result<PatchResult, EditError> {
    if old_string == new_string {
        return Err(EditError::InvalidRequest);
    }

    let (new_content, strategy, replacements) = if old_string.is_empty() {
        trace!("  Empty old_string: replacing the whole content.");
        (new_string.to_string(), None, 1)
    } else {
        let found = finder.find_match(content, old_string, options.replace_all)?;
        let new_content = replace_match(content, &found.text, new_string, options.replace_all)?;
        (new_content, Some(found.strategy), found.occurrences)
    };

    let diff = render_unified_diff(
        content,
        &new_content,
        options.diff_label.as_deref(),
        options.context_radius,
    );
    let (additions, deletions) = count_line_changes(content, &new_content);
    debug!(
        "  Edit applied: {} replacement(s), +{} -{} line(s).",
        replacements, additions, deletions
    );

    Ok(PatchResult {
        original_content: content.to_string(),
        new_content,
        diff,
        additions,
        deletions,
        strategy,
        replacements,
    })
}
