//! Character-level edit distance used to rank anchor-bounded blocks.

/// Computes the Levenshtein distance between two strings.
///
/// The distance is the minimum number of single-character insertions,
/// deletions and substitutions needed to turn `a` into `b`. Characters are
/// Unicode scalar values, not bytes.
///
/// This builds the full `(len(a) + 1) x (len(b) + 1)` table, so it is only
/// meant for line-sized inputs.
///
/// # Example
///
/// ```
/// # use fuzzedit::edit_distance;
/// assert_eq!(edit_distance("kitten", "sitting"), 3);
/// assert_eq!(edit_distance("", "abc"), 3);
/// assert_eq!(edit_distance("same", "same"), 0);
/// ```
pub fn edit_distance(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return a.chars().count().max(b.chars().count());
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + cost);
        }
    }

    table[a.len()][b.len()]
}

/// Scores how alike two lines are, from `0.0` (nothing shared) to `1.0`.
///
/// Defined as `1 - edit_distance(a, b) / max(len(a), len(b))`. Two empty
/// strings are identical and score `1.0`.
///
/// # Example
///
/// ```
/// # use fuzzedit::line_similarity;
/// assert_eq!(line_similarity("let x = 1;", "let x = 1;"), 1.0);
/// assert_eq!(line_similarity("abcd", "abcf"), 0.75);
/// assert_eq!(line_similarity("", ""), 1.0);
/// ```
pub fn line_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}
