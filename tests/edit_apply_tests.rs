use fuzzedit::{
    apply_edit, apply_edit_with, apply_edit_with_options, edit_distance, find_match,
    line_similarity, replace_match, trim_diff, EditError, EditOptions, Match, MatchFinder,
    Strategy,
};
use indoc::indoc;
use std::borrow::Cow;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// --- Resolution cascade ---

#[test]
fn test_exact_unique_match() {
    init_logger();
    let content = "alpha\nbeta\ngamma\n";
    let result = apply_edit(content, "beta", "delta", false).unwrap();
    assert_eq!(result.new_content, "alpha\ndelta\ngamma\n");
    assert_eq!(result.original_content, content);
    assert_eq!(result.strategy, Some(Strategy::Exact));
    assert_eq!(result.replacements, 1);
    assert_eq!((result.additions, result.deletions), (1, 1));
}

#[test]
fn test_exact_ambiguity_does_not_stop_the_cascade() {
    init_logger();
    // "start();" occurs twice verbatim, but only one line is indented.
    let content = indoc! {"
        if ready {
            start();
        }
        start();
    "};
    let found = find_match(content, "start();", false).unwrap();
    assert_eq!(found.strategy, Strategy::LineTrimmed);
    assert_eq!(found.text, "    start();");
    assert_eq!(found.occurrences, 1);

    let result = apply_edit(content, "start();", "    stop();", false).unwrap();
    assert_eq!(
        result.new_content,
        indoc! {"
            if ready {
                stop();
            }
            start();
        "}
    );
}

#[test]
fn test_ambiguous_match_is_rejected() {
    init_logger();
    let content = "x = 1\nx = 1\n";
    let err = apply_edit(content, "x = 1", "x = 2", false).unwrap_err();
    assert_eq!(err, EditError::Ambiguous);
    assert_eq!(
        err.to_string(),
        "Found multiple matches for old_string. Provide more surrounding lines in old_string to identify the correct match."
    );
}

#[test]
fn test_missing_text_is_not_found() {
    init_logger();
    let err = apply_edit("hello\n", "world", "there", false).unwrap_err();
    assert_eq!(err, EditError::NotFound);
    assert_eq!(err.to_string(), "old_string not found in content");
}

#[test]
fn test_whitespace_only_old_string_is_not_found() {
    init_logger();
    assert_eq!(
        apply_edit("a b\n", "   ", "x", false),
        Err(EditError::NotFound)
    );
}

#[test]
fn test_identical_strings_are_an_invalid_request() {
    init_logger();
    assert_eq!(
        apply_edit("abc", "b", "b", false),
        Err(EditError::InvalidRequest)
    );
    assert_eq!(apply_edit("abc", "", "", false), Err(EditError::InvalidRequest));
    assert_eq!(
        EditError::InvalidRequest.to_string(),
        "old_string and new_string must be different"
    );
}

#[test]
fn test_inverse_edit_restores_original() {
    init_logger();
    let content = indoc! {"
        fn main() {
            let answer = 41;
            println!(\"{answer}\");
        }
    "};
    let forward = apply_edit(content, "let answer = 41;", "let answer = 42;", false).unwrap();
    let back = apply_edit(
        &forward.new_content,
        "let answer = 42;",
        "let answer = 41;",
        false,
    )
    .unwrap();
    assert_eq!(back.new_content, content);
}

#[test]
fn test_reindented_block_is_found_by_line_trimmed() {
    init_logger();
    let content = indoc! {"
        impl Counter {
            fn bump(&mut self) {
                self.count += 1;
            }
        }
    "};
    let old = "fn bump(&mut self) {\n  self.count += 1;\n}";
    let new = "    fn bump(&mut self) {\n        self.count += 2;\n    }";

    let result = apply_edit(content, old, new, false).unwrap();
    assert_eq!(result.strategy, Some(Strategy::LineTrimmed));
    assert_eq!(
        result.new_content,
        indoc! {"
            impl Counter {
                fn bump(&mut self) {
                    self.count += 2;
                }
            }
        "}
    );
    assert_eq!((result.additions, result.deletions), (1, 1));
}

#[test]
fn test_extra_indentation_without_trailing_newline() {
    init_logger();
    let content = "function a() {\n  return 1\n}\n";
    let old = "function a() {\n    return 1\n}";
    let new = "function a() {\n  return 2\n}";

    let result = apply_edit(content, old, new, false).unwrap();
    assert_eq!(result.strategy, Some(Strategy::LineTrimmed));
    assert_eq!(result.new_content, "function a() {\n  return 2\n}\n");
}

#[test]
fn test_empty_old_string_replaces_whole_content() {
    init_logger();
    let result = apply_edit("whatever was here\n", "", "brand new\n", false).unwrap();
    assert_eq!(result.new_content, "brand new\n");
    assert_eq!(result.strategy, None);

    let from_nothing = apply_edit("", "", "created\n", false).unwrap();
    assert_eq!(from_nothing.new_content, "created\n");
    assert_eq!((from_nothing.additions, from_nothing.deletions), (1, 0));
}

#[test]
fn test_replace_all_on_one_line() {
    init_logger();
    let result = apply_edit("foo foo foo\n", "foo", "bar", true).unwrap();
    assert_eq!(result.new_content, "bar bar bar\n");
    assert_eq!(result.replacements, 3);
    assert_eq!((result.additions, result.deletions), (1, 1));
}

#[test]
fn test_replace_all_on_three_lines() {
    init_logger();
    let result = apply_edit("foo\nfoo\nfoo\n", "foo", "bar", true).unwrap();
    assert_eq!(result.new_content, "bar\nbar\nbar\n");
    assert_eq!(result.replacements, 3);
    assert_eq!((result.additions, result.deletions), (3, 3));
}

#[test]
fn test_replace_all_without_any_match_is_not_found() {
    init_logger();
    assert_eq!(
        apply_edit("foo\n", "qux", "bar", true),
        Err(EditError::NotFound)
    );
}

#[test]
fn test_diff_uses_label_and_context_radius() {
    init_logger();
    let content = "1\n2\n3\n4\n5\n6\n7\n";
    let options = EditOptions::builder()
        .diff_label("numbers.txt")
        .context_radius(1)
        .build();
    let result = apply_edit_with_options(content, "4", "four", &options).unwrap();
    assert_eq!(
        result.diff,
        "--- numbers.txt\n+++ numbers.txt\n@@ -3,3 +3,3 @@\n 3\n-4\n+four\n 5\n"
    );
}

#[test]
fn test_diff_without_label_has_no_file_headers() {
    init_logger();
    let result = apply_edit("a\nb\n", "b", "c", false).unwrap();
    assert!(result.diff.starts_with("@@"));
}

/// Accepts only literal, unique occurrences.
struct LiteralOnly;

impl MatchFinder for LiteralOnly {
    fn find_match<'a>(
        &self,
        content: &'a str,
        search: &'a str,
        _replace_all: bool,
    ) -> Result<Match<'a>, EditError> {
        match content.matches(search).count() {
            0 => Err(EditError::NotFound),
            1 => Ok(Match {
                text: Cow::Borrowed(search),
                strategy: Strategy::Exact,
                occurrences: 1,
            }),
            _ => Err(EditError::Ambiguous),
        }
    }
}

#[test]
fn test_custom_match_finder() {
    init_logger();
    let content = "fn main() {\n    run();\n}\n";
    let options = EditOptions::default();

    let literal = apply_edit_with(&LiteralOnly, content, "  run();", "  go();", &options).unwrap();
    assert_eq!(literal.new_content, "fn main() {\n    go();\n}\n");

    // The cascade accepts this through line trimming; the literal finder does not.
    let err = apply_edit_with(&LiteralOnly, content, "fn main() {\n  run();\n}", "x", &options)
        .unwrap_err();
    assert_eq!(err, EditError::NotFound);
    assert!(apply_edit(content, "fn main() {\n  run();\n}", "x", false).is_ok());
}

#[test]
fn test_replace_match_revalidates_uniqueness() {
    init_logger();
    assert_eq!(replace_match("abc", "", "x", false), Err(EditError::NotFound));
    assert_eq!(replace_match("abc", "z", "x", false), Err(EditError::NotFound));
    assert_eq!(replace_match("aXa", "a", "b", false), Err(EditError::Ambiguous));
    assert_eq!(replace_match("aXa", "X", "Y", false), Ok("aYa".to_string()));
}

// --- Block anchors ---

#[test]
fn test_single_anchor_block_is_accepted_regardless_of_interior() {
    init_logger();
    // A lone first/last anchor pair is trusted even when nothing inside it
    // resembles the search text.
    let content = indoc! {"
        fn compute() {
            let a = 1;
            let b = 2;
            a + b
        }
    "};
    let old = "fn compute() {\n    zzzzzzzz\n    qqqqqqqq\n    wwwwwwww\n}";
    let found = find_match(content, old, false).unwrap();
    assert_eq!(found.strategy, Strategy::BlockAnchor);
    assert_eq!(found.text, content.trim_end());
}

#[test]
fn test_block_anchor_picks_most_similar_window() {
    init_logger();
    let content = indoc! {"
        fn a() {
            alpha();
            beta();
        }
        fn a() {
            gamma();
            delta();
        }
    "};
    let old = "fn a() {\n    gamma();\n    deltaX();\n}";
    let found = find_match(content, old, false).unwrap();
    assert_eq!(found.strategy, Strategy::BlockAnchor);
    assert_eq!(found.text, "fn a() {\n    gamma();\n    delta();\n}");
}

#[test]
fn test_block_anchor_rejects_windows_below_threshold() {
    init_logger();
    let content = indoc! {"
        fn a() {
            alpha();
            beta();
        }
        fn a() {
            gamma();
            delta();
        }
    "};
    let old = "fn a() {\n    qqqqqqqqqq\n    wwwwwwwwww\n}";
    assert_eq!(Strategy::BlockAnchor.candidates(content, old).count(), 0);
    assert_eq!(find_match(content, old, false), Err(EditError::NotFound));
}

#[test]
fn test_block_anchor_ignores_lines_blank_on_both_sides() {
    init_logger();
    // The first window scores 0.5 on its only non-blank interior pair. If the
    // two blank pairs counted towards the average it would fall to 0.17,
    // under the 0.3 needed when several windows compete.
    let content = "begin\nabcd\n\n\nend\nbegin\nzzzz\nqq\nrr\nend\n";
    let old = "begin\nabXY\n\n\nend";

    let found: Vec<_> = Strategy::BlockAnchor.candidates(content, old).collect();
    assert_eq!(found, vec!["begin\nabcd\n\n\nend"]);

    let result = apply_edit(content, old, "begin\nabcd\nmore\n\nend", false).unwrap();
    assert_eq!(result.strategy, Some(Strategy::BlockAnchor));
    assert_eq!(
        result.new_content,
        "begin\nabcd\nmore\n\nend\nbegin\nzzzz\nqq\nrr\nend\n"
    );
}

#[test]
fn test_block_anchor_needs_three_lines() {
    init_logger();
    let content = "open\nclose\n";
    assert_eq!(
        Strategy::BlockAnchor.candidates(content, "open\nclose").count(),
        0
    );
}

// --- Individual strategies ---

#[test]
fn test_strategy_order_and_names() {
    let names: Vec<_> = Strategy::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "exact",
            "line-trimmed",
            "block-anchor",
            "whitespace-normalized",
            "indentation-flexible",
            "escape-normalized",
            "trimmed-boundary",
            "context-aware",
            "multi-occurrence",
        ]
    );
    assert_eq!(Strategy::ContextAware.to_string(), "context-aware");
}

#[test]
fn test_exact_yields_search_text() {
    let found: Vec<_> = Strategy::Exact.candidates("abc", "zzz").collect();
    assert_eq!(found, vec!["zzz"]);
}

#[test]
fn test_whitespace_normalized_whole_line() {
    init_logger();
    let content = "let  x   =  1;\n";
    let found = find_match(content, "let x = 1;", false).unwrap();
    assert_eq!(found.strategy, Strategy::WhitespaceNormalized);
    assert_eq!(found.text, "let  x   =  1;");
}

#[test]
fn test_whitespace_normalized_substring_of_line() {
    init_logger();
    let content = "    if (a  &&  b) {\n";
    let found = find_match(content, "a && b", false).unwrap();
    assert_eq!(found.strategy, Strategy::WhitespaceNormalized);
    assert_eq!(found.text, "a  &&  b");
}

#[test]
fn test_whitespace_normalized_multi_line_block() {
    let content = "one\n  two   three\nfour\n";
    let found: Vec<_> = Strategy::WhitespaceNormalized
        .candidates(content, "two three\nfour")
        .collect();
    assert_eq!(found, vec!["  two   three\nfour"]);
}

#[test]
fn test_indentation_flexible() {
    let content = "        a\n          b\nc\n";
    let found: Vec<_> = Strategy::IndentationFlexible
        .candidates(content, "a\n  b")
        .collect();
    assert_eq!(found, vec!["        a\n          b"]);
}

#[test]
fn test_escape_normalized() {
    init_logger();
    let content = "name\tvalue\n";
    let found = find_match(content, "name\\tvalue", false).unwrap();
    assert_eq!(found.strategy, Strategy::EscapeNormalized);
    assert_eq!(found.text, "name\tvalue");

    let result = apply_edit(content, "name\\tvalue", "name = value", false).unwrap();
    assert_eq!(result.new_content, "name = value\n");
}

#[test]
fn test_escape_normalized_newline() {
    let content = "first\nsecond\n";
    let found: Vec<_> = Strategy::EscapeNormalized
        .candidates(content, "first\\nsecond")
        .collect();
    assert_eq!(found[0], "first\nsecond");
}

#[test]
fn test_escape_normalized_block_with_escapes_in_file() {
    init_logger();
    // The file keeps its escapes, so the unescaped search text never occurs
    // literally; the line only matches once it is unescaped too.
    let content = "let s = \"say \\\"hi\\\"\";\nlet t = 1;\n";
    let search = r#"let s = "say "hi"";"#;

    let found: Vec<_> = Strategy::EscapeNormalized.candidates(content, search).collect();
    assert_eq!(found, vec![r#"let s = "say \"hi\"";"#]);

    let matched = find_match(content, search, false).unwrap();
    assert_eq!(matched.strategy, Strategy::EscapeNormalized);
    assert_eq!(matched.text, r#"let s = "say \"hi\"";"#);
}

#[test]
fn test_trimmed_boundary() {
    let content = "alpha\nbeta\n";
    let found: Vec<_> = Strategy::TrimmedBoundary
        .candidates(content, "  beta  ")
        .collect();
    assert_eq!(found, vec!["beta", "beta"]);

    // Already trimmed text yields nothing.
    assert_eq!(
        Strategy::TrimmedBoundary.candidates(content, "beta").count(),
        0
    );
}

#[test]
fn test_context_aware_half_of_interior_matches() {
    let content = "begin\n    a();\n    b();\nend\n";
    let found: Vec<_> = Strategy::ContextAware
        .candidates(content, "begin\n    a();\n    c();\nend")
        .collect();
    assert_eq!(found, vec!["begin\n    a();\n    b();\nend"]);

    let none = Strategy::ContextAware
        .candidates(content, "begin\n    x();\n    y();\nend")
        .count();
    assert_eq!(none, 0);
}

#[test]
fn test_context_aware_uses_first_closing_line() {
    // The nearest "end" closes the window, so the longer block that would
    // fit is never considered.
    let content = indoc! {"
        start
          one
        end
          two
        end
    "};
    let search = "start\n  one\nmiddle\n  two\nend";
    assert_eq!(Strategy::ContextAware.candidates(content, search).count(), 0);
}

#[test]
fn test_multi_occurrence() {
    let found: Vec<_> = Strategy::MultiOccurrence.candidates("x y x", "x").collect();
    assert_eq!(found, vec!["x", "x"]);
    assert_eq!(Strategy::MultiOccurrence.candidates("x y x", "").count(), 0);
}

// --- Diff clean-up ---

#[test]
fn test_trim_diff_strips_shared_indentation() {
    let diff = "@@ -1,3 +1,3 @@\n-  foo\n+  bar\n    baz\n";
    assert_eq!(trim_diff(diff), "@@ -1,3 +1,3 @@\n-foo\n+bar\n  baz\n");
}

#[test]
fn test_trim_diff_ignores_file_headers_and_blank_lines() {
    let diff = indoc! {"
        --- a.rs
        +++ a.rs
        @@ -1,3 +1,3 @@
             if x {
        -        y();
        +        z();

             }
    "};
    assert_eq!(
        trim_diff(diff),
        indoc! {"
            --- a.rs
            +++ a.rs
            @@ -1,3 +1,3 @@
             if x {
            -    y();
            +    z();

             }
        "}
    );
}

#[test]
fn test_trim_diff_leaves_unindented_diff_alone() {
    let diff = "@@ -1,2 +1,2 @@\n-foo\n+    bar\n";
    assert_eq!(trim_diff(diff), diff);
}

// --- Similarity ---

#[test]
fn test_edit_distance() {
    assert_eq!(edit_distance("kitten", "sitting"), 3);
    assert_eq!(edit_distance("flaw", "lawn"), 2);
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("héllo", "hello"), 1);
}

#[test]
fn test_line_similarity_bounds() {
    assert_eq!(line_similarity("abc", "xyz"), 0.0);
    assert_eq!(line_similarity("", "abc"), 0.0);
    assert_eq!(line_similarity("same", "same"), 1.0);
}
