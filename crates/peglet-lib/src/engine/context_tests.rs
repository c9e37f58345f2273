use peglet_core::{CharClass, SourceLocation};

use super::context::{Context, ParserConfig};

fn ctx(input: &str) -> Context<'_> {
    Context::new(input, ParserConfig::default())
}

#[test]
fn literal_matching_is_byte_exact() {
    let cx = ctx("hello");
    assert_eq!(cx.match_literal("hell", false), Some(4));
    assert_eq!(cx.match_literal("help", false), None);
    assert_eq!(cx.match_literal("", false), Some(0));
}

#[test]
fn literal_matching_folds_ascii_case() {
    let cx = ctx("HeLLo");
    assert_eq!(cx.match_literal("hello", true), Some(5));
    assert_eq!(cx.match_literal("hello", false), None);
}

#[test]
fn class_and_any_match_one_char() {
    let cx = ctx("x9");
    assert_eq!(cx.match_class(&CharClass::new("a-z", false, false)), Some(1));
    assert_eq!(cx.match_class(&CharClass::new("0-9", false, false)), None);
    assert_eq!(cx.match_any(), Some(1));
    assert_eq!(ctx("").match_any(), None);
}

#[test]
fn dictionary_prefers_the_longest_word() {
    let words: Vec<String> = ["in", "integer", "int"]
        .iter()
        .map(|w| w.to_string())
        .collect();
    let cx = ctx("integers");
    assert_eq!(cx.match_dictionary(&words, false), Some(7));

    let cx = ctx("into");
    assert_eq!(cx.match_dictionary(&words, false), Some(3));

    let cx = ctx("out");
    assert_eq!(cx.match_dictionary(&words, false), None);
}

#[test]
fn advance_moves_line_and_column() {
    let mut cx = ctx("a\nbc");
    cx.advance(2);
    assert_eq!((cx.cursor.line, cx.cursor.column, cx.cursor.offset), (2, 1, 2));
    cx.advance(2);
    assert_eq!((cx.cursor.line, cx.cursor.column, cx.cursor.offset), (2, 3, 4));
    assert!(cx.at_end());
}

#[test]
fn furthest_failure_replaces_and_merges() {
    let mut cx = ctx("abcdef");
    cx.note_failure(SourceLocation::new(1, 3, 2), &["'x'".to_string()]);
    assert_eq!(cx.furthest_failure().expected, ["'x'"]);

    // equal offset merges without duplicates
    cx.note_failure(
        SourceLocation::new(1, 3, 2),
        &["'y'".to_string(), "'x'".to_string()],
    );
    assert_eq!(cx.furthest_failure().expected, ["'x'", "'y'"]);

    // a strictly further failure replaces the set
    cx.note_failure(SourceLocation::new(1, 5, 4), &["'z'".to_string()]);
    assert_eq!(cx.furthest_failure().location.offset, 4);
    assert_eq!(cx.furthest_failure().expected, ["'z'"]);

    // an earlier failure is not recorded
    cx.note_failure(SourceLocation::new(1, 1, 0), &["'a'".to_string()]);
    assert_eq!(cx.furthest_failure().location.offset, 4);
}

#[test]
fn whitespace_guard_suppresses_failure_tracking() {
    let mut cx = ctx("abc");
    cx.in_whitespace = true;
    cx.note_failure(SourceLocation::new(1, 2, 1), &["' '".to_string()]);
    assert!(cx.furthest_failure().expected.is_empty());
}

#[test]
fn capture_scopes_save_and_restore() {
    let mut cx = ctx("");
    cx.define_capture("outer", "a".to_string());
    cx.push_capture_scope();
    cx.define_capture("inner", "b".to_string());
    cx.define_capture("outer", "shadowed".to_string());
    assert_eq!(cx.capture("inner"), Some("b"));
    assert_eq!(cx.capture("outer"), Some("shadowed"));
    cx.pop_capture_scope();
    assert_eq!(cx.capture("inner"), None);
    assert_eq!(cx.capture("outer"), Some("a"));
}

#[test]
fn save_restore_round_trips_cursor_and_trivia() {
    let mut cx = ctx("ab cd");
    let saved = cx.save();
    cx.advance(3);
    cx.pending_trivia.push(peglet_core::Trivia::classify(
        peglet_core::SourceSpan::empty(cx.cursor),
        " ".to_string(),
    ));
    cx.restore(&saved);
    assert_eq!(cx.cursor.offset, 0);
    assert!(cx.pending_trivia.is_empty());
}

#[test]
fn packrat_can_be_disabled() {
    let config = ParserConfig {
        packrat: false,
        ..ParserConfig::default()
    };
    let mut cx = Context::new("abc", config);
    cx.cache_put(
        0,
        0,
        super::context::CacheEntry::Failure(super::outcome::Failure::expecting(
            SourceLocation::START,
            "'x'",
        )),
    );
    assert!(cx.cache_get(0, 0).is_none());
}
