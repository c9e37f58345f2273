use indoc::indoc;
use peglet_core::{CstKind, CstNode};

use crate::{Peg, Recovery};

fn peg(grammar: &str) -> Peg {
    Peg::new(grammar).expect("valid grammar")
}

/// Preorder walk asserting span containment and offset monotonicity.
fn assert_spans_well_formed(node: &CstNode) {
    let mut last_start = 0usize;
    fn walk(node: &CstNode, last_start: &mut usize) {
        assert!(
            node.span.start.offset >= *last_start,
            "preorder offsets must be non-decreasing"
        );
        *last_start = node.span.start.offset;
        for child in node.children() {
            assert!(node.span.start.offset <= child.span.start.offset);
            assert!(node.span.end.offset >= child.span.end.offset);
            walk(child, last_start);
        }
    }
    walk(node, &mut last_start);
}

#[test]
fn literal_produces_single_terminal() {
    let cst = peg("Root <- 'hello'").parse_cst("hello").unwrap();
    assert_eq!(cst.rule, "Root");
    assert_eq!(cst.span.to_string(), "1:1-1:6");
    match &cst.kind {
        CstKind::Terminal { text } => assert_eq!(text, "hello"),
        other => panic!("expected terminal, got {other:?}"),
    }
}

#[test]
fn literal_mismatch_reports_expected() {
    let err = peg("Root <- 'hello'").parse_cst("help").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'hello'"), "got: {message}");
}

#[test]
fn sequence_builds_nonterminal() {
    let cst = peg("Root <- 'a' 'b' 'c'").parse_cst("abc").unwrap();
    assert_eq!(cst.children().len(), 3);
    assert_eq!(cst.source_text(), "abc");
    assert_spans_well_formed(&cst);
}

#[test]
fn rule_wrapper_preserves_leaf_kind() {
    let cst = peg("Root <- Num  Num <- <[0-9]+>").parse_cst("42").unwrap();
    // single-token rules stay leaf-shaped; the wrapper only renames
    assert_eq!(cst.rule, "Root");
    assert!(matches!(cst.kind, CstKind::Token { ref text } if text == "42"));
}

#[test]
fn referenced_rules_keep_their_names_as_children() {
    let cst = peg("Sum <- Num '+' Num  Num <- <[0-9]+>")
        .parse_cst("1+2")
        .unwrap();
    let rules: Vec<&str> = cst.children().iter().map(|c| c.rule.as_str()).collect();
    assert_eq!(rules, ["Num", "Sum", "Num"]);
}

#[test]
fn whitespace_becomes_leading_trivia() {
    let grammar = indoc! {r"
        List <- Item (',' Item)*
        Item <- <[a-z]+>
        %whitespace <- [ ]*
    "};
    let cst = peg(grammar).parse_cst("ab , cd").unwrap();
    assert_eq!(cst.source_text(), "ab , cd");
    assert_spans_well_formed(&cst);
}

#[test]
fn comment_whitespace_rule_classifies_trivia() {
    let grammar = indoc! {r"
        Root <- <[0-9]+>
        %whitespace <- ([ \t]+ / '//' [^\n]* '\n')+
    "};
    let cst = peg(grammar).parse_cst("  // c\n  42").unwrap();
    let kinds: Vec<(&'static str, &str)> = cst
        .leading_trivia
        .iter()
        .map(|t| (t.kind_name(), t.text()))
        .collect();
    assert_eq!(
        kinds,
        [
            ("Whitespace", "  "),
            ("LineComment", "// c\n"),
            ("Whitespace", "  "),
        ]
    );
    assert_eq!(cst.source_text(), "  // c\n  42");
}

#[test]
fn trailing_trivia_attaches_to_root() {
    let cst = peg("Root <- 'a'  %whitespace <- [ ]*")
        .parse_cst("a  ")
        .unwrap();
    assert_eq!(cst.trailing_trivia.len(), 1);
    assert_eq!(cst.trailing_trivia[0].text(), "  ");
    assert_eq!(cst.source_text(), "a  ");
}

#[test]
fn capture_trivia_can_be_disabled() {
    let peg = peg("Root <- 'a' 'b'  %whitespace <- [ ]*").with_capture_trivia(false);
    let cst = peg.parse_cst("a b").unwrap();
    assert!(cst.children().iter().all(|c| c.leading_trivia.is_empty()));
}

#[test]
fn token_boundary_suppresses_whitespace_inside() {
    let peg = peg("Root <- <'a' 'b'>  %whitespace <- [ ]*");
    assert!(peg.parse_cst("ab").is_ok());
    assert!(peg.parse_cst("a b").is_err());
}

#[test]
fn token_boundary_emits_raw_text() {
    let cst = peg("Root <- <[0-9]+ '.' [0-9]+>").parse_cst("3.14").unwrap();
    assert!(matches!(cst.kind, CstKind::Token { ref text } if text == "3.14"));
}

#[test]
fn optional_failure_yields_empty_nonterminal() {
    let cst = peg("Root <- 'a' 'b'?").parse_cst("a").unwrap();
    assert_eq!(cst.children().len(), 2);
    let empty = &cst.children()[1];
    assert!(empty.span.is_empty());
    assert!(matches!(empty.kind, CstKind::NonTerminal { ref children } if children.is_empty()));
}

#[test]
fn choice_takes_first_match() {
    let cst = peg("Root <- 'ab' / 'a'").parse_cst("ab").unwrap();
    assert!(matches!(cst.kind, CstKind::Terminal { ref text } if text == "ab"));
}

#[test]
fn dictionary_is_longest_match() {
    // first-match would take 'in' and then fail at end of input
    let cst = peg("Root <- 'in' | 'int' | 'integer'").parse_cst("integer").unwrap();
    assert!(matches!(cst.kind, CstKind::Terminal { ref text } if text == "integer"));
}

#[test]
fn dictionary_failure_lists_all_words() {
    let err = peg("Root <- 'let' | 'mut'").parse_cst("xyz").unwrap_err();
    assert!(err.expected.contains(&"'let'".to_string()));
    assert!(err.expected.contains(&"'mut'".to_string()));
}

#[test]
fn case_insensitive_literal_preserves_input_text() {
    let cst = peg("Root <- 'hello'i").parse_cst("HeLLo").unwrap();
    assert!(matches!(cst.kind, CstKind::Terminal { ref text } if text == "HeLLo"));
}

#[test]
fn repetition_counts_are_enforced() {
    let peg = peg("Root <- 'a'{2,3}");
    assert!(peg.parse_cst("a").is_err());
    assert!(peg.parse_cst("aa").is_ok());
    assert!(peg.parse_cst("aaa").is_ok());
    // the fourth 'a' is not consumed, so end-of-input fails the parse
    assert!(peg.parse_cst("aaaa").is_err());
}

#[test]
fn zero_width_repetition_terminates() {
    let cst = peg("Root <- ''* 'x'").parse_cst("x").unwrap();
    assert_eq!(cst.source_text(), "x");
}

#[test]
fn predicates_consume_nothing() {
    let peg = peg("Root <- &'a' !'b' <[a-z]+>");
    let cst = peg.parse_cst("abc").unwrap();
    assert!(matches!(cst.kind, CstKind::Token { ref text } if text == "abc"));
    assert!(peg.parse_cst("bcd").is_err());
}

#[test]
fn ignore_still_appears_in_cst() {
    // `~` suppresses semantic values, not tree content; the CST is lossless
    let cst = peg("Root <- ~'a' 'b'").parse_cst("ab").unwrap();
    assert_eq!(cst.source_text(), "ab");
    assert_eq!(cst.children().len(), 2);
}

// --- cut semantics ----------------------------------------------------------

#[test]
fn cut_prevents_fallthrough_to_later_alternative() {
    // without the cut this would succeed via the bare 'a'
    let err = peg("Root <- ('a' ^ 'b') / 'a'").parse_cst("a").unwrap_err();
    assert!(err.expected.contains(&"'b'".to_string()));
}

#[test]
fn cut_failure_reports_committed_expectation() {
    let err = peg("Root <- ('a' ^ 'b') / 'c'").parse_cst("ax").unwrap_err();
    assert_eq!(err.location.offset, 1);
    assert!(err.expected.contains(&"'b'".to_string()));
    assert!(!err.expected.contains(&"'c'".to_string()));
}

#[test]
fn cut_does_not_commit_before_it_fires() {
    // first alternative fails before the cut, so the second is tried
    let cst = peg("Root <- ('a' ^ 'b') / 'c'").parse_cst("c").unwrap();
    assert!(matches!(cst.kind, CstKind::Terminal { ref text } if text == "c"));
}

#[test]
fn cut_inside_predicate_is_firewalled() {
    // the cut fires inside `!(…)`, which must not stop the outer choice
    let cst = peg("Root <- (!('a' ^ 'b') 'a' 'z') / 'a' 'x'")
        .parse_cst("ax")
        .unwrap();
    assert_eq!(cst.source_text(), "ax");
}

#[test]
fn cut_allows_local_repetition_backtracking() {
    // commitment must not turn the repetition's normal loop exit into a
    // failure
    let cst = peg("Root <- 'x' ^ 'a'* 'y'").parse_cst("xaay").unwrap();
    assert_eq!(cst.source_text(), "xaay");
}

#[test]
fn cut_propagates_out_of_nested_optional() {
    // the cut fires inside the optional's body; its failure is not
    // recovered by `?`
    let err = peg("Root <- 'a' ('-' ^ 'b')? 'c' / 'a' '-' 'z'")
        .parse_cst("a-z")
        .unwrap_err();
    assert!(err.expected.contains(&"'b'".to_string()));
}

#[test]
fn cut_is_contained_by_rule_boundary() {
    // the cut fires (and fails) inside R; the caller's choice still tries
    // its next alternative
    let cst = peg("Root <- R / 'a'  R <- 'a' ^ 'b'").parse_cst("a").unwrap();
    assert_eq!(cst.source_text(), "a");
}

// --- captures ---------------------------------------------------------------

#[test]
fn backreference_matches_captured_text() {
    let peg = peg("Match <- $tag<[a-z]+> '=' $tag");
    assert!(peg.parse_cst("foo=foo").is_ok());
    assert!(peg.parse_cst("foo=bar").is_err());
}

#[test]
fn capture_scope_isolates_inner_captures() {
    // $t is defined only inside the scope, so the trailing $t cannot see it
    let peg = peg("Root <- $( $t<[a-z]> ) $t");
    assert!(peg.parse_cst("ab").is_err());
}

#[test]
fn capture_scope_preserves_outer_captures() {
    let peg = peg("Root <- $a<[a-z]> $( $b<[a-z]> ) $a");
    assert!(peg.parse_cst("xyx").is_ok());
    assert!(peg.parse_cst("xyz").is_err());
}

// --- failure tracking -------------------------------------------------------

#[test]
fn furthest_failure_wins_over_last_alternative() {
    let err = peg("Root <- 'ab' 'cd' / 'abc'").parse_cst("abx").unwrap_err();
    assert_eq!(err.location.offset, 2);
    assert!(err.expected.contains(&"'cd'".to_string()));
}

#[test]
fn equal_offset_failures_merge_expected_sets() {
    let err = peg("Root <- 'a' / 'b'").parse_cst("c").unwrap_err();
    assert!(err.expected.contains(&"'a'".to_string()));
    assert!(err.expected.contains(&"'b'".to_string()));
}

#[test]
fn recovery_none_reports_raw_failure() {
    let peg = peg("Root <- 'ab' 'cd' / 'abc'").with_recovery(Recovery::None);
    let err = peg.parse_cst("abx").unwrap_err();
    // the raw failure is the last alternative's, at the choice start
    assert_eq!(err.location.offset, 0);
}

#[test]
fn custom_error_message_is_substituted() {
    let err = peg(r#"Stmt <- 'x' ';' { error_message "missing semicolon" }"#)
        .parse_cst("x")
        .unwrap_err();
    assert!(err.expected.contains(&"missing semicolon".to_string()));
}

#[test]
fn unconsumed_input_is_an_error() {
    let err = peg("Root <- 'a'").parse_cst("ab").unwrap_err();
    assert_eq!(err.location.offset, 1);
    assert!(err.expected.contains(&"end of input".to_string()));
}

// --- packrat ----------------------------------------------------------------

#[test]
fn packrat_and_no_packrat_agree() {
    let grammar = indoc! {r"
        Root <- A 'x' / A 'y'
        A    <- <[a-z]>
        %whitespace <- [ ]*
    "};
    let with = peg(grammar).parse_cst("a y").unwrap();
    let without = Peg::new(grammar)
        .unwrap()
        .with_packrat(false)
        .parse_cst("a y")
        .unwrap();
    assert_eq!(with, without);
}

#[test]
fn indirect_recursion_is_safe_with_memoization() {
    let grammar = indoc! {r"
        Expr  <- Term ('+' Term)*
        Term  <- Atom ('*' Atom)*
        Atom  <- <[0-9]+> / '(' Expr ')'
    "};
    let cst = peg(grammar).parse_cst("(1+2)*3").unwrap();
    assert_eq!(cst.source_text(), "(1+2)*3");
    assert_spans_well_formed(&cst);
}

// --- configuration ----------------------------------------------------------

#[test]
fn start_rule_override() {
    let peg = peg("A <- 'a'  B <- 'b'");
    assert!(peg.parse_cst("a").is_ok());
    assert!(peg.parse_cst_from("b", Some("B")).is_ok());
    assert!(peg.parse_cst_from("b", Some("Missing")).is_err());
}

#[test]
fn word_directive_is_accepted_and_inert() {
    let peg = peg("Root <- 'ab'  %word <- [a-z]+");
    assert!(peg.parse_cst("ab").is_ok());
}

#[test]
fn ast_projection_drops_trivia_and_merges_tokens() {
    let ast = peg("Root <- Num Num  Num <- <[0-9]+>  %whitespace <- [ ]*")
        .parse_ast("1 2")
        .unwrap();
    assert_eq!(ast.children().len(), 2);
    assert_eq!(ast.children()[0].text(), Some("1"));
    assert_eq!(ast.children()[1].text(), Some("2"));
}
