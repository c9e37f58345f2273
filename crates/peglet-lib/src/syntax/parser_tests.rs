use indoc::indoc;
use peglet_core::Expression;

use super::parser::parse_grammar;

#[test]
fn parse_single_rule() {
    let parse = parse_grammar("Root <- 'hello'");
    assert!(parse.is_valid());
    let rule = parse.grammar.rule("Root").expect("rule exists");
    assert_eq!(rule.expression.to_string(), "'hello'");
}

#[test]
fn parse_precedence() {
    let parse = parse_grammar("A <- 'a' 'b' / 'c'* !'d'");
    assert!(parse.is_valid());
    let expr = &parse.grammar.rule("A").unwrap().expression;
    assert_eq!(expr.to_string(), "'a' 'b' / 'c'* !'d'");
    assert!(matches!(expr, Expression::Choice { alternatives } if alternatives.len() == 2));
}

#[test]
fn parse_quantifiers_and_counted_repetition() {
    let parse = parse_grammar("A <- 'a'{2,5} 'b'{3} 'c'{1,}");
    assert!(parse.is_valid());
    let Expression::Sequence { elements } = &parse.grammar.rule("A").unwrap().expression else {
        panic!("expected sequence");
    };
    assert!(matches!(
        &elements[0],
        Expression::Repetition { min: 2, max: Some(5), .. }
    ));
    assert!(matches!(
        &elements[1],
        Expression::Repetition { min: 3, max: Some(3), .. }
    ));
    assert!(matches!(
        &elements[2],
        Expression::Repetition { min: 1, max: None, .. }
    ));
}

#[test]
fn parse_token_boundary_and_groups() {
    let parse = parse_grammar("Num <- < [0-9]+ > ('a' / 'b')?");
    assert!(parse.is_valid());
    let expr = &parse.grammar.rule("Num").unwrap().expression;
    assert_eq!(expr.to_string(), "< [0-9]+ > ('a' / 'b')?");
}

#[test]
fn parse_captures_scope_and_backreference() {
    let parse = parse_grammar("Match <- $tag<[a-z]+> '=' $tag  Scoped <- $( $x<.> ) $x");
    assert!(parse.is_valid());
    let Expression::Sequence { elements } = &parse.grammar.rule("Match").unwrap().expression
    else {
        panic!("expected sequence");
    };
    assert!(matches!(&elements[0], Expression::Capture { name, .. } if name == "tag"));
    assert!(matches!(&elements[2], Expression::BackReference { name, .. } if name == "tag"));

    let Expression::Sequence { elements } = &parse.grammar.rule("Scoped").unwrap().expression
    else {
        panic!("expected sequence");
    };
    assert!(matches!(&elements[0], Expression::CaptureScope { .. }));
}

#[test]
fn parse_dictionary() {
    let parse = parse_grammar("Kw <- 'let' | 'mut' | 'const'");
    assert!(parse.is_valid());
    let expr = &parse.grammar.rule("Kw").unwrap().expression;
    let Expression::Dictionary { words, .. } = expr else {
        panic!("expected dictionary, got {expr}");
    };
    assert_eq!(words, &["let", "mut", "const"]);
}

#[test]
fn parse_cut_both_spellings() {
    let parse = parse_grammar("A <- 'a' ^ 'b'  B <- 'a' ↑ 'b'");
    assert!(parse.is_valid());
    for name in ["A", "B"] {
        let Expression::Sequence { elements } = &parse.grammar.rule(name).unwrap().expression
        else {
            panic!("expected sequence");
        };
        assert!(matches!(elements[1], Expression::Cut));
    }
}

#[test]
fn parse_directives() {
    let parse = parse_grammar(indoc! {r"
        Root <- Word+
        Word <- <[a-z]+>
        %whitespace <- [ \t]*
        %word <- [a-z]+
    "});
    assert!(parse.is_valid());
    assert!(parse.grammar.whitespace.is_some());
    assert!(parse.grammar.word.is_some());
}

#[test]
fn parse_action_trailer_is_opaque() {
    let parse = parse_grammar("Sum <- Number '+' Number { $1 + $2 }  Number <- <[0-9]+> { int($0) }");
    assert!(parse.is_valid());
    assert_eq!(
        parse.grammar.rule("Sum").unwrap().action_source.as_deref(),
        Some("$1 + $2")
    );
    assert_eq!(
        parse.grammar.rule("Number").unwrap().action_source.as_deref(),
        Some("int($0)")
    );
}

#[test]
fn parse_error_message_trailer() {
    let parse = parse_grammar(r#"Stmt <- 'x' ';' { error_message "missing semicolon" }"#);
    assert!(parse.is_valid());
    assert_eq!(
        parse.grammar.rule("Stmt").unwrap().error_message.as_deref(),
        Some("missing semicolon")
    );
}

#[test]
fn parse_case_insensitive_suffixes() {
    let parse = parse_grammar("A <- 'if'i [a-z]i");
    assert!(parse.is_valid());
    let Expression::Sequence { elements } = &parse.grammar.rule("A").unwrap().expression else {
        panic!("expected sequence");
    };
    assert!(matches!(
        &elements[0],
        Expression::Literal { case_insensitive: true, .. }
    ));
    assert!(matches!(
        &elements[1],
        Expression::CharClass(class) if class.case_insensitive
    ));
}

#[test]
fn literal_escapes_are_decoded() {
    let parse = parse_grammar(r"A <- 'a\n\t\x41B\\'");
    assert!(parse.is_valid());
    let Expression::Literal { text, .. } = &parse.grammar.rule("A").unwrap().expression else {
        panic!("expected literal");
    };
    assert_eq!(text, "a\n\tAB\\");
}

#[test]
fn comments_are_skipped() {
    let parse = parse_grammar(indoc! {"
        # leading comment
        A <- 'a' # trailing
        B <- 'b'
    "});
    assert!(parse.is_valid());
    assert_eq!(parse.grammar.len(), 2);
}

#[test]
fn malformed_rule_reports_and_recovers() {
    let parse = parse_grammar(indoc! {"
        A <-
        B <- 'b'
    "});
    assert!(parse.diagnostics.has_errors());
    // the parser synchronized and still picked up B
    assert!(parse.grammar.rule("B").is_some());
}

#[test]
fn rule_order_is_preserved() {
    let parse = parse_grammar("First <- 'a'  Second <- 'b'  Third <- 'c'");
    let names: Vec<_> = parse.grammar.rules().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["First", "Second", "Third"]);
    assert_eq!(parse.grammar.effective_start_rule(), Some("First"));
}
