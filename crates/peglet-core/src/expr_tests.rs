use crate::{CharClass, Expression};

#[test]
fn char_class_ranges_and_singles() {
    let class = CharClass::new("a-z0", false, false);
    assert!(class.matches('a'));
    assert!(class.matches('m'));
    assert!(class.matches('z'));
    assert!(class.matches('0'));
    assert!(!class.matches('A'));
    assert!(!class.matches('1'));
}

#[test]
fn char_class_negation() {
    let class = CharClass::new("\\n", true, false);
    assert!(class.matches('x'));
    assert!(!class.matches('\n'));
}

#[test]
fn char_class_escapes() {
    let class = CharClass::new("\\t\\]\\-\\x41\\u0042", false, false);
    assert!(class.matches('\t'));
    assert!(class.matches(']'));
    assert!(class.matches('-'));
    assert!(class.matches('A'));
    assert!(class.matches('B'));
    assert!(!class.matches('x'));
}

#[test]
fn char_class_escaped_dash_is_not_a_range() {
    // `a\-z` is the three characters a, -, z.
    let class = CharClass::new("a\\-z", false, false);
    assert!(class.matches('a'));
    assert!(class.matches('-'));
    assert!(class.matches('z'));
    assert!(!class.matches('m'));
}

#[test]
fn char_class_case_insensitive() {
    let class = CharClass::new("a-z", false, true);
    assert!(class.matches('Q'));
    assert!(class.matches('q'));
    assert!(!class.matches('0'));
}

#[test]
fn display_renders_peg_notation() {
    let expr = Expression::choice(vec![
        Expression::sequence(vec![
            Expression::literal("a"),
            Expression::Cut,
            Expression::literal("b"),
        ]),
        Expression::reference("Other"),
    ]);
    assert_eq!(expr.to_string(), "'a' ^ 'b' / Other");

    let expr = Expression::ZeroOrMore {
        expr: Box::new(Expression::Group {
            expr: Box::new(Expression::sequence(vec![
                Expression::literal(","),
                Expression::reference("Item"),
            ])),
        }),
    };
    assert_eq!(expr.to_string(), "(',' Item)*");
}

#[test]
fn display_escapes_literals() {
    let expr = Expression::literal("a'\n");
    assert_eq!(expr.to_string(), "'a\\'\\n'");
}

#[test]
fn expected_text_for_terminals() {
    assert_eq!(Expression::literal("if").expected_text(), "'if'");
    assert_eq!(Expression::Any.expected_text(), "any character");
    let dict = Expression::Dictionary {
        words: vec!["let".into(), "mut".into()],
        case_insensitive: false,
    };
    assert_eq!(dict.expected_text(), "one of 'let', 'mut'");
}

#[test]
fn predicate_detection_looks_through_groups() {
    let not = Expression::Not {
        expr: Box::new(Expression::Any),
    };
    assert!(not.is_predicate());
    let grouped = Expression::Group {
        expr: Box::new(not),
    };
    assert!(grouped.is_predicate());
    assert!(!Expression::Any.is_predicate());
}
