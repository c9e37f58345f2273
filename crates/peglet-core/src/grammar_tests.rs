use crate::{Expression, Grammar, Rule, ValidationError};

fn two_rule_grammar() -> Grammar {
    let mut grammar = Grammar::new();
    grammar.add_rule(Rule::new("A", Expression::reference("B")));
    grammar.add_rule(Rule::new("B", Expression::literal("b")));
    grammar
}

#[test]
fn first_rule_is_default_start() {
    let grammar = two_rule_grammar();
    assert_eq!(grammar.effective_start_rule(), Some("A"));

    let mut grammar = two_rule_grammar();
    grammar.start_rule = Some("B".to_string());
    assert_eq!(grammar.effective_start_rule(), Some("B"));
}

#[test]
fn rule_ids_are_dense_and_ordered() {
    let grammar = two_rule_grammar();
    assert_eq!(grammar.rule_id("A"), Some(0));
    assert_eq!(grammar.rule_id("B"), Some(1));
    assert_eq!(grammar.rule_id("C"), None);
}

#[test]
fn validate_accepts_well_formed_grammar() {
    assert_eq!(two_rule_grammar().validate(), Ok(()));
}

#[test]
fn validate_rejects_undefined_rule_with_location() {
    let mut grammar = Grammar::new();
    grammar.add_rule(Rule::new(
        "A",
        Expression::Reference {
            rule: "Missing".to_string(),
            offset: 5,
        },
    ));
    assert_eq!(
        grammar.validate(),
        Err(ValidationError::UndefinedRule {
            name: "Missing".to_string(),
            offset: 5,
        })
    );
}

#[test]
fn validate_rejects_undefined_capture() {
    let mut grammar = Grammar::new();
    grammar.add_rule(Rule::new(
        "A",
        Expression::BackReference {
            name: "tag".to_string(),
            offset: 3,
        },
    ));
    let err = grammar.validate().unwrap_err();
    assert_eq!(err.offset(), Some(3));
    assert!(err.to_string().contains("tag"));
}

#[test]
fn validate_accepts_backreference_to_capture() {
    let mut grammar = Grammar::new();
    grammar.add_rule(Rule::new(
        "Match",
        Expression::sequence(vec![
            Expression::Capture {
                name: "tag".to_string(),
                expr: Box::new(Expression::literal("x")),
            },
            Expression::BackReference {
                name: "tag".to_string(),
                offset: 0,
            },
        ]),
    ));
    assert_eq!(grammar.validate(), Ok(()));
}

#[test]
fn validate_rejects_empty_grammar_and_bad_start() {
    assert_eq!(Grammar::new().validate(), Err(ValidationError::EmptyGrammar));

    let mut grammar = two_rule_grammar();
    grammar.start_rule = Some("Zed".to_string());
    assert!(matches!(
        grammar.validate(),
        Err(ValidationError::UnknownStartRule { .. })
    ));
}

#[test]
fn whitespace_inner_unwraps_one_level_of_repetition() {
    let mut grammar = two_rule_grammar();
    grammar.whitespace = Some(Expression::ZeroOrMore {
        expr: Box::new(Expression::literal(" ")),
    });
    assert_eq!(
        grammar.whitespace_inner(),
        Some(&Expression::literal(" "))
    );

    grammar.whitespace = Some(Expression::literal(" "));
    assert_eq!(
        grammar.whitespace_inner(),
        Some(&Expression::literal(" "))
    );
}
