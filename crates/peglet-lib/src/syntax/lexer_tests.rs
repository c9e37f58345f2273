use super::lexer::{TokenKind, lex, token_text};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect()
}

#[test]
fn lex_rule_definition() {
    assert_eq!(
        kinds("Root <- 'hello'"),
        vec![TokenKind::Ident, TokenKind::LeftArrow, TokenKind::Literal]
    );
}

#[test]
fn left_arrow_wins_over_angle() {
    assert_eq!(
        kinds("A <- < . >"),
        vec![
            TokenKind::Ident,
            TokenKind::LeftArrow,
            TokenKind::AngleOpen,
            TokenKind::Dot,
            TokenKind::AngleClose,
        ]
    );
}

#[test]
fn lex_operators() {
    assert_eq!(
        kinds("/ * + ? & ! ~ ^ ↑ ."),
        vec![
            TokenKind::Slash,
            TokenKind::Star,
            TokenKind::Plus,
            TokenKind::Question,
            TokenKind::Amp,
            TokenKind::Bang,
            TokenKind::Tilde,
            TokenKind::Caret,
            TokenKind::UpArrow,
            TokenKind::Dot,
        ]
    );
}

#[test]
fn lex_dollar_forms() {
    assert_eq!(
        kinds("$tag $( $name<"),
        vec![
            TokenKind::DollarName,
            TokenKind::DollarParen,
            TokenKind::DollarName,
            TokenKind::AngleOpen,
        ]
    );
}

#[test]
fn lex_literals_and_classes_with_suffix() {
    let source = r#"'ab'i "cd" [a-z]i [^0-9]"#;
    let tokens = lex(source);
    let significant: Vec<_> = tokens.iter().filter(|t| !t.kind.is_trivia()).collect();
    assert_eq!(significant.len(), 4);
    assert_eq!(token_text(source, significant[0]), "'ab'i");
    assert_eq!(significant[1].kind, TokenKind::Literal);
    assert_eq!(token_text(source, significant[2]), "[a-z]i");
    assert_eq!(token_text(source, significant[3]), "[^0-9]");
}

#[test]
fn lex_directives_and_comments() {
    assert_eq!(
        kinds("%whitespace <- [ ]* # trailing comment\n%word <- [a-z]+"),
        vec![
            TokenKind::KwWhitespace,
            TokenKind::LeftArrow,
            TokenKind::Class,
            TokenKind::Star,
            TokenKind::KwWord,
            TokenKind::LeftArrow,
            TokenKind::Class,
            TokenKind::Plus,
        ]
    );
}

#[test]
fn garbage_coalesces() {
    let source = "A <- @@@ 'x'";
    let tokens = lex(source);
    let garbage: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Garbage)
        .collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(token_text(source, garbage[0]), "@@@");
}

#[test]
fn escaped_quote_stays_in_literal() {
    let source = r"A <- 'a\'b'";
    let tokens = lex(source);
    let lit = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Literal)
        .expect("literal token");
    assert_eq!(token_text(source, lit), r"'a\'b'");
}
