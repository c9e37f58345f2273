//! Recursive-descent parser for grammar text.
//!
//! Precedence, loosest first: choice (`/`), sequence, prefix (`&` `!` `~`),
//! suffix (`*` `+` `?` `{n,m}`), primary. Dictionaries (`'a' | 'b'`) are
//! recognized when a plain literal is followed by `|`. Rule trailers
//! (`{ action }` / `{ error_message "…" }`) are brace-matched over the
//! token stream and sliced from the raw source, so action code is never
//! interpreted here.
//!
//! Errors are collected as diagnostics; the parser synchronizes to the
//! next plausible rule start and keeps going, so one bad rule does not
//! hide the rest.

use peglet_core::{CharClass, Expression, Grammar, Rule};

use crate::diagnostics::Diagnostics;

use super::lexer::{Token, TokenKind, lex, token_text};

/// Result of parsing grammar text: the (possibly partial) grammar and any
/// diagnostics.
#[derive(Debug)]
pub struct GrammarParse {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
}

impl GrammarParse {
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Parses grammar text into the IR.
pub fn parse_grammar(source: &str) -> GrammarParse {
    let tokens: Vec<Token> = lex(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    Parser {
        source,
        tokens,
        pos: 0,
        diagnostics: Diagnostics::new(),
    }
    .parse()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

enum Trailer {
    Action(String),
    ErrorMessage(String),
}

impl<'s> Parser<'s> {
    fn parse(mut self) -> GrammarParse {
        let mut grammar = Grammar::new();
        while !self.eof() {
            match self.current() {
                Some(TokenKind::KwWhitespace) => {
                    self.bump();
                    self.expect(TokenKind::LeftArrow, "`<-` after %whitespace");
                    grammar.whitespace = Some(self.parse_expression());
                }
                Some(TokenKind::KwWord) => {
                    self.bump();
                    self.expect(TokenKind::LeftArrow, "`<-` after %word");
                    grammar.word = Some(self.parse_expression());
                }
                Some(TokenKind::Ident) if self.nth(1) == Some(TokenKind::LeftArrow) => {
                    self.parse_rule(&mut grammar);
                }
                _ => {
                    self.error_here("expected a rule definition (`Name <- Expression`)");
                    self.synchronize();
                }
            }
        }
        GrammarParse {
            grammar,
            diagnostics: self.diagnostics,
        }
    }

    fn parse_rule(&mut self, grammar: &mut Grammar) {
        let name = self.current_text().to_string();
        self.bump(); // name
        self.bump(); // <-
        let expression = self.parse_expression();
        let mut rule = Rule::new(name, expression);
        while self.at(TokenKind::BraceOpen) && !self.at_counted_repetition() {
            match self.parse_trailer() {
                Some(Trailer::ErrorMessage(message)) => rule.error_message = Some(message),
                Some(Trailer::Action(code)) => rule.action_source = Some(code),
                None => break,
            }
        }
        grammar.add_rule(rule);
    }

    /// Brace-matches a `{ … }` trailer over the token stream. String
    /// literals inside action code were lexed as single tokens, so braces
    /// within them cannot unbalance the count.
    fn parse_trailer(&mut self) -> Option<Trailer> {
        let open = self.pos;
        let mut depth = 0usize;
        let mut close = None;
        for i in open..self.tokens.len() {
            match self.tokens[i].kind {
                TokenKind::BraceOpen => depth += 1,
                TokenKind::BraceClose => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(close) = close else {
            self.error_here("unclosed `{` in rule trailer");
            self.pos = self.tokens.len();
            return None;
        };

        let inner = &self.tokens[open + 1..close];
        let trailer = if inner.len() == 2
            && inner[0].kind == TokenKind::Ident
            && token_text(self.source, &inner[0]) == "error_message"
            && inner[1].kind == TokenKind::Literal
        {
            let (text, _) = unquote(token_text(self.source, &inner[1]));
            Trailer::ErrorMessage(text)
        } else {
            let start = self.tokens[open].span.end;
            let end = self.tokens[close].span.start;
            Trailer::Action(self.source[start..end].trim().to_string())
        };
        self.pos = close + 1;
        Some(trailer)
    }

    // --- expressions -------------------------------------------------------

    fn parse_expression(&mut self) -> Expression {
        self.parse_choice()
    }

    fn parse_choice(&mut self) -> Expression {
        let mut alternatives = vec![self.parse_sequence()];
        while self.at(TokenKind::Slash) {
            self.bump();
            alternatives.push(self.parse_sequence());
        }
        if alternatives.len() == 1 {
            alternatives.pop().expect("one alternative")
        } else {
            Expression::Choice { alternatives }
        }
    }

    fn parse_sequence(&mut self) -> Expression {
        let mut elements = Vec::new();
        while self.at_expression_start() {
            let element = self.parse_prefixed();
            let element = self.maybe_dictionary(element);
            elements.push(element);
        }
        if elements.is_empty() {
            self.error_here("expected an expression");
            self.synchronize();
        }
        if elements.len() == 1 {
            elements.pop().expect("one element")
        } else {
            Expression::Sequence { elements }
        }
    }

    /// `'w1' | 'w2' | …` longest-match word set.
    fn maybe_dictionary(&mut self, element: Expression) -> Expression {
        let Expression::Literal {
            text,
            case_insensitive,
        } = &element
        else {
            return element;
        };
        if !self.at(TokenKind::Pipe) {
            return element;
        }
        let mut words = vec![text.clone()];
        let mut case_insensitive = *case_insensitive;
        while self.at(TokenKind::Pipe) {
            self.bump();
            if self.at(TokenKind::Literal) {
                let (word, ci) = unquote(self.current_text());
                case_insensitive |= ci;
                words.push(word);
                self.bump();
            } else {
                self.error_here("expected a literal after `|`");
                break;
            }
        }
        Expression::Dictionary {
            words,
            case_insensitive,
        }
    }

    fn parse_prefixed(&mut self) -> Expression {
        match self.current() {
            Some(TokenKind::Amp) => {
                self.bump();
                Expression::And {
                    expr: Box::new(self.parse_suffixed()),
                }
            }
            Some(TokenKind::Bang) => {
                self.bump();
                Expression::Not {
                    expr: Box::new(self.parse_suffixed()),
                }
            }
            Some(TokenKind::Tilde) => {
                self.bump();
                Expression::Ignore {
                    expr: Box::new(self.parse_suffixed()),
                }
            }
            Some(TokenKind::Caret | TokenKind::UpArrow) => {
                self.bump();
                Expression::Cut
            }
            _ => self.parse_suffixed(),
        }
    }

    fn parse_suffixed(&mut self) -> Expression {
        let mut expr = self.parse_primary();
        loop {
            match self.current() {
                Some(TokenKind::Star) => {
                    self.bump();
                    expr = Expression::ZeroOrMore {
                        expr: Box::new(expr),
                    };
                }
                Some(TokenKind::Plus) => {
                    self.bump();
                    expr = Expression::OneOrMore {
                        expr: Box::new(expr),
                    };
                }
                Some(TokenKind::Question) => {
                    self.bump();
                    expr = Expression::Optional {
                        expr: Box::new(expr),
                    };
                }
                Some(TokenKind::BraceOpen) if self.at_counted_repetition() => {
                    expr = self.parse_counted(expr);
                }
                _ => break,
            }
        }
        expr
    }

    /// `{n}`, `{n,}`, `{n,m}`. Anything else after `{` is a rule trailer.
    fn at_counted_repetition(&self) -> bool {
        self.at(TokenKind::BraceOpen)
            && self.nth(1) == Some(TokenKind::Number)
            && matches!(
                self.nth(2),
                Some(TokenKind::Comma | TokenKind::BraceClose)
            )
    }

    fn parse_counted(&mut self, expr: Expression) -> Expression {
        self.bump(); // {
        let min = self.parse_number();
        let max = if self.at(TokenKind::Comma) {
            self.bump();
            if self.at(TokenKind::Number) {
                Some(self.parse_number())
            } else {
                None
            }
        } else {
            Some(min)
        };
        self.expect(TokenKind::BraceClose, "`}` to close the repetition count");
        Expression::Repetition {
            expr: Box::new(expr),
            min,
            max,
        }
    }

    fn parse_number(&mut self) -> u32 {
        let value = self.current_text().parse().unwrap_or_else(|_| {
            self.diagnostics
                .error("repetition count out of range", self.current_range())
                .emit();
            0
        });
        self.bump();
        value
    }

    fn parse_primary(&mut self) -> Expression {
        match self.current() {
            Some(TokenKind::Literal) => {
                let (text, case_insensitive) = unquote(self.current_text());
                self.bump();
                Expression::Literal {
                    text,
                    case_insensitive,
                }
            }
            Some(TokenKind::Class) => {
                let class = parse_class(self.current_text());
                self.bump();
                Expression::CharClass(class)
            }
            Some(TokenKind::Dot) => {
                self.bump();
                Expression::Any
            }
            Some(TokenKind::Ident) => {
                let rule = self.current_text().to_string();
                let offset = self.current_span_start();
                self.bump();
                Expression::Reference { rule, offset }
            }
            Some(TokenKind::ParenOpen) => {
                self.bump();
                let expr = self.parse_expression();
                self.expect(TokenKind::ParenClose, "`)`");
                Expression::Group {
                    expr: Box::new(expr),
                }
            }
            Some(TokenKind::AngleOpen) => {
                self.bump();
                let expr = self.parse_expression();
                self.expect(TokenKind::AngleClose, "`>` to close the token boundary");
                Expression::TokenBoundary {
                    expr: Box::new(expr),
                }
            }
            Some(TokenKind::DollarParen) => {
                self.bump();
                let expr = self.parse_expression();
                self.expect(TokenKind::ParenClose, "`)` to close the capture scope");
                Expression::CaptureScope {
                    expr: Box::new(expr),
                }
            }
            Some(TokenKind::DollarName) => {
                let name = self.current_text()[1..].to_string();
                let offset = self.current_span_start();
                self.bump();
                if self.at(TokenKind::AngleOpen) {
                    self.bump();
                    let expr = self.parse_expression();
                    self.expect(TokenKind::AngleClose, "`>` to close the capture");
                    Expression::Capture {
                        name,
                        expr: Box::new(expr),
                    }
                } else {
                    Expression::BackReference { name, offset }
                }
            }
            _ => {
                self.error_here("expected an expression");
                if !self.eof() {
                    self.bump();
                }
                Expression::sequence(Vec::new())
            }
        }
    }

    fn at_expression_start(&self) -> bool {
        match self.current() {
            Some(
                TokenKind::Literal
                | TokenKind::Class
                | TokenKind::Dot
                | TokenKind::ParenOpen
                | TokenKind::AngleOpen
                | TokenKind::Amp
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::Caret
                | TokenKind::UpArrow
                | TokenKind::DollarName
                | TokenKind::DollarParen,
            ) => true,
            // A name starts an element unless it begins the next rule.
            Some(TokenKind::Ident) => self.nth(1) != Some(TokenKind::LeftArrow),
            _ => false,
        }
    }

    // --- plumbing ----------------------------------------------------------

    fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn nth(&self, lookahead: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + lookahead).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current() == Some(kind)
    }

    fn bump(&mut self) {
        if !self.eof() {
            self.pos += 1;
        }
    }

    fn current_text(&self) -> &'s str {
        self.tokens
            .get(self.pos)
            .map(|t| token_text(self.source, t))
            .unwrap_or("")
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len())
    }

    fn current_range(&self) -> std::ops::Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.range())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.at(kind) {
            self.bump();
            return true;
        }
        self.error_here(format!("expected {what}"));
        false
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let range = self.current_range();
        self.diagnostics.error(message, range).emit();
    }

    /// Skips to the next plausible rule start.
    fn synchronize(&mut self) {
        while !self.eof() {
            match self.current() {
                Some(TokenKind::KwWhitespace | TokenKind::KwWord) => return,
                Some(TokenKind::Ident) if self.nth(1) == Some(TokenKind::LeftArrow) => return,
                _ => self.bump(),
            }
        }
    }
}

/// Strips quotes and an optional `i` suffix; decodes escapes.
fn unquote(raw: &str) -> (String, bool) {
    let (raw, case_insensitive) = match raw.strip_suffix('i') {
        Some(stripped) if !stripped.is_empty() => (stripped, true),
        _ => (raw, false),
    };
    let inner = if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    (unescape(inner), case_insensitive)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('x') => out.push(read_hex(&mut chars, 2)),
            Some('u') => out.push(read_hex(&mut chars, 4)),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn read_hex(chars: &mut std::str::Chars<'_>, digits: usize) -> char {
    let mut value: u32 = 0;
    for _ in 0..digits {
        let Some(digit) = chars.clone().next().and_then(|c| c.to_digit(16)) else {
            break;
        };
        chars.next();
        value = value * 16 + digit;
    }
    char::from_u32(value).unwrap_or('\u{FFFD}')
}

/// `[a-z]i` / `[^…]`: strips brackets, negation marker, `i` suffix.
fn parse_class(raw: &str) -> CharClass {
    let (raw, case_insensitive) = match raw.strip_suffix('i') {
        Some(stripped) if stripped.ends_with(']') => (stripped, true),
        _ => (raw, false),
    };
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw);
    let (inner, negated) = match inner.strip_prefix('^') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    CharClass::new(inner, negated, case_insensitive)
}
