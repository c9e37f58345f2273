//! Lexer for grammar text.
//!
//! Produces span-based tokens; text is sliced from the source only when
//! needed. Consecutive unrecognized characters coalesce into single
//! `Garbage` tokens so malformed input stays manageable. Action-code
//! blocks are not lexed specially: the parser brace-matches over the token
//! stream and slices the raw source.

use logos::Logos;
use std::ops::Range;

/// Byte range of a token. `Copy`, unlike `std::ops::Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

impl ByteSpan {
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for ByteSpan {
    fn from(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<-` must win over `<`.
    #[token("<-")]
    LeftArrow,

    #[token("<")]
    AngleOpen,

    #[token(">")]
    AngleClose,

    #[token("/")]
    Slash,

    #[token("&")]
    Amp,

    #[token("!")]
    Bang,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(",")]
    Comma,

    #[token("|")]
    Pipe,

    #[token("~")]
    Tilde,

    #[token(".")]
    Dot,

    /// Cut, ASCII spelling.
    #[token("^")]
    Caret,

    /// Cut, arrow spelling.
    #[token("↑")]
    UpArrow,

    /// `$(` opens a capture scope.
    #[token("$(")]
    DollarParen,

    /// `$name`: capture definition or back-reference, disambiguated by the
    /// parser (a following `<` means capture).
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    DollarName,

    #[token("%whitespace")]
    KwWhitespace,

    #[token("%word")]
    KwWord,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Number,

    /// Quoted literal, optional `i` suffix for case-insensitivity.
    #[regex(r"'(?:[^'\\]|\\.)*'i?")]
    #[regex(r#""(?:[^"\\]|\\.)*"i?"#)]
    Literal,

    /// Character class, optional `i` suffix.
    #[regex(r"\[\^?(?:[^\]\\]|\\.)*\]i?")]
    Class,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// `#` to end of line.
    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    /// Coalesced unrecognized characters.
    Garbage,
}

impl TokenKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Kind + span; text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ByteSpan,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: ByteSpan) -> Self {
        Self { kind, span }
    }
}

/// Tokenizes grammar text, coalescing lexer errors into `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    let end = lexer.span().start;
                    tokens.push(Token::new(TokenKind::Garbage, (start..end).into()));
                }
                tokens.push(Token::new(kind, lexer.span().into()));
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(TokenKind::Garbage, (start..source.len()).into()));
                }
                break;
            }
        }
    }

    tokens
}

/// O(1) slice into the source for a token.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.span.range()]
}
