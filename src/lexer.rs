use std::{iter::Peekable, num::ParseIntError};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    assert_eq!(tokens.len(), 0, "must pass clean tokens buffer");
    tokens.extend(Lexer::new(src));
    log::trace!("lexed {} tokens", tokens.len());
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The Lustre lexer.
///
/// Tokens are produced on demand. The sequence ends right after the first
/// [`TokenKind::Eof`] or error token, so an exhausted lexer always yields
/// `None` afterwards.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    finished: bool,
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let kind = loop {
            if let Some(kind) = self.scan_token_kind() {
                break kind;
            }
        };
        let token = self.produce(kind);
        self.finished = token.is_terminal();
        Some(token)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

impl Lexer<'_> {
    /// Tries to scan the current character. Returns `None` for whitespace.
    fn scan_token_kind(&mut self) -> Option<TokenKind> {
        use TokenKind::*;
        let Some(c) = self.mark_advance() else {
            return Some(Eof);
        };
        let kind = match c {
            '+' => Plus,
            '-' => Minus,
            '<' => Less,
            '>' => Greater,
            '(' => LParen,
            ')' => RParen,
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '=' => Eq,
            '"' => self.string(),
            ' ' | '\t' | '\r' | '\n' => return None,
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier_or_keyword(),
            _ => ErrorUnexpectedChar,
        };
        Some(kind)
    }

    /// String contents are taken verbatim: there are no escape sequences and
    /// line breaks are allowed.
    fn string(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                Some('"') => return TokenKind::String,
                Some(_) => continue,
                None => return TokenKind::ErrorUnclosedString,
            }
        }
    }

    /// Identifiers may hold any Unicode letter or digit.
    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_alphanumeric() || c == '_';

        while self.peek().is_some_and(valid_identifier_suffix) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        TokenKind::Number
    }
}

impl Lexer<'_> {
    /// Constructs a new lexer with the default state.
    pub fn new(src: &str) -> Lexer<'_> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            finished: false,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next char and advances the iterator.
    fn advance(&mut self) -> Option<char> {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
    }

    /// Returns the next char without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i32, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.text(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.text(src)
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }

    /// The offending character of an [`TokenKind::ErrorUnexpectedChar`] token.
    pub fn unexpected_char(token: Token, src: &str) -> char {
        debug_assert_eq!(token.kind, TokenKind::ErrorUnexpectedChar);
        token.text(src).chars().next().unwrap_or('\0')
    }
}
