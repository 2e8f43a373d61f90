use std::{fmt, ops::Range};

#[derive(Copy, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    /// Returns the end-of-input token for the provided source.
    pub fn eof_for(src: &str) -> Token {
        Token::new(TokenKind::Eof, Span::new_of_length(src.len(), 0))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    /// Returns the source text covered by this token.
    pub fn text<'src>(&self, src: &'src str) -> &'src str {
        self.span().substr(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Whether the lexer stops after this token.
    pub fn is_terminal(&self) -> bool {
        self.is_eof() || self.kind.is_error()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub const fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let lo = self.lo.min(other.lo);
        let hi = self.hi().max(other.hi());
        Span::new_of_bounds(lo..hi)
    }

    /// Shrinks (or grows) the span bounds by the provided deltas.
    pub fn offset(self, lo: isize, hi: isize) -> Span {
        let new_lo = self.lo.checked_add_signed(lo).unwrap();
        let new_hi = self.hi().checked_add_signed(hi).unwrap();
        Span::new_of_bounds(new_lo..new_hi)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

// This is not the most efficient way of representing a token kind, but it
// suffices for this simple compiler implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Node,
    Returns,
    Var,
    Let,
    Tel,
    Fby,
    If,
    Then,
    Else,
    And,
    Or,
    Not,
    Const,
    End,

    True,
    False,

    UnitTy,
    BoolTy,
    IntTy,
    FloatTy,
    StringTy,

    Plus,
    Minus,
    Less,
    Greater,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Eq,

    Identifier,
    /// Quotes are part of the token's span.
    String,
    Number,

    Eof,
    ErrorUnexpectedChar,
    ErrorUnclosedString,
}

impl TokenKind {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            TokenKind::ErrorUnexpectedChar | TokenKind::ErrorUnclosedString
        )
    }

    /// A human readable description, used in diagnostics.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Node => "keyword `node`",
            Returns => "keyword `returns`",
            Var => "keyword `var`",
            Let => "keyword `let`",
            Tel => "keyword `tel`",
            Fby => "keyword `fby`",
            If => "keyword `if`",
            Then => "keyword `then`",
            Else => "keyword `else`",
            And => "keyword `and`",
            Or => "keyword `or`",
            Not => "keyword `not`",
            Const => "keyword `const`",
            End => "keyword `end`",
            True => "keyword `true`",
            False => "keyword `false`",
            UnitTy => "keyword `unit`",
            BoolTy => "keyword `bool`",
            IntTy => "keyword `int`",
            FloatTy => "keyword `float`",
            StringTy => "keyword `string`",
            Plus => "`+`",
            Minus => "`-`",
            Less => "`<`",
            Greater => "`>`",
            LParen => "`(`",
            RParen => "`)`",
            Colon => "`:`",
            Semicolon => "`;`",
            Comma => "`,`",
            Eq => "`=`",
            Identifier => "identifier",
            String => "string literal",
            Number => "number",
            Eof => "end of input",
            ErrorUnexpectedChar => "unexpected character",
            ErrorUnclosedString => "unclosed string",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "and" => TokenKind::And,
    "bool" => TokenKind::BoolTy,
    "const" => TokenKind::Const,
    "else" => TokenKind::Else,
    "end" => TokenKind::End,
    "false" => TokenKind::False,
    "fby" => TokenKind::Fby,
    "float" => TokenKind::FloatTy,
    "if" => TokenKind::If,
    "int" => TokenKind::IntTy,
    "let" => TokenKind::Let,
    "node" => TokenKind::Node,
    "not" => TokenKind::Not,
    "or" => TokenKind::Or,
    "returns" => TokenKind::Returns,
    "string" => TokenKind::StringTy,
    "tel" => TokenKind::Tel,
    "then" => TokenKind::Then,
    "true" => TokenKind::True,
    "unit" => TokenKind::UnitTy,
    "var" => TokenKind::Var,
};
