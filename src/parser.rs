use std::{collections::HashMap, mem};

use crate::{
    ast::{Assign, BinaryOperator, Const, Expr, ExprKind, File, Ident, Node, Param, Type},
    lexer::{extract, Lexer},
    stream,
    token::{Span, Spanned, Token, TokenKind},
    types::builtins,
    util::intern::{Interned, Interner},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T>;

/// Parses a whole file, pulling tokens from the lexer on demand.
///
/// Builtin names live at fixed handles, so `ident_interner` must be empty or
/// have been filled by previous parses only. Panics otherwise.
pub fn parse_file(src: &str, ident_interner: &mut Interner<str>) -> ParseResult<File> {
    parse(src, Lexer::new(src), ident_interner, Parser::parse_file)
}

/// Parses a whole file while a separate thread tokenizes it.
pub fn parse_file_threaded(src: &str, ident_interner: &mut Interner<str>) -> ParseResult<File> {
    stream::with_channel(src, |channel| {
        parse(src, channel, ident_interner, Parser::parse_file)
    })
}

/// Parses a whole file from already produced tokens.
pub fn parse_tokens(
    src: &str,
    tokens: impl IntoIterator<Item = Token>,
    ident_interner: &mut Interner<str>,
) -> ParseResult<File> {
    parse(src, tokens.into_iter(), ident_interner, Parser::parse_file)
}

/// Parses a single expression, which must span the whole input.
pub fn parse_expr(src: &str, ident_interner: &mut Interner<str>) -> ParseResult<Expr> {
    parse(src, Lexer::new(src), ident_interner, |p| {
        let expr = p.parse_expr()?;
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    })
}

fn parse<'src, 'ident, I, T>(
    src: &'src str,
    tokens: I,
    ident_interner: &'ident mut Interner<str>,
    f: impl FnOnce(&mut Parser<'src, 'ident, I>) -> Result<T>,
) -> ParseResult<T>
where
    I: Iterator<Item = Token>,
{
    for builtin in builtins::ALL {
        let handle = ident_interner.intern(builtin.name);
        assert_eq!(
            handle, builtin.id,
            "the interner must be fresh or come from a previous parse"
        );
    }

    let mut p = Parser::new(src, tokens, ident_interner);
    let result = f(&mut p);
    if let Err(error) = &result {
        log::debug!("parsing aborted at {}", error.span);
    }
    result
}

struct Parser<'src, 'ident, I> {
    src: &'src str,
    tokens: I,
    /// The lookahead token, if already pulled from `tokens`.
    current: Option<Token>,
    ident_interner: &'ident mut Interner<str>,
}

impl<I> Parser<'_, '_, I>
where
    I: Iterator<Item = Token>,
{
    fn parse_file(&mut self) -> Result<File> {
        let mut nodes = Vec::with_capacity(4);
        loop {
            nodes.push(self.parse_node()?);
            if self.take(TokenKind::Eof) {
                break;
            }
        }
        Ok(File { nodes })
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.consume(TokenKind::Node)?;
        let name = self.parse_ident()?;

        // Parameter names are unique across all lists of the node.
        let mut scope = HashMap::with_capacity(8);

        self.consume(TokenKind::LParen)?;
        let inputs = self.parse_params(&mut scope)?;
        self.consume(TokenKind::RParen)?;

        let returns = self.consume(TokenKind::Returns)?;
        self.consume(TokenKind::LParen)?;
        let outputs = self.parse_params(&mut scope)?;
        let end = self.consume(TokenKind::RParen)?;
        if outputs.is_empty() {
            let span = returns.span().to(end.span());
            return Err(span.wrap(Error::MissingOutputs { node: name.name }));
        }
        self.consume(TokenKind::Semicolon)?;

        let locals = if self.take(TokenKind::Var) {
            self.parse_params(&mut scope)?
        } else {
            Vec::new()
        };

        self.consume(TokenKind::Let)?;
        let body = self.parse_assigns()?;
        self.consume(TokenKind::Tel)?;

        log::debug!(
            "parsed node `{}` ({} equations)",
            self.ident_interner.get(name),
            body.len()
        );
        Ok(Node {
            name,
            inputs,
            outputs,
            locals,
            body,
        })
    }

    /// Parses `names ':' type (';' names ':' type)* [';']`, possibly empty.
    /// The list ends at the first token which can't start a name group.
    fn parse_params(&mut self, scope: &mut HashMap<Interned<str>, Span>) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        while self.is(TokenKind::Identifier) {
            let mut names = vec![self.parse_param_name(scope)?];
            while self.take(TokenKind::Comma) {
                names.push(self.parse_param_name(scope)?);
            }
            self.consume(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.extend(names.into_iter().map(|name| Param { name, ty }));

            if !self.take(TokenKind::Semicolon) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_param_name(&mut self, scope: &mut HashMap<Interned<str>, Span>) -> Result<Ident> {
        let name = self.parse_ident()?;
        if let Some(&other_definition_span) = scope.get(&name.name) {
            let error = Error::DuplicateParameter {
                name: name.name,
                other_definition_span,
            };
            return Err(name.span.wrap(error));
        }
        scope.insert(name.name, name.span);
        Ok(name)
    }

    fn parse_type(&mut self) -> Result<Type> {
        let token = self.peek();
        let ty = match token.kind {
            TokenKind::UnitTy => Type::Unit,
            TokenKind::BoolTy => Type::Bool,
            TokenKind::IntTy => Type::Int,
            TokenKind::FloatTy => Type::Float,
            TokenKind::StringTy => Type::String,
            _ => return Err(self.unexpected(token, |actual| Error::ExpectedType { actual })),
        };
        self.advance();
        Ok(ty)
    }

    fn parse_assigns(&mut self) -> Result<Vec<Assign>> {
        let mut assigns = Vec::new();
        while self.is(TokenKind::Identifier) || self.is(TokenKind::LParen) {
            assigns.push(self.parse_assign()?);
            self.consume(TokenKind::Semicolon)?;
        }
        Ok(assigns)
    }

    fn parse_assign(&mut self) -> Result<Assign> {
        let destinations = if self.take(TokenKind::LParen) {
            let mut names = vec![self.parse_ident()?];
            while self.take(TokenKind::Comma) {
                names.push(self.parse_ident()?);
            }
            self.consume(TokenKind::RParen)?;
            names
        } else {
            vec![self.parse_ident()?]
        };
        self.consume(TokenKind::Eq)?;
        let body = self.parse_expr()?;
        Ok(Assign { destinations, body })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.ident_interner.intern(extract::ident(token, self.src)),
            span: token.span(),
        })
    }

    /// Binary operators don't have precedence. The right operand is always the
    /// whole remaining expression.
    /// Operator chains are collected first and then folded from the right,
    /// so that their length doesn't grow the stack.
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut last = self.parse_member()?;
        let mut chain = Vec::new();
        while let Some(op) = binary_operator(self.peek().kind) {
            self.advance(); // Operator
            let next = self.parse_member()?;
            chain.push((mem::replace(&mut last, next), op));
        }

        let mut expr = last;
        while let Some((lhs, op)) = chain.pop() {
            let span = lhs.span.to(expr.span);
            let binary = ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(expr),
            };
            expr = Expr { kind: binary, span };
        }
        Ok(expr)
    }

    fn parse_member(&mut self) -> Result<Expr> {
        let token = self.peek();
        let (kind, span) = match token.kind {
            // Grouping `( expr )` or tuple `( expr, expr, ... )`
            TokenKind::LParen => {
                self.advance();
                let items = self.parse_expr_list()?;
                let end = self.consume(TokenKind::RParen)?;
                let span = token.span().to(end.span());
                match <[Expr; 1]>::try_from(items) {
                    Ok([mut grouped]) => {
                        grouped.span = span;
                        return Ok(grouped);
                    }
                    Err(items) => (ExprKind::Tuple(items), span),
                }
            }

            // Conditional: if expr then expr else expr
            TokenKind::If => {
                self.advance();
                let predicate = self.parse_expr()?;
                self.consume(TokenKind::Then)?;
                let then_arm = self.parse_expr()?;
                self.consume(TokenKind::Else)?;
                let else_arm = self.parse_expr()?;
                let span = token.span().to(else_arm.span);
                let cond = ExprKind::If {
                    predicate: Box::new(predicate),
                    then_arm: Box::new(then_arm),
                    else_arm: Box::new(else_arm),
                };
                (cond, span)
            }

            // Variable `ID` or call `ID ( [expr [, expr]*] )`
            TokenKind::Identifier => {
                let ident = self.parse_ident()?;
                if !self.take(TokenKind::LParen) {
                    return Ok(Expr {
                        kind: ExprKind::Var(ident),
                        span: ident.span,
                    });
                }
                let args = if self.is(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                let end = self.consume(TokenKind::RParen)?;
                let call = ExprKind::Call { node: ident, args };
                (call, ident.span.to(end.span()))
            }

            TokenKind::Number => {
                self.advance();
                let Ok(parsed) = extract::int(token, self.src) else {
                    return Err(token.span().wrap(Error::ParseInt));
                };
                (ExprKind::Const(Const::Int(parsed)), token.span())
            }
            TokenKind::String => {
                self.advance();
                let string = extract::string(token, self.src);
                (ExprKind::Const(Const::String(string)), token.span())
            }
            TokenKind::True => {
                self.advance();
                (ExprKind::Const(Const::Bool(true)), token.span())
            }
            TokenKind::False => {
                self.advance();
                (ExprKind::Const(Const::Bool(false)), token.span())
            }

            _ => {
                return Err(self.unexpected(token, |token| Error::UnexpectedTokenInExpr { token }));
            }
        };

        Ok(Expr { kind, span })
    }

    /// Parses `expr (',' expr)*`.
    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut items = vec![self.parse_expr()?];
        while self.take(TokenKind::Comma) {
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }
}

impl<'src, 'ident, I> Parser<'src, 'ident, I>
where
    I: Iterator<Item = Token>,
{
    fn new(
        src: &'src str,
        tokens: I,
        ident_interner: &'ident mut Interner<str>,
    ) -> Parser<'src, 'ident, I> {
        Parser {
            src,
            tokens,
            current: None,
            ident_interner,
        }
    }

    /// Returns the current token, pulling it from the source if needed.
    ///
    /// An exhausted source behaves as if it ended with [`TokenKind::Eof`].
    fn peek(&mut self) -> Token {
        if let Some(token) = self.current {
            return token;
        }
        let token = self
            .tokens
            .next()
            .unwrap_or_else(|| Token::eof_for(self.src));
        self.current = Some(token);
        token
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        self.current = None;
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&mut self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not, fails
    /// with an error naming both.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if c.kind == expect {
            self.advance();
            Ok(c)
        } else {
            Err(self.unexpected(c, |actual| Error::Unexpected {
                actual,
                expected: expect,
            }))
        }
    }

    /// Builds the error for an unexpected token. Lexer error tokens take
    /// precedence over the grammar error described by `error`.
    fn unexpected(&self, token: Token, error: impl FnOnce(TokenKind) -> Error) -> Spanned<Error> {
        let error = match token.kind {
            TokenKind::ErrorUnexpectedChar => {
                Error::UnexpectedChar(extract::unexpected_char(token, self.src))
            }
            TokenKind::ErrorUnclosedString => Error::UnclosedString,
            actual => error(actual),
        };
        token.span().wrap(error)
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Fby => Some(BinaryOperator::Fby),
        TokenKind::Plus => Some(BinaryOperator::Plus),
        TokenKind::Minus => Some(BinaryOperator::Minus),
        TokenKind::Less => Some(BinaryOperator::Lt),
        TokenKind::Greater => Some(BinaryOperator::Gt),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    ExpectedType {
        actual: TokenKind,
    },
    DuplicateParameter {
        name: Interned<str>,
        other_definition_span: Span,
    },
    MissingOutputs {
        node: Interned<str>,
    },
    ParseInt,
    UnexpectedChar(char),
    UnclosedString,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::tree_tests;
    use pretty_assertions::assert_eq;

    tree_tests!(
        use parser;

        fn test_add_node() {
            let file = "node add(a: int; b: int) returns (c: int); let c = a + b; tel";
            let tree_ok = "
                node add (5..8)
                  inputs
                    a: int (9..10)
                    b: int (17..18)
                  outputs
                    c: int (34..35)
                  assign c
                    binary Plus (51..56)
                      var a (51..52)
                      var b (55..56)
            ";
        }

        fn test_grouped_names() {
            let file = "node f(a, b: int; s: string) returns (x, y: bool); let tel";
            let tree_ok = "
                node f (5..6)
                  inputs
                    a: int (7..8)
                    b: int (10..11)
                    s: string (18..19)
                  outputs
                    x: bool (38..39)
                    y: bool (41..42)
            ";
        }

        fn test_locals_with_trailing_semicolon() {
            let file = "node f() returns (x: int); var t: int; u: unit; let t = 1; x = t; tel";
            let tree_ok = "
                node f (5..6)
                  outputs
                    x: int (18..19)
                  locals
                    t: int (31..32)
                    u: unit (39..40)
                  assign t
                    int 1 (56..57)
                  assign x
                    var t (63..64)
            ";
        }

        fn test_multiple_nodes() {
            let file = "
                node a() returns (x: int); let x = 1; tel
                node b() returns (y: int); let y = a(); tel
            ";
            let tree_ok = "
                node a (22..23)
                  outputs
                    x: int (35..36)
                  assign x
                    int 1 (54..55)
                node b (80..81)
                  outputs
                    y: int (93..94)
                  assign y
                    call a (110..113)
            ";
        }

        fn test_right_nested_operators() {
            let expr = "a + b - c";
            let tree_ok = "
                binary Plus (0..9)
                  var a (0..1)
                  binary Minus (4..9)
                    var b (4..5)
                    var c (8..9)
            ";
        }

        fn test_fby_takes_remaining_expression() {
            let expr = "0 fby n + 1";
            let tree_ok = "
                binary Fby (0..11)
                  int 0 (0..1)
                  binary Plus (6..11)
                    var n (6..7)
                    int 1 (10..11)
            ";
        }

        fn test_comparisons() {
            let expr = "a < b > c";
            let tree_ok = "
                binary Lt (0..9)
                  var a (0..1)
                  binary Gt (4..9)
                    var b (4..5)
                    var c (8..9)
            ";
        }

        fn test_grouping_is_not_tuple() {
            let expr = "(a + b) - c";
            let tree_ok = "
                binary Minus (0..11)
                  binary Plus (0..7)
                    var a (1..2)
                    var b (5..6)
                  var c (10..11)
            ";
        }

        fn test_tuple() {
            let expr = "(1, x, \"s\")";
            let tree_ok = r#"
                tuple (0..11)
                  int 1 (1..2)
                  var x (4..5)
                  string "s" (7..10)
            "#;
        }

        fn test_call_arguments() {
            let expr = "f(g(), 1, true, false)";
            let tree_ok = "
                call f (0..22)
                  call g (2..5)
                  int 1 (7..8)
                  bool true (10..14)
                  bool false (16..21)
            ";
        }

        fn test_conditional() {
            let expr = "if a > 0 then a else 0 - a";
            let tree_ok = "
                if (0..26)
                  binary Gt (3..8)
                    var a (3..4)
                    int 0 (7..8)
                  var a (14..15)
                  binary Minus (21..26)
                    int 0 (21..22)
                    var a (25..26)
            ";
        }

        fn test_destructuring_assign() {
            let file = "node f() returns (a: int; b: int); let (a, b) = (1, 2); tel";
            let tree_ok = "
                node f (5..6)
                  outputs
                    a: int (18..19)
                    b: int (26..27)
                  assign a, b
                    tuple (48..54)
                      int 1 (49..50)
                      int 2 (52..53)
            ";
        }

        fn test_error_missing_outputs() {
            let file = "node f(a: int) returns (); let tel";
            let expected_errors = &["15..25: node f doesn't have any output parameter"];
        }

        fn test_error_duplicate_parameter_in_list() {
            let file = "node f(a: int; a: bool) returns (x: int); let tel";
            let expected_errors = &["15..16: duplicate parameter a, first declared at 7..8"];
        }

        fn test_error_duplicate_parameter_across_lists() {
            let file = "node f(a: int) returns (a: int); let tel";
            let expected_errors = &["24..25: duplicate parameter a, first declared at 7..8"];
        }

        fn test_error_expected_keyword() {
            let file = "node f() return (x: int); let tel";
            let expected_errors = &["9..15: expected keyword `returns`, found identifier"];
        }

        fn test_error_expected_type() {
            let file = "node f(a: integer) returns (x: int); let tel";
            let expected_errors = &["10..17: expected a type, found identifier"];
        }

        fn test_error_missing_semicolon_after_assign() {
            let file = "node f() returns (x: int); let x = 1 tel";
            let expected_errors = &["37..40: expected `;`, found keyword `tel`"];
        }

        fn test_error_empty_file() {
            let file = "   ";
            let expected_errors = &["3..3: expected keyword `node`, found end of input"];
        }

        fn test_error_unexpected_token_in_expr() {
            let expr = "1 + ;";
            let expected_errors = &["4..5: unexpected `;` in expression"];
        }

        fn test_error_integer_too_large() {
            let expr = "4294967296";
            let expected_errors = &["0..10: integer literal out of range"];
        }

        fn test_error_lexer_unexpected_char() {
            let file = "node f() returns (x: int); let x = 1 * 2; tel";
            let expected_errors = &["37..38: unexpected character '*'"];
        }

        fn test_error_lexer_unclosed_string() {
            let expr = "print(\"hello";
            let expected_errors = &["6..12: unclosed string"];
        }
    );

    #[test]
    fn test_body_less_node_parses() {
        let (i, file) = test_utils::parse_file("node f() returns (x: int); let tel");
        assert_eq!(file.nodes.len(), 1);
        let node = &file.nodes[0];
        assert_eq!(i.get(node.name), "f");
        assert!(node.body.is_empty());
        assert_eq!(node.outputs.len(), 1);
    }

    #[test]
    fn test_long_chain_nests_to_the_right() {
        let src = vec!["a"; 1_000].join(" - ");
        let i = &mut Interner::with_capacity(8);
        let expr = parse_expr(&src, i).unwrap();
        let tree = crate::util::fmt::tree::print_expr_string(i, &expr);
        let lines: Vec<_> = tree.lines().collect();
        assert_eq!(lines.len(), 1_999);
        assert_eq!(lines[0], format!("binary Minus (0..{})", src.len()));
        assert_eq!(lines[1], "  var a (0..1)");
        assert_eq!(lines[2], format!("  binary Minus (4..{})", src.len()));
        let last = format!("{}var a ({}..{})", " ".repeat(999 * 2), src.len() - 1, src.len());
        assert_eq!(lines[1_998], last);
    }

    #[test]
    fn test_very_long_chain() {
        let src = vec!["x"; 100_000].join(" fby ");
        let expr = parse_expr(&src, &mut Interner::with_capacity(8)).unwrap();
        assert_eq!(expr.span, Span::new_of_bounds(0..src.len()));
        let ExprKind::Binary { op, rhs, .. } = &expr.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOperator::Fby);
        assert_eq!(rhs.span.lo, 6);
    }

    #[test]
    fn test_interner_reused_across_parses() {
        let i = &mut Interner::with_capacity(8);
        parse_file("node f() returns (x: int); let x = 1; tel", i).unwrap();
        let file = parse_file(r#"node g() returns (u: unit); let u = print("a"); tel"#, i).unwrap();
        let ExprKind::Call { node, .. } = &file.nodes[0].body[0].body.kind else {
            panic!("expected a call");
        };
        assert_eq!(node.name, builtins::PRINT);
        assert_eq!(i.get(builtins::PRINT), "print");
    }

    #[test]
    #[should_panic(expected = "the interner must be fresh")]
    fn test_foreign_interner_is_rejected() {
        let i = &mut Interner::with_capacity(8);
        i.intern("x");
        let _ = parse_file("node f() returns (x: int); let x = 1; tel", i);
    }

    #[test]
    fn test_threaded_parse_matches_direct_parse() {
        let src = "
            node counter(reset: bool) returns (n: int);
            let n = if reset then 0 else 0 fby n + 1; tel
            node main() returns (u: unit);
            var c: int;
            let c = counter(false); u = print(\"tick\"); tel
        ";
        let direct = parse_file(src, &mut Interner::with_capacity(16)).unwrap();
        let threaded = parse_file_threaded(src, &mut Interner::with_capacity(16)).unwrap();
        assert_eq!(direct, threaded);
    }

    #[test]
    fn test_threaded_parse_error_with_large_tail() {
        let mut src = String::from("node broken( returns (x: int); let tel\n");
        for i in 0..20_000 {
            src.push_str(&format!("node n{i}() returns (x: int); let x = {i}; tel\n"));
        }
        let error = parse_file_threaded(&src, &mut Interner::with_capacity(16)).unwrap_err();
        assert_eq!(
            error.inner,
            Error::Unexpected {
                actual: TokenKind::Returns,
                expected: TokenKind::RParen,
            }
        );
    }

    #[test]
    fn test_parse_tokens() {
        let src = "node f() returns (x: int); let x = 1; tel";
        let tokens = crate::lexer::lex_in_new(src);
        let (_, expected) = test_utils::parse_file(src);
        let file = parse_tokens(src, tokens, &mut Interner::with_capacity(8)).unwrap();
        assert_eq!(file, expected);
    }
}
