// file ::= node+
// node ::= node ID '(' params ')' returns '(' params ')' ';'
//          [var params] let (assign ';')* tel
// params ::= [ID (',' ID)* ':' TYPE (';' ID (',' ID)* ':' TYPE)* [';']]
// assign ::= (ID | '(' ID (',' ID)* ')') '=' expr
// expr ::= member [('fby' | '+' | '-' | '<' | '>') expr]
// member ::= '(' expr (',' expr)* ')'
//          | if expr then expr else expr
//          | ID ['(' [expr (',' expr)*] ')']
//          | integer
//          | string
//          | true
//          | false
//
// There is no precedence: binary operators nest to the right, so that
// `a - b + c` reads as `a - (b + c)`.

use std::{fmt, mem};

use crate::{token::Span, util::intern::Interned};

#[derive(Debug, PartialEq, Default)]
pub struct File {
    pub nodes: Vec<Node>,
}

#[derive(Debug, PartialEq)]
pub struct Node {
    pub name: Ident,
    pub inputs: Vec<Param>,
    /// Non empty list of parameters.
    pub outputs: Vec<Param>,
    pub locals: Vec<Param>,
    pub body: Vec<Assign>,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Type,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Unit,
    Bool,
    Int,
    Float,
    String,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Unit => "unit",
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Assign {
    /// Non empty list of destinations. More than one only when destructuring.
    pub destinations: Vec<Ident>,
    pub body: Expr,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Subexpressions are taken apart one at a time, so that dropping a long
/// operator chain doesn't recurse through it.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        let mut kind = mem::replace(&mut self.kind, ExprKind::Tuple(Vec::new()));
        loop {
            match kind {
                ExprKind::Call { args: items, .. } | ExprKind::Tuple(items) => pending.extend(items),
                ExprKind::Const(_) | ExprKind::Var(_) => {}
                ExprKind::Binary { lhs, rhs, .. } => pending.extend([*lhs, *rhs]),
                ExprKind::If {
                    predicate,
                    then_arm,
                    else_arm,
                } => pending.extend([*predicate, *then_arm, *else_arm]),
            }
            let Some(mut next) = pending.pop() else {
                break;
            };
            kind = mem::replace(&mut next.kind, ExprKind::Tuple(Vec::new()));
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Call {
        node: Ident,
        args: Vec<Expr>,
    },
    Const(Const),
    Var(Ident),
    /// At least two elements.
    Tuple(Vec<Expr>),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    If {
        predicate: Box<Expr>,
        then_arm: Box<Expr>,
        else_arm: Box<Expr>,
    },
}

#[derive(Debug, PartialEq)]
pub enum Const {
    Int(i32),
    Bool(bool),
    String(Box<str>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Minus,
    Plus,
    Gt,
    Lt,
    /// Followed-by, the unit delay.
    Fby,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Minus => "-",
            BinaryOperator::Plus => "+",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::Fby => "fby",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Interned<str>,
    pub span: Span,
}

impl From<Ident> for Interned<str> {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Interned<str> {
    fn from(value: &Ident) -> Self {
        value.name
    }
}
