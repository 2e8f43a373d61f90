use crate::{
    lower::{self, LowerError},
    parser,
    token::Spanned,
    util::fmt::Show,
};

impl Show for LowerError {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = &self.error;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }
        if let Some(node) = self.node {
            write!(f, "in node {}: ", i.get(node))?;
        }

        use lower::Error::*;
        match error {
            DuplicateNode {
                name,
                other_definition_span,
            } => {
                let name = i.get(name);
                write!(f, "node {name} already defined at {other_definition_span}")
            }
            RedefinedBuiltin(name) => write!(f, "node {} is a builtin", i.get(name)),
            UndefinedNode(name) => write!(f, "undefined node {}", i.get(name)),
            UndefinedVariable(name) => write!(f, "undefined variable {}", i.get(name)),
            AssignToInput(name) => write!(f, "can't assign to input {}", i.get(name)),
            UnknownAssignTarget(name) => {
                write!(f, "{} is neither an output nor a local", i.get(name))
            }
            Reassigned {
                name,
                other_assignment_span,
            } => {
                let name = i.get(name);
                write!(f, "{name} is already assigned at {other_assignment_span}")
            }
            UnassignedOutput(name) => write!(f, "output {} is never assigned", i.get(name)),
            ArityMismatch { expected, actual } => {
                write!(f, "expected a tuple of {expected} values, found {actual}")
            }
            ArgumentCount {
                node,
                expected,
                actual,
            } => {
                let node = i.get(node);
                write!(f, "node {node} takes {expected} arguments, but got {actual}")
            }
            Mismatch { expected, actual } => {
                write!(f, "expected type {expected}, found {actual}")
            }
            UnitInTuple => write!(f, "unit values can't be tuple elements"),
            MixedUnitOutputs(name) => {
                write!(f, "unit output {} must be the only output", i.get(name))
            }
            RecursiveNode(name) => write!(f, "recursive call to node {}", i.get(name)),
        }
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use parser::Error::*;
        match error {
            Unexpected { actual, expected } => write!(f, "expected {expected}, found {actual}"),
            UnexpectedTokenInExpr { token } => write!(f, "unexpected {token} in expression"),
            ExpectedType { actual } => write!(f, "expected a type, found {actual}"),
            DuplicateParameter {
                name,
                other_definition_span,
            } => {
                let name = i.get(name);
                write!(
                    f,
                    "duplicate parameter {name}, first declared at {other_definition_span}"
                )
            }
            MissingOutputs { node } => {
                write!(f, "node {} doesn't have any output parameter", i.get(node))
            }
            ParseInt => write!(f, "integer literal out of range"),
            UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            UnclosedString => write!(f, "unclosed string"),
        }
    }
}
