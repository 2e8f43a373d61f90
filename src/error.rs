use thiserror::Error;

use crate::{
    lower::LowerError,
    parser,
    token::{Span, Spanned},
    util::{fmt::diagnostic, intern::Interner},
};

/// Any failure of the compiler pipeline, with its diagnostic already
/// rendered.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("lexical error: {message}")]
    Lex { span: Span, message: String },
    #[error("syntax error: {message}")]
    Syntax { span: Span, message: String },
    #[error("semantic error: {message}")]
    Semantic { span: Span, message: String },
}

impl CompileError {
    pub fn from_parser(ident_interner: &Interner<str>, error: &Spanned<parser::Error>) -> Self {
        let message = diagnostic(ident_interner, error);
        match error.inner {
            parser::Error::UnexpectedChar(_) | parser::Error::UnclosedString => CompileError::Lex {
                span: error.span,
                message,
            },
            _ => CompileError::Syntax {
                span: error.span,
                message,
            },
        }
    }

    pub fn from_lower(ident_interner: &Interner<str>, error: &LowerError) -> Self {
        CompileError::Semantic {
            span: error.error.span,
            message: diagnostic(ident_interner, error),
        }
    }

    /// The source span the error refers to, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Io(_) => None,
            CompileError::Lex { span, .. }
            | CompileError::Syntax { span, .. }
            | CompileError::Semantic { span, .. } => Some(*span),
        }
    }
}
