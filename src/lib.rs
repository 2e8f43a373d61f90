/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// A bounded channel which lets the lexer run on its own thread, ahead of
/// the parser.
pub mod stream;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// Lowering resolves names, checks types and maps the AST into an LLVM
/// module, one function per node.
pub mod lower;

/// Writes lowered modules as LLVM assembly.
pub mod codegen;

pub mod ast;
pub mod compiler;
pub mod error;
pub mod ir;
pub mod token;
pub mod types;

pub mod util;

pub use compiler::{compile, Options};
pub use error::CompileError;
