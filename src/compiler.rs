//! The pipeline entry points: source text in, rendered text or errors out.

use std::{fmt::Write as _, io};

use crate::{
    ast::File,
    codegen::{self, Target},
    error::CompileError,
    lexer::Lexer,
    lower, parser,
    util::{
        fmt::{tree, Context, Show},
        intern::Interner,
    },
};

#[derive(Copy, Clone, Debug, Default)]
pub struct Options {
    pub target: Target,
    /// Tokenize on a separate thread, feeding the parser through a channel.
    pub threaded: bool,
}

/// A parsed file along with the names it refers to.
pub struct Parsed {
    pub ident_interner: Interner<str>,
    pub file: File,
}

pub fn parse(src: &str, options: &Options) -> Result<Parsed, CompileError> {
    let mut ident_interner = Interner::with_capacity(256);
    let result = if options.threaded {
        parser::parse_file_threaded(src, &mut ident_interner)
    } else {
        parser::parse_file(src, &mut ident_interner)
    };
    match result {
        Ok(file) => {
            log::debug!("parsed {} nodes", file.nodes.len());
            Ok(Parsed {
                ident_interner,
                file,
            })
        }
        Err(error) => Err(CompileError::from_parser(&ident_interner, &error)),
    }
}

/// Compiles the source into an LLVM module, written to `writer`.
pub fn compile_to<W>(src: &str, options: &Options, writer: W) -> Result<(), CompileError>
where
    W: io::Write,
{
    let Parsed {
        ident_interner,
        file,
    } = parse(src, options)?;
    let module = lower::lower_file(&file, &ident_interner)
        .map_err(|error| CompileError::from_lower(&ident_interner, &error))?;
    codegen::generate(writer, &module, options.target)?;
    Ok(())
}

/// Compiles the source into the text of an LLVM module.
pub fn compile(src: &str, options: &Options) -> Result<String, CompileError> {
    let mut buf = Vec::with_capacity(src.len() * 4);
    compile_to(src, options, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The canonical rendering of the parsed source.
pub fn render_source(src: &str, options: &Options) -> Result<String, CompileError> {
    let parsed = parse(src, options)?;
    let ctx = Context {
        ident_interner: &parsed.ident_interner,
    };
    let rendered = parsed.file.display(&ctx).to_string();
    Ok(rendered)
}

/// The span annotated tree of the parsed source.
pub fn render_tree(src: &str, options: &Options) -> Result<String, CompileError> {
    let parsed = parse(src, options)?;
    Ok(tree::print_file_string(&parsed.ident_interner, &parsed.file))
}

/// One line per token, up to the end of input or the first lexical error.
pub fn render_tokens(src: &str) -> String {
    let mut out = String::with_capacity(src.len() * 2);
    for token in Lexer::new(src) {
        let span = token.span();
        if token.is_eof() {
            writeln!(out, "{:?} {span}", token.kind).unwrap();
        } else {
            writeln!(out, "{:?} {span} {:?}", token.kind, token.text(src)).unwrap();
        }
    }
    out
}
