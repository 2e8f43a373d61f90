use std::{format_args as f, io, marker::PhantomData};

use crate::{codegen::env, ir};

pub const MODULE_ID: &str = "minilustre";

pub struct Generator<W, E> {
    writer: W,
    indent: bool,
    _env: PhantomData<E>,
}

impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: env::Env,
{
    pub fn new(writer: W) -> Generator<W, E> {
        Generator {
            writer,
            indent: false,
            _env: PhantomData,
        }
    }

    pub fn generate(mut self, module: &ir::Module) -> io::Result<()> {
        self.g_module_prologue()?;
        self.g_state_types(module)?;
        self.g_strings(module)?;
        self.g_declarations(module)?;
        self.g_functions(module)?;
        self.writer.flush()
    }

    fn g_module_prologue(&mut self) -> io::Result<()> {
        self.out(f!("; ModuleID = '{MODULE_ID}'"))?;
        self.out(f!("source_filename = \"{MODULE_ID}\""))?;
        self.out(f!("target datalayout = \"{}\"", E::DATA_LAYOUT))?;
        self.out(f!("target triple = \"{}\"", E::TRIPLE))?;
        self.out_line()
    }

    fn g_state_types(&mut self, module: &ir::Module) -> io::Result<()> {
        self.section(&module.state_types)
    }

    fn g_strings(&mut self, module: &ir::Module) -> io::Result<()> {
        self.section(&module.strings)
    }

    fn g_declarations(&mut self, module: &ir::Module) -> io::Result<()> {
        self.section(&module.declarations)
    }

    fn g_functions(&mut self, module: &ir::Module) -> io::Result<()> {
        for (idx, function) in module.functions.iter().enumerate() {
            if idx > 0 {
                self.out_line()?;
            }
            self.g_function(function)?;
        }
        Ok(())
    }

    fn g_function(&mut self, function: &ir::Function) -> io::Result<()> {
        self.out(f!("{} {{", function.header()))?;
        for block in &function.blocks {
            self.out(f!("{}:", block.label))?;
            self.indented(|this| {
                for inst in &block.insts {
                    this.out(inst)?;
                }
                this.out(&block.terminator)
            })?;
        }
        self.out("}")
    }
}

/// Utility functions.
impl<W, E> Generator<W, E>
where
    W: io::Write,
{
    /// Prints each item on its own line, followed by an empty line. Empty
    /// sections print nothing.
    fn section<T: std::fmt::Display>(&mut self, items: &[T]) -> io::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        for item in items {
            self.out(item)?;
        }
        self.out_line()
    }

    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) -> io::Result<()> {
        let indent = if self.indent { "  " } else { "" };
        writeln!(self.writer, "{indent}{f}")
    }

    /// Prints an empty line.
    fn out_line(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    /// Writes in an indented block.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        res
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::{
        codegen::{generate, Target},
        lower, parser,
        util::intern::Interner,
    };

    fn emit(src: &str, target: Target) -> String {
        let i = &mut Interner::with_capacity(16);
        let file = parser::parse_file(src, i).unwrap();
        let module = lower::lower_file(&file, i).unwrap();
        let mut buf = Vec::new();
        generate(&mut buf, &module, target).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_whole_module() {
        let src = r#"
            node add(a: int; b: int) returns (c: int); let c = a + b; tel
            node main() returns (u: unit); let u = print("hi"); tel
        "#;
        assert_eq!(
            emit(src, Target::x86_64_linux),
            indoc! {r#"
                ; ModuleID = 'minilustre'
                source_filename = "minilustre"
                target datalayout = "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128"
                target triple = "x86_64-unknown-linux-gnu"

                %add.state = type { i1 }
                %main.state = type { i1 }

                @.str.0 = private unnamed_addr constant [3 x i8] c"hi\00"

                declare void @print(ptr)

                define i32 @add(ptr %self.state, i32 %a, i32 %b) {
                entry.block:
                  %t.0 = add i32 %a, %b
                  %t.1 = getelementptr inbounds %add.state, ptr %self.state, i32 0, i32 0
                  store i1 true, ptr %t.1
                  ret i32 %t.0
                }

                define void @main(ptr %self.state) {
                entry.block:
                  %t.0 = getelementptr inbounds [3 x i8], ptr @.str.0, i64 0, i64 0
                  call void @print(ptr %t.0)
                  %t.1 = getelementptr inbounds %main.state, ptr %self.state, i32 0, i32 0
                  store i1 true, ptr %t.1
                  ret void
                }
            "#}
        );
    }

    #[test]
    fn test_darwin_target() {
        let out = emit("node f() returns (x: bool); let x = true; tel", Target::x86_64_darwin);
        assert!(out.contains("target triple = \"x86_64-apple-darwin\"\n"));
        assert!(out.contains("target datalayout = \"e-m:o-"));
    }

    #[test]
    fn test_target_names() {
        for target in Target::ALL {
            assert_eq!(target.to_string().parse::<Target>(), Ok(*target));
        }
        assert!("riscv".parse::<Target>().is_err());
    }
}
