//! Value types of the command line, mapped onto the library's own.

use std::fmt;

use minilustre::codegen;

/// What the compiler prints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Emit {
    /// The token stream.
    Tokens,
    /// The span annotated syntax tree.
    Tree,
    /// The parsed source in canonical form.
    Ast,
    /// The LLVM module.
    Llvm,
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum TargetArg {
    x86_64_darwin,
    x86_64_linux,
}

impl TargetArg {
    pub fn target(self) -> codegen::Target {
        match self {
            TargetArg::x86_64_darwin => codegen::Target::x86_64_darwin,
            TargetArg::x86_64_linux => codegen::Target::x86_64_linux,
        }
    }
}

/// Shown as the target triple.
impl fmt::Display for TargetArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target().triple())
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        pub const HOST_TARGET: TargetArg = TargetArg::x86_64_darwin;
    } else {
        pub const HOST_TARGET: TargetArg = TargetArg::x86_64_linux;
    }
}
