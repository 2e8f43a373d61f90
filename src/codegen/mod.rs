//! Textual LLVM emission for lowered modules.

use std::io;

use crate::{
    codegen::{env::Env, llvm::Generator},
    ir,
};

pub mod env;
pub mod llvm;

/// Writes `module` as LLVM assembly for the given target.
pub fn generate<W>(writer: W, module: &ir::Module, target: Target) -> io::Result<()>
where
    W: io::Write,
{
    type DarwinGenerator<W> = Generator<W, env::Darwin>;
    type LinuxGenerator<W> = Generator<W, env::Linux>;

    log::debug!(
        "emitting {} functions for {target} ({})",
        module.functions.len(),
        target.triple()
    );
    match target {
        Target::x86_64_darwin => DarwinGenerator::new(writer).generate(module),
        Target::x86_64_linux => LinuxGenerator::new(writer).generate(module),
    }
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Target {
    x86_64_darwin,
    #[default]
    x86_64_linux,
}

impl Target {
    pub const ALL: &[Target] = &[Target::x86_64_darwin, Target::x86_64_linux];

    pub const fn triple(&self) -> &'static str {
        match self {
            Target::x86_64_darwin => env::Darwin::TRIPLE,
            Target::x86_64_linux => env::Linux::TRIPLE,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::x86_64_darwin => f.write_str("x86_64_darwin"),
            Target::x86_64_linux => f.write_str("x86_64_linux"),
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .iter()
            .copied()
            .find(|target| target.to_string() == s)
            .ok_or_else(|| format!("unknown target `{s}`"))
    }
}
