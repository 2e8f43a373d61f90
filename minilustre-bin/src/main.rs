use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use minilustre::{compiler, Options};

mod args;

use args::{Emit, TargetArg};

/// Compiles minilustre nodes into LLVM assembly.
#[derive(Parser, Debug)]
#[command(name = "minilustre", version, about, long_about = None)]
struct Cli {
    /// Source file. The standard input is read when absent.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file. The standard output is written when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to print.
    #[arg(long, value_enum, default_value_t = Emit::Llvm)]
    emit: Emit,

    /// Platform of the emitted module. Defaults to the host.
    #[arg(long, value_enum, default_value_t = args::HOST_TARGET)]
    target: TargetArg,

    /// Tokenize on a separate thread.
    #[arg(long)]
    threaded: bool,

    /// Raises the log level, once per occurrence. `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    execute(&cli)
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn execute(cli: &Cli) -> Result<()> {
    let source = read_source(cli)?;
    let options = Options {
        target: cli.target.target(),
        threaded: cli.threaded,
    };
    log::info!("emitting {:?} for {}", cli.emit, cli.target);

    let output = match cli.emit {
        Emit::Tokens => compiler::render_tokens(&source),
        Emit::Tree => compiler::render_tree(&source, &options).context("failed to parse")?,
        Emit::Ast => compiler::render_source(&source, &options).context("failed to parse")?,
        Emit::Llvm => minilustre::compile(&source, &options).context("failed to compile")?,
    };
    write_output(cli, output.as_bytes())
}

fn read_source(cli: &Cli) -> Result<String> {
    match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read standard input")?;
            Ok(buffer)
        }
    }
}

fn write_output(cli: &Cli, bytes: &[u8]) -> Result<()> {
    let Some(path) = &cli.output else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        return Ok(stdout.flush()?);
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))
}
