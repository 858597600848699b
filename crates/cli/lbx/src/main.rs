//! lbx CLI
//!
//! `lbx [INPUT] [OUTPUT]` expands FUNC/CALLFUNC directives, reading standard input
//! and writing standard output when the paths are omitted.

#![allow(clippy::print_stderr, reason = "CLI tool needs to print to stderr")]

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use lbx::config::Config;
use lbx::{Invocation, logging};
use lbx_macro::{Expansion, ExpansionError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "lbx")]
#[command(about = "Expand structured function directives into label/goto BASIC", long_about = None)]
#[command(version)]
struct Cli {
    /// Source file (standard input if omitted)
    input: Option<PathBuf>,

    /// Destination file (standard output if omitted)
    output: Option<PathBuf>,

    /// Configuration file (defaults to lbx.toml in the current directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Do not emit the `# FUNC` and `# FUNCEND` marker comments
    #[arg(long)]
    no_markers: bool,

    /// Print defined functions and call sites to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;
    logging::init(&config.log.filter);

    let mut options = config.expand;
    if cli.no_markers {
        options.markers = false;
    }

    let invocation = Invocation {
        input: cli.input,
        output: cli.output,
        options,
    };
    let expansion = lbx::run(&invocation)?;

    if cli.stats {
        print_stats(&expansion);
    }

    Ok(())
}

fn report(err: anyhow::Error) {
    match err.downcast::<ExpansionError>() {
        Ok(diagnostic) => eprintln!("{:?}", miette::Report::new(diagnostic)),
        Err(other) => eprintln!("{} {other:#}", "error:".red().bold()),
    }
}

fn print_stats(expansion: &Expansion) {
    eprintln!(
        "{} {} functions, {} call sites",
        "Expanded:".green().bold(),
        expansion.functions().len(),
        expansion.call_sites()
    );
    for (name, def) in expansion.functions() {
        eprintln!(
            "  {} {name} -> FUNC{} (line {})",
            "fn".bold(),
            def.id.0,
            def.line
        );
    }
}
