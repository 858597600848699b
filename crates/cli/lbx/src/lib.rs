//! lbx driver
//!
//! Reads a script, expands its function directives with [`lbx_macro`] and writes
//! the result. The whole input is read before expansion starts and nothing is
//! written unless the expansion succeeds, so a failed run never leaves a partial
//! output file behind.

pub mod config;
pub mod logging;

use anyhow::{Context, Result};
use lbx_macro::{ExpandOptions, Expansion, expand_source};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name used for standard input in diagnostics
pub const STDIN_NAME: &str = "<stdin>";

/// One expansion run
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Source file, standard input if `None`
    pub input: Option<PathBuf>,

    /// Destination file, standard output if `None`
    pub output: Option<PathBuf>,

    /// Expansion settings
    pub options: ExpandOptions,
}

/// Read, expand and write.
///
/// Expansion failures are returned as [`lbx_macro::ExpansionError`] wrapped in
/// [`anyhow::Error`] and can be recovered with `downcast`.
///
/// # Errors
///
/// Returns an error if reading the input, expanding it or writing the output fails.
pub fn run(invocation: &Invocation) -> Result<Expansion> {
    let (name, source) = read_input(invocation.input.as_deref())?;
    let expansion = expand_source(&name, &source, &invocation.options)?;

    write_output(invocation.output.as_deref(), &expansion.render())?;
    info!(
        input = %name,
        functions = expansion.functions().len(),
        call_sites = expansion.call_sites(),
        lines = expansion.lines().len(),
        "expansion finished"
    );

    Ok(expansion)
}

fn read_input(path: Option<&Path>) -> Result<(String, String)> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))?;
            Ok((path.display().to_string(), source))
        }
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read standard input")?;
            Ok((STDIN_NAME.to_string(), source))
        }
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write standard output")
        }
    }
}
