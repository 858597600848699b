//! Shared helpers for the lbx integration tests

use lbx_macro::{ExpandOptions, Expansion, ExpansionError, expand_source};
use std::path::PathBuf;

/// Directory holding the `.lb` fixture scripts
#[must_use]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Read a fixture script
///
/// # Panics
///
/// Panics if the fixture does not exist.
#[must_use]
pub fn fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("Failed to read fixture {}: {err}", path.display()))
}

/// Expand a fixture with the given options
///
/// # Errors
///
/// Returns the expansion error of the fixture, if any.
pub fn expand_fixture(name: &str, options: &ExpandOptions) -> Result<Expansion, ExpansionError> {
    expand_source(name, &fixture(name), options)
}

/// Labels defined by `LBL` lines, in output order
#[must_use]
pub fn defined_labels(expansion: &Expansion) -> Vec<&str> {
    expansion
        .lines()
        .iter()
        .filter_map(|line| line.strip_prefix("LBL "))
        .collect()
}
