//! Structured function directives for label/goto BASIC scripts
//!
//! The interpreter this targets only understands labels, unconditional jumps and
//! variable assignment. This crate rewrites four directives into those primitives:
//!
//! - `FUNC <name>` / `FUNCEND` frame a function body that normal control flow
//!   jumps over
//! - `FUNCRTN <value>` stores a return value in `FUNCRTN` and returns
//! - `CALLFUNC <name> [args...]` binds `FUNCPARAM1..` and jumps into the body
//!
//! Every other line is copied to the output unchanged.
//!
//! # Example
//!
//! ```rust
//! use lbx_macro::{ExpandOptions, expand_source};
//!
//! let source = "FUNC ADD\nFUNCRTN 5\nFUNCEND\nCALLFUNC ADD\n";
//! let expansion = expand_source("add.lb", source, &ExpandOptions::default()).unwrap();
//!
//! assert_eq!(expansion.lines()[3], "SETVAL FUNCRTN 5");
//! assert_eq!(expansion.lines().last().unwrap(), "LBL FUNCRTNGOTO0");
//! ```

pub mod ast;
pub mod emit;
pub mod error;
pub mod expand;
pub mod options;

// Re-export commonly used types
pub use ast::{CallSiteId, DefinitionId, Directive, Keyword, Line, MissingOperand, classify};
pub use emit::{GeneratedLabel, Instruction, ReservedVar, Value};
pub use error::{ErrorKind, ExpansionError};
pub use expand::{Expander, Expansion, FunctionDef, expand_lines, expand_source};
pub use options::ExpandOptions;
