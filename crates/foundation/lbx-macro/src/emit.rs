//! Target-language instructions produced by the expander
//!
//! The interpreter only knows labels, unconditional jumps and variable assignment.
//! Calls are simulated through a handful of reserved variables and generated labels,
//! rendered here in the interpreter's own syntax.

use crate::ast::{CallSiteId, DefinitionId};
use std::fmt;

/// A label invented by the expander
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum GeneratedLabel {
    /// Entry point of a function body, `FUNC<i>`
    Function(DefinitionId),
    /// Landing point after a function body, `SKIPFUNC<i>`
    Skip(DefinitionId),
    /// Resume point after a call, `FUNCRTNGOTO<j>`
    Return(CallSiteId),
}

impl fmt::Display for GeneratedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(DefinitionId(id)) => write!(f, "FUNC{id}"),
            Self::Skip(DefinitionId(id)) => write!(f, "SKIPFUNC{id}"),
            Self::Return(CallSiteId(id)) => write!(f, "FUNCRTNGOTO{id}"),
        }
    }
}

/// Variables reserved for the calling convention
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ReservedVar {
    /// `FUNCRTNGOTO`, the label to resume at once the callee returns
    ReturnAddress,
    /// `FUNCRTN`, the value of the last `FUNCRTN`
    ReturnValue,
    /// `FUNCPARAM<k>`, 1-indexed positional argument
    Param(usize),
}

impl fmt::Display for ReservedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReturnAddress => f.write_str("FUNCRTNGOTO"),
            Self::ReturnValue => f.write_str("FUNCRTN"),
            Self::Param(index) => write!(f, "FUNCPARAM{index}"),
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Value<'src> {
    /// Operand copied from the source line
    Text(&'src str),
    /// Name of a generated label
    Label(GeneratedLabel),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

/// One emitted output line
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction<'src> {
    /// `# FUNC <name>`
    BeginMarker(&'src str),
    /// `# FUNCEND`
    EndMarker,
    /// `GOTO <label>`
    Goto(GeneratedLabel),
    /// `GOTO $<var>`, a jump through the label stored in a variable
    GotoIndirect(ReservedVar),
    /// `LBL <label>`
    Label(GeneratedLabel),
    /// `SETVAL <var> <value>`
    SetVal {
        /// Assigned variable
        var: ReservedVar,
        /// Assigned value
        value: Value<'src>,
    },
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginMarker(name) => write!(f, "# FUNC {name}"),
            Self::EndMarker => f.write_str("# FUNCEND"),
            Self::Goto(label) => write!(f, "GOTO {label}"),
            Self::GotoIndirect(var) => write!(f, "GOTO ${var}"),
            Self::Label(label) => write!(f, "LBL {label}"),
            Self::SetVal { var, value } => write!(f, "SETVAL {var} {value}"),
        }
    }
}
