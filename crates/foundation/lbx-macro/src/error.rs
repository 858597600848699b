//! Expansion error types
//!
//! Every error is structural: it follows from the order of directives alone and
//! ends the run. Errors are created while the expander only sees one line at a
//! time, so they carry an empty placeholder source until
//! [`ExpansionError::with_source`] attaches the full text for rendering.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::Keyword;

/// Which structural rule an [`ExpansionError`] violated
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// `FUNC` inside another function body
    NestedFunction,
    /// `FUNC` reusing a registered name
    DuplicateFunction,
    /// `FUNCEND` outside a function body
    UnmatchedFuncEnd,
    /// `CALLFUNC` to an unregistered name
    UndefinedFunction,
    /// End of input inside a function body
    UnterminatedFunction,
    /// Directive without its required operand
    MissingOperand,
    /// Source too long for 32-bit positions
    SourceTooLarge,
    /// Definition or call-site numbers exhausted
    LabelOverflow,
}

/// Error type for directive expansion
#[derive(Error, Debug, Diagnostic)]
pub enum ExpansionError {
    /// `FUNC` opened while another body is still open
    #[error("nested function definitions: FUNC {name} inside FUNC {outer}")]
    #[diagnostic(
        code(lbx::nested_function),
        help("close `{outer}` (opened on line {outer_line}) with FUNCEND before starting `{name}`")
    )]
    NestedFunction {
        /// Name of the inner function
        name: String,
        /// Name of the function that is still open
        outer: String,
        /// Line of the outer `FUNC`
        outer_line: u32,
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("function bodies cannot nest")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// `FUNC` with a name that is already registered
    #[error("duplicate function: `{name}` is already defined")]
    #[diagnostic(
        code(lbx::duplicate_function),
        help("`{name}` was first defined on line {first_line}; function names must be unique")
    )]
    DuplicateFunction {
        /// Function name
        name: String,
        /// Line of the first definition
        first_line: u32,
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("redefined here")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// `FUNCEND` with no open function
    #[error("FUNCEND without a matching FUNC")]
    #[diagnostic(code(lbx::unmatched_funcend))]
    UnmatchedFuncEnd {
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("no function body is open here")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// `CALLFUNC` naming a function that has not been defined yet
    #[error("call to undefined function `{name}`")]
    #[diagnostic(
        code(lbx::undefined_function),
        help("functions must be defined with FUNC before the first CALLFUNC that uses them")
    )]
    UndefinedFunction {
        /// Function name
        name: String,
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("`{name}` is not defined at this point")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Input ended inside a function body
    #[error("function `{name}` is never closed")]
    #[diagnostic(code(lbx::unterminated_function), help("add FUNCEND after the body of `{name}`"))]
    UnterminatedFunction {
        /// Function name
        name: String,
        /// Line of the unterminated `FUNC`
        line: u32,
        /// Location of the unterminated `FUNC`
        #[label("opened here")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Directive keyword without its operand
    #[error("{keyword} expects {expected}")]
    #[diagnostic(code(lbx::missing_operand))]
    MissingOperand {
        /// Directive keyword
        keyword: Keyword,
        /// Description of the missing operand
        expected: &'static str,
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("missing {expected}")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },

    /// Source text longer than [`lbx_span::MAX_SOURCE_LEN`]
    #[error("source is {len} bytes, larger than the 4 GiB limit")]
    #[diagnostic(code(lbx::source_too_large), help("split the script into smaller files"))]
    SourceTooLarge {
        /// Length of the source in bytes
        len: usize,
    },

    /// A label counter ran out of numbers
    #[error("too many {counter}s: generated label numbers would repeat")]
    #[diagnostic(code(lbx::label_overflow))]
    LabelOverflow {
        /// What was being numbered, `function` or `call site`
        counter: &'static str,
        /// Offending line
        line: u32,
        /// Location of the offending line
        #[label("no label number left for this {counter}")]
        span: SourceSpan,
        /// Source code for context
        #[source_code]
        src: NamedSource<String>,
    },
}

impl ExpansionError {
    /// The rule this error violated
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NestedFunction { .. } => ErrorKind::NestedFunction,
            Self::DuplicateFunction { .. } => ErrorKind::DuplicateFunction,
            Self::UnmatchedFuncEnd { .. } => ErrorKind::UnmatchedFuncEnd,
            Self::UndefinedFunction { .. } => ErrorKind::UndefinedFunction,
            Self::UnterminatedFunction { .. } => ErrorKind::UnterminatedFunction,
            Self::MissingOperand { .. } => ErrorKind::MissingOperand,
            Self::SourceTooLarge { .. } => ErrorKind::SourceTooLarge,
            Self::LabelOverflow { .. } => ErrorKind::LabelOverflow,
        }
    }

    /// 1-based line the error points at, 0 for errors about the whole source
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::NestedFunction { line, .. }
            | Self::DuplicateFunction { line, .. }
            | Self::UnmatchedFuncEnd { line, .. }
            | Self::UndefinedFunction { line, .. }
            | Self::UnterminatedFunction { line, .. }
            | Self::MissingOperand { line, .. }
            | Self::LabelOverflow { line, .. } => *line,
            Self::SourceTooLarge { .. } => 0,
        }
    }

    /// Byte span of the offending line in the source
    #[must_use]
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::NestedFunction { span, .. }
            | Self::DuplicateFunction { span, .. }
            | Self::UnmatchedFuncEnd { span, .. }
            | Self::UndefinedFunction { span, .. }
            | Self::UnterminatedFunction { span, .. }
            | Self::MissingOperand { span, .. }
            | Self::LabelOverflow { span, .. } => *span,
            Self::SourceTooLarge { .. } => SourceSpan::from((0, 0)),
        }
    }

    /// Attach the complete source text for error reporting
    #[must_use]
    pub fn with_source(mut self, filename: impl AsRef<str>, source: impl Into<String>) -> Self {
        let named_source = NamedSource::new(filename, source.into());
        match &mut self {
            Self::NestedFunction { src, .. }
            | Self::DuplicateFunction { src, .. }
            | Self::UnmatchedFuncEnd { src, .. }
            | Self::UndefinedFunction { src, .. }
            | Self::UnterminatedFunction { src, .. }
            | Self::MissingOperand { src, .. }
            | Self::LabelOverflow { src, .. } => *src = named_source,
            Self::SourceTooLarge { .. } => {}
        }
        self
    }
}

/// Source placeholder used until [`ExpansionError::with_source`] runs
pub(crate) fn detached_source() -> NamedSource<String> {
    NamedSource::new("<input>", String::new())
}
