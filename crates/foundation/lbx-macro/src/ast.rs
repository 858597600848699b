//! Directive syntax
//!
//! A line is classified by its first whitespace-delimited token. Only the four
//! function directives are understood; everything else is opaque text.

use std::fmt;

/// Unique identifier for a function definition block
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct DefinitionId(pub u32);

/// Unique identifier for a `CALLFUNC` site
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CallSiteId(pub u32);

/// Directive keyword
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Keyword {
    /// `FUNC <name>`
    Func,
    /// `FUNCRTN <value>`
    FuncRtn,
    /// `FUNCEND`
    FuncEnd,
    /// `CALLFUNC <name> [args...]`
    CallFunc,
}

impl Keyword {
    /// Matches a token against the directive keywords. Keywords are case-sensitive.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "FUNC" => Some(Self::Func),
            "FUNCRTN" => Some(Self::FuncRtn),
            "FUNCEND" => Some(Self::FuncEnd),
            "CALLFUNC" => Some(Self::CallFunc),
            _ => None,
        }
    }

    /// Source spelling of the keyword
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Func => "FUNC",
            Self::FuncRtn => "FUNCRTN",
            Self::FuncEnd => "FUNCEND",
            Self::CallFunc => "CALLFUNC",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'src> {
    /// Opens a function body
    Func {
        /// Function name
        name: &'src str,
    },
    /// Returns a value from the current function
    FuncRtn {
        /// Value assigned to the return variable
        value: &'src str,
    },
    /// Closes the current function body
    FuncEnd,
    /// Calls a previously defined function
    CallFunc {
        /// Target function name
        name: &'src str,
        /// Positional arguments, bound to `FUNCPARAM1..`
        args: Vec<&'src str>,
    },
}

impl Directive<'_> {
    /// Keyword that introduced this directive
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        match self {
            Self::Func { .. } => Keyword::Func,
            Self::FuncRtn { .. } => Keyword::FuncRtn,
            Self::FuncEnd => Keyword::FuncEnd,
            Self::CallFunc { .. } => Keyword::CallFunc,
        }
    }
}

/// A classified source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'src> {
    /// Empty or whitespace-only line
    Blank,
    /// Line starting with `#`
    Comment(&'src str),
    /// One of the function directives
    Directive(Directive<'src>),
    /// Anything else, passed through untouched
    Text(&'src str),
}

/// A directive keyword that is missing its required operand
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MissingOperand {
    /// The directive that was cut short
    pub keyword: Keyword,
    /// What should have followed the keyword
    pub expected: &'static str,
}

/// Classifies a single line.
///
/// Tokens following the required operand of `FUNC`, `FUNCRTN` and `FUNCEND` are
/// ignored.
///
/// # Errors
///
/// Returns [`MissingOperand`] if `FUNC`, `FUNCRTN` or `CALLFUNC` has no operand.
pub fn classify(text: &str) -> Result<Line<'_>, MissingOperand> {
    if text.starts_with('#') {
        return Ok(Line::Comment(text));
    }

    let mut tokens = text.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(Line::Blank);
    };
    let Some(keyword) = Keyword::from_token(first) else {
        return Ok(Line::Text(text));
    };

    let directive = match keyword {
        Keyword::Func => Directive::Func {
            name: operand(&mut tokens, keyword, "a function name")?,
        },
        Keyword::FuncRtn => Directive::FuncRtn {
            value: operand(&mut tokens, keyword, "a return value")?,
        },
        Keyword::FuncEnd => Directive::FuncEnd,
        Keyword::CallFunc => Directive::CallFunc {
            name: operand(&mut tokens, keyword, "a function name")?,
            args: tokens.collect(),
        },
    };

    Ok(Line::Directive(directive))
}

fn operand<'src>(
    tokens: &mut impl Iterator<Item = &'src str>,
    keyword: Keyword,
    expected: &'static str,
) -> Result<&'src str, MissingOperand> {
    tokens.next().ok_or(MissingOperand { keyword, expected })
}
