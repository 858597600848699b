//! Expansion settings

use serde::{Deserialize, Serialize};

/// Knobs controlling the shape of the expanded output
///
/// Every field has a default, so a partial `[expand]` table in a config file is
/// enough to override a single setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExpandOptions {
    /// Frame each definition with `# FUNC <name>` and `# FUNCEND` comment lines
    pub markers: bool,

    /// Strip surrounding whitespace from every input line
    pub trim_lines: bool,

    /// Terminate rendered output with a newline
    pub trailing_newline: bool,

    /// Log a warning for `CALLFUNC` inside a function body
    pub warn_nested_calls: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            markers: true,
            trim_lines: true,
            trailing_newline: true,
            warn_nested_calls: true,
        }
    }
}

impl ExpandOptions {
    /// Enable or disable the definition comment markers
    #[must_use]
    pub fn with_markers(mut self, markers: bool) -> Self {
        self.markers = markers;
        self
    }

    /// Enable or disable line trimming
    #[must_use]
    pub fn with_trim_lines(mut self, trim_lines: bool) -> Self {
        self.trim_lines = trim_lines;
        self
    }

    /// Enable or disable the trailing newline
    #[must_use]
    pub fn with_trailing_newline(mut self, trailing_newline: bool) -> Self {
        self.trailing_newline = trailing_newline;
        self
    }

    /// Enable or disable the warning for calls made inside a function body
    #[must_use]
    pub fn with_warn_nested_calls(mut self, warn_nested_calls: bool) -> Self {
        self.warn_nested_calls = warn_nested_calls;
        self
    }
}
