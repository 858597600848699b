//! Directive expansion engine
//!
//! The expander is a single forward pass. Function bodies stay in place and are
//! jumped over; a call stores its resume label in `FUNCRTNGOTO` and jumps to the
//! body, which returns by jumping through that variable.
//!
//! There is exactly one return slot. A `CALLFUNC` inside a function body overwrites
//! the address its own caller stored, so the outer function can no longer return.
//! The expander keeps that convention for compatibility with existing scripts and
//! logs a warning for every such call when `warn_nested_calls` is set.

use indexmap::IndexMap;
use lbx_span::SourceLine;
use miette::SourceSpan;
use tracing::{debug, warn};

use crate::ast::{CallSiteId, DefinitionId, Directive, Line, classify};
use crate::emit::{GeneratedLabel, Instruction, ReservedVar, Value};
use crate::error::{ExpansionError, detached_source};
use crate::options::ExpandOptions;

/// A registered function
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Definition id, also the number in `FUNC<i>` and `SKIPFUNC<i>`
    pub id: DefinitionId,
    /// Line of the `FUNC` directive
    pub line: u32,
}

/// The function body currently being scanned
#[derive(Debug, Clone)]
struct OpenFunction {
    name: String,
    id: DefinitionId,
    line: u32,
    span: SourceSpan,
}

/// Position of the line being expanded, for error reporting
#[derive(Copy, Clone)]
struct Site {
    line: u32,
    span: SourceSpan,
}

impl Site {
    /// Covers the line without its surrounding whitespace
    fn of(line: &SourceLine<'_>) -> Self {
        let text = line.text();
        let lead = text.len() - text.trim_start().len();
        let start = line.span().start as usize + lead;
        Self {
            line: line.number(),
            span: (start, text.trim().len()).into(),
        }
    }

    fn label_overflow(self, counter: &'static str) -> ExpansionError {
        ExpansionError::LabelOverflow {
            counter,
            line: self.line,
            span: self.span,
            src: detached_source(),
        }
    }
}

/// Expansion context for one run
///
/// Owns the function registry, the definition and call-site counters and the
/// open-function state. Nothing is shared between runs.
#[derive(Debug)]
pub struct Expander {
    options: ExpandOptions,
    /// Registered functions in definition order
    functions: IndexMap<String, FunctionDef>,
    /// Next definition id, advanced on FUNCEND
    next_definition: u32,
    /// Next call-site id, advanced on CALLFUNC
    next_call_site: u32,
    open: Option<OpenFunction>,
    output: Vec<String>,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(ExpandOptions::default())
    }
}

impl Expander {
    /// Create an empty expansion context
    #[must_use]
    pub fn new(options: ExpandOptions) -> Self {
        Self {
            options,
            functions: IndexMap::new(),
            next_definition: 0,
            next_call_site: 0,
            open: None,
            output: Vec::new(),
        }
    }

    /// Whether a `FUNC` body is currently open
    #[must_use]
    pub const fn in_function(&self) -> bool {
        self.open.is_some()
    }

    /// Lines emitted so far
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Expand one source line, appending the result to the output
    ///
    /// # Errors
    ///
    /// Returns an error if the line violates directive nesting, redefines or
    /// calls an unknown function, or omits a required operand.
    pub fn process_line(&mut self, line: SourceLine<'_>) -> Result<(), ExpansionError> {
        let text = if self.options.trim_lines {
            line.text().trim()
        } else {
            line.text()
        };
        let site = Site::of(&line);

        let classified = classify(text).map_err(|missing| ExpansionError::MissingOperand {
            keyword: missing.keyword,
            expected: missing.expected,
            line: site.line,
            span: site.span,
            src: detached_source(),
        })?;

        match classified {
            Line::Blank | Line::Comment(_) | Line::Text(_) => {
                self.output.push(text.to_string());
                Ok(())
            }
            Line::Directive(directive) => self.expand_directive(directive, site),
        }
    }

    /// Finish the run
    ///
    /// # Errors
    ///
    /// Returns an error if a function body is still open.
    pub fn finish(self) -> Result<Expansion, ExpansionError> {
        if let Some(open) = self.open {
            return Err(ExpansionError::UnterminatedFunction {
                name: open.name,
                line: open.line,
                span: open.span,
                src: detached_source(),
            });
        }

        Ok(Expansion {
            lines: self.output,
            functions: self.functions,
            call_sites: self.next_call_site,
            trailing_newline: self.options.trailing_newline,
        })
    }

    fn expand_directive(
        &mut self,
        directive: Directive<'_>,
        site: Site,
    ) -> Result<(), ExpansionError> {
        match directive {
            Directive::Func { name } => self.open_function(name, site),
            Directive::FuncRtn { value } => {
                self.emit(Instruction::SetVal {
                    var: ReservedVar::ReturnValue,
                    value: Value::Text(value),
                });
                self.emit(Instruction::GotoIndirect(ReservedVar::ReturnAddress));
                Ok(())
            }
            Directive::FuncEnd => self.close_function(site),
            Directive::CallFunc { name, args } => self.call_function(name, &args, site),
        }
    }

    fn open_function(&mut self, name: &str, site: Site) -> Result<(), ExpansionError> {
        if let Some(outer) = &self.open {
            return Err(ExpansionError::NestedFunction {
                name: name.to_string(),
                outer: outer.name.clone(),
                outer_line: outer.line,
                line: site.line,
                span: site.span,
                src: detached_source(),
            });
        }
        if let Some(first) = self.functions.get(name) {
            return Err(ExpansionError::DuplicateFunction {
                name: name.to_string(),
                first_line: first.line,
                line: site.line,
                span: site.span,
                src: detached_source(),
            });
        }

        let id = DefinitionId(self.next_definition);
        self.functions.insert(
            name.to_string(),
            FunctionDef {
                id,
                line: site.line,
            },
        );
        self.open = Some(OpenFunction {
            name: name.to_string(),
            id,
            line: site.line,
            span: site.span,
        });
        debug!(function = name, id = id.0, line = site.line, "function opened");

        if self.options.markers {
            self.emit(Instruction::BeginMarker(name));
        }
        self.emit(Instruction::Goto(GeneratedLabel::Skip(id)));
        self.emit(Instruction::Label(GeneratedLabel::Function(id)));
        Ok(())
    }

    fn close_function(&mut self, site: Site) -> Result<(), ExpansionError> {
        let Some(open) = self.open.take() else {
            return Err(ExpansionError::UnmatchedFuncEnd {
                line: site.line,
                span: site.span,
                src: detached_source(),
            });
        };
        self.next_definition = self
            .next_definition
            .checked_add(1)
            .ok_or_else(|| site.label_overflow("function"))?;
        debug!(function = %open.name, id = open.id.0, line = site.line, "function closed");

        self.emit(Instruction::GotoIndirect(ReservedVar::ReturnAddress));
        self.emit(Instruction::Label(GeneratedLabel::Skip(open.id)));
        if self.options.markers {
            self.emit(Instruction::EndMarker);
        }
        Ok(())
    }

    fn call_function(
        &mut self,
        name: &str,
        args: &[&str],
        site: Site,
    ) -> Result<(), ExpansionError> {
        let Some(target) = self.functions.get(name).map(|def| def.id) else {
            return Err(ExpansionError::UndefinedFunction {
                name: name.to_string(),
                line: site.line,
                span: site.span,
                src: detached_source(),
            });
        };

        let call_site = CallSiteId(self.next_call_site);
        self.next_call_site = self
            .next_call_site
            .checked_add(1)
            .ok_or_else(|| site.label_overflow("call site"))?;

        if self.options.warn_nested_calls {
            if let Some(caller) = &self.open {
                warn!(
                    line = site.line,
                    caller = %caller.name,
                    callee = name,
                    "CALLFUNC inside a function body overwrites the caller's return address"
                );
            }
        }

        for (index, &arg) in args.iter().enumerate() {
            self.emit(Instruction::SetVal {
                var: ReservedVar::Param(index + 1),
                value: Value::Text(arg),
            });
        }

        let resume = GeneratedLabel::Return(call_site);
        debug!(callee = name, %resume, line = site.line, "call expanded");

        self.emit(Instruction::SetVal {
            var: ReservedVar::ReturnAddress,
            value: Value::Label(resume),
        });
        self.emit(Instruction::Goto(GeneratedLabel::Function(target)));
        self.emit(Instruction::Label(resume));
        Ok(())
    }

    fn emit(&mut self, instruction: Instruction<'_>) {
        self.output.push(instruction.to_string());
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    lines: Vec<String>,
    functions: IndexMap<String, FunctionDef>,
    call_sites: u32,
    trailing_newline: bool,
}

impl Expansion {
    /// Output lines in order
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the expansion, keeping only the output lines
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Functions in definition order
    #[must_use]
    pub const fn functions(&self) -> &IndexMap<String, FunctionDef> {
        &self.functions
    }

    /// Number of expanded `CALLFUNC` sites
    #[must_use]
    pub const fn call_sites(&self) -> u32 {
        self.call_sites
    }

    /// Output text: lines joined with `\n`, plus the trailing newline if enabled
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }
}

fn check_source_len(source: &str) -> Result<(), ExpansionError> {
    if source.len() > lbx_span::MAX_SOURCE_LEN {
        return Err(ExpansionError::SourceTooLarge { len: source.len() });
    }
    Ok(())
}

/// Expand a complete source text
///
/// Errors carry `source` under `name` so they can be rendered with context.
///
/// # Errors
///
/// Returns the first structural error in the source, or an error if the source
/// is longer than [`lbx_span::MAX_SOURCE_LEN`].
pub fn expand_source(
    name: &str,
    source: &str,
    options: &ExpandOptions,
) -> Result<Expansion, ExpansionError> {
    check_source_len(source)?;

    let mut expander = Expander::new(options.clone());
    lbx_span::lines(source)
        .try_for_each(|line| expander.process_line(line))
        .and_then(|()| expander.finish())
        .map_err(|err| err.with_source(name, source))
}

/// Expand lines that are already split
///
/// Each item is one line taken verbatim, so empty items stay blank lines and a
/// trailing `\r` is kept when trimming is off. Error positions refer to the
/// items joined with `\n`.
///
/// # Errors
///
/// Returns the first structural error in the lines.
pub fn expand_lines<'src, I>(
    lines: I,
    options: &ExpandOptions,
) -> Result<Expansion, ExpansionError>
where
    I: IntoIterator<Item = &'src str>,
{
    let lines: Vec<&str> = lines.into_iter().collect();
    let source = lines.join("\n");
    check_source_len(&source)?;

    let mut expander = Expander::new(options.clone());
    let mut number = 0u32;
    let mut offset = 0u32;
    lines
        .iter()
        .try_for_each(|text| {
            number = number.saturating_add(1);
            let line = SourceLine::new(number, offset, text);
            offset = line.span().end.saturating_add(1);
            expander.process_line(line)
        })
        .and_then(|()| expander.finish())
        .map_err(|err| err.with_source("<input>", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn expand(source: &str) -> Result<Vec<String>, ExpansionError> {
        expand_source("test.lb", source, &ExpandOptions::default()).map(Expansion::into_lines)
    }

    fn expand_err(source: &str) -> ExpansionError {
        match expand(source) {
            Ok(lines) => panic!("expected an error, got {lines:?}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_definition_and_call() {
        let lines = expand("FUNC ADD\nFUNCRTN 5\nFUNCEND\nCALLFUNC ADD\n").unwrap();
        assert_eq!(
            lines,
            vec![
                "# FUNC ADD",
                "GOTO SKIPFUNC0",
                "LBL FUNC0",
                "SETVAL FUNCRTN 5",
                "GOTO $FUNCRTNGOTO",
                "GOTO $FUNCRTNGOTO",
                "LBL SKIPFUNC0",
                "# FUNCEND",
                "SETVAL FUNCRTNGOTO FUNCRTNGOTO0",
                "GOTO FUNC0",
                "LBL FUNCRTNGOTO0",
            ]
        );
    }

    #[test]
    fn test_call_arguments() {
        let lines = expand("FUNC F\nFUNCEND\nCALLFUNC F 1 $X hello").unwrap();
        assert_eq!(
            &lines[6..],
            &[
                "SETVAL FUNCPARAM1 1",
                "SETVAL FUNCPARAM2 $X",
                "SETVAL FUNCPARAM3 hello",
                "SETVAL FUNCRTNGOTO FUNCRTNGOTO0",
                "GOTO FUNC0",
                "LBL FUNCRTNGOTO0",
            ]
        );
    }

    #[test]
    fn test_definition_ids_ignore_calls() {
        let source = "FUNC A\nFUNCEND\nCALLFUNC A\nCALLFUNC A\nCALLFUNC A\nFUNC B\nFUNCEND\nCALLFUNC B";
        let expansion = expand_source("test.lb", source, &ExpandOptions::default()).unwrap();
        let lines = expansion.lines();

        assert!(lines.contains(&"LBL FUNC1".to_string()));
        assert!(lines.contains(&"LBL SKIPFUNC1".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("LBL FUNCRTNGOTO3"));
        assert!(lines.contains(&"GOTO FUNC1".to_string()));

        let ids: Vec<_> = expansion
            .functions()
            .iter()
            .map(|(name, def)| (name.as_str(), def.id))
            .collect();
        assert_eq!(ids, vec![("A", DefinitionId(0)), ("B", DefinitionId(1))]);
        assert_eq!(expansion.call_sites(), 4);
    }

    #[test]
    fn test_sequential_calls_get_distinct_return_labels() {
        let lines = expand("FUNC A\nFUNCEND\nCALLFUNC A\nCALLFUNC A").unwrap();
        let labels: Vec<_> = lines.iter().filter(|line| line.starts_with("LBL FUNCRTNGOTO")).collect();
        assert_eq!(labels, vec!["LBL FUNCRTNGOTO0", "LBL FUNCRTNGOTO1"]);
    }

    #[test]
    fn test_generated_labels_unique() {
        let source = "FUNC A\nCALLFUNC A\nFUNCEND\nFUNC B\nCALLFUNC A\nFUNCEND\nCALLFUNC B\nCALLFUNC A";
        let lines = expand(source).unwrap();
        let mut labels: Vec<_> = lines.iter().filter(|line| line.starts_with("LBL ")).collect();
        let total = labels.len();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), total);
        assert_eq!(total, 8);
    }

    #[test]
    fn test_passthrough_preserved() {
        let source = "PRINT start\n\n# comment FUNC\n   SETVAL X 1   \nGOTO end";
        let lines = expand(source).unwrap();
        assert_eq!(lines, vec!["PRINT start", "", "# comment FUNC", "SETVAL X 1", "GOTO end"]);
    }

    #[test]
    fn test_body_lines_kept_in_place() {
        let lines = expand("FUNC A\nPRINT $FUNCPARAM1\nFUNCEND").unwrap();
        assert_eq!(lines[3], "PRINT $FUNCPARAM1");
        assert_eq!(lines[4], "GOTO $FUNCRTNGOTO");
    }

    #[test]
    fn test_recursive_call_allowed() {
        let lines = expand("FUNC LOOP\nCALLFUNC LOOP\nFUNCEND").unwrap();
        assert!(lines.contains(&"GOTO FUNC0".to_string()));
    }

    #[test]
    fn test_funcrtn_outside_function() {
        let lines = expand("FUNCRTN 1").unwrap();
        assert_eq!(lines, vec!["SETVAL FUNCRTN 1", "GOTO $FUNCRTNGOTO"]);
    }

    #[test]
    fn test_error_undefined_function() {
        let err = expand_err("PRINT\nCALLFUNC MISSING\nFUNC MISSING\nFUNCEND");
        assert_eq!(err.kind(), ErrorKind::UndefinedFunction);
        assert_eq!(err.line(), 2);
        assert_eq!(err.to_string(), "call to undefined function `MISSING`");
    }

    #[test]
    fn test_error_nested_function() {
        let err = expand_err("FUNC A\nFUNC B\nFUNCEND\nFUNCEND");
        assert_eq!(err.kind(), ErrorKind::NestedFunction);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_error_nested_checked_before_duplicate() {
        let err = expand_err("FUNC A\nFUNC A");
        assert_eq!(err.kind(), ErrorKind::NestedFunction);
    }

    #[test]
    fn test_error_duplicate_function() {
        let err = expand_err("FUNC A\nFUNCEND\n\nFUNC A\nFUNCEND");
        assert_eq!(err.kind(), ErrorKind::DuplicateFunction);
        assert_eq!(err.line(), 4);
        assert!(matches!(err, ExpansionError::DuplicateFunction { first_line: 1, .. }));
    }

    #[test]
    fn test_error_unmatched_funcend() {
        let err = expand_err("FUNC A\nFUNCEND\nFUNCEND");
        assert_eq!(err.kind(), ErrorKind::UnmatchedFuncEnd);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_error_unterminated_points_at_func() {
        let err = expand_err("PRINT\n  FUNC OPEN\nPRINT body\n");
        assert_eq!(err.kind(), ErrorKind::UnterminatedFunction);
        assert_eq!(err.line(), 2);
        assert_eq!(err.span(), SourceSpan::from((8, 9)));
    }

    #[test]
    fn test_error_missing_operand() {
        let err = expand_err("FUNC\nFUNCEND");
        assert_eq!(err.kind(), ErrorKind::MissingOperand);
        assert_eq!(err.line(), 1);
        assert_eq!(expand_err("CALLFUNC").kind(), ErrorKind::MissingOperand);
    }

    #[test]
    fn test_options_without_markers() {
        let options = ExpandOptions::default().with_markers(false);
        let expansion = expand_source("test.lb", "FUNC A\nFUNCEND", &options).unwrap();
        assert_eq!(
            expansion.lines(),
            &["GOTO SKIPFUNC0", "LBL FUNC0", "GOTO $FUNCRTNGOTO", "LBL SKIPFUNC0"]
        );
    }

    #[test]
    fn test_options_without_trimming() {
        let options = ExpandOptions::default().with_trim_lines(false);
        let expansion = expand_source("test.lb", "  PRINT x  \n  FUNC A\nFUNCEND", &options).unwrap();
        assert_eq!(expansion.lines()[0], "  PRINT x  ");
        assert_eq!(expansion.lines()[1], "# FUNC A");
    }

    #[test]
    fn test_render_trailing_newline() {
        let expansion = expand_source("test.lb", "A\nB", &ExpandOptions::default()).unwrap();
        assert_eq!(expansion.render(), "A\nB\n");

        let options = ExpandOptions::default().with_trailing_newline(false);
        let expansion = expand_source("test.lb", "A\nB", &options).unwrap();
        assert_eq!(expansion.render(), "A\nB");

        let empty = expand_source("test.lb", "", &ExpandOptions::default()).unwrap();
        assert_eq!(empty.render(), "");
    }

    #[test]
    fn test_expand_lines_matches_source() {
        let options = ExpandOptions::default();
        let from_lines = expand_lines(["FUNC A", "FUNCEND", "CALLFUNC A"], &options).unwrap();
        let from_source = expand_source("x", "FUNC A\nFUNCEND\nCALLFUNC A\n", &options).unwrap();
        assert_eq!(from_lines, from_source);
    }

    #[test]
    fn test_expand_lines_keeps_blank_lines() {
        let options = ExpandOptions::default();

        let expansion = expand_lines(["PRINT a", ""], &options).unwrap();
        assert_eq!(expansion.lines(), &["PRINT a", ""]);

        let expansion = expand_lines([""], &options).unwrap();
        assert_eq!(expansion.lines(), &[""]);
        assert_eq!(expansion.render(), "\n");
    }

    #[test]
    fn test_expand_lines_verbatim_without_trimming() {
        let options = ExpandOptions::default().with_trim_lines(false);
        let expansion = expand_lines(["PRINT a\r", "  "], &options).unwrap();
        assert_eq!(expansion.lines(), &["PRINT a\r", "  "]);
    }

    #[test]
    fn test_expand_lines_error_position() {
        let err = expand_lines(["PRINT", "", "FUNCEND"], &ExpandOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmatchedFuncEnd);
        assert_eq!(err.line(), 3);
        assert_eq!(err.span(), SourceSpan::from((7, 7)));
    }

    #[test]
    fn test_nested_call_warning_does_not_change_output() {
        let source = "FUNC A\nFUNCEND\nFUNC B\nCALLFUNC A\nFUNCEND";
        let warned = expand(source).unwrap();
        let options = ExpandOptions::default().with_warn_nested_calls(false);
        let quiet = expand_source("test.lb", source, &options).unwrap();
        assert_eq!(quiet.lines(), warned.as_slice());
    }

    #[test]
    fn test_definition_counter_overflow() {
        let mut expander = Expander::default();
        expander.next_definition = u32::MAX;
        expander.process_line(SourceLine::new(1, 0, "FUNC A")).unwrap();
        assert!(expander.output().contains(&format!("LBL FUNC{}", u32::MAX)));

        let err = expander.process_line(SourceLine::new(2, 7, "FUNCEND")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LabelOverflow);
        assert_eq!(err.line(), 2);
        assert_eq!(err.to_string(), "too many functions: generated label numbers would repeat");
    }

    #[test]
    fn test_call_site_counter_overflow() {
        let mut expander = Expander::default();
        expander.process_line(SourceLine::new(1, 0, "FUNC A")).unwrap();
        expander.process_line(SourceLine::new(2, 7, "FUNCEND")).unwrap();
        expander.next_call_site = u32::MAX;

        let emitted = expander.output().len();
        let err = expander.process_line(SourceLine::new(3, 15, "CALLFUNC A")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LabelOverflow);
        assert_eq!(err.line(), 3);
        assert_eq!(expander.output().len(), emitted);
    }

    #[test]
    fn test_streaming_expander_state() {
        let mut expander = Expander::default();
        expander.process_line(SourceLine::new(1, 0, "FUNC A")).unwrap();
        assert!(expander.in_function());
        expander.process_line(SourceLine::new(2, 7, "FUNCEND")).unwrap();
        assert!(!expander.in_function());
        assert_eq!(expander.output().len(), 6);
        assert!(expander.finish().is_ok());
    }
}
