//! Source spans and line positions
//!
//! Everything the expander reports points back at a line of its input. This crate
//! splits a source text into [`SourceLine`]s that remember their 1-based line number
//! and the byte range they occupy in the source text.
//!
//! Positions are `u32`. Sources longer than [`MAX_SOURCE_LEN`] must be rejected by
//! the caller; past that limit offsets saturate instead of wrapping.

use std::ops::Range;

/// Largest source text whose byte offsets fit a [`Span`]
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize;

/// Convert a byte length to a `u32` offset, saturating at `u32::MAX`
fn saturating_offset(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// A byte offset span in a source text
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct Span {
    /// First byte of the span
    pub start: u32,
    /// One past the last byte of the span
    pub end: u32,
}

impl Span {
    /// Creates a span covering `start..end`
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Byte range of the span, usable for slicing the source text
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span covers no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A single line of source text together with its position
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourceLine<'src> {
    number: u32,
    span: Span,
    text: &'src str,
}

impl<'src> SourceLine<'src> {
    /// Creates a line starting at byte `offset` of its source
    #[must_use]
    pub fn new(number: u32, offset: u32, text: &'src str) -> Self {
        Self {
            number,
            span: Span::new(offset, offset.saturating_add(saturating_offset(text.len()))),
            text,
        }
    }

    /// 1-based line number
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Bytes of the source covered by this line, excluding the line terminator
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Line contents without the terminator
    #[must_use]
    pub const fn text(&self) -> &'src str {
        self.text
    }
}

/// Iterator over the lines of a source text, see [`lines`]
#[derive(Clone, Debug)]
pub struct Lines<'src> {
    rest: &'src str,
    offset: u32,
    number: u32,
}

/// Splits `source` into lines.
///
/// Both `\n` and `\r\n` terminate a line. A final terminator does not start an
/// extra empty line, so `"a\nb\n"` yields two lines and `""` yields none.
#[must_use]
pub fn lines(source: &str) -> Lines<'_> {
    Lines {
        rest: source,
        offset: 0,
        number: 0,
    }
}

impl<'src> Iterator for Lines<'src> {
    type Item = SourceLine<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let (raw, consumed) = match self.rest.find('\n') {
            Some(end) => (&self.rest[..end], end + 1),
            None => (self.rest, self.rest.len()),
        };
        let text = raw.strip_suffix('\r').unwrap_or(raw);

        self.number = self.number.saturating_add(1);
        let line = SourceLine::new(self.number, self.offset, text);

        self.offset = self.offset.saturating_add(saturating_offset(consumed));
        self.rest = &self.rest[consumed..];

        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_numbers_and_offsets() {
        let source = "FUNC A\n  FUNCEND\nCALLFUNC A\n";
        let collected: Vec<_> = lines(source).collect();

        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].number(), 1);
        assert_eq!(collected[1].text(), "  FUNCEND");
        assert_eq!(collected[1].span(), Span::new(7, 16));
        assert_eq!(&source[collected[2].span().range()], "CALLFUNC A");
        assert_eq!(collected[2].number(), 3);
    }

    #[test]
    fn test_lines_crlf_and_missing_terminator() {
        let source = "a\r\n\r\nb";
        let collected: Vec<_> = lines(source).map(|line| line.text()).collect();
        assert_eq!(collected, vec!["a", "", "b"]);

        let last = lines(source).last().map(|line| line.span());
        assert_eq!(last, Some(Span::new(5, 6)));
    }

    #[test]
    fn test_lines_empty_source() {
        assert_eq!(lines("").count(), 0);
        assert_eq!(lines("\n").count(), 1);
    }

    #[test]
    fn test_offsets_saturate_near_limit() {
        let line = SourceLine::new(1, u32::MAX - 2, "PRINT a");
        assert_eq!(line.span(), Span::new(u32::MAX - 2, u32::MAX));
        assert_eq!(line.text(), "PRINT a");
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(4, 10);
        assert_eq!(span.len(), 6);
        assert!(!span.is_empty());
        assert!(Span::default().is_empty());
    }
}
