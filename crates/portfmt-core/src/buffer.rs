//! The raw-line buffer: the original source text, split and indexed from 1.

use portfmt_base::LineRange;

/// Owns the input text split into lines, indexed from 1. Every [`Token`]
/// carries a [`LineRange`] that refers back into this buffer, so unedited
/// regions can be emitted verbatim rather than re-rendered.
///
/// [`Token`]: crate::token::Token
#[derive(Debug, Clone, Default)]
pub struct RawLines {
    lines: Vec<String>,
}

impl RawLines {
    /// Splits `text` into lines (trailing newline, if any, is not retained
    /// as part of the last line).
    pub fn new(text: &str) -> Self {
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            text.lines().map(str::to_string).collect()
        };
        RawLines { lines }
    }

    /// Returns the 1-indexed line `n`, or `None` if out of bounds.
    pub fn get(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.lines.get(n - 1).map(String::as_str)
    }

    /// Returns the number of lines in the buffer.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the buffer holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the lines covered by `range`, verbatim.
    pub fn slice(&self, range: LineRange) -> &[String] {
        let start = range.start.saturating_sub(1).min(self.lines.len());
        let end = range.end.saturating_sub(1).min(self.lines.len());
        &self.lines[start..end]
    }

    /// Appends a line, returning the 1-indexed line number it was stored
    /// at. Used by edit passes that synthesise wholly new lines (e.g. the
    /// merge engine inserting a variable that did not exist in the
    /// primary).
    pub fn push(&mut self, line: String) -> usize {
        self.lines.push(line);
        self.lines.len()
    }

    /// Iterates over all lines with their 1-indexed line numbers.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i + 1, l.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_indexes_from_one() {
        let buf = RawLines::new("a\nb\nc");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get(1), Some("a"));
        assert_eq!(buf.get(3), Some("c"));
        assert_eq!(buf.get(0), None);
        assert_eq!(buf.get(4), None);
    }

    #[test]
    fn empty_text_is_empty_buffer() {
        let buf = RawLines::new("");
        assert!(buf.is_empty());
    }

    #[test]
    fn slice_returns_range_verbatim() {
        let buf = RawLines::new("a\nb\nc\nd");
        let range = LineRange::new(2, 4);
        assert_eq!(buf.slice(range), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn push_appends_and_returns_new_line_number() {
        let mut buf = RawLines::new("a\nb");
        let n = buf.push("c".to_string());
        assert_eq!(n, 3);
        assert_eq!(buf.get(3), Some("c"));
    }
}
