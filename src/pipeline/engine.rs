//! The narrow PDF-engine interface the extractor and compositor work against.
//!
//! Only four operations are needed from a PDF engine: count pages, list the
//! raw text blocks of a page, paint a rectangle, and insert wrapped text into
//! a rectangle. Opening and saving are the adapter's business
//! ([`crate::pipeline::pdfium`]), so the stages can be exercised against any
//! implementation, in-memory fakes included.
//!
//! All coordinates crossing this interface are page space: origin top-left,
//! y downward, PDF points.

use crate::error::{LayoutError, PdfTranslateError};
use crate::output::Rect;

/// A text block as the engine reports it, before validation.
///
/// Engines are not trusted to always provide both parts; a block missing
/// either is skipped by the extractor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBlock {
    pub bounds: Option<Rect>,
    pub text: Option<String>,
}

impl RawBlock {
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            bounds: Some(rect),
            text: Some(text.into()),
        }
    }
}

/// Horizontal alignment inside the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// What the engine does when wrapped text is taller than the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Reject with [`LayoutError::TextOverflow`] and draw nothing.
    #[default]
    Reject,
    /// Draw every line, running past the bottom edge if needed.
    Allow,
}

/// How to set a block of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub fontsize: f32,
    pub line_spacing: f32,
    /// Average glyph width relative to font size, used for wrapping.
    pub glyph_width_factor: f32,
    pub align: Align,
    pub overflow: Overflow,
}

/// Operations the pipeline needs from an open PDF document.
pub trait LayoutDocument {
    fn page_count(&self) -> usize;

    /// Raw text blocks of `page` (0-based) in engine order.
    fn raw_blocks(&self, page: usize) -> Result<Vec<RawBlock>, PdfTranslateError>;

    /// Paint a filled rectangle (no stroke).
    fn fill_rect(&mut self, page: usize, rect: Rect, rgb: [u8; 3]) -> Result<(), LayoutError>;

    /// Word-wrap `text` into `rect` and draw it.
    fn insert_text(
        &mut self,
        page: usize,
        rect: Rect,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), LayoutError>;
}

/// Greedy word wrap at `chars_per_line` characters.
///
/// Explicit line breaks are kept. Words longer than a line are split.
pub fn wrap_text(text: &str, chars_per_line: usize) -> Vec<String> {
    let width = chars_per_line.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            // Hard-split words that can never fit on one line.
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > width && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }

        if current_len > 0 || paragraph.trim().is_empty() {
            lines.push(current);
        }
    }

    // Drop trailing blank lines produced by trailing newlines.
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = wrap_text("abcdefghij klm", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "klm"]);
    }

    #[test]
    fn wrap_keeps_explicit_breaks() {
        let lines = wrap_text("one\ntwo three", 20);
        assert_eq!(lines, vec!["one", "two three"]);
    }

    #[test]
    fn wrap_counts_chars_not_bytes() {
        let lines = wrap_text("été été", 3);
        assert_eq!(lines, vec!["été", "été"]);
    }

    #[test]
    fn wrap_empty_text_is_empty() {
        assert!(wrap_text("", 10).is_empty());
        assert!(wrap_text("\n\n", 10).is_empty());
    }
}
