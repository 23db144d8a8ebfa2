//! Layout compositor: paint over each source block and set the translation
//! into the same rectangle.
//!
//! Per block:
//! 1. Fill the rectangle, grown by `fill_inset` on every side, with the
//!    background colour so anti-aliased edges of the source glyphs vanish.
//! 2. Pick a font size with [`fit_font_size`] against the original
//!    (non-inset) rectangle.
//! 3. Insert the text at that size with overflow rejected. If the engine
//!    rejects it, insert once more at `min_fontsize` with overflow allowed.
//!
//! Step 3's second insert may run past the box bottom on pathological input;
//! that is accepted. The document is modified in place and nothing is rolled
//! back: on a hard failure the whole run restarts from the source file.

use crate::config::LayoutOptions;
use crate::output::{ComposeReport, TranslatedBlock, TranslatedPage};
use crate::pipeline::engine::{Align, LayoutDocument, Overflow, TextStyle};
use crate::pipeline::fit::fit_font_size;
use tracing::{debug, warn};

/// Compose every page of `pages` into `doc`.
///
/// Pages whose index is past the end of `doc` are skipped with a warning.
/// Pages of `doc` not listed in `pages` are left untouched.
pub fn compose<D: LayoutDocument + ?Sized>(
    doc: &mut D,
    pages: &[TranslatedPage],
    opts: &LayoutOptions,
) -> ComposeReport {
    let mut report = ComposeReport::default();
    let total = doc.page_count();

    for page in pages {
        if page.page_index >= total {
            warn!(
                "Skipping page {} during composition (out of range, total={})",
                page.page_index + 1,
                total
            );
            continue;
        }
        let page_report = compose_page(doc, page, opts);
        report.blocks_written += page_report.blocks_written;
        report.blocks_shrunk += page_report.blocks_shrunk;
        report.floor_fallbacks += page_report.floor_fallbacks;
        report.failed_inserts += page_report.failed_inserts;
        report.failed_fills += page_report.failed_fills;
    }

    debug!(
        "Composed {} blocks ({} shrunk, {} floor retries, {} failed)",
        report.blocks_written, report.blocks_shrunk, report.floor_fallbacks, report.failed_inserts
    );
    report
}

/// Compose the blocks of one page.
pub fn compose_page<D: LayoutDocument + ?Sized>(
    doc: &mut D,
    page: &TranslatedPage,
    opts: &LayoutOptions,
) -> ComposeReport {
    let mut report = ComposeReport::default();
    for block in &page.blocks {
        compose_block(doc, block, opts, &mut report);
    }
    report
}

fn compose_block<D: LayoutDocument + ?Sized>(
    doc: &mut D,
    block: &TranslatedBlock,
    opts: &LayoutOptions,
    report: &mut ComposeReport,
) {
    let page = block.page_index;

    if let Err(e) = doc.fill_rect(page, block.rect.expand(opts.fill_inset), opts.background) {
        warn!("Block {}: background fill failed: {}", block.id(), e);
        report.failed_fills += 1;
    }

    let fit = fit_font_size(&block.rect, &block.text, &opts.fit);
    if fit.fontsize < opts.fit.initial_fontsize {
        report.blocks_shrunk += 1;
    }

    let mut style = TextStyle {
        fontsize: fit.fontsize,
        line_spacing: opts.fit.line_spacing,
        glyph_width_factor: opts.fit.glyph_width_factor,
        align: Align::Left,
        overflow: Overflow::Reject,
    };

    match doc.insert_text(page, block.rect, &block.text, &style) {
        Ok(()) => {
            report.blocks_written += 1;
            return;
        }
        Err(e) => warn!(
            "Block {}: insert at {}pt rejected ({}), retrying at {}pt",
            block.id(),
            fit.fontsize,
            e,
            opts.fit.min_fontsize
        ),
    }

    report.floor_fallbacks += 1;
    style.fontsize = opts.fit.min_fontsize;
    style.overflow = Overflow::Allow;
    match doc.insert_text(page, block.rect, &block.text, &style) {
        Ok(()) => report.blocks_written += 1,
        Err(e) => {
            warn!("Block {}: floor-size insert failed: {}", block.id(), e);
            report.failed_inserts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LayoutError, PdfTranslateError};
    use crate::output::{Outcome, Rect};
    use crate::pipeline::engine::RawBlock;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Fill(usize, Rect),
        Insert(usize, Rect, String, f32, Overflow),
    }

    /// Records draw calls; rejects strict inserts when `reject_strict` is set.
    struct Recorder {
        pages: usize,
        ops: Vec<Op>,
        reject_strict: bool,
        fail_all_inserts: bool,
    }

    impl Recorder {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                ops: Vec::new(),
                reject_strict: false,
                fail_all_inserts: false,
            }
        }
    }

    impl LayoutDocument for Recorder {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn raw_blocks(&self, _: usize) -> Result<Vec<RawBlock>, PdfTranslateError> {
            Ok(Vec::new())
        }

        fn fill_rect(&mut self, page: usize, rect: Rect, _: [u8; 3]) -> Result<(), LayoutError> {
            self.ops.push(Op::Fill(page, rect));
            Ok(())
        }

        fn insert_text(
            &mut self,
            page: usize,
            rect: Rect,
            text: &str,
            style: &TextStyle,
        ) -> Result<(), LayoutError> {
            if self.fail_all_inserts || (self.reject_strict && style.overflow == Overflow::Reject) {
                return Err(LayoutError::TextOverflow {
                    needed: 100.0,
                    available: rect.height(),
                });
            }
            self.ops.push(Op::Insert(
                page,
                rect,
                text.to_string(),
                style.fontsize,
                style.overflow,
            ));
            Ok(())
        }
    }

    fn page(page_index: usize, rect: Rect, text: &str) -> TranslatedPage {
        TranslatedPage {
            page_index,
            blocks: vec![TranslatedBlock {
                page_index,
                block_index: 0,
                rect,
                source_text: "src".into(),
                text: text.into(),
                outcome: Outcome::Translated,
            }],
        }
    }

    #[test]
    fn fills_inset_rect_then_inserts_in_original() {
        let mut doc = Recorder::new(2);
        let rect = Rect::new(0.0, 0.0, 100.0, 20.0);
        let report = compose(&mut doc, &[page(0, rect, "Hello")], &LayoutOptions::default());

        assert_eq!(
            doc.ops,
            vec![
                Op::Fill(0, Rect::new(-0.5, -0.5, 100.5, 20.5)),
                Op::Insert(0, rect, "Hello".into(), 10.0, Overflow::Reject),
            ]
        );
        assert_eq!(report.blocks_written, 1);
        assert_eq!(report.blocks_shrunk, 0);
    }

    #[test]
    fn oversized_text_lands_at_the_floor() {
        let mut doc = Recorder::new(1);
        let rect = Rect::new(0.0, 0.0, 50.0, 15.0);
        let text = "a".repeat(500);
        let report = compose(&mut doc, &[page(0, rect, &text)], &LayoutOptions::default());

        assert!(matches!(doc.ops[1], Op::Insert(0, _, _, size, _) if size == 6.0));
        assert_eq!(report.blocks_shrunk, 1);
        assert_eq!(report.blocks_written, 1);
    }

    #[test]
    fn engine_rejection_retries_once_at_floor() {
        let mut doc = Recorder::new(1);
        doc.reject_strict = true;
        let rect = Rect::new(0.0, 0.0, 100.0, 20.0);
        let report = compose(&mut doc, &[page(0, rect, "Hello")], &LayoutOptions::default());

        assert_eq!(
            doc.ops[1],
            Op::Insert(0, rect, "Hello".into(), 6.0, Overflow::Allow)
        );
        assert_eq!(report.floor_fallbacks, 1);
        assert_eq!(report.blocks_written, 1);
        assert_eq!(report.failed_inserts, 0);
    }

    #[test]
    fn failed_floor_insert_is_counted_not_fatal() {
        let mut doc = Recorder::new(1);
        doc.fail_all_inserts = true;
        let rect = Rect::new(0.0, 0.0, 100.0, 20.0);
        let pages = [page(0, rect, "Hello"), page(0, rect, "World")];
        let report = compose(&mut doc, &pages, &LayoutOptions::default());

        assert_eq!(report.failed_inserts, 2);
        assert_eq!(report.blocks_written, 0);
        // Both backgrounds were still painted.
        assert_eq!(doc.ops.len(), 2);
    }

    #[test]
    fn out_of_range_pages_are_skipped() {
        let mut doc = Recorder::new(1);
        let rect = Rect::new(0.0, 0.0, 100.0, 20.0);
        let report = compose(&mut doc, &[page(3, rect, "Hello")], &LayoutOptions::default());
        assert!(doc.ops.is_empty());
        assert_eq!(report, ComposeReport::default());
    }
}
