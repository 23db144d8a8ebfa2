//! Block extraction: raw engine blocks → validated [`TextBlock`]s per page.
//!
//! Many raw blocks are decorative or whitespace-only; those are skipped
//! silently, not reported as errors. What survives is trimmed, non-empty,
//! has a proper rectangle, and carries a `block_index` that is its position
//! among the *accepted* blocks of the page. That index is the identity the
//! rest of the pipeline keys on.

use crate::error::PdfTranslateError;
use crate::output::{ExtractedPage, TextBlock};
use crate::pipeline::engine::{LayoutDocument, RawBlock};
use tracing::{debug, warn};

/// Validate one raw block; `None` means "skip".
pub fn accept_raw_block(raw: &RawBlock, page_index: usize, block_index: usize) -> Option<TextBlock> {
    let rect = raw.bounds?;
    let text = raw.text.as_deref()?.trim();

    if text.is_empty() {
        return None;
    }
    if !rect.is_well_formed() {
        debug!(
            "Page {}: skipping block with degenerate bounds {:?}",
            page_index + 1,
            rect
        );
        return None;
    }

    Some(TextBlock {
        page_index,
        block_index,
        rect,
        text: text.to_string(),
    })
}

/// Turn the raw blocks of one page into accepted blocks, preserving order.
pub fn accept_page(page_index: usize, raw: &[RawBlock]) -> ExtractedPage {
    let mut blocks = Vec::with_capacity(raw.len());
    for r in raw {
        if let Some(block) = accept_raw_block(r, page_index, blocks.len()) {
            blocks.push(block);
        }
    }
    debug!(
        "Page {}: {} raw blocks → {} accepted",
        page_index + 1,
        raw.len(),
        blocks.len()
    );
    ExtractedPage { page_index, blocks }
}

/// Extract the selected pages of `doc` in document order.
///
/// `page_indices` are 0-based; indices past the end of the document are
/// skipped with a warning. A page whose text layer cannot be read is skipped
/// the same way and left untouched; any other engine error is fatal.
pub fn extract_pages<D: LayoutDocument + ?Sized>(
    doc: &D,
    page_indices: &[usize],
) -> Result<Vec<ExtractedPage>, PdfTranslateError> {
    let total = doc.page_count();
    let mut pages = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total {
            warn!("Skipping page {} (out of range, total={})", idx + 1, total);
            continue;
        }
        match doc.raw_blocks(idx) {
            Ok(raw) => pages.push(accept_page(idx, &raw)),
            Err(e @ PdfTranslateError::ExtractionFailed { .. }) => {
                warn!("Skipping page {}: {}", idx + 1, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(pages)
}

/// Extract every page of `doc`.
pub fn extract_all<D: LayoutDocument + ?Sized>(
    doc: &D,
) -> Result<Vec<ExtractedPage>, PdfTranslateError> {
    let indices: Vec<usize> = (0..doc.page_count()).collect();
    extract_pages(doc, &indices)
}
