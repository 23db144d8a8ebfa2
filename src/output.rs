//! Data records flowing between the pipeline stages.
//!
//! Every record is immutable once built. Stages never mutate a block in
//! place; they produce new records keyed by [`BlockId`], which is what lets
//! translation results arrive in any order and still land on the right
//! rectangle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in page space.
///
/// Origin is the top-left corner of the page, y grows downward, units are PDF
/// points. A well-formed rectangle has `x0 < x1` and `y0 < y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when all coordinates are finite and the rectangle has area.
    pub fn is_well_formed(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 < self.x1
            && self.y0 < self.y1
    }

    /// Grow the rectangle by `by` on every side.
    pub fn expand(&self, by: f32) -> Self {
        Self {
            x0: self.x0 - by,
            y0: self.y0 - by,
            x1: self.x1 + by,
            y1: self.y1 + by,
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Stable identity of a text block: `(page_index, block_index)`, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    pub page_index: usize,
    pub block_index: usize,
}

impl BlockId {
    pub const fn new(page_index: usize, block_index: usize) -> Self {
        Self {
            page_index,
            block_index,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}:b{}", self.page_index + 1, self.block_index)
    }
}

/// A positioned, non-empty, trimmed run of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub page_index: usize,
    pub block_index: usize,
    #[serde(flatten)]
    pub rect: Rect,
    pub text: String,
}

impl TextBlock {
    pub fn id(&self) -> BlockId {
        BlockId::new(self.page_index, self.block_index)
    }
}

/// All accepted blocks of one page, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub page_index: usize,
    pub blocks: Vec<TextBlock>,
}

/// One unit of translation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationTask {
    pub id: BlockId,
    pub source_text: String,
}

impl From<&TextBlock> for TranslationTask {
    fn from(block: &TextBlock) -> Self {
        Self {
            id: block.id(),
            source_text: block.text.clone(),
        }
    }
}

/// Why a block kept its source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// The backend answered with nothing usable; not retried.
    EmptyResult,
    /// Every attempt failed; carries the last error message.
    RetriesExhausted { last_error: String },
    /// The run deadline passed before the task resolved.
    DeadlineExceeded,
    /// No result was collected for this identity.
    Missing,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::EmptyResult => write!(f, "empty result"),
            FallbackReason::RetriesExhausted { last_error } => {
                write!(f, "retries exhausted: {last_error}")
            }
            FallbackReason::DeadlineExceeded => write!(f, "deadline exceeded"),
            FallbackReason::Missing => write!(f, "missing result"),
        }
    }
}

/// Terminal state of a translation task. There is no failure variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Translated,
    Fallback(FallbackReason),
}

impl Outcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }
}

/// The resolved text for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub id: BlockId,
    /// Never empty: the translation, or the source text on fallback.
    pub translated_text: String,
    pub outcome: Outcome,
    /// Backend calls made for this block (0 when resolved before the first call).
    pub attempts: u32,
}

/// A source block paired with its resolved text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedBlock {
    pub page_index: usize,
    pub block_index: usize,
    #[serde(flatten)]
    pub rect: Rect,
    pub source_text: String,
    pub text: String,
    pub outcome: Outcome,
}

impl TranslatedBlock {
    pub fn id(&self) -> BlockId {
        BlockId::new(self.page_index, self.block_index)
    }
}

/// Translated blocks of one page, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslatedPage {
    pub page_index: usize,
    pub blocks: Vec<TranslatedBlock>,
}

/// What the compositor did with the blocks it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeReport {
    /// Blocks whose text reached the page.
    pub blocks_written: usize,
    /// Blocks committed below the initial font size.
    pub blocks_shrunk: usize,
    /// Blocks that needed the floor-size retry.
    pub floor_fallbacks: usize,
    /// Blocks whose text could not be inserted even at the floor size.
    pub failed_inserts: usize,
    /// Background fills the engine rejected.
    pub failed_fills: usize,
}

/// Run statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages selected for translation.
    pub translated_pages: usize,
    pub total_blocks: usize,
    pub translated_blocks: usize,
    pub fallback_blocks: usize,
    /// Backend calls across all blocks, retries included.
    pub total_attempts: u64,
    pub compose: ComposeReport,
    pub extract_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    pub pages: Vec<TranslatedPage>,
    pub stats: TranslationStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_expand_and_dimensions() {
        let r = Rect::new(10.0, 20.0, 110.0, 40.0);
        assert_eq!(r.width(), 100.0);
        assert_eq!(r.height(), 20.0);
        assert_eq!(r.expand(0.5), Rect::new(9.5, 19.5, 110.5, 40.5));
    }

    #[test]
    fn rect_well_formed() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!Rect::new(1.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!Rect::new(0.0, 5.0, 1.0, 1.0).is_well_formed());
        assert!(!Rect::new(0.0, 0.0, f32::NAN, 1.0).is_well_formed());
    }

    #[test]
    fn block_id_display_is_one_based_page() {
        assert_eq!(BlockId::new(0, 3).to_string(), "p1:b3");
    }

    #[test]
    fn text_block_serialises_flat_coordinates() {
        let b = TextBlock {
            page_index: 0,
            block_index: 0,
            rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            text: "Bonjour".into(),
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["x1"], 100.0);
        assert_eq!(v["text"], "Bonjour");
    }
}
