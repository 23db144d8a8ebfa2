//! Progress-callback trait for per-block translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events while the pipeline works through the blocks. Progress is purely
//! informational: nothing in the pipeline depends on what a callback does.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_translate::{BlockId, Outcome, TranslationConfig, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for FallbackCounter {
//!     fn on_block_complete(&self, _id: BlockId, _done: usize, _total: usize, outcome: &Outcome) {
//!         if outcome.is_fallback() {
//!             self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(FallbackCounter { fallbacks: AtomicUsize::new(0) });
//! let config = TranslationConfig::builder()
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BlockId, Outcome};
use std::sync::Arc;

/// Called by the translation pipeline as it resolves each block.
///
/// `on_block_start` may be called concurrently from up to `concurrency`
/// workers. `on_block_complete` is called from the collector, one block at a
/// time, in completion order.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before any block is dispatched.
    fn on_translation_start(&self, total_blocks: usize) {
        let _ = total_blocks;
    }

    /// Called just before a block's first backend call.
    fn on_block_start(&self, id: BlockId) {
        let _ = id;
    }

    /// Called when a block reaches its terminal state.
    ///
    /// # Arguments
    /// * `completed` — blocks resolved so far, this one included
    /// * `total`     — blocks in the run
    /// * `outcome`   — translated, or the fallback reason
    fn on_block_complete(&self, id: BlockId, completed: usize, total: usize, outcome: &Outcome) {
        let _ = (id, completed, total, outcome);
    }

    /// Called once after every block has resolved.
    fn on_translation_complete(&self, total_blocks: usize, translated: usize, fallbacks: usize) {
        let _ = (total_blocks, translated, fallbacks);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
