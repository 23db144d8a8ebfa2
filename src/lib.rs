//! # edgequake-pdf-translate
//!
//! Translate PDF documents in place: every text block is painted over and
//! refilled with its translation at the same position, so the page layout
//! survives.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file, URL download, or in-memory bytes
//!  ├─ 2. Extract   positioned text blocks via pdfium (spawn_blocking)
//!  ├─ 3. Translate bounded concurrent backend calls, retry with backoff,
//!  │               source text kept when a block cannot be translated
//!  ├─ 4. Compose   paint over each block, shrink the font until it fits
//!  └─ 5. Output    new PDF + per-block outcomes and stats
//! ```
//!
//! A run either fails up front (unreadable input, backend not configured)
//! or produces a document in which every extracted block holds translated
//! or original text. Backend outages and oversized translations degrade
//! individual blocks; they never abort the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_translate::{translate_pdf, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Google web endpoint by default; no API key needed.
//!     let config = TranslationConfig::builder()
//!         .source_lang("fr")
//!         .target_lang("en")
//!         .concurrency(4)
//!         .build()?;
//!     let output = translate_pdf("rapport.pdf", "rapport_en.pdf", &config).await?;
//!     eprintln!(
//!         "{}/{} blocks translated, {} kept source text",
//!         output.stats.translated_blocks,
//!         output.stats.total_blocks,
//!         output.stats.fallback_blocks
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | Backend | Key | Notes |
//! |---------|-----|-------|
//! | [`Backend::Google`] | none | Public web endpoint, rate-limited; keep concurrency low |
//! | [`Backend::Llm`]    | provider key | Any edgequake-llm provider (OpenAI, Anthropic, Gemini, Ollama, …) |
//!
//! Any type implementing [`Translator`] can be plugged in with
//! [`TranslationConfigBuilder::translator`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ```toml
//! edgequake-pdf-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Backend, FitOptions, LayoutOptions, PageSelection, RetryPolicy, TranslationConfig,
    TranslationConfigBuilder,
};
pub use error::{LayoutError, PdfTranslateError, TranslateError};
pub use output::{
    BlockId, ComposeReport, ExtractedPage, FallbackReason, Outcome, Rect, TextBlock,
    TranslatedBlock, TranslatedPage, TranslationOutput, TranslationResult, TranslationStats,
    TranslationTask,
};
pub use pipeline::backend::{resolve_translator, GoogleTranslator, LlmTranslator, Translator};
pub use pipeline::engine::{LayoutDocument, RawBlock, TextStyle};
pub use pipeline::translate::{translate_all, TranslationMap};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use run::{
    inspect, translate_document, translate_document_with, translate_pdf,
    translate_pdf_from_bytes, translate_pdf_sync,
};
pub use stream::{translate_stream, ResultStream};
