//! Full-document entry points: extract → translate → compose.
//!
//! [`translate_pdf`] is the main API: it resolves the input, extracts the
//! text blocks, translates them, and writes a new PDF with every block
//! painted over and refilled. Only the fatal error class reaches the caller;
//! backend failures and layout rejections are absorbed per block and show up
//! in [`TranslationStats`].
//!
//! [`translate_document`] runs the same three stages against any open
//! [`LayoutDocument`], which is how the pipeline is exercised without pdfium.

use crate::config::TranslationConfig;
use crate::error::PdfTranslateError;
use crate::output::{ComposeReport, ExtractedPage, TranslationOutput, TranslationStats};
use crate::pipeline::backend::{resolve_translator, Translator};
use crate::pipeline::compose::compose;
use crate::pipeline::engine::LayoutDocument;
use crate::pipeline::extract::extract_pages;
use crate::pipeline::translate::{translate_pages, TranslationMap};
use crate::pipeline::{input, pdfium};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Translate a PDF file or URL and write the result to `output_path`.
///
/// # Returns
/// `Ok(TranslationOutput)` whenever an output document was written, even if
/// every block fell back to its source text (check
/// `output.stats.fallback_blocks`).
///
/// # Errors
/// Only fatal errors: unreadable or non-PDF input, wrong password, no
/// pages selected, backend not configured, output not writable.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_translate::{translate_pdf, TranslationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TranslationConfig::builder()
///     .source_lang("fr")
///     .target_lang("en")
///     .build()?;
/// let output = translate_pdf("rapport.pdf", "rapport_en.pdf", &config).await?;
/// println!("{} blocks translated", output.stats.translated_blocks);
/// # Ok(())
/// # }
/// ```
pub async fn translate_pdf(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, PdfTranslateError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    info!("Starting translation: {} → {}", input_str, output_path.display());

    // ── Step 1: Resolve input and backend ────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();
    let translator = resolve_translator(config)?;

    // ── Step 2: Extract blocks ───────────────────────────────────────────
    let extract_start = Instant::now();
    let (total_pages, pages) = {
        let path = pdf_path.clone();
        let password = config.password.clone();
        let selection = config.pages.clone();
        run_blocking("Extraction", move || {
            pdfium::extract_document(&path, password.as_deref(), &selection)
        })
        .await?
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} blocks from {} pages in {}ms",
        count_blocks(&pages),
        pages.len(),
        extract_duration_ms
    );

    // ── Step 3: Translate ────────────────────────────────────────────────
    let translate_start = Instant::now();
    let (translated, map) = translate_pages(&pages, translator, config).await;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    // ── Step 4: Compose into a fresh copy of the source ──────────────────
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PdfTranslateError::OutputWriteFailed {
                    path: output_path.to_path_buf(),
                    detail: e.to_string(),
                })?;
        }
    }

    let compose_start = Instant::now();
    let report = {
        let input = pdf_path.clone();
        let output = output_path.to_path_buf();
        let password = config.password.clone();
        let layout = config.layout_options();
        let to_compose = translated.clone();
        run_blocking("Composition", move || {
            pdfium::compose_document(&input, password.as_deref(), &output, &to_compose, &layout)
        })
        .await?
    };
    let compose_duration_ms = compose_start.elapsed().as_millis() as u64;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let stats = TranslationStats {
        extract_duration_ms,
        translate_duration_ms,
        compose_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..summarize(total_pages, &pages, &map, report)
    };
    log_summary(&stats);

    Ok(TranslationOutput {
        pages: translated,
        stats,
    })
}

/// Translate PDF bytes held in memory and write the result to `output_path`.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn translate_pdf_from_bytes(
    bytes: &[u8],
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, PdfTranslateError> {
    let resolved = input::resolve_bytes(bytes)?;
    let path = resolved.path().to_string_lossy().to_string();
    translate_pdf(&path, output_path, config).await
}

/// Synchronous wrapper around [`translate_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_pdf_sync(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, PdfTranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfTranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_pdf(input_str, output_path, config))
}

/// Extract the text blocks of a PDF without translating anything.
///
/// Does not need a translation backend.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<Vec<ExtractedPage>, PdfTranslateError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let password = config.password.clone();
    let selection = config.pages.clone();
    let (_, pages) = run_blocking("Extraction", move || {
        pdfium::extract_document(&path, password.as_deref(), &selection)
    })
    .await?;
    Ok(pages)
}

/// Run all three stages against an already open document, in place.
///
/// The configured translator is resolved as in [`translate_pdf`]; page
/// selection applies to `doc`'s page count.
pub async fn translate_document<D: LayoutDocument + ?Sized>(
    doc: &mut D,
    config: &TranslationConfig,
) -> Result<TranslationOutput, PdfTranslateError> {
    let translator = resolve_translator(config)?;
    translate_document_with(doc, translator, config).await
}

/// [`translate_document`] with an explicit translator.
pub async fn translate_document_with<D: LayoutDocument + ?Sized>(
    doc: &mut D,
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, PdfTranslateError> {
    let total_start = Instant::now();
    let total_pages = doc.page_count();
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(PdfTranslateError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }

    let extract_start = Instant::now();
    let pages = extract_pages(doc, &indices)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let translate_start = Instant::now();
    let (translated, map) = translate_pages(&pages, translator, config).await;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    let compose_start = Instant::now();
    let report = compose(doc, &translated, &config.layout_options());
    let compose_duration_ms = compose_start.elapsed().as_millis() as u64;

    let stats = TranslationStats {
        extract_duration_ms,
        translate_duration_ms,
        compose_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..summarize(total_pages, &pages, &map, report)
    };
    log_summary(&stats);

    Ok(TranslationOutput {
        pages: translated,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run pdfium work on the blocking pool.
async fn run_blocking<T, F>(stage: &'static str, f: F) -> Result<T, PdfTranslateError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PdfTranslateError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PdfTranslateError::Internal(format!("{} task panicked: {}", stage, e)))?
}

fn count_blocks(pages: &[ExtractedPage]) -> usize {
    pages.iter().map(|p| p.blocks.len()).sum()
}

/// Block and attempt counts; durations are filled in by the caller.
fn summarize(
    total_pages: usize,
    pages: &[ExtractedPage],
    map: &TranslationMap,
    compose: ComposeReport,
) -> TranslationStats {
    let translated_blocks = map.values().filter(|r| !r.outcome.is_fallback()).count();
    let total_blocks = count_blocks(pages);
    TranslationStats {
        total_pages,
        translated_pages: pages.len(),
        total_blocks,
        translated_blocks,
        fallback_blocks: total_blocks.saturating_sub(translated_blocks),
        total_attempts: map.values().map(|r| r.attempts as u64).sum(),
        compose,
        ..Default::default()
    }
}

fn log_summary(stats: &TranslationStats) {
    info!(
        "Translation complete: {}/{} blocks translated on {} pages, {}ms total",
        stats.translated_blocks, stats.total_blocks, stats.translated_pages, stats.total_duration_ms
    );
    debug!(
        "Backend calls: {}, shrunk: {}, floor retries: {}, failed inserts: {}",
        stats.total_attempts,
        stats.compose.blocks_shrunk,
        stats.compose.floor_fallbacks,
        stats.compose.failed_inserts
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BlockId, FallbackReason, Outcome, Rect, TextBlock, TranslationResult};

    #[test]
    fn summary_counts_missing_results_as_fallbacks() {
        let block = |i| TextBlock {
            page_index: 0,
            block_index: i,
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            text: "x".into(),
        };
        let pages = vec![ExtractedPage {
            page_index: 0,
            blocks: vec![block(0), block(1), block(2)],
        }];
        let mut map = TranslationMap::new();
        map.insert(
            BlockId::new(0, 0),
            TranslationResult {
                id: BlockId::new(0, 0),
                translated_text: "y".into(),
                outcome: Outcome::Translated,
                attempts: 1,
            },
        );
        map.insert(
            BlockId::new(0, 1),
            TranslationResult {
                id: BlockId::new(0, 1),
                translated_text: "x".into(),
                outcome: Outcome::Fallback(FallbackReason::EmptyResult),
                attempts: 3,
            },
        );

        let stats = summarize(4, &pages, &map, ComposeReport::default());
        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.translated_pages, 1);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.fallback_blocks, 2);
        assert_eq!(stats.total_attempts, 4);
    }
}
