//! Streaming translation API: emit block results as they resolve.
//!
//! [`crate::pipeline::translate::translate_all`] waits for every block and
//! hands back a map. [`translate_stream`] is the layer underneath it: the
//! same bounded fan-out, exposed as a `Stream` so callers can show partial
//! results or drive their own progress UI. Results arrive in completion
//! order, not document order; key them by [`crate::output::BlockId`].

use crate::config::TranslationConfig;
use crate::output::{ExtractedPage, TranslationResult};
use crate::pipeline::backend::Translator;
use crate::pipeline::translate::{tasks_from_pages, translate_task, LanguagePair};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of block results.
pub type ResultStream = Pin<Box<dyn Stream<Item = TranslationResult> + Send>>;

/// Translate every block of `pages`, yielding one result per block.
///
/// At most `config.concurrency` backend calls are in flight at once. Each
/// item is terminal: failures have already been absorbed into a fallback
/// [`crate::output::Outcome`]. The run deadline, if any, starts counting
/// when this function is called.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_translate::{resolve_translator, translate_stream, TranslationConfig};
/// use futures::StreamExt;
///
/// # async fn demo(pages: Vec<edgequake_pdf_translate::ExtractedPage>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = TranslationConfig::default();
/// let translator = resolve_translator(&config)?;
/// let mut results = translate_stream(&pages, translator, &config);
/// while let Some(r) = results.next().await {
///     println!("{} → {}", r.id, r.translated_text);
/// }
/// # Ok(())
/// # }
/// ```
pub fn translate_stream(
    pages: &[ExtractedPage],
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> ResultStream {
    let tasks = tasks_from_pages(pages);
    let total = tasks.len();
    let policy = config.retry_policy();
    let langs = LanguagePair::from_config(config);
    let deadline = config
        .deadline_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let progress = config.progress_callback.clone();
    let concurrency = config.concurrency.max(1);

    debug!(
        "Dispatching {} tasks, concurrency={}, deadline={:?}",
        total, concurrency, config.deadline_secs
    );
    if let Some(ref cb) = progress {
        cb.on_translation_start(total);
    }

    let worker_progress = progress.clone();
    let results = stream::iter(tasks.into_iter().map(move |task| {
        let translator = Arc::clone(&translator);
        let langs = langs.clone();
        let progress = worker_progress.clone();
        async move {
            translate_task(
                translator.as_ref(),
                task,
                &langs,
                &policy,
                deadline,
                progress.as_deref(),
            )
            .await
        }
    }))
    .buffer_unordered(concurrency);

    let mut completed = 0usize;
    let reported = results.map(move |result| {
        completed += 1;
        if let Some(ref cb) = progress {
            cb.on_block_complete(result.id, completed, total, &result.outcome);
        }
        result
    });

    Box::pin(reported)
}
