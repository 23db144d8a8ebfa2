//! Translation pipeline: per-block state machine, fan-out/fan-in, reassembly.
//!
//! ## Task lifecycle
//!
//! ```text
//! PENDING ──pacing delay──▶ IN_FLIGHT ──ok──────────────▶ SUCCEEDED
//!                              │  ▲    └─ok, empty──────▶ SUCCEEDED_WITH_FALLBACK
//!                              │  │
//!                          err │  │ backoff elapsed
//!                              ▼  │
//!                           RETRY_WAIT ──retries spent──▶ SUCCEEDED_WITH_FALLBACK
//! ```
//!
//! Both terminal states are successes: a block that cannot be translated
//! keeps its source text, so a bad backend day never leaves a hole in the
//! output document. The backoff before attempt `k + 1` is
//! [`RetryPolicy::backoff`]`(k)`, a pure function of the attempt number.
//!
//! ## Fan-out / fan-in
//!
//! Tasks are fanned out through [`crate::stream::translate_stream`]
//! (`buffer_unordered(concurrency)`), and [`translate_all`] is the collector:
//! it owns the result map, so workers never share mutable state.

use crate::config::{RetryPolicy, TranslationConfig};
use crate::error::TranslateError;
use crate::output::{
    BlockId, ExtractedPage, FallbackReason, Outcome, TranslatedBlock, TranslatedPage,
    TranslationResult, TranslationTask,
};
use crate::pipeline::backend::Translator;
use crate::pipeline::postprocess::clean_translation;
use crate::progress::TranslationProgressCallback;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Result map addressed by block identity.
pub type TranslationMap = HashMap<BlockId, TranslationResult>;

/// Source and target language codes of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(config.source_lang.clone(), config.target_lang.clone())
    }
}

/// State of one translation task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    /// Backend call number `attempt` (1-based) is about to be / being made.
    InFlight { attempt: u32 },
    /// Call `attempt` failed; waiting `delay` before the next one.
    RetryWait { attempt: u32, delay: std::time::Duration },
    Succeeded { text: String },
    SucceededWithFallback(FallbackReason),
}

impl TaskState {
    /// Transition out of `InFlight { attempt }` given that call's result.
    pub fn after_call(attempt: u32, result: Result<String, TranslateError>, policy: &RetryPolicy) -> Self {
        match result {
            Ok(raw) => {
                let text = clean_translation(&raw);
                if text.is_empty() {
                    TaskState::SucceededWithFallback(FallbackReason::EmptyResult)
                } else {
                    TaskState::Succeeded { text }
                }
            }
            Err(e) if policy.is_exhausted(attempt) => {
                TaskState::SucceededWithFallback(FallbackReason::RetriesExhausted {
                    last_error: e.to_string(),
                })
            }
            Err(_) => TaskState::RetryWait {
                attempt,
                delay: policy.backoff(attempt),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded { .. } | TaskState::SucceededWithFallback(_)
        )
    }
}

/// Flatten pages into the unordered task set.
pub fn tasks_from_pages(pages: &[ExtractedPage]) -> Vec<TranslationTask> {
    pages
        .iter()
        .flat_map(|p| p.blocks.iter().map(TranslationTask::from))
        .collect()
}

/// Drive one task to a terminal state.
///
/// Never fails. With a `deadline`, a task still unresolved when it passes
/// resolves to its source text immediately.
pub async fn translate_task(
    translator: &dyn Translator,
    task: TranslationTask,
    langs: &LanguagePair,
    policy: &RetryPolicy,
    deadline: Option<Instant>,
    progress: Option<&dyn TranslationProgressCallback>,
) -> TranslationResult {
    let attempts = AtomicU32::new(0);
    let run = run_task(translator, &task, langs, policy, progress, &attempts);

    let (translated_text, outcome) = match deadline {
        Some(d) => match timeout_at(d, run).await {
            Ok(resolved) => resolved,
            Err(_) => {
                warn!("Block {}: deadline exceeded, keeping source text", task.id);
                (
                    task.source_text.clone(),
                    Outcome::Fallback(FallbackReason::DeadlineExceeded),
                )
            }
        },
        None => run.await,
    };

    TranslationResult {
        id: task.id,
        translated_text,
        outcome,
        attempts: attempts.load(Ordering::SeqCst),
    }
}

async fn run_task(
    translator: &dyn Translator,
    task: &TranslationTask,
    langs: &LanguagePair,
    policy: &RetryPolicy,
    progress: Option<&dyn TranslationProgressCallback>,
    attempts: &AtomicU32,
) -> (String, Outcome) {
    let mut state = TaskState::Pending;
    loop {
        state = match state {
            TaskState::Pending => {
                if !policy.per_call_delay.is_zero() {
                    sleep(policy.per_call_delay).await;
                }
                if let Some(cb) = progress {
                    cb.on_block_start(task.id);
                }
                TaskState::InFlight { attempt: 1 }
            }
            TaskState::InFlight { attempt } => {
                attempts.store(attempt, Ordering::SeqCst);
                let result = call_backend(translator, &task.source_text, langs, policy).await;
                if let Err(ref e) = result {
                    if policy.is_exhausted(attempt) {
                        warn!(
                            "Block {}: attempt {} failed, giving up: {}",
                            task.id, attempt, e
                        );
                    } else {
                        warn!(
                            "Block {}: attempt {} failed, retrying in {}ms: {}",
                            task.id,
                            attempt,
                            policy.backoff(attempt).as_millis(),
                            e
                        );
                    }
                }
                TaskState::after_call(attempt, result, policy)
            }
            TaskState::RetryWait { attempt, delay } => {
                sleep(delay).await;
                TaskState::InFlight {
                    attempt: attempt.saturating_add(1),
                }
            }
            TaskState::Succeeded { text } => {
                debug!("Block {}: translated", task.id);
                return (text, Outcome::Translated);
            }
            TaskState::SucceededWithFallback(reason) => {
                debug!("Block {}: keeping source text ({})", task.id, reason);
                return (task.source_text.clone(), Outcome::Fallback(reason));
            }
        };
    }
}

/// One backend call bounded by the per-call timeout.
async fn call_backend(
    translator: &dyn Translator,
    text: &str,
    langs: &LanguagePair,
    policy: &RetryPolicy,
) -> Result<String, TranslateError> {
    match timeout(
        policy.call_timeout,
        translator.translate(text, &langs.source, &langs.target),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(TranslateError::Timeout {
            secs: policy.call_timeout.as_secs(),
        }),
    }
}

/// Translate every block of `pages`, returning one result per block identity.
///
/// Waits for all tasks. Results are collected in completion order.
pub async fn translate_all(
    pages: &[ExtractedPage],
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> TranslationMap {
    let total: usize = pages.iter().map(|p| p.blocks.len()).sum();
    info!(
        "Translating {} blocks ({} → {}) with {} workers via {}",
        total,
        config.source_lang,
        config.target_lang,
        config.concurrency,
        translator.name()
    );

    let mut map = TranslationMap::with_capacity(total);
    let mut results = crate::stream::translate_stream(pages, translator, config);
    while let Some(result) = results.next().await {
        if let Some(previous) = map.insert(result.id, result) {
            warn!("Block {}: duplicate identity in input, keeping the later result", previous.id);
        }
    }

    let fallbacks = map.values().filter(|r| r.outcome.is_fallback()).count();
    info!(
        "Translation finished: {} translated, {} kept source text",
        map.len() - fallbacks,
        fallbacks
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_complete(total, map.len() - fallbacks, fallbacks);
    }

    map
}

/// Pair every extracted block with its result, in extraction order.
///
/// An identity missing from `map` keeps its source text.
pub fn reassemble(pages: &[ExtractedPage], map: &TranslationMap) -> Vec<TranslatedPage> {
    pages
        .iter()
        .map(|page| TranslatedPage {
            page_index: page.page_index,
            blocks: page
                .blocks
                .iter()
                .map(|block| {
                    let (text, outcome) = match map.get(&block.id()) {
                        Some(r) if !r.translated_text.trim().is_empty() => {
                            (r.translated_text.clone(), r.outcome.clone())
                        }
                        _ => {
                            warn!("Block {}: no result collected, keeping source text", block.id());
                            (
                                block.text.clone(),
                                Outcome::Fallback(FallbackReason::Missing),
                            )
                        }
                    };
                    TranslatedBlock {
                        page_index: block.page_index,
                        block_index: block.block_index,
                        rect: block.rect,
                        source_text: block.text.clone(),
                        text,
                        outcome,
                    }
                })
                .collect(),
        })
        .collect()
}

/// [`translate_all`] followed by [`reassemble`].
pub async fn translate_pages(
    pages: &[ExtractedPage],
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> (Vec<TranslatedPage>, TranslationMap) {
    let map = translate_all(pages, translator, config).await;
    (reassemble(pages, &map), map)
}
