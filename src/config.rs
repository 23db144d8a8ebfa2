//! Configuration types for PDF translation.
//!
//! All run behaviour is controlled through [`TranslationConfig`], built via
//! [`TranslationConfigBuilder`]. The stages do not read the whole record:
//! each gets the small, explicit record it needs ([`RetryPolicy`] for the
//! pipeline, [`LayoutOptions`]/[`FitOptions`] for the compositor), derived
//! from the config at the start of a run.

use crate::error::PdfTranslateError;
use crate::pipeline::backend::Translator;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a PDF translation run.
///
/// # Example
/// ```rust
/// use edgequake_pdf_translate::{Backend, TranslationConfig};
///
/// let config = TranslationConfig::builder()
///     .source_lang("fr")
///     .target_lang("en")
///     .concurrency(4)
///     .backend(Backend::Google)
///     .build()
///     .unwrap();
/// assert_eq!(config.initial_fontsize, 10.0);
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Source language code (`"fr"`, `"de"`, … or `"auto"`). Default: `"fr"`.
    pub source_lang: String,

    /// Target language code. Default: `"en"`.
    pub target_lang: String,

    /// Which backend to build when no pre-built translator is supplied.
    pub backend: Backend,

    /// Pre-constructed translator. Takes precedence over `backend`.
    pub translator: Option<Arc<dyn Translator>>,

    /// Maximum number of backend calls in flight. Default: 4.
    ///
    /// Translation endpoints throttle aggressively; more workers than this
    /// mostly buys 429 responses.
    pub concurrency: usize,

    /// Pause before each task's first backend call, in ms. Default: 20.
    pub per_call_delay_ms: u64,

    /// Retries after the first failed call. Default: 3.
    pub max_retries: u32,

    /// Base backoff in ms; doubles per retry (500 → 1000 → 2000). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. A timed-out call is retried. Default: 30.
    pub api_timeout_secs: u64,

    /// Wall-clock budget for the translation stage in seconds. Default: none.
    ///
    /// When it runs out, every unresolved block keeps its source text.
    pub deadline_secs: Option<u64>,

    /// Base URL of the Google Translate web endpoint.
    pub google_endpoint: String,

    /// LLM model identifier for [`Backend::Llm`]. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for LLM translation. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per block. Default: 1024.
    pub max_tokens: usize,

    /// Custom LLM system prompt. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Font size the fit starts from. Default: 10.
    pub initial_fontsize: f32,

    /// Font size floor. Default: 6.
    pub min_fontsize: f32,

    /// Line height as a multiple of font size. Default: 1.15.
    pub line_spacing: f32,

    /// Average glyph width relative to font size. Default: 0.5.
    pub glyph_width_factor: f32,

    /// Lower bound of the chars-per-line estimate. Default: 20.
    pub min_chars_per_line: usize,

    /// How far the background fill extends past each block. Default: 0.5.
    pub fill_inset: f32,

    /// Fill colour painted over the original text. Default: white.
    pub background: [u8; 3],

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-block progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "fr".to_string(),
            target_lang: "en".to_string(),
            backend: Backend::default(),
            translator: None,
            concurrency: 4,
            per_call_delay_ms: 20,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 30,
            deadline_secs: None,
            google_endpoint: DEFAULT_GOOGLE_ENDPOINT.to_string(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            system_prompt: None,
            initial_fontsize: 10.0,
            min_fontsize: 6.0,
            line_spacing: 1.15,
            glyph_width_factor: 0.5,
            min_chars_per_line: 20,
            fill_inset: 0.5,
            background: [255, 255, 255],
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

/// Default host of the Google Translate web endpoint.
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com";

/// Upper bound accepted by [`TranslationConfigBuilder::max_retries`].
pub const MAX_RETRIES: u32 = 20;

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("backend", &self.backend)
            .field("translator", &self.translator.as_ref().map(|t| t.name().to_string()))
            .field("concurrency", &self.concurrency)
            .field("per_call_delay_ms", &self.per_call_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("deadline_secs", &self.deadline_secs)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("initial_fontsize", &self.initial_fontsize)
            .field("min_fontsize", &self.min_fontsize)
            .field("pages", &self.pages)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Retry policy handed to every pipeline task.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_backoff_ms),
            per_call_delay: Duration::from_millis(self.per_call_delay_ms),
            call_timeout: Duration::from_secs(self.api_timeout_secs),
        }
    }

    /// Font-fit parameters for the compositor.
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            initial_fontsize: self.initial_fontsize,
            min_fontsize: self.min_fontsize,
            line_spacing: self.line_spacing,
            glyph_width_factor: self.glyph_width_factor,
            min_chars_per_line: self.min_chars_per_line,
        }
    }

    /// Everything the compositor needs.
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            fit: self.fit_options(),
            fill_inset: self.fill_inset,
            background: self.background,
        }
    }
}

/// Builder for [`TranslationConfig`].
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl fmt::Debug for TranslationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl TranslationConfigBuilder {
    pub fn source_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.source_lang = lang.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into();
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn per_call_delay_ms(mut self, ms: u64) -> Self {
        self.config.per_call_delay_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn deadline_secs(mut self, secs: Option<u64>) -> Self {
        self.config.deadline_secs = secs;
        self
    }

    pub fn google_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.google_endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn initial_fontsize(mut self, size: f32) -> Self {
        self.config.initial_fontsize = size;
        self
    }

    pub fn min_fontsize(mut self, size: f32) -> Self {
        self.config.min_fontsize = size;
        self
    }

    pub fn line_spacing(mut self, mult: f32) -> Self {
        self.config.line_spacing = mult;
        self
    }

    pub fn glyph_width_factor(mut self, factor: f32) -> Self {
        self.config.glyph_width_factor = factor;
        self
    }

    pub fn fill_inset(mut self, inset: f32) -> Self {
        self.config.fill_inset = inset.max(0.0);
        self
    }

    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.config.background = rgb;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, PdfTranslateError> {
        let c = &self.config;
        if c.source_lang.trim().is_empty() || c.target_lang.trim().is_empty() {
            return Err(PdfTranslateError::InvalidConfig(
                "Source and target language codes must be non-empty".into(),
            ));
        }
        if c.target_lang.eq_ignore_ascii_case("auto") {
            return Err(PdfTranslateError::InvalidConfig(
                "Target language cannot be 'auto'".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PdfTranslateError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(PdfTranslateError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.min_fontsize >= 1.0) {
            return Err(PdfTranslateError::InvalidConfig(format!(
                "Minimum font size must be ≥ 1, got {}",
                c.min_fontsize
            )));
        }
        if !(c.initial_fontsize >= c.min_fontsize) {
            return Err(PdfTranslateError::InvalidConfig(format!(
                "Initial font size {} is below the minimum {}",
                c.initial_fontsize, c.min_fontsize
            )));
        }
        if !(c.line_spacing > 0.0) || !(c.glyph_width_factor > 0.0) {
            return Err(PdfTranslateError::InvalidConfig(
                "Line spacing and glyph width factor must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Derived per-component records ────────────────────────────────────────

/// Retry/backoff contract for one translation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed call (total calls ≤ `max_retries + 1`).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub per_call_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        TranslationConfig::default().retry_policy()
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, given that `attempt` (1-based) failed.
    ///
    /// `base_delay * 2^(attempt-1)`: the first retry waits `base_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// Whether a failure of call `attempt` (1-based) ends the task.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_retries.saturating_add(1)
    }
}

/// Font-fit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub initial_fontsize: f32,
    pub min_fontsize: f32,
    pub line_spacing: f32,
    pub glyph_width_factor: f32,
    pub min_chars_per_line: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        TranslationConfig::default().fit_options()
    }
}

/// Compositor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub fit: FitOptions,
    pub fill_inset: f32,
    pub background: [u8; 3],
}

impl Default for LayoutOptions {
    fn default() -> Self {
        TranslationConfig::default().layout_options()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Translation backend built when no pre-built translator is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Google Translate web endpoint (no API key). (default)
    #[default]
    Google,
    /// Any edgequake-llm provider, prompted to translate.
    Llm,
}

/// Specifies which pages of the PDF to translate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Translate all pages (default).
    #[default]
    All,
    /// Translate a single page (1-indexed).
    Single(usize),
    /// Translate a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Translate specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = TranslationConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.retry_backoff_ms, 500);
        assert_eq!(c.per_call_delay_ms, 20);
        assert_eq!(c.initial_fontsize, 10.0);
        assert_eq!(c.min_fontsize, 6.0);
        assert_eq!(c.line_spacing, 1.15);
        assert_eq!(c.fill_inset, 0.5);
        assert_eq!(c.background, [255, 255, 255]);
    }

    #[test]
    fn builder_rejects_inverted_font_sizes() {
        let err = TranslationConfig::builder()
            .initial_fontsize(5.0)
            .min_fontsize(6.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("below the minimum"));
    }

    #[test]
    fn builder_rejects_auto_target() {
        assert!(TranslationConfig::builder().target_lang("auto").build().is_err());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = TranslationConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_clamps_max_retries() {
        let c = TranslationConfig::builder().max_retries(u32::MAX).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES);
    }

    #[test]
    fn exhaustion_saturates() {
        let p = RetryPolicy {
            max_retries: u32::MAX,
            ..RetryPolicy::default()
        };
        assert!(!p.is_exhausted(1));
        assert!(p.is_exhausted(u32::MAX));
        assert!(RetryPolicy::default().is_exhausted(4));
        assert!(!RetryPolicy::default().is_exhausted(3));
    }

    #[test]
    fn backoff_doubles_from_base() {
        let p = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            per_call_delay: Duration::ZERO,
            call_timeout: Duration::from_secs(30),
        };
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn page_selection_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(3), vec![1, 2]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(3), vec![0, 2]);
    }

    #[test]
    fn derived_records_follow_config() {
        let c = TranslationConfig::builder()
            .initial_fontsize(12.0)
            .min_fontsize(7.0)
            .fill_inset(1.0)
            .build()
            .unwrap();
        let layout = c.layout_options();
        assert_eq!(layout.fit.initial_fontsize, 12.0);
        assert_eq!(layout.fit.min_fontsize, 7.0);
        assert_eq!(layout.fill_inset, 1.0);
    }
}
