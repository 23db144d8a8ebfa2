//! Translation backends.
//!
//! The pipeline only knows the [`Translator`] trait: one async call that
//! turns a text into a translated text or a [`TranslateError`]. Retries,
//! pacing, timeouts and fallback all live in
//! [`crate::pipeline::translate`], so a backend implementation is a plain
//! request/response adapter and never sleeps or retries on its own.
//!
//! Two backends ship with the crate:
//!
//! * [`GoogleTranslator`] — the public Google Translate web endpoint
//!   (`translate_a/single?client=gtx`). No key, aggressively rate-limited.
//! * [`LlmTranslator`] — any [`edgequake_llm`] provider, prompted with
//!   [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].

use crate::config::{Backend, TranslationConfig};
use crate::error::{PdfTranslateError, TranslateError};
use crate::pipeline::postprocess::strip_added_quotes;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A translation backend.
///
/// An `Ok` value may be empty; the pipeline treats that as "nothing to
/// translate" and keeps the source text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError>;
}

// ── Google ───────────────────────────────────────────────────────────────────

/// Google Translate web endpoint client.
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl GoogleTranslator {
    /// Build a client for `endpoint` (e.g. `https://translate.googleapis.com`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PdfTranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("edgequake-pdf-translate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PdfTranslateError::BackendNotConfigured {
                backend: "google".to_string(),
                hint: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslateError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TranslateError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(TranslateError::RateLimited {
                backend: self.name().to_string(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                status: status.as_u16(),
                detail: detail.chars().take(200).collect(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranslateError::Transport(e.to_string()))?;
        parse_google_response(&body)
    }
}

/// Extract the translation from a `translate_a/single` JSON body.
///
/// The body is a nested array; element `[0]` holds one
/// `[translated, original, …]` entry per sentence.
pub fn parse_google_response(body: &str) -> Result<String, TranslateError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Malformed(e.to_string()))?;

    let sentences = match value.get(0) {
        Some(serde_json::Value::Array(s)) => s,
        // A null first element is how the endpoint answers for input with
        // nothing translatable.
        Some(serde_json::Value::Null) => return Ok(String::new()),
        _ => {
            return Err(TranslateError::Malformed(
                "expected an array of sentences".to_string(),
            ))
        }
    };

    Ok(sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(|t| t.as_str()))
        .collect())
}

// ── LLM ──────────────────────────────────────────────────────────────────────

/// Translate through an edgequake-llm chat provider.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: Option<String>,
    options: CompletionOptions,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &TranslationConfig) -> Self {
        Self {
            provider,
            system_prompt: config.system_prompt.clone(),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError> {
        let messages = vec![
            ChatMessage::system(prompts::system_prompt(
                self.system_prompt.as_deref(),
                source,
                target,
            )),
            ChatMessage::user(text),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| TranslateError::Llm(e.to_string()))?;

        debug!(
            "LLM translation: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(strip_added_quotes(&response.content, text))
    }
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Resolve the translator for a run, from most-specific to least-specific.
///
/// 1. **Pre-built translator** (`config.translator`) — used as-is.
/// 2. **Backend** (`config.backend`):
///    * [`Backend::Google`] — a [`GoogleTranslator`] on `config.google_endpoint`.
///    * [`Backend::Llm`] — an [`LlmTranslator`] on the resolved LLM provider.
pub fn resolve_translator(config: &TranslationConfig) -> Result<Arc<dyn Translator>, PdfTranslateError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }

    match config.backend {
        Backend::Google => {
            let google = GoogleTranslator::new(
                config.google_endpoint.clone(),
                Duration::from_secs(config.api_timeout_secs),
            )?;
            Ok(Arc::new(google))
        }
        Backend::Llm => {
            let provider = resolve_provider(config)?;
            Ok(Arc::new(LlmTranslator::new(provider, config)))
        }
    }
}

/// Resolve the LLM provider.
///
/// 1. Pre-built provider (`config.provider`)
/// 2. Named provider + model (`config.provider_name`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is present
/// 5. `ProviderFactory::from_env` auto-detection
fn resolve_provider(config: &TranslationConfig) -> Result<Arc<dyn LLMProvider>, PdfTranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfTranslateError::BackendNotConfigured {
            backend: "llm".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Model used when a provider is named without one.
const DEFAULT_LLM_MODEL: &str = "gpt-4.1-nano";

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PdfTranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfTranslateError::BackendNotConfigured {
            backend: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
