//! Error types for the edgequake-pdf-translate library.
//!
//! Three error types map onto the three failure classes of a run:
//!
//! * [`PdfTranslateError`] — **Fatal**: the run cannot proceed at all (bad
//!   input file, corrupt PDF, backend not configured, output not writable).
//!   Returned as `Err(PdfTranslateError)` from the top-level `translate_*`
//!   functions. No output document is produced.
//!
//! * [`TranslateError`] — **Transient**: a single backend call failed. The
//!   pipeline absorbs it with retry/backoff and, when retries run out, falls
//!   back to the source text. It is never returned to the caller of
//!   [`crate::translate_pdf`]; it only shows up inside
//!   [`crate::output::FallbackReason::RetriesExhausted`].
//!
//! * [`LayoutError`] — **Degraded**: the PDF engine rejected a drawing call.
//!   The compositor retries once at the floor font size and otherwise logs a
//!   warning; the block is counted in [`crate::output::ComposeReport`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-translate library.
#[derive(Debug, Error)]
pub enum PdfTranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could not read the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured translation backend cannot be constructed.
    #[error("Translation backend '{backend}' is not configured.\n{hint}")]
    BackendNotConfigured { backend: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not save the translated PDF.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform and either:\n\
  • put it on the system library search path, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A transient failure of a single translation backend call.
///
/// Every variant is retried by the pipeline; none of them aborts a run.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum TranslateError {
    /// Network-level failure (DNS, connection reset, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not return within the per-call timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Backend answered HTTP 429.
    #[error("rate limited by '{backend}'")]
    RateLimited {
        backend: String,
        retry_after_secs: Option<u64>,
    },

    /// Backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Backend answered 2xx but the body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An LLM provider returned an error.
    #[error("LLM error: {0}")]
    Llm(String),
}

/// An engine-level rejection of a drawing call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    /// The page index does not exist in the document.
    #[error("page {page} does not exist (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The wrapped text needs more height than the box provides.
    #[error("text needs {needed:.1}pt but the box is {available:.1}pt high")]
    TextOverflow { needed: f32, available: f32 },

    /// Any other engine failure.
    #[error("engine error: {0}")]
    Engine(String),
}
