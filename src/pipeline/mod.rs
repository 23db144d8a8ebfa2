//! Pipeline stages for in-place PDF translation.
//!
//! Each submodule implements one step. Data flows strictly forward; no
//! stage reads the output of a later one.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ translate ──▶ compose ──▶ save
//! (URL/path)  (blocks)   (backend)    (fit+paint)  (pdfium)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path, URL or bytes to a local file
//! 2. [`extract`]   — validate raw engine blocks into identified [`crate::output::TextBlock`]s
//! 3. [`translate`] — bounded fan-out over a [`backend::Translator`] with
//!    retry/backoff and source-text fallback; [`postprocess`] cleans each result
//! 4. [`compose`]   — paint over each block and refit the translation with [`fit`]
//!
//! [`engine`] is the narrow PDF-engine interface stages 2 and 4 work against;
//! [`pdfium`] implements it and owns open/save, running in `spawn_blocking`.

pub mod backend;
pub mod compose;
pub mod engine;
pub mod extract;
pub mod fit;
pub mod input;
pub mod pdfium;
pub mod postprocess;
pub mod translate;
