//! Whole-pipeline scenarios against an in-memory document.
//!
//! `MemoryDoc` records every draw call per page and enforces overflow the
//! way the pdfium adapter does, so extraction, translation and composition
//! run exactly as in production minus the PDF bytes.

use async_trait::async_trait;
use edgequake_pdf_translate::pipeline::engine::{wrap_text, Overflow};
use edgequake_pdf_translate::{
    translate_document_with, FallbackReason, LayoutDocument, LayoutError, Outcome,
    PageSelection, PdfTranslateError, RawBlock, Rect, TextStyle, TranslateError,
    TranslationConfig, Translator,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── In-memory engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Draw {
    Fill { rect: Rect, rgb: [u8; 3] },
    Text { rect: Rect, text: String, size: f32, overflow: Overflow },
}

struct MemoryDoc {
    pages: Vec<Vec<RawBlock>>,
    draws: Vec<Vec<Draw>>,
}

impl MemoryDoc {
    fn new(pages: Vec<Vec<RawBlock>>) -> Self {
        let draws = vec![Vec::new(); pages.len()];
        Self { pages, draws }
    }

    fn texts(&self, page: usize) -> Vec<(String, f32)> {
        self.draws[page]
            .iter()
            .filter_map(|d| match d {
                Draw::Text { text, size, .. } => Some((text.clone(), *size)),
                Draw::Fill { .. } => None,
            })
            .collect()
    }
}

impl LayoutDocument for MemoryDoc {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn raw_blocks(&self, page: usize) -> Result<Vec<RawBlock>, PdfTranslateError> {
        Ok(self.pages[page].clone())
    }

    fn fill_rect(&mut self, page: usize, rect: Rect, rgb: [u8; 3]) -> Result<(), LayoutError> {
        let total = self.pages.len();
        self.draws
            .get_mut(page)
            .ok_or(LayoutError::PageOutOfRange { page, total })?
            .push(Draw::Fill { rect, rgb });
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: usize,
        rect: Rect,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), LayoutError> {
        let cpl = (rect.width() / (style.fontsize * style.glyph_width_factor)).floor() as usize;
        let needed = wrap_text(text, cpl).len() as f32 * style.fontsize * style.line_spacing;
        if style.overflow == Overflow::Reject && needed > rect.height() {
            return Err(LayoutError::TextOverflow {
                needed,
                available: rect.height(),
            });
        }
        self.draws[page].push(Draw::Text {
            rect,
            text: text.to_string(),
            size: style.fontsize,
            overflow: style.overflow,
        });
        Ok(())
    }
}

// ── Backends ─────────────────────────────────────────────────────────────────

/// Dictionary lookup; records every source text it was asked for.
struct Dictionary {
    entries: HashMap<&'static str, String>,
    seen: Mutex<Vec<String>>,
}

impl Dictionary {
    fn new(entries: &[(&'static str, String)]) -> Arc<Self> {
        Arc::new(Self {
            entries: entries.iter().cloned().collect(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Translator for Dictionary {
    fn name(&self) -> &str {
        "dictionary"
    }

    async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        self.seen.lock().unwrap().push(text.to_string());
        self.entries
            .get(text)
            .cloned()
            .ok_or_else(|| TranslateError::Malformed(format!("no entry for {text:?}")))
    }
}

fn config() -> TranslationConfig {
    TranslationConfig::builder()
        .per_call_delay_ms(0)
        .retry_backoff_ms(1)
        .max_retries(1)
        .build()
        .unwrap()
}

fn bonjour_doc() -> MemoryDoc {
    MemoryDoc::new(vec![
        vec![RawBlock::new(Rect::new(0.0, 0.0, 100.0, 20.0), "Bonjour")],
        vec![],
    ])
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn two_page_document_is_translated_in_place() {
    let mut doc = bonjour_doc();
    let backend = Dictionary::new(&[("Bonjour", "Hello".to_string())]);

    let output = translate_document_with(&mut doc, backend, &config())
        .await
        .unwrap();

    assert_eq!(
        doc.draws[0],
        vec![
            Draw::Fill {
                rect: Rect::new(-0.5, -0.5, 100.5, 20.5),
                rgb: [255, 255, 255],
            },
            Draw::Text {
                rect: Rect::new(0.0, 0.0, 100.0, 20.0),
                text: "Hello".into(),
                size: 10.0,
                overflow: Overflow::Reject,
            },
        ]
    );
    assert!(doc.draws[1].is_empty());

    assert_eq!(output.stats.total_pages, 2);
    assert_eq!(output.stats.total_blocks, 1);
    assert_eq!(output.stats.translated_blocks, 1);
    assert_eq!(output.stats.compose.blocks_written, 1);
    assert_eq!(output.pages[0].blocks[0].source_text, "Bonjour");
}

#[tokio::test(start_paused = true)]
async fn whitespace_blocks_never_reach_the_backend() {
    let mut doc = MemoryDoc::new(vec![vec![
        RawBlock::new(Rect::new(0.0, 0.0, 100.0, 20.0), "   "),
        RawBlock::new(Rect::new(0.0, 30.0, 100.0, 50.0), "Bonjour"),
    ]]);
    let backend = Dictionary::new(&[("Bonjour", "Hello".to_string())]);

    let output = translate_document_with(&mut doc, backend.clone(), &config())
        .await
        .unwrap();

    assert_eq!(*backend.seen.lock().unwrap(), vec!["Bonjour".to_string()]);
    assert_eq!(output.pages[0].blocks.len(), 1);
    assert_eq!(output.pages[0].blocks[0].block_index, 0);
    assert_eq!(doc.draws[0].len(), 2);
}

#[tokio::test(start_paused = true)]
async fn oversized_translation_is_set_at_the_floor() {
    let mut doc = MemoryDoc::new(vec![vec![RawBlock::new(
        Rect::new(10.0, 10.0, 60.0, 25.0),
        "Court",
    )]]);
    let long = "long text ".repeat(50);
    let backend = Dictionary::new(&[("Court", long.clone())]);

    let output = translate_document_with(&mut doc, backend, &config())
        .await
        .unwrap();

    let texts = doc.texts(0);
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0], (long.trim().to_string(), 6.0));
    assert!(matches!(
        doc.draws[0][1],
        Draw::Text {
            overflow: Overflow::Allow,
            ..
        }
    ));
    assert_eq!(output.stats.compose.blocks_shrunk, 1);
    assert_eq!(output.stats.compose.floor_fallbacks, 1);
    assert_eq!(output.stats.compose.failed_inserts, 0);
}

#[tokio::test(start_paused = true)]
async fn untranslatable_blocks_keep_their_source_text() {
    let mut doc = MemoryDoc::new(vec![vec![
        RawBlock::new(Rect::new(0.0, 0.0, 100.0, 20.0), "Bonjour"),
        RawBlock::new(Rect::new(0.0, 30.0, 100.0, 50.0), "Inconnu"),
    ]]);
    let backend = Dictionary::new(&[("Bonjour", "Hello".to_string())]);

    let output = translate_document_with(&mut doc, backend, &config())
        .await
        .unwrap();

    let texts: Vec<String> = doc.texts(0).into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["Hello".to_string(), "Inconnu".to_string()]);
    assert!(matches!(
        output.pages[0].blocks[1].outcome,
        Outcome::Fallback(FallbackReason::RetriesExhausted { .. })
    ));
    assert_eq!(output.stats.fallback_blocks, 1);
    assert_eq!(output.stats.total_attempts, 1 + 2);
}

#[tokio::test(start_paused = true)]
async fn page_selection_limits_the_work() {
    let mut doc = MemoryDoc::new(vec![
        vec![RawBlock::new(Rect::new(0.0, 0.0, 100.0, 20.0), "Bonjour")],
        vec![RawBlock::new(Rect::new(0.0, 0.0, 100.0, 20.0), "Salut")],
    ]);
    let backend = Dictionary::new(&[
        ("Bonjour", "Hello".to_string()),
        ("Salut", "Hi".to_string()),
    ]);
    let cfg = TranslationConfig::builder()
        .per_call_delay_ms(0)
        .pages(PageSelection::Single(2))
        .build()
        .unwrap();

    let output = translate_document_with(&mut doc, backend, &cfg).await.unwrap();

    assert!(doc.draws[0].is_empty());
    assert_eq!(doc.texts(1), vec![("Hi".to_string(), 10.0)]);
    assert_eq!(output.stats.translated_pages, 1);
}

#[tokio::test]
async fn selecting_no_pages_is_fatal() {
    let mut doc = bonjour_doc();
    let backend = Dictionary::new(&[]);
    let cfg = TranslationConfig::builder()
        .pages(PageSelection::Single(9))
        .build()
        .unwrap();

    let err = translate_document_with(&mut doc, backend, &cfg)
        .await
        .unwrap_err();
    assert!(matches!(err, PdfTranslateError::PageOutOfRange { total: 2, .. }));
}
