//! pdfium adapter: [`LayoutDocument`] over a `pdfium-render` document.
//!
//! ## Binding
//!
//! The library path is resolved once per process; every blocking entry point
//! binds its own [`Pdfium`] from it. `PDFIUM_LIB_PATH` may point at the
//! library file or the directory holding it; otherwise the usual locations
//! and the system loader are tried.
//!
//! ## Blocks
//!
//! pdfium reports text as line segments, not paragraphs. [`group_segments`]
//! merges segments that continue the same line, or sit directly below with a
//! matching left edge, into one raw block so a paragraph is translated as a
//! unit.
//!
//! ## Coordinates
//!
//! pdfium's origin is bottom-left. Everything crossing [`LayoutDocument`] is
//! converted to page space (top-left origin) here and nowhere else.
//!
//! All calls are blocking; async callers go through
//! `tokio::task::spawn_blocking` ([`extract_document`], [`compose_document`]).

use crate::config::{LayoutOptions, PageSelection};
use crate::error::{LayoutError, PdfTranslateError};
use crate::output::{ComposeReport, ExtractedPage, Rect, TranslatedPage};
use crate::pipeline::compose::compose;
use crate::pipeline::engine::{wrap_text, Align, LayoutDocument, Overflow, RawBlock, TextStyle};
use crate::pipeline::extract::extract_pages;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Fraction of the font size above the baseline.
const ASCENT: f32 = 0.8;

static RESOLVED_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Bind a fresh pdfium instance.
///
/// The library location is resolved once per process and cached; the
/// returned [`Pdfium`] is owned by the caller and must stay on the thread
/// that uses it, so each blocking call binds its own.
pub fn bind_pdfium() -> Result<Pdfium, PdfTranslateError> {
    let bindings = match RESOLVED_PATH.get_or_init(resolve_library_path) {
        Some(lib) => {
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib).map_err(|e| {
                PdfTranslateError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library().map_err(|e| {
            PdfTranslateError::PdfiumBindingFailed(format!(
                "{e}. Install libpdfium or set PDFIUM_LIB_PATH to its location"
            ))
        })?,
    };
    Ok(Pdfium::new(bindings))
}

/// `PDFIUM_LIB_PATH` (file or directory), then the usual install locations.
/// `None` leaves the lookup to the system loader.
fn resolve_library_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        return Some(if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        });
    }

    ["./", "/usr/lib", "/usr/local/lib"]
        .iter()
        .map(|dir| Pdfium::pdfium_platform_library_name_at_path(dir))
        .find(|lib| lib.exists())
}

/// Open `path`, mapping pdfium's load errors onto the crate's error kinds.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfTranslateError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PdfTranslateError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                PdfTranslateError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            PdfTranslateError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// An open pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    font: PdfFontToken,
}

impl<'a> PdfiumDocument<'a> {
    pub fn new(mut document: PdfDocument<'a>) -> Self {
        let font = document.fonts_mut().helvetica();
        Self { document, font }
    }

    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, PdfTranslateError> {
        Ok(Self::new(open_document(pdfium, path, password)?))
    }

    /// Write the document to `path` atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), PdfTranslateError> {
        let write_err = |detail: String| PdfTranslateError::OutputWriteFailed {
            path: path.to_path_buf(),
            detail,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".pdf-translate-")
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(|e| write_err(e.to_string()))?;

        self.document
            .save_to_file(tmp.path())
            .map_err(|e| write_err(format!("{:?}", e)))?;
        tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;
        Ok(())
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>, PdfiumError> {
        self.document.pages().get(index as u16)
    }

    fn drawable_page(&self, index: usize) -> Result<PdfPage<'a>, LayoutError> {
        let total = self.page_count();
        if index >= total {
            return Err(LayoutError::PageOutOfRange { page: index, total });
        }
        self.page(index).map_err(engine_err)
    }
}

impl LayoutDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn raw_blocks(&self, page: usize) -> Result<Vec<RawBlock>, PdfTranslateError> {
        let extraction_err = |e: PdfiumError| PdfTranslateError::ExtractionFailed {
            page: page + 1,
            detail: format!("{:?}", e),
        };

        let pdf_page = self.page(page).map_err(extraction_err)?;
        let page_h = pdf_page.height().value;
        let text = pdf_page.text().map_err(extraction_err)?;

        let segments: Vec<(Rect, String)> = text
            .segments()
            .iter()
            .map(|segment| {
                let b = segment.bounds();
                let rect = Rect::new(
                    b.left().value,
                    page_h - b.top().value,
                    b.right().value,
                    page_h - b.bottom().value,
                );
                (rect, segment.text())
            })
            .collect();

        Ok(group_segments(&segments))
    }

    fn fill_rect(&mut self, page: usize, rect: Rect, rgb: [u8; 3]) -> Result<(), LayoutError> {
        let mut pdf_page = self.drawable_page(page)?;
        let page_h = pdf_page.height().value;
        let color = PdfColor::new(rgb[0], rgb[1], rgb[2], 255);

        pdf_page
            .objects_mut()
            .create_path_object_rect(
                PdfRect::new_from_values(page_h - rect.y1, rect.x0, page_h - rect.y0, rect.x1),
                None,
                None,
                Some(color),
            )
            .map_err(engine_err)?;
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: usize,
        rect: Rect,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), LayoutError> {
        let size = style.fontsize;
        let glyph = (size * style.glyph_width_factor).max(f32::EPSILON);
        let chars_per_line = ((rect.width() / glyph).floor() as usize).max(1);
        let lines = wrap_text(text, chars_per_line);
        let line_height = size * style.line_spacing;

        let needed = lines.len() as f32 * line_height;
        if style.overflow == Overflow::Reject && needed > rect.height() {
            return Err(LayoutError::TextOverflow {
                needed,
                available: rect.height(),
            });
        }

        let mut pdf_page = self.drawable_page(page)?;
        let page_h = pdf_page.height().value;

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_w = line.chars().count() as f32 * glyph;
            let x = match style.align {
                Align::Left => rect.x0,
                Align::Center => rect.x0 + ((rect.width() - line_w) / 2.0).max(0.0),
                Align::Right => (rect.x1 - line_w).max(rect.x0),
            };
            let baseline = rect.y0 + size * ASCENT + i as f32 * line_height;

            pdf_page
                .objects_mut()
                .create_text_object(
                    PdfPoints::new(x),
                    PdfPoints::new(page_h - baseline),
                    line,
                    self.font,
                    PdfPoints::new(size),
                )
                .map_err(engine_err)?;
        }
        Ok(())
    }
}

fn engine_err(e: PdfiumError) -> LayoutError {
    LayoutError::Engine(format!("{:?}", e))
}

// ── Segment grouping ─────────────────────────────────────────────────────────

struct Group {
    rect: Rect,
    last: Rect,
    text: String,
}

/// Merge pdfium line segments (page space) into paragraph blocks.
///
/// Segments with no text are dropped. Degenerate segments are passed through
/// on their own so the extractor sees and rejects them.
pub fn group_segments(segments: &[(Rect, String)]) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<Group> = None;

    for (rect, text) in segments {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !rect.is_well_formed() {
            if let Some(g) = current.take() {
                blocks.push(RawBlock::new(g.rect, g.text));
            }
            blocks.push(RawBlock::new(*rect, trimmed));
            continue;
        }

        match current.as_mut() {
            Some(g) if continues_line(&g.last, rect) || starts_next_line(g, rect) => {
                g.rect = g.rect.union(rect);
                g.last = *rect;
                g.text.push(' ');
                g.text.push_str(trimmed);
            }
            _ => {
                if let Some(g) = current.take() {
                    blocks.push(RawBlock::new(g.rect, g.text));
                }
                current = Some(Group {
                    rect: *rect,
                    last: *rect,
                    text: trimmed.to_string(),
                });
            }
        }
    }

    if let Some(g) = current {
        blocks.push(RawBlock::new(g.rect, g.text));
    }
    blocks
}

fn continues_line(last: &Rect, next: &Rect) -> bool {
    let overlap = last.y1.min(next.y1) - last.y0.max(next.y0);
    let line_h = last.height().max(next.height());
    overlap >= 0.5 * last.height().min(next.height())
        && next.x0 >= last.x0
        && next.x0 - last.x1 <= 2.0 * line_h
}

fn starts_next_line(group: &Group, next: &Rect) -> bool {
    let line_h = group.last.height().max(next.height());
    let gap = next.y0 - group.last.y1;
    gap >= -0.25 * line_h && gap <= 0.6 * line_h && (next.x0 - group.rect.x0).abs() <= 1.5 * line_h
}

// ── Blocking entry points ────────────────────────────────────────────────────

/// Open `path` and extract the selected pages.
///
/// Returns the document's page count alongside the extracted pages.
pub fn extract_document(
    path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<(usize, Vec<ExtractedPage>), PdfTranslateError> {
    let pdfium = bind_pdfium()?;
    let doc = PdfiumDocument::open(&pdfium, path, password)?;
    let total = doc.page_count();
    info!("PDF loaded: {} pages", total);

    let indices = selection.to_indices(total);
    if indices.is_empty() {
        return Err(PdfTranslateError::PageOutOfRange { page: 0, total });
    }
    Ok((total, extract_pages(&doc, &indices)?))
}

/// Open `input` fresh, compose `pages` into it and save to `output`.
pub fn compose_document(
    input: &Path,
    password: Option<&str>,
    output: &Path,
    pages: &[TranslatedPage],
    opts: &LayoutOptions,
) -> Result<ComposeReport, PdfTranslateError> {
    let pdfium = bind_pdfium()?;
    let mut doc = PdfiumDocument::open(&pdfium, input, password)?;
    let report = compose(&mut doc, pages, opts);
    doc.save(output)?;
    info!("Wrote {}", output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> (Rect, String) {
        (Rect::new(x0, y0, x1, y1), text.to_string())
    }

    #[test]
    fn library_path_comes_from_env_file_or_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("libpdfium-custom.so");
        std::fs::write(&file, b"").unwrap();

        std::env::set_var("PDFIUM_LIB_PATH", &file);
        assert_eq!(resolve_library_path(), Some(file.clone()));

        std::env::set_var("PDFIUM_LIB_PATH", dir.path());
        assert_eq!(
            resolve_library_path(),
            Some(Pdfium::pdfium_platform_library_name_at_path(dir.path()))
        );
        std::env::remove_var("PDFIUM_LIB_PATH");
    }

    #[test]
    fn paragraph_lines_are_merged() {
        let segments = vec![
            seg(50.0, 100.0, 300.0, 112.0, "Le chat dort sur"),
            seg(50.0, 114.0, 280.0, 126.0, "le canapé du salon."),
        ];
        let blocks = group_segments(&segments);
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].text.as_deref(),
            Some("Le chat dort sur le canapé du salon.")
        );
        assert_eq!(blocks[0].bounds, Some(Rect::new(50.0, 100.0, 300.0, 126.0)));
    }

    #[test]
    fn same_line_fragments_are_merged() {
        let segments = vec![
            seg(50.0, 100.0, 90.0, 112.0, "Titre"),
            seg(95.0, 100.0, 140.0, 112.0, "principal"),
        ];
        let blocks = group_segments(&segments);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text.as_deref(), Some("Titre principal"));
    }

    #[test]
    fn distant_segments_stay_separate() {
        let segments = vec![
            seg(50.0, 100.0, 300.0, 112.0, "Premier paragraphe."),
            seg(50.0, 160.0, 300.0, 172.0, "Second paragraphe."),
            seg(400.0, 160.0, 500.0, 172.0, "Colonne"),
        ];
        let blocks = group_segments(&segments);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn blank_segments_are_dropped_and_degenerate_passed_through() {
        let segments = vec![
            seg(50.0, 100.0, 300.0, 112.0, "   "),
            seg(10.0, 10.0, 10.0, 20.0, "x"),
        ];
        let blocks = group_segments(&segments);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bounds, Some(Rect::new(10.0, 10.0, 10.0, 20.0)));
    }
}
