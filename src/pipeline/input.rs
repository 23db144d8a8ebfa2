//! Input resolution: turn a path, URL, or byte buffer into a local PDF file.
//!
//! pdfium opens documents by path, and the compositor reopens the source
//! file after translation, so every input becomes a file on disk first.
//! Downloads and in-memory buffers land in a `TempDir` owned by
//! [`ResolvedInput`] and are removed when it is dropped. The `%PDF` magic is
//! checked up front so a wrong file fails with [`PdfTranslateError::NotAPdf`]
//! instead of an opaque pdfium error.

use crate::error::PdfTranslateError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A local PDF path, possibly backed by a temp directory.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was downloaded or written from memory into a temp directory.
    /// The `TempDir` lives as long as this value.
    Temporary { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Temporary { path, .. } => path,
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` (local path or http(s) URL) to a local PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PdfTranslateError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Write an in-memory PDF to a temp file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, PdfTranslateError> {
    let temp_dir = TempDir::new().map_err(|e| PdfTranslateError::Internal(e.to_string()))?;
    let path = temp_dir.path().join("input.pdf");
    check_magic(bytes, &path)?;

    std::fs::write(&path, bytes)
        .map_err(|e| PdfTranslateError::Internal(format!("Failed to write temp file: {}", e)))?;
    debug!("Wrote {} input bytes to {}", bytes.len(), path.display());

    Ok(ResolvedInput::Temporary {
        path,
        _temp_dir: temp_dir,
    })
}

/// `<dir>/<stem>_translated.pdf` next to a local input, or in the working
/// directory for a URL.
pub fn default_output_path(input: &str) -> PathBuf {
    let name = if is_url(input) {
        url_filename(input).unwrap_or_else(|| "downloaded.pdf".to_string())
    } else {
        input.to_string()
    };
    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file = format!("{stem}_translated.pdf");

    match path.parent() {
        Some(dir) if !is_url(input) && !dir.as_os_str().is_empty() => dir.join(file),
        _ => PathBuf::from(file),
    }
}

fn check_magic(bytes: &[u8], path: &Path) -> Result<(), PdfTranslateError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PdfTranslateError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, PdfTranslateError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(PdfTranslateError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() {
                check_magic(&magic, &path)?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfTranslateError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PdfTranslateError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PdfTranslateError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| PdfTranslateError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PdfTranslateError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = url_filename(url).unwrap_or_else(|| "downloaded.pdf".to_string());
    let temp_dir = TempDir::new().map_err(|e| PdfTranslateError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PdfTranslateError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Temporary {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of `url` when it looks like a file name.
fn url_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_filename_uses_last_segment() {
        assert_eq!(
            url_filename("https://example.com/a/rapport.pdf").as_deref(),
            Some("rapport.pdf")
        );
        assert_eq!(url_filename("https://example.com/a/"), None);
        assert_eq!(url_filename("not a url"), None);
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path("docs/rapport.pdf"),
            PathBuf::from("docs/rapport_translated.pdf")
        );
        assert_eq!(
            default_output_path("rapport.pdf"),
            PathBuf::from("rapport_translated.pdf")
        );
        assert_eq!(
            default_output_path("https://example.com/x/paper.pdf"),
            PathBuf::from("paper_translated.pdf")
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/here.pdf").err().unwrap();
        assert!(matches!(err, PdfTranslateError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 zip archive").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).err().unwrap();
        match err {
            PdfTranslateError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bytes_land_in_a_temp_file() {
        let resolved = resolve_bytes(b"%PDF-1.7\n%%EOF\n").unwrap();
        assert!(resolved.path().exists());
        let path = resolved.path().to_path_buf();
        drop(resolved);
        assert!(!path.exists());

        assert!(matches!(
            resolve_bytes(b"<html>"),
            Err(PdfTranslateError::NotAPdf { .. })
        ));
    }
}
