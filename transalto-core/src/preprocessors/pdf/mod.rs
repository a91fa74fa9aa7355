//! PDF Preprocessor
//!
//! Uses a pluggable backend to pull per-page words out of a PDF, then orders
//! every page independently. Pages without words are skipped.

pub mod backends;

use super::order_page;
use crate::error::{Error, Result};
use crate::ordering::ReadingOrderEngine;
use crate::preprocessors::traits::{has_extension, Preprocessor};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

pub use backends::PdfBackend;

#[cfg(feature = "pdfium-backend")]
pub use backends::PdfiumBackend;

/// Separator between ordered pages
pub const PAGE_SEPARATOR: &str = "\n\n";

/// PDF Preprocessor with pluggable backend
pub struct PdfPreprocessor {
    backend: Option<Box<dyn PdfBackend>>,
    engine: Rc<ReadingOrderEngine>,
}

impl PdfPreprocessor {
    /// Preprocessor with the best backend compiled in, if any
    pub fn new(engine: Rc<ReadingOrderEngine>) -> Self {
        Self {
            backend: default_backend(),
            engine,
        }
    }

    pub fn with_backend(backend: Box<dyn PdfBackend>, engine: Rc<ReadingOrderEngine>) -> Self {
        Self {
            backend: Some(backend),
            engine,
        }
    }

    /// Get the backend name for logging
    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("none")
    }

    /// Check if the backend is healthy
    pub fn is_healthy(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.is_healthy())
    }
}

#[cfg(feature = "pdfium-backend")]
fn default_backend() -> Option<Box<dyn PdfBackend>> {
    match PdfiumBackend::from_env() {
        Ok(backend) => Some(Box::new(backend)),
        Err(e) => {
            warn!("pdfium unavailable, PDF files will be skipped: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "pdfium-backend"))]
fn default_backend() -> Option<Box<dyn PdfBackend>> {
    None
}

impl Preprocessor for PdfPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let backend = self.backend.as_ref().ok_or_else(|| {
            Error::extraction(
                path,
                "no PDF backend available (build with the pdfium-backend feature)",
            )
        })?;

        let bytes = std::fs::read(path)?;
        let pages = backend.extract_pages(&bytes).map_err(|e| match e {
            Error::Extraction { message, .. } => Error::extraction(path, message),
            other => other,
        })?;

        let mut texts = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            if page.words.is_empty() {
                debug!("Page {} has no words, skipping", index + 1);
                continue;
            }
            texts.push(order_page(&self.engine, page));
        }

        if texts.is_empty() {
            warn!("No text found in {}", path.display());
        }
        Ok(texts.join(PAGE_SEPARATOR))
    }

    fn name(&self) -> &str {
        "PdfPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, PageSize, PageWords, WordToken};

    struct StaticPages(Vec<PageWords>);

    impl PdfBackend for StaticPages {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageWords>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "static"
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    fn page(words: &[&str]) -> PageWords {
        PageWords {
            size: PageSize::new(612.0, 792.0),
            words: words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let x = 50.0 + 60.0 * i as f64;
                    WordToken::new(*w, BoundingBox::new(x, 100.0, x + 50.0, 112.0))
                })
                .collect(),
        }
    }

    #[test]
    fn test_pages_joined_and_empty_pages_skipped() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let backend = StaticPages(vec![page(&["Ahoj", "světe"]), page(&[]), page(&["Konec"])]);
        let pre = PdfPreprocessor::with_backend(
            Box::new(backend),
            Rc::new(ReadingOrderEngine::default()),
        );
        assert_eq!(pre.extract(file.path()).unwrap(), "Ahoj světe\n\nKonec");
        assert_eq!(pre.backend_name(), "static");
    }

    #[cfg(not(feature = "pdfium-backend"))]
    #[test]
    fn test_missing_backend_fails_the_file() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let pre = PdfPreprocessor::new(Rc::new(ReadingOrderEngine::default()));
        assert!(!pre.is_healthy());
        assert!(matches!(pre.extract(file.path()), Err(Error::Extraction { .. })));
    }
}
