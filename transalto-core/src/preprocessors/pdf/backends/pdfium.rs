//! Pdfium backend
//!
//! Binds the pdfium shared library at runtime and rebuilds words from the
//! page's character stream.

use super::PdfBackend;
use crate::error::{Error, Result};
use crate::types::{BoundingBox, PageSize, PageWords, WordToken};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Directory holding the pdfium shared library
pub const PDFIUM_LIB_PATH_ENV_NAME: &str = "PDFIUM_DYNAMIC_LIB_PATH";

pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind from `PDFIUM_DYNAMIC_LIB_PATH`, falling back to the system library
    pub fn from_env() -> Result<Self> {
        let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV_NAME) {
            Ok(path) => {
                info!("Loading pdfium from {}", path);
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&path))
            }
            Err(_) => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Error::extraction(PDFIUM_LIB_PATH_ENV_NAME, format!("load-library: {e}")))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

/// Accumulates characters into one word and its covering box
#[derive(Default)]
struct WordBuilder {
    text: String,
    bbox: Option<BoundingBox>,
}

impl WordBuilder {
    fn push(&mut self, ch: char, bbox: BoundingBox) {
        self.text.push(ch);
        self.bbox = Some(match self.bbox {
            Some(current) => current.union(&bbox),
            None => bbox,
        });
    }

    fn finish(&mut self, words: &mut Vec<WordToken>) {
        let text = std::mem::take(&mut self.text);
        if let Some(bbox) = self.bbox.take() {
            if !text.trim().is_empty() {
                words.push(WordToken::new(text, bbox));
            }
        }
    }
}

fn page_words(page: &PdfPage) -> std::result::Result<PageWords, PdfiumError> {
    let width = f64::from(page.width().value);
    let height = f64::from(page.height().value);

    let text = page.text()?;
    let mut words = Vec::new();
    let mut current = WordBuilder::default();

    for ch in text.chars().iter() {
        let Some(c) = ch.unicode_char() else {
            continue;
        };
        if c.is_whitespace() || c.is_control() {
            current.finish(&mut words);
            continue;
        }
        let Ok(rect) = ch.loose_bounds() else {
            continue;
        };
        // pdfium measures from the bottom-left corner
        let bbox = BoundingBox::new(
            f64::from(rect.left.value),
            height - f64::from(rect.top.value),
            f64::from(rect.right.value),
            height - f64::from(rect.bottom.value),
        );
        current.push(c, bbox);
    }
    current.finish(&mut words);

    Ok(PageWords {
        size: PageSize::new(width, height),
        words,
    })
}

impl PdfBackend for PdfiumBackend {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageWords>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| Error::extraction("<pdf>", format!("load-pdf: {e}")))?;

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let words = page_words(&page)
                .map_err(|e| Error::extraction("<pdf>", format!("page {index}: {e}")))?;
            debug!("Page {}: {} words", index + 1, words.words.len());
            pages.push(words);
        }
        Ok(pages)
    }

    fn name(&self) -> &str {
        "pdfium"
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
