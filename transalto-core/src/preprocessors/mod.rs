//! Document Preprocessors
//!
//! This module provides the extraction layer that turns every supported
//! input format into plain text for the flat translation pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Document (ALTO, PDF, DOCX, HTML, CSV, JSON, TXT)
//!     ↓
//! [Format-specific Preprocessor]   (ALTO/PDF: words → normalized boxes → reading order)
//!     ↓
//! Plain text
//!     ↓
//! [Language gate → Translator]
//! ```
//!
//! Routing is by lower-cased file extension; the first registered
//! preprocessor that accepts a path handles it.

pub mod alto;
pub mod docx;
pub mod html;
pub mod pdf;
pub mod tabular;
pub mod traits;

// Re-export main types
pub use alto::AltoPreprocessor;
pub use docx::DocxPreprocessor;
pub use html::HtmlPreprocessor;
pub use pdf::{PdfBackend, PdfPreprocessor};
pub use tabular::{CsvPreprocessor, JsonPreprocessor};
pub use traits::{extension_of, Preprocessor};

#[cfg(feature = "pdfium-backend")]
pub use pdf::PdfiumBackend;

use crate::error::{Error, Result};
use crate::geometry::normalize_boxes;
use crate::ordering::ReadingOrderEngine;
use crate::types::PageWords;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Reading-order text of one page
pub fn order_page(engine: &ReadingOrderEngine, page: &PageWords) -> String {
    if page.words.is_empty() {
        return String::new();
    }
    let boxes = normalize_boxes(&page.boxes(), page.size.width, page.size.height);
    engine.order(&page.texts(), &boxes)
}

/// Plain UTF-8 text files, read as-is
pub struct PlainTextPreprocessor;

impl Preprocessor for PlainTextPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::extraction(path, e.to_string()))
    }

    fn name(&self) -> &str {
        "PlainTextPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        traits::has_extension(path, &["txt"])
    }
}

/// Extension router over the available preprocessors
pub struct PreprocessorRegistry {
    preprocessors: Vec<Box<dyn Preprocessor>>,
}

impl PreprocessorRegistry {
    /// Every built-in format; ALTO and PDF order their words with `engine`
    pub fn new(engine: Rc<ReadingOrderEngine>) -> Self {
        Self {
            preprocessors: vec![
                Box::new(AltoPreprocessor::new(Rc::clone(&engine))),
                Box::new(PdfPreprocessor::new(engine)),
                Box::new(DocxPreprocessor),
                Box::new(HtmlPreprocessor),
                Box::new(CsvPreprocessor),
                Box::new(JsonPreprocessor),
                Box::new(PlainTextPreprocessor),
            ],
        }
    }

    /// Register a preprocessor ahead of the built-ins
    pub fn register(&mut self, preprocessor: Box<dyn Preprocessor>) {
        self.preprocessors.insert(0, preprocessor);
    }

    pub fn for_path(&self, path: &Path) -> Result<&dyn Preprocessor> {
        self.preprocessors
            .iter()
            .find(|p| p.supports_file_type(path))
            .map(|p| p.as_ref())
            .ok_or_else(|| Error::UnsupportedFormat(extension_of(path)))
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        let preprocessor = self.for_path(path)?;
        debug!("Extracting {} with {}", path.display(), preprocessor.name());
        preprocessor.extract(path)
    }
}
