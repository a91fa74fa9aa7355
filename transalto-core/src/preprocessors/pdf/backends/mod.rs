//! PDF Backend trait
//!
//! Defines the interface that all PDF extraction backends must implement.
//! Every backend produces the same per-page word lists, so page ordering is
//! shared across backends.

use crate::error::Result;
use crate::types::PageWords;

/// Backend trait for PDF word extraction
///
/// Boxes are in page points with a top-left origin, matching the page size
/// reported for the same page. Words never have empty text.
pub trait PdfBackend {
    /// Extract every page's words, in page order
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageWords>>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;

    /// Check if backend is healthy/ready
    fn is_healthy(&self) -> bool;
}

#[cfg(feature = "pdfium-backend")]
pub mod pdfium;

#[cfg(feature = "pdfium-backend")]
pub use self::pdfium::PdfiumBackend;
