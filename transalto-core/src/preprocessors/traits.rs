// Preprocessor abstraction for text extraction
//
// This module defines the boundary between format-specific extraction
// (file -> plain text in reading order) and translation. Everything after
// this point works with a single string and is format-agnostic.

use crate::error::Result;
use std::path::Path;

/// Preprocessor trait - converts a document on disk to plain text
///
/// Page-oriented formats (ALTO, PDF) run their words through the
/// reading-order engine before returning; flow formats return their text
/// in document order.
pub trait Preprocessor {
    /// Extract the document's text
    ///
    /// A document with no text is not an error and yields an empty string.
    fn extract(&self, path: &Path) -> Result<String>;

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}

/// Lower-cased extension of `path`, empty when there is none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Whether `path` has one of `extensions` (compared lower-cased)
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = extension_of(path);
    extensions.iter().any(|e| *e == ext)
}
