//! Error taxonomy for document processing.
//!
//! Only errors that abort a file (or a config line) live here. Chunk-local
//! failures have their own types next to the component that absorbs them:
//! [`crate::ordering::OrderingError`] and [`crate::translate::ServiceError`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed source document; the file is skipped
    #[error("extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    /// The layout tree could not be parsed or written back; no output is produced
    #[error("XML reconstruction failed: {0}")]
    XmlReconstruction(String),

    /// A config entry that could not be applied; callers keep the previous value
    #[error("config line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
