// Transalto Core Library
//
// Recovers the reading order of laid-out documents, translates them through a
// remote service and, for ALTO, writes the translation back into the original
// layout. Main interface is `DocumentProcessor`.

pub mod alto;
pub mod config;
pub mod error;
pub mod geometry;
pub mod language;
pub mod ordering;
pub mod preprocessors;
pub mod processor;
pub mod report;
pub mod translate;
pub mod types;

// Re-export main types and functions for easy use
pub use alto::{AltoDocument, BlockText, Namespace, XmlWriteOptions};
pub use config::{ConfigOverrides, OrderingKind, TranslateConfig, XmlMode};
pub use error::{Error, Result};
pub use language::{LanguageDecision, LanguageGate, LanguageIdentifier};
pub use ordering::{OrderingBackend, ReadingOrderEngine};
pub use preprocessors::{PdfPreprocessor, Preprocessor, PreprocessorRegistry};
pub use processor::{collect_inputs, DocumentProcessor, DEFAULT_OUTPUT_DIR};
pub use report::{BatchReport, FileOutcome, FileReport};
pub use translate::{LindatService, TranslationService, Translator};
pub use types::*;

// Re-export backends for direct use
#[cfg(feature = "pdfium-backend")]
pub use preprocessors::PdfiumBackend;
