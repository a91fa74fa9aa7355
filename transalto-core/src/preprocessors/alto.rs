use super::traits::{has_extension, Preprocessor};
use super::order_page;
use crate::alto::AltoDocument;
use crate::error::{Error, Result};
use crate::ordering::ReadingOrderEngine;
use crate::types::PageWords;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// ALTO pages flattened to words and put through the reading-order engine
pub struct AltoPreprocessor {
    engine: Rc<ReadingOrderEngine>,
}

impl AltoPreprocessor {
    pub fn new(engine: Rc<ReadingOrderEngine>) -> Self {
        Self { engine }
    }
}

impl Preprocessor for AltoPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let document =
            AltoDocument::open(path).map_err(|e| Error::extraction(path, e.to_string()))?;
        let page: PageWords = document.extract_ordering_inputs().into();
        debug!(
            "{} words on a {}x{} page",
            page.words.len(),
            page.size.width,
            page.size.height
        );
        Ok(order_page(&self.engine, &page))
    }

    fn name(&self) -> &str {
        "AltoPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["xml"])
    }
}
