//! Record-shaped inputs: CSV tables and JSON documents.
//!
//! Both pick their text by field name: the first CSV column whose header
//! mentions `text`, or every JSON string stored under such a key.

use super::traits::{has_extension, Preprocessor};
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

fn is_text_field(name: &str) -> bool {
    name.to_lowercase().contains("text")
}

pub struct CsvPreprocessor;

impl Preprocessor for CsvPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::extraction(path, e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::extraction(path, e.to_string()))?
            .clone();
        let Some(column) = headers.iter().position(is_text_field) else {
            warn!("No column containing 'text' found in CSV: {}", path.display());
            return Ok(String::new());
        };

        let mut cells = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::extraction(path, e.to_string()))?;
            if let Some(cell) = record.get(column).filter(|c| !c.is_empty()) {
                cells.push(cell.to_string());
            }
        }

        Ok(cells.join("\n"))
    }

    fn name(&self) -> &str {
        "CsvPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["csv"])
    }
}

/// String values under text-like keys, depth first in document order
pub fn collect_json_text<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(s) if is_text_field(key) => out.push(s),
                    _ => collect_json_text(child, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_json_text(item, out);
            }
        }
        _ => {}
    }
}

pub struct JsonPreprocessor;

impl Preprocessor for JsonPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| Error::extraction(path, e.to_string()))?;

        let mut texts = Vec::new();
        collect_json_text(&value, &mut texts);
        Ok(texts.join("\n"))
    }

    fn name(&self) -> &str {
        "JsonPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }
}
