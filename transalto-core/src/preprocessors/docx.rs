use super::traits::{has_extension, Preprocessor};
use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Word documents, one output line per paragraph
pub struct DocxPreprocessor;

/// Paragraph texts of a WordprocessingML body, empty paragraphs included
pub fn paragraphs_from_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match (e.name().as_ref(), current.as_mut()) {
                (b"w:p", _) => paragraphs.push(String::new()),
                (b"w:tab", Some(text)) => text.push('\t'),
                (b"w:br" | b"w:cr", Some(text)) => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

impl Preprocessor for DocxPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| Error::extraction(path, format!("Failed to read ZIP archive: {e}")))?;

        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| Error::extraction(path, format!("{DOCUMENT_PART} not found: {e}")))?;
        let mut content = String::new();
        part.read_to_string(&mut content)?;

        let paragraphs = paragraphs_from_document_xml(&content)
            .map_err(|e| Error::extraction(path, e.to_string()))?;
        Ok(paragraphs.join("\n"))
    }

    fn name(&self) -> &str {
        "DocxPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["docx"])
    }
}
