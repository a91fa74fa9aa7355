use super::chunker::{chunk_text, DEFAULT_CHUNK_CHARS};
use super::service::{default_models, TranslationService};
use std::cell::OnceCell;
use tracing::{debug, error, warn};

/// Text translation over a [`TranslationService`].
///
/// Failures never escape as errors: an unsupported language pair or a
/// failed chunk turns into a bracketed marker inside the returned text.
pub struct Translator {
    service: Box<dyn TranslationService>,
    chunk_chars: usize,
    catalog: OnceCell<Vec<String>>,
}

impl Translator {
    pub fn new(service: Box<dyn TranslationService>) -> Self {
        Self::with_chunk_chars(service, DEFAULT_CHUNK_CHARS)
    }

    pub fn with_chunk_chars(service: Box<dyn TranslationService>, chunk_chars: usize) -> Self {
        Self {
            service,
            chunk_chars: chunk_chars.max(1),
            catalog: OnceCell::new(),
        }
    }

    /// Supported models, fetched on first use
    pub fn catalog(&self) -> &[String] {
        self.catalog.get_or_init(|| match self.service.list_models() {
            Ok(models) => {
                debug!("Translation service offers {} models", models.len());
                models
            }
            Err(e) => {
                warn!("Could not fetch model catalogue ({}), using default list", e);
                default_models()
            }
        })
    }

    pub fn translate(&self, text: &str, src: &str, tgt: &str) -> String {
        if text.trim().is_empty() || src == tgt {
            return text.to_string();
        }

        let model = format!("{src}-{tgt}");
        let catalog = self.catalog();
        if catalog.is_empty() {
            warn!("Proceeding with '{}' (model validation unavailable)", model);
        } else if !catalog.iter().any(|m| *m == model) {
            error!(
                "Model '{}' not found. Available models: {}",
                model,
                catalog.join(", ")
            );
            return format!("[ERROR: Model {model} not supported]");
        }

        let chunks = chunk_text(text, self.chunk_chars);
        if chunks.len() > 1 {
            debug!("Translating {} chunks with {}", chunks.len(), model);
        }

        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| match self.service.translate_chunk(&model, src, tgt, chunk) {
                Ok(body) => body.trim().to_string(),
                Err(e) => {
                    let marker = format!("[Network Error on chunk {i}: {e}]");
                    warn!("{}", marker);
                    marker
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
