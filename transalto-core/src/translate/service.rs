//! Remote translation service.
//!
//! The Lindat API exposes `GET /models` and
//! `POST /models/{src}-{tgt}?src=..&tgt=..` with an `input_text` form field,
//! answering with plain text.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://lindat.mff.cuni.cz/services/translation/api/v2";

/// Models assumed available when the catalogue cannot be fetched
pub const DEFAULT_MODELS: [&str; 6] = ["fr-en", "cs-en", "de-en", "uk-en", "ru-en", "pl-en"];

pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with something other than 200
    #[error("HTTP {code} - {reason}")]
    Status { code: u16, reason: String },

    #[error("{0}")]
    Transport(String),

    #[error("invalid model catalogue: {0}")]
    Catalog(String),
}

pub trait TranslationService {
    fn list_models(&self) -> Result<Vec<String>, ServiceError>;

    fn translate_chunk(
        &self,
        model: &str,
        src: &str,
        tgt: &str,
        chunk: &str,
    ) -> Result<String, ServiceError>;
}

/// Model names from a catalogue response.
///
/// Accepts the HAL envelope (`{"_embedded": {"item": [{"model": ..}]}}`) or a
/// flat list of names; any other shape is an empty catalogue.
pub fn parse_model_catalog(body: &str) -> Result<Vec<String>, ServiceError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ServiceError::Catalog(e.to_string()))?;

    let names = match &value {
        Value::Object(map) if map.contains_key("_embedded") => value["_embedded"]["item"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["model"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(names)
}

pub struct LindatService {
    base_url: String,
    agent: ureq::Agent,
}

impl LindatService {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: builder.build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for LindatService {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }
}

fn map_ureq_error(error: ureq::Error) -> ServiceError {
    match error {
        ureq::Error::Status(code, response) => ServiceError::Status {
            code,
            reason: response.status_text().to_string(),
        },
        ureq::Error::Transport(transport) => ServiceError::Transport(transport.to_string()),
    }
}

/// Body of a `200 OK` reply; any other status is a [`ServiceError::Status`]
fn ok_body(reply: Result<ureq::Response, ureq::Error>) -> Result<String, ServiceError> {
    let response = reply.map_err(map_ureq_error)?;
    if response.status() != 200 {
        return Err(ServiceError::Status {
            code: response.status(),
            reason: response.status_text().to_string(),
        });
    }
    response
        .into_string()
        .map_err(|e| ServiceError::Transport(e.to_string()))
}

impl TranslationService for LindatService {
    fn list_models(&self) -> Result<Vec<String>, ServiceError> {
        let url = format!("{}/models", self.base_url);
        debug!("Fetching model catalogue from {}", url);
        let body = ok_body(self.agent.get(&url).set("accept", "application/json").call())?;
        parse_model_catalog(&body)
    }

    fn translate_chunk(
        &self,
        model: &str,
        src: &str,
        tgt: &str,
        chunk: &str,
    ) -> Result<String, ServiceError> {
        let url = format!("{}/models/{}", self.base_url, model);
        ok_body(
            self.agent
                .post(&url)
                .query("src", src)
                .query("tgt", tgt)
                .set("accept", "text/plain")
                .send_form(&[("input_text", chunk)]),
        )
    }
}
