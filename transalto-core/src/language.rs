//! Source-language decision.
//!
//! Identification is delegated to a [`LanguageIdentifier`]; the gate turns
//! its top prediction into a service language code and overrides it with a
//! fixed default when the score is too low to trust.

use crate::types::LanguageDetection;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const DEFAULT_LANGUAGE: &str = "cs";
pub const DEFAULT_SAMPLE_CHARS: usize = 2000;

/// Sentinel meaning "detect the source language"
pub const AUTO: &str = "auto";

/// ISO 639-3 model codes to the ISO 639-1 codes the translation service uses
const CODE_MAP: &[(&str, &str)] = &[
    ("ces", "cs"),
    ("eng", "en"),
    ("fra", "fr"),
    ("deu", "de"),
    ("rus", "ru"),
    ("pol", "pl"),
    ("ukr", "uk"),
    ("slk", "sk"),
    ("bul", "bg"),
    ("hrv", "hr"),
    ("slv", "sl"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("est", "et"),
    ("hun", "hu"),
    ("ron", "ro"),
    ("spa", "es"),
    ("ita", "it"),
    ("nld", "nl"),
    ("hin", "hi"),
];

/// Two-letter code for a model label such as `__label__ces_Latn`.
/// Codes missing from the table pass through unchanged.
pub fn service_code(label: &str) -> String {
    let raw = label.trim().trim_start_matches("__label__");
    let iso3 = raw.split('_').next().unwrap_or(raw);
    CODE_MAP
        .iter()
        .find(|(from, _)| *from == iso3)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| iso3.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("language identification model is not loaded")]
    Unavailable,

    #[error("language identification failed: {0}")]
    Failed(String),
}

pub trait LanguageIdentifier {
    /// Top-ranked label for an already cleaned sample
    fn predict(&self, text: &str) -> Result<Prediction, IdentifyError>;

    fn name(&self) -> &str;
}

/// Stand-in when no model is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableIdentifier;

impl LanguageIdentifier for UnavailableIdentifier {
    fn predict(&self, _text: &str) -> Result<Prediction, IdentifyError> {
        Err(IdentifyError::Unavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// fastText language-identification model driven through its command-line tool
#[derive(Debug, Clone)]
pub struct FastTextCli {
    binary: PathBuf,
    model: PathBuf,
}

impl FastTextCli {
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }
}

/// First `label score` pair of a `predict-prob` output line
pub fn parse_prediction(output: &str) -> Option<Prediction> {
    let mut fields = output.split_whitespace();
    let label = fields.next()?;
    let score = fields.next()?.parse::<f32>().ok()?;
    Some(Prediction {
        label: label.to_string(),
        score: score.clamp(0.0, 1.0),
    })
}

impl LanguageIdentifier for FastTextCli {
    fn predict(&self, text: &str) -> Result<Prediction, IdentifyError> {
        let mut child = Command::new(&self.binary)
            .arg("predict-prob")
            .arg(&self.model)
            .arg("-")
            .arg("1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| IdentifyError::Failed(format!("{}: {}", self.binary.display(), e)))?;

        // predict-prob reads one sample per line
        let line = format!("{}\n", text.replace(['\r', '\n'], " "));
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(line.as_bytes())
                .map_err(|e| IdentifyError::Failed(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| IdentifyError::Failed(e.to_string()))?;
        if !output.status.success() {
            return Err(IdentifyError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_prediction(&stdout)
            .ok_or_else(|| IdentifyError::Failed(format!("unexpected output: {}", stdout.trim())))
    }

    fn name(&self) -> &str {
        "fasttext"
    }
}

/// Outcome of [`LanguageGate::decide`]
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDecision {
    pub code: String,
    pub confidence: f32,
    /// The detection was overridden by the default language
    pub used_default: bool,
}

pub struct LanguageGate {
    identifier: Box<dyn LanguageIdentifier>,
    threshold: f32,
    default_language: String,
    sample_chars: usize,
}

impl Default for LanguageGate {
    fn default() -> Self {
        Self::new(Box::new(UnavailableIdentifier))
    }
}

impl LanguageGate {
    pub fn new(identifier: Box<dyn LanguageIdentifier>) -> Self {
        Self {
            identifier,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            default_language: DEFAULT_LANGUAGE.to_string(),
            sample_chars: DEFAULT_SAMPLE_CHARS,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_default_language(mut self, code: &str) -> Self {
        self.default_language = code.to_lowercase();
        self
    }

    pub fn with_sample_chars(mut self, chars: usize) -> Self {
        self.sample_chars = chars;
        self
    }

    /// Newlines collapsed, lower-cased, cut to the sample length
    fn clean_sample(&self, text: &str) -> String {
        text.replace('\n', " ")
            .to_lowercase()
            .chars()
            .take(self.sample_chars)
            .collect()
    }

    /// Raw detection without the confidence policy.
    ///
    /// A blank sample or an identifier failure yields `("en", 0.0)`.
    pub fn detect(&self, text: &str) -> LanguageDetection {
        let fallback = LanguageDetection {
            code: "en".to_string(),
            confidence: 0.0,
        };

        if text.trim().is_empty() {
            return fallback;
        }

        match self.identifier.predict(&self.clean_sample(text)) {
            Ok(prediction) => LanguageDetection {
                code: service_code(&prediction.label),
                confidence: prediction.score,
            },
            Err(IdentifyError::Unavailable) => {
                warn!("Language identification model is not loaded, defaulting to 'en'");
                fallback
            }
            Err(e) => {
                warn!("{} ({})", e, self.identifier.name());
                fallback
            }
        }
    }

    /// Effective source language for `sample`.
    ///
    /// An explicit code other than `auto` wins without any check.
    pub fn decide(&self, sample: &str, explicit: Option<&str>) -> LanguageDecision {
        if let Some(code) = explicit.filter(|c| !c.eq_ignore_ascii_case(AUTO)) {
            debug!("Using explicit source language '{}'", code);
            return LanguageDecision {
                code: code.to_lowercase(),
                confidence: 1.0,
                used_default: false,
            };
        }

        let detection = self.detect(sample);
        if detection.confidence < self.threshold {
            warn!(
                "Language detection confidence low ({:.3} < {}), defaulting source language to '{}'",
                detection.confidence, self.threshold, self.default_language
            );
            return LanguageDecision {
                code: self.default_language.clone(),
                confidence: detection.confidence,
                used_default: true,
            };
        }

        info!(
            "Detected language: {} - confidence: {:.3}%",
            detection.code,
            detection.confidence * 100.0
        );
        LanguageDecision {
            code: detection.code,
            confidence: detection.confidence,
            used_default: false,
        }
    }
}
