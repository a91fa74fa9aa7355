use crate::error::{Error, Result};
use crate::ordering::{IdentityOrdering, OrderingBackend, SpatialOrdering};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Formats picked up in directory mode unless configured otherwise
pub const DEFAULT_EXTENSIONS: [&str; 8] = ["xml", "pdf", "txt", "docx", "html", "htm", "csv", "json"];

/// How `.xml` inputs are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XmlMode {
    /// Translate block by block and write the ALTO tree back
    #[default]
    Structured,
    /// Extract reading-order text and write a plain-text translation
    Flat,
}

impl FromStr for XmlMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(XmlMode::Structured),
            "flat" => Ok(XmlMode::Flat),
            other => Err(format!("unknown xml_mode '{other}' (expected structured or flat)")),
        }
    }
}

/// Reading-order backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingKind {
    #[default]
    Identity,
    Spatial,
}

impl OrderingKind {
    pub fn backend(self) -> Box<dyn OrderingBackend> {
        match self {
            OrderingKind::Identity => Box::new(IdentityOrdering),
            OrderingKind::Spatial => Box::new(SpatialOrdering),
        }
    }
}

impl FromStr for OrderingKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "none" => Ok(OrderingKind::Identity),
            "spatial" => Ok(OrderingKind::Spatial),
            other => Err(format!("unknown ordering '{other}' (expected identity or spatial)")),
        }
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub api_url: String,
    /// Source language code, or `auto` to detect it
    pub source_lang: String,
    pub target_lang: String,
    pub extensions: Vec<String>,
    pub output: Option<PathBuf>,
    pub translation_chunk_chars: usize,
    pub ordering_chunk_size: usize,
    pub confidence_threshold: f32,
    pub default_language: String,
    pub detection_sample_blocks: usize,
    pub detection_sample_chars: usize,
    /// Per-request timeout; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
    pub ordering: OrderingKind,
    pub xml_mode: XmlMode,
    pub fasttext_bin: PathBuf,
    /// fastText language-identification model; unset disables detection
    pub fasttext_model: Option<PathBuf>,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            api_url: crate::translate::DEFAULT_API_URL.to_string(),
            source_lang: crate::language::AUTO.to_string(),
            target_lang: "en".to_string(),
            extensions: default_extensions(),
            output: None,
            translation_chunk_chars: crate::translate::DEFAULT_CHUNK_CHARS,
            ordering_chunk_size: crate::ordering::DEFAULT_CHUNK_SIZE,
            confidence_threshold: crate::language::DEFAULT_CONFIDENCE_THRESHOLD,
            default_language: crate::language::DEFAULT_LANGUAGE.to_string(),
            detection_sample_blocks: 20,
            detection_sample_chars: crate::language::DEFAULT_SAMPLE_CHARS,
            timeout_secs: None,
            ordering: OrderingKind::default(),
            xml_mode: XmlMode::default(),
            fasttext_bin: PathBuf::from("fasttext"),
            fasttext_model: None,
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("{key} expects a number, got '{value}'"))
}

fn parse_positive(key: &str, value: &str) -> std::result::Result<usize, String> {
    match parse_number::<usize>(key, value)? {
        0 => Err(format!("{key} must be greater than zero")),
        n => Ok(n),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

fn yaml_setting(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(yaml_scalar)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        other => yaml_scalar(other),
    }
}

/// 1-based line of a top-level `key:` entry, 0 when it cannot be found
fn yaml_key_line(content: &str, key: &str) -> usize {
    let prefix = format!("{key}:");
    content
        .lines()
        .position(|l| l.starts_with(&prefix))
        .map_or(0, |i| i + 1)
}

impl TranslateConfig {
    /// Apply one `key=value` setting
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim().to_lowercase().as_str() {
            "api_url" => self.api_url = value.trim_end_matches('/').to_string(),
            "source_lang" => self.source_lang = value.to_lowercase(),
            "target_lang" => self.target_lang = value.to_lowercase(),
            "extensions" => {
                self.extensions = value
                    .split(',')
                    .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            }
            "output" => self.output = optional_path(value),
            "translation_chunk_chars" => {
                self.translation_chunk_chars = parse_positive(key, value)?
            }
            "ordering_chunk_size" => self.ordering_chunk_size = parse_positive(key, value)?,
            "confidence_threshold" => {
                let threshold: f32 = parse_number(key, value)?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(format!("confidence_threshold must be within [0, 1], got {threshold}"));
                }
                self.confidence_threshold = threshold;
            }
            "default_language" => self.default_language = value.to_lowercase(),
            "detection_sample_blocks" => {
                self.detection_sample_blocks = parse_positive(key, value)?
            }
            "detection_sample_chars" => self.detection_sample_chars = parse_positive(key, value)?,
            "timeout_secs" => {
                self.timeout_secs = match value.to_lowercase().as_str() {
                    "" | "none" | "0" => None,
                    _ => Some(parse_number(key, value)?),
                }
            }
            "ordering" => self.ordering = value.parse()?,
            "xml_mode" => self.xml_mode = value.parse()?,
            "fasttext_bin" => self.fasttext_bin = PathBuf::from(value),
            "fasttext_model" => self.fasttext_model = optional_path(value),
            other => return Err(format!("unknown key '{other}'")),
        }
        Ok(())
    }

    /// Newline-delimited `key=value` pairs; `#` starts a comment line.
    ///
    /// Bad lines are skipped and returned alongside the resulting config.
    pub fn parse_key_value(content: &str) -> (Self, Vec<Error>) {
        let mut config = Self::default();
        let mut problems = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = match line.split_once('=') {
                Some((key, value)) => config.set(key, value),
                None => Err("expected key=value".to_string()),
            };
            if let Err(message) = result {
                problems.push(Error::ConfigParse {
                    line: index + 1,
                    message,
                });
            }
        }

        (config, problems)
    }

    /// A YAML mapping of the same keys, applied through [`Self::set`].
    ///
    /// Lists are joined with commas, so `extensions: [xml, pdf]` works.
    /// Only a document that is not valid YAML (or not a mapping) is an error.
    pub fn parse_yaml(content: &str) -> Result<(Self, Vec<Error>)> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
                line: e.location().map(|l| l.line()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let mut config = Self::default();
        let mut problems = Vec::new();
        let mapping = match document {
            serde_yaml::Value::Null => return Ok((config, problems)),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::ConfigParse {
                    line: 1,
                    message: "expected a mapping of settings".to_string(),
                })
            }
        };

        for (key, value) in &mapping {
            let Some(key) = yaml_scalar(key) else {
                problems.push(Error::ConfigParse {
                    line: 0,
                    message: format!("unsupported key {key:?}"),
                });
                continue;
            };
            let line = yaml_key_line(content, &key);
            let result = yaml_setting(value)
                .ok_or_else(|| format!("{key} expects a scalar or a list of scalars"))
                .and_then(|value| config.set(&key, &value));
            if let Err(message) = result {
                problems.push(Error::ConfigParse { line, message });
            }
        }

        Ok((config, problems))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            crate::preprocessors::extension_of(path).as_str(),
            "yaml" | "yml"
        );

        let (config, problems) = if is_yaml {
            Self::parse_yaml(&content)?
        } else {
            Self::parse_key_value(&content)
        };
        for problem in problems {
            warn!("{}: {} (ignored)", path.display(), problem);
        }
        Ok(config)
    }

    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {} ({}), using defaults", p.display(), e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }

    /// Whether directory mode should pick up `path`
    pub fn accepts(&self, path: &Path) -> bool {
        let ext = crate::preprocessors::extension_of(path);
        !ext.is_empty() && self.extensions.iter().any(|e| *e == ext)
    }

    /// Apply explicit command-line values on top of file values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = &overrides.api_url {
            self.api_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = &overrides.source_lang {
            self.source_lang = v.to_lowercase();
        }
        if let Some(v) = &overrides.target_lang {
            self.target_lang = v.to_lowercase();
        }
        if let Some(v) = &overrides.extensions {
            if let Err(e) = self.set("extensions", v) {
                warn!("Ignoring --extensions: {}", e);
            }
        }
        if let Some(v) = &overrides.output {
            self.output = Some(v.clone());
        }
        if let Some(v) = overrides.ordering {
            self.ordering = v;
        }
        if let Some(v) = overrides.xml_mode {
            self.xml_mode = v;
        }
        if let Some(v) = overrides.timeout_secs {
            self.timeout_secs = (v > 0).then_some(v);
        }
        if let Some(v) = &overrides.fasttext_model {
            self.fasttext_model = Some(v.clone());
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub extensions: Option<String>,
    pub output: Option<PathBuf>,
    pub ordering: Option<OrderingKind>,
    pub xml_mode: Option<XmlMode>,
    pub timeout_secs: Option<u64>,
    pub fasttext_model: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TranslateConfig::default();
        assert_eq!(config.source_lang, "auto");
        assert_eq!(config.target_lang, "en");
        assert_eq!(config.translation_chunk_chars, 5000);
        assert_eq!(config.ordering_chunk_size, 350);
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.default_language, "cs");
        assert_eq!(config.detection_sample_blocks, 20);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.xml_mode, XmlMode::Structured);
    }

    #[test]
    fn test_key_value_parsing_skips_bad_lines() {
        let content = "\
# translation settings
target_lang = DE
extensions=.XML, pdf ,txt
timeout_secs=30
ordering_chunk_size=zero
no equals sign here
colour=blue
xml_mode=flat
";
        let (config, problems) = TranslateConfig::parse_key_value(content);
        assert_eq!(config.target_lang, "de");
        assert_eq!(config.extensions, vec!["xml", "pdf", "txt"]);
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.ordering_chunk_size, 350);
        assert_eq!(config.xml_mode, XmlMode::Flat);

        let lines: Vec<usize> = problems
            .iter()
            .map(|p| match p {
                Error::ConfigParse { line, .. } => *line,
                _ => 0,
            })
            .collect();
        assert_eq!(lines, vec![5, 6, 7]);
    }

    #[test]
    fn test_threshold_must_be_a_probability() {
        let mut config = TranslateConfig::default();
        assert!(config.set("confidence_threshold", "1.5").is_err());
        assert!(config.set("confidence_threshold", "0.25").is_ok());
        assert_eq!(config.confidence_threshold, 0.25);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "target_lang: cs\nordering: spatial\nextensions: [xml]").unwrap();
        let config = TranslateConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.target_lang, "cs");
        assert_eq!(config.ordering, OrderingKind::Spatial);
        assert_eq!(config.extensions, vec!["xml"]);
        assert_eq!(config.translation_chunk_chars, 5000);
    }

    #[test]
    fn test_yaml_and_key_value_apply_the_same_rules() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "timeout_secs: 0\ntarget_lang: DE\nextensions: [.XML, Pdf]\nconfidence_threshold: 7.5\ndetection_sample_blocks: 0"
        )
        .unwrap();
        let yaml = TranslateConfig::load_from_file(file.path()).unwrap();

        let (kv, problems) = TranslateConfig::parse_key_value(
            "timeout_secs=0\ntarget_lang=DE\nextensions=.XML,Pdf\nconfidence_threshold=7.5\ndetection_sample_blocks=0",
        );
        assert_eq!(problems.len(), 2);

        assert_eq!(yaml, kv);
        assert_eq!(yaml.timeout(), None);
        assert_eq!(yaml.target_lang, "de");
        assert_eq!(yaml.extensions, vec!["xml", "pdf"]);
        assert_eq!(yaml.confidence_threshold, 0.4);
        assert_eq!(yaml.detection_sample_blocks, 20);
        assert!(yaml.accepts(Path::new("page.xml")));
    }

    #[test]
    fn test_yaml_problems_point_at_their_lines() {
        let content = "target_lang: cs\nordering: layoutlm\nextensions:\n  nested: map\ncolour: blue\n";
        let (config, problems) = TranslateConfig::parse_yaml(content).unwrap();
        assert_eq!(config.target_lang, "cs");
        assert_eq!(config.ordering, OrderingKind::Identity);

        let lines: Vec<usize> = problems
            .iter()
            .map(|p| match p {
                Error::ConfigParse { line, .. } => *line,
                _ => usize::MAX,
            })
            .collect();
        assert_eq!(lines, vec![2, 3, 5]);

        assert_eq!(TranslateConfig::parse_yaml("").unwrap().0, TranslateConfig::default());
        assert!(TranslateConfig::parse_yaml("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_broken_yaml_falls_back_to_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "ordering: [not, a, kind").unwrap();
        assert!(TranslateConfig::load_from_file(file.path()).is_err());
        assert_eq!(
            TranslateConfig::load_with_fallback(Some(file.path())),
            TranslateConfig::default()
        );
        assert_eq!(
            TranslateConfig::load_with_fallback(Some(Path::new("/nonexistent/transalto.conf"))),
            TranslateConfig::default()
        );
    }

    #[test]
    fn test_cli_overrides_win() {
        let (mut config, _) = TranslateConfig::parse_key_value("target_lang=de\nsource_lang=fr");
        config.apply_overrides(&ConfigOverrides {
            target_lang: Some("EN".to_string()),
            extensions: Some("pdf".to_string()),
            timeout_secs: Some(0),
            ..Default::default()
        });
        assert_eq!(config.target_lang, "en");
        assert_eq!(config.source_lang, "fr");
        assert_eq!(config.extensions, vec!["pdf"]);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_accepts_by_extension() {
        let config = TranslateConfig::default();
        assert!(config.accepts(Path::new("a/b/page.XML")));
        assert!(!config.accepts(Path::new("a/b/page.xlsx")));
        assert!(!config.accepts(Path::new("Makefile")));
    }
}
