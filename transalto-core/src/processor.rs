use crate::alto::AltoDocument;
use crate::config::{TranslateConfig, XmlMode};
use crate::language::{
    FastTextCli, LanguageDecision, LanguageGate, LanguageIdentifier, UnavailableIdentifier, AUTO,
};
use crate::ordering::{OrderingBackend, ReadingOrderEngine};
use crate::preprocessors::{extension_of, Preprocessor, PreprocessorRegistry};
use crate::report::{fingerprint, BatchReport, FileOutcome, FileReport};
use crate::translate::{
    unique_units, LindatService, TranslationCache, TranslationService, Translator,
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Output directory used in directory mode when none is configured
pub const DEFAULT_OUTPUT_DIR: &str = "translated";

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        debug!("{}: {:.0}ms", step_name, elapsed.as_millis());
        match self.timings.iter_mut().find(|(name, _)| name == step_name) {
            Some((_, total)) => *total += elapsed,
            None => self.timings.push((step_name.to_string(), elapsed)),
        }

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Files in `dir` (not recursive) whose extension the config accepts, sorted by path
pub fn collect_inputs(dir: &Path, config: &TranslateConfig) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list input directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && config.accepts(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write output file {}", path.display()))
}

pub struct DocumentProcessor {
    config: TranslateConfig,
    preprocessors: PreprocessorRegistry,
    gate: LanguageGate,
    translator: Translator,
    profiler: StepProfiler,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        config: TranslateConfig,
        service: Box<dyn TranslationService>,
        identifier: Box<dyn LanguageIdentifier>,
        ordering: Box<dyn OrderingBackend>,
    ) -> Self {
        let engine = ReadingOrderEngine::with_chunk_size(ordering, config.ordering_chunk_size);
        debug!(
            "Reading order: {} backend, {} words per chunk",
            engine.backend_name(),
            config.ordering_chunk_size
        );
        let engine = Rc::new(engine);
        let gate = LanguageGate::new(identifier)
            .with_threshold(config.confidence_threshold)
            .with_default_language(&config.default_language)
            .with_sample_chars(config.detection_sample_chars);
        let translator = Translator::with_chunk_chars(service, config.translation_chunk_chars);

        Self {
            preprocessors: PreprocessorRegistry::new(engine),
            gate,
            translator,
            profiler: StepProfiler::new(false),
            config,
        }
    }

    /// Convenience constructor wiring the Lindat service, fastText and the configured ordering
    pub fn from_config(config: TranslateConfig) -> Self {
        let service = Box::new(LindatService::new(&config.api_url, config.timeout()));
        let identifier: Box<dyn LanguageIdentifier> = match &config.fasttext_model {
            Some(model) => Box::new(FastTextCli::new(&config.fasttext_bin, model)),
            None => Box::new(UnavailableIdentifier),
        };
        let ordering = config.ordering.backend();
        Self::new_with_dependencies(config, service, identifier, ordering)
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiler = StepProfiler::new(enabled);
        self
    }

    pub fn config(&self) -> &TranslateConfig {
        &self.config
    }

    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    /// Add a preprocessor that takes precedence over the built-in ones
    pub fn register_preprocessor(&mut self, preprocessor: Box<dyn Preprocessor>) {
        self.preprocessors.register(preprocessor);
    }

    fn uses_structured_pipeline(&self, input: &Path) -> bool {
        extension_of(input) == "xml" && self.config.xml_mode == XmlMode::Structured
    }

    /// `<stem>_<target>.xml` for structured output, `<stem>_<target>.txt` otherwise
    pub fn output_file_name(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let extension = if self.uses_structured_pipeline(input) {
            "xml"
        } else {
            "txt"
        };
        format!("{}_{}.{}", stem, self.config.target_lang, extension)
    }

    fn explicit_source(&self) -> Option<&str> {
        let source = self.config.source_lang.as_str();
        (!source.eq_ignore_ascii_case(AUTO)).then_some(source)
    }

    /// Process one file, writing the result to `output`
    pub fn process_file(&mut self, input: &Path, output: &Path) -> Result<FileOutcome> {
        self.run_file(input, output).map(|(outcome, _)| outcome)
    }

    fn run_file(&mut self, input: &Path, output: &Path) -> Result<(FileOutcome, Option<String>)> {
        info!("Processing {}", input.display());
        if self.uses_structured_pipeline(input) {
            self.process_structured(input, output)
        } else {
            self.process_flat(input, output)
        }
    }

    /// Whole-text pipeline: extract, decide, translate, write text
    fn process_flat(&mut self, input: &Path, output: &Path) -> Result<(FileOutcome, Option<String>)> {
        let text = self
            .profiler
            .time_step("Extract text", || self.preprocessors.extract(input))
            .with_context(|| format!("Extraction failed for {}", input.display()))?;

        if text.trim().is_empty() {
            info!("No text extracted from {}", input.display());
            return Ok((FileOutcome::NoText, None));
        }

        let explicit = self.explicit_source().map(str::to_string);
        let decision = self
            .profiler
            .time_step("Identify language", || self.gate.decide(&text, explicit.as_deref()));

        let target = self.config.target_lang.clone();
        let final_text = if decision.code == target {
            info!("Source matches target ({}), skipping translation", target);
            text
        } else {
            info!("Translating from {} to {}", decision.code, target);
            self.profiler.time_step("Translate", || {
                self.translator.translate(&text, &decision.code, &target)
            })
        };

        self.profiler
            .time_step("Write output", || write_output(output, final_text.as_bytes()))?;
        info!("Translation saved to {}", output.display());

        Ok((
            FileOutcome::Written {
                output: output.to_path_buf(),
            },
            Some(decision.code),
        ))
    }

    /// Structured pipeline: translate block by block and rewrite the ALTO tree
    fn process_structured(
        &mut self,
        input: &Path,
        output: &Path,
    ) -> Result<(FileOutcome, Option<String>)> {
        let bytes = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let mut document = self
            .profiler
            .time_step("Parse ALTO", || AltoDocument::parse(&bytes))
            .with_context(|| format!("Failed to parse ALTO XML file {}", input.display()))?;

        let blocks = self
            .profiler
            .time_step("Extract blocks", || document.extract_blocks());
        if blocks.is_empty() {
            info!("No text blocks found in {}", input.display());
            return Ok((FileOutcome::NoText, None));
        }

        let sample = blocks
            .iter()
            .take(self.config.detection_sample_blocks)
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let explicit = self.explicit_source().map(str::to_string);
        let decision: LanguageDecision = self
            .profiler
            .time_step("Identify language", || self.gate.decide(&sample, explicit.as_deref()));

        let target = self.config.target_lang.clone();
        if decision.code == target {
            info!(
                "Source matches target ({}), leaving {} untouched",
                target,
                input.display()
            );
            return Ok((FileOutcome::SkippedSameLanguage, Some(decision.code)));
        }

        let units = unique_units(blocks.iter().map(|b| b.text.as_str()));
        info!(
            "Translating {} unique blocks ({} total) from {} to {}",
            units.len(),
            blocks.len(),
            decision.code,
            target
        );

        let mut cache = TranslationCache::new();
        let translator = &self.translator;
        self.profiler.time_step("Translate", || {
            for unit in &units {
                cache.resolve(unit, |text| translator.translate(text, &decision.code, &target));
            }
        });
        debug!(
            "{} distinct texts translated for {} blocks",
            cache.misses(),
            blocks.len()
        );

        let options = document.write_options();
        self.profiler.time_step("Rewrite lines", || {
            for block in &blocks {
                let translated = cache.get(&block.text).unwrap_or(&block.text);
                document.rewrite_lines(&block.lines, translated, &options);
            }
        });

        let serialized = self
            .profiler
            .time_step("Serialize", || document.serialize(&options))
            .with_context(|| format!("Failed to serialize {}", input.display()))?;
        write_output(output, &serialized)?;
        info!("Translated ALTO saved to {}", output.display());

        Ok((
            FileOutcome::Written {
                output: output.to_path_buf(),
            },
            Some(decision.code),
        ))
    }

    /// Process one file with failures caught at the file boundary
    pub fn process_one(&mut self, input: &Path, output: &Path) -> FileReport {
        let started = Instant::now();
        let input_sha256 = std::fs::read(input).ok().map(|bytes| fingerprint(&bytes));

        let (outcome, language) = match self.run_file(input, output) {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to process {}: {:#}", input.display(), e);
                (
                    FileOutcome::Failed {
                        error: format!("{e:#}"),
                    },
                    None,
                )
            }
        };

        FileReport {
            input: input.to_path_buf(),
            input_sha256,
            outcome,
            language,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Output path for `input` not yet taken by an earlier input of the batch.
    ///
    /// Same-stem inputs (`notes.txt`, `notes.json`) fall back to
    /// `<stem>_<ext>_<target>`; `None` when that name is taken too.
    fn claim_output(
        &self,
        input: &Path,
        output_dir: &Path,
        claimed: &mut HashSet<PathBuf>,
    ) -> Option<PathBuf> {
        let output = output_dir.join(self.output_file_name(input));
        if claimed.insert(output.clone()) {
            return Some(output);
        }

        let name = self.output_file_name(input);
        let target_suffix = format!("_{}.", self.config.target_lang);
        let (stem, rest) = name.rsplit_once(&target_suffix)?;
        let fallback = output_dir.join(format!(
            "{}_{}{}{}",
            stem,
            extension_of(input),
            target_suffix,
            rest
        ));
        warn!(
            "{} collides with an earlier input, writing {} instead",
            output.display(),
            fallback.display()
        );
        claimed.insert(fallback.clone()).then_some(fallback)
    }

    /// Process every input into `output_dir`; one file's failure never stops the rest
    pub fn process_batch(&mut self, inputs: &[PathBuf], output_dir: &Path) -> BatchReport {
        let mut report = BatchReport::new(&self.config.target_lang);

        let mut claimed = HashSet::new();

        for (index, input) in inputs.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, inputs.len(), input.display());
            let Some(output) = self.claim_output(input, output_dir, &mut claimed) else {
                error!("No free output name for {}", input.display());
                report.push(FileReport {
                    input: input.to_path_buf(),
                    input_sha256: std::fs::read(input).ok().map(|bytes| fingerprint(&bytes)),
                    outcome: FileOutcome::Failed {
                        error: format!(
                            "output name {} is already used by another input in this batch",
                            self.output_file_name(input)
                        ),
                    },
                    language: None,
                    duration_ms: 0,
                });
                continue;
            };
            report.push(self.process_one(input, &output));
        }

        report.finish();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::UnavailableIdentifier;
    use crate::ordering::IdentityOrdering;
    use crate::translate::ServiceError;

    struct Offline;

    impl TranslationService for Offline {
        fn list_models(&self) -> std::result::Result<Vec<String>, ServiceError> {
            Err(ServiceError::Transport("offline".to_string()))
        }

        fn translate_chunk(
            &self,
            _model: &str,
            _src: &str,
            _tgt: &str,
            _chunk: &str,
        ) -> std::result::Result<String, ServiceError> {
            Err(ServiceError::Transport("offline".to_string()))
        }
    }

    fn processor(config: TranslateConfig) -> DocumentProcessor {
        DocumentProcessor::new_with_dependencies(
            config,
            Box::new(Offline),
            Box::new(UnavailableIdentifier),
            Box::new(IdentityOrdering),
        )
    }

    #[test]
    fn test_output_file_names() {
        let mut config = TranslateConfig::default();
        config.target_lang = "de".to_string();
        let p = processor(config.clone());
        assert_eq!(p.output_file_name(Path::new("in/page_001.xml")), "page_001_de.xml");
        assert_eq!(p.output_file_name(Path::new("in/report.pdf")), "report_de.txt");

        config.xml_mode = XmlMode::Flat;
        let p = processor(config);
        assert_eq!(p.output_file_name(Path::new("in/page_001.XML")), "page_001_de.txt");
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml", "a.PDF", "c.txt", "notes.md", "d.docx"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.xml")).unwrap();

        let mut config = TranslateConfig::default();
        config.extensions = vec!["xml".into(), "pdf".into(), "txt".into()];
        let names: Vec<String> = collect_inputs(dir.path(), &config)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.xml", "c.txt"]);
    }

    #[test]
    fn test_profiler_accumulates_named_steps() {
        let mut profiler = StepProfiler::new(true);
        assert_eq!(profiler.time_step("Translate", || 1 + 1), 2);
        profiler.time_step("Translate", || ());
        profiler.time_step("Write output", || ());
        let names: Vec<&str> = profiler.timings().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Translate", "Write output"]);

        let mut disabled = StepProfiler::new(false);
        disabled.time_step("Translate", || ());
        assert!(disabled.timings().is_empty());
    }

    #[test]
    fn test_explicit_source_language() {
        let p = processor(TranslateConfig::default());
        assert_eq!(p.explicit_source(), None);

        let mut config = TranslateConfig::default();
        config.source_lang = "cs".to_string();
        assert_eq!(processor(config).explicit_source(), Some("cs"));
    }
}
