use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Import from transalto-core
use transalto_core::{
    collect_inputs, BatchReport, ConfigOverrides, DocumentProcessor, FileOutcome, OrderingKind,
    TranslateConfig, XmlMode, DEFAULT_OUTPUT_DIR,
};

#[derive(Parser)]
#[command(name = "transalto")]
#[command(about = "Translate ALTO, PDF and text documents while keeping their layout")]
struct Args {
    /// Input file (.xml ALTO, .pdf, .txt, .docx, .html, .csv, .json) or a directory of them
    input: PathBuf,

    /// Output file for a single input, output directory for a directory input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code, or "auto" to detect it
    #[arg(long)]
    source_lang: Option<String>,

    /// Target language code (default: en)
    #[arg(long)]
    target_lang: Option<String>,

    /// Comma-separated extensions picked up in directory mode
    #[arg(long)]
    extensions: Option<String>,

    /// Config file of key=value lines (or YAML for .yaml/.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reading-order backend: identity or spatial
    #[arg(long)]
    ordering: Option<OrderingKind>,

    /// ALTO handling: structured (rewrite the XML) or flat (plain-text output)
    #[arg(long)]
    xml_mode: Option<XmlMode>,

    /// fastText language-identification model (enables detection)
    #[arg(long)]
    fasttext_model: Option<PathBuf>,

    /// Translation service base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write a JSON report of every processed file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            extensions: self.extensions.clone(),
            output: self.output.clone(),
            ordering: self.ordering,
            xml_mode: self.xml_mode,
            timeout_secs: self.timeout_secs,
            fasttext_model: self.fasttext_model.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// `~/.config/transalto/config` when present
fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("transalto").join("config");
    path.is_file().then_some(path)
}

fn run_single(
    processor: &mut DocumentProcessor,
    input: &Path,
    config: &TranslateConfig,
) -> BatchReport {
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(processor.output_file_name(input)));

    let mut report = BatchReport::new(&config.target_lang);
    report.push(processor.process_one(input, &output));
    report.finish();
    report
}

fn run_directory(
    processor: &mut DocumentProcessor,
    input: &Path,
    config: &TranslateConfig,
) -> Result<BatchReport> {
    let inputs = collect_inputs(input, config)?;
    if inputs.is_empty() {
        println!(
            "⚠️  No files with extensions [{}] in {}",
            config.extensions.join(", "),
            input.display()
        );
    }

    let output_dir = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    println!("📁 {} files → {}", inputs.len(), output_dir.display());
    Ok(processor.process_batch(&inputs, &output_dir))
}

fn print_summary(report: &BatchReport) {
    for file in &report.files {
        match &file.outcome {
            FileOutcome::Written { output } => {
                println!("✅ {} → {}", file.input.display(), output.display())
            }
            FileOutcome::SkippedSameLanguage => {
                println!("⏭️  {} already in target language", file.input.display())
            }
            FileOutcome::NoText => println!("∅  {} has no text", file.input.display()),
            FileOutcome::Failed { error } => {
                println!("❌ {}: {}", file.input.display(), error)
            }
        }
    }

    let summary = report.summary();
    println!(
        "\n📊 {} written, {} skipped, {} empty, {} failed",
        summary.written, summary.skipped, summary.empty, summary.failed
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("🦀 Transalto Document Translator");

    if !args.input.exists() {
        eprintln!("❌ Input not found at: {}", args.input.display());
        std::process::exit(1);
    }

    let config_path = args.config.clone().or_else(default_config_path);
    if let Some(path) = &config_path {
        println!("📋 Loading config from: {}", path.display());
    }
    let mut config = TranslateConfig::load_with_fallback(config_path.as_deref());
    config.apply_overrides(&args.overrides());
    debug!("Effective config: {:?}", config);

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut processor = DocumentProcessor::from_config(config.clone()).with_profiling(args.profile);

    let report = if args.input.is_dir() {
        run_directory(&mut processor, &args.input, &config)?
    } else {
        run_single(&mut processor, &args.input, &config)
    };

    print_summary(&report);
    processor.profiler().print_summary();

    if let Some(path) = &args.report {
        report.save(path)?;
        println!("📝 Report written to {}", path.display());
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
