use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lessongraph_cli::{discover_documents, SubjectPaths};
use lessongraph_core::ids::IdGenerator;
use lessongraph_core::store::{load_store, save_store_atomic};
use lessongraph_core::subjects::SubjectRegistry;
use lessongraph_core::{
    chapter_no_from_path, ChapterJob, ConversionConfig, DocumentProcessor, StepProfiler,
};

#[derive(Parser)]
#[command(name = "lessongraph")]
#[command(about = "Convert styled lesson documents into concept and question/answer stores")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build concept trees into concept.json
    Concepts(CommonArgs),
    /// Collect question/answer records into qa.json
    Qa(CommonArgs),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Concepts,
    Qa,
}

impl Command {
    fn split(&self) -> (Mode, &CommonArgs) {
        match self {
            Command::Concepts(common) => (Mode::Concepts, common),
            Command::Qa(common) => (Mode::Qa, common),
        }
    }
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Standard (grade) number, e.g. 6
    #[arg(long)]
    standard: String,

    /// Subject name, e.g. science
    #[arg(long)]
    subject: String,

    /// Directory scanned for .docx files when no FILES are given
    #[arg(long, default_value = "input")]
    input_dir: PathBuf,

    /// Database directory holding subjects.json and per-subject stores
    #[arg(long, default_value = "db")]
    db_dir: PathBuf,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Base path or URL recorded in image items
    #[arg(long)]
    asset_base_url: Option<String>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Convert and merge in memory without writing stores or images
    #[arg(long)]
    dry_run: bool,

    /// Documents to convert; the numeric file stem is the chapter number
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (mode, common) = args.command.split();
    let (standard, subject) = (common.standard.as_str(), common.subject.as_str());
    info!("🦀 Lessongraph Document Converter");

    let paths = SubjectPaths::new(&common.db_dir, standard, subject);

    let mut config = ConversionConfig::load_with_fallback(common.config.as_deref());
    if let Some(config_path) = &common.config {
        info!("📋 Loaded config from: {}", config_path);
    } else {
        info!("📋 Using default config");
    }
    config.asset_base_url = common
        .asset_base_url
        .clone()
        .unwrap_or_else(|| paths.default_asset_base_url());

    let subject_id = resolve_subject(&paths, &config, standard, subject, common.dry_run)?;

    let files = if common.files.is_empty() {
        discover_documents(&common.input_dir)?
    } else {
        common.files.clone()
    };
    if files.is_empty() {
        warn!("⚠️  No documents to convert");
        return Ok(());
    }

    let store_path = match mode {
        Mode::Concepts => paths.concept_store.clone(),
        Mode::Qa => paths.qa_store.clone(),
    };
    let processor = DocumentProcessor::new_cli(&paths.images, config, common.dry_run)?;

    let mut failures = 0;
    for input in &files {
        match convert_one(&processor, mode, input, &subject_id, &store_path, common.profile) {
            Ok(()) => {}
            Err(e) => {
                failures += 1;
                error!("❌ {}: {e:#}", input.display());
            }
        }
    }

    info!(
        "🏁 {} of {} documents converted",
        files.len() - failures,
        files.len()
    );
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn convert_one(
    processor: &DocumentProcessor,
    mode: Mode,
    input: &Path,
    subject_id: &str,
    store_path: &Path,
    profile: bool,
) -> Result<()> {
    if !processor.supports(input) {
        bail!("not a .docx document");
    }
    let job = ChapterJob {
        input: input.to_path_buf(),
        chapter_no: chapter_no_from_path(input)?,
        subject_id: subject_id.to_string(),
        store_path: store_path.to_path_buf(),
    };

    let mut profiler = StepProfiler::new(profile);
    let outcome = match mode {
        Mode::Concepts => processor.process_concepts_file(&job, &mut profiler)?,
        Mode::Qa => processor.process_qa_file(&job, &mut profiler)?,
    };
    profiler.log_summary(&format!("chapter {}", job.chapter_no));

    if !outcome.report.is_empty() {
        warn!(
            "⚠️  {}: {} issues need review",
            input.display(),
            outcome.report.len()
        );
    }
    Ok(())
}

/// Subject id from `<db>/subjects.json`, registering the standard and subject
/// when they are new.
fn resolve_subject(
    paths: &SubjectPaths,
    config: &ConversionConfig,
    standard: &str,
    subject: &str,
    dry_run: bool,
) -> Result<String> {
    let mut registry: SubjectRegistry = load_store(&paths.registry)
        .with_context(|| format!("Failed to load {}", paths.registry.display()))?;
    let ids = IdGenerator::new(config.id_strategy, "subjects");
    let resolved = registry.resolve(&config.publisher, standard, subject, &ids);

    if resolved.created && !dry_run {
        save_store_atomic(&paths.registry, &registry)?;
    }
    info!("📚 Subject {} → {}", paths.slug, resolved.subject_id);
    Ok(resolved.subject_id)
}
