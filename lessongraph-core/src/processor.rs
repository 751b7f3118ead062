use crate::concepts::ConceptPipeline;
use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::extract::images::ExtractedImage;
use crate::extract::Converted;
use crate::ids::{sanitize_label, IdGenerator};
use crate::merge::{upsert, ChapterEntry, ChapterIdentity, ChapterStore, Upserted};
use crate::preprocessors::{DocxPreprocessor, Preprocessor};
use crate::qa::QaPipeline;
use crate::report::ConversionReport;
use crate::storage::{AssetStorage, AssetWrite, FileAssetStorage, NoOpAssetStorage};
use crate::store::{load_store, save_store_atomic};
use crate::types::*;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Collects timings for pipeline steps
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

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn log_summary(&self, title: &str) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        info!("📊 Performance Summary ({title}):");
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Chapter identity from a document's file stem (`3.docx` → 3). Content
/// inside the document never decides the chapter.
pub fn chapter_no_from_path(path: &Path) -> Result<ChapterNo, ConversionError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .unwrap_or_default();
    match stem.parse::<u64>() {
        Ok(_) => Ok(ChapterNo::Text(stem.to_string())),
        Err(_) => Err(ConversionError::InvalidChapterIdentity(
            path.display().to_string(),
        )),
    }
}

/// One chapter document and where its result goes.
#[derive(Debug, Clone)]
pub struct ChapterJob {
    pub input: PathBuf,
    pub chapter_no: ChapterNo,
    pub subject_id: String,
    pub store_path: PathBuf,
}

impl ChapterJob {
    /// Deterministic ids are namespaced by subject and chapter so equal
    /// labels in different chapters get different ids.
    fn ids(&self, config: &ConversionConfig) -> IdGenerator {
        IdGenerator::new(
            config.id_strategy,
            format!("{}/{}", self.subject_id, self.chapter_no),
        )
    }

    /// Images directory of this chapter under the images root. Q&A images
    /// get their own subdirectory so they never meet concept image names.
    fn asset_dir(&self, qa: bool) -> String {
        let mut dir = sanitize_label(&self.chapter_no.to_string());
        if dir.is_empty() {
            dir = "chapter".to_string();
        }
        if qa {
            dir.push_str("/qa");
        }
        dir
    }

    fn identity(&self, ids: &IdGenerator) -> ChapterIdentity {
        ChapterIdentity {
            chapter_no: self.chapter_no.clone(),
            subject_id: self.subject_id.clone(),
            id: ids.keyed_id(&["chapter"]),
        }
    }
}

#[derive(Debug)]
pub struct ChapterOutcome {
    pub upserted: Upserted,
    pub records: usize,
    pub images: usize,
    pub report: ConversionReport,
}

pub struct DocumentProcessor {
    preprocessor: Box<dyn Preprocessor>,
    assets: Box<dyn AssetStorage>,
    config: ConversionConfig,
    dry_run: bool,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        preprocessor: Box<dyn Preprocessor>,
        assets: Box<dyn AssetStorage>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            preprocessor,
            assets,
            config,
            dry_run: false,
        }
    }

    /// Docx reader plus file-backed images. A dry run converts and merges in
    /// memory but writes neither images nor stores.
    pub fn new_cli(images_dir: &Path, config: ConversionConfig, dry_run: bool) -> Result<Self> {
        let assets: Box<dyn AssetStorage> = if dry_run {
            Box::new(NoOpAssetStorage::new())
        } else {
            Box::new(FileAssetStorage::new(images_dir)?)
        };
        let mut processor =
            Self::new_with_dependencies(Box::new(DocxPreprocessor::new()), assets, config);
        processor.dry_run = dry_run;
        Ok(processor)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.preprocessor.supports_file_type(path)
    }

    /// Document bytes → concept tree, without touching any store.
    pub fn convert_concepts(
        &self,
        document_bytes: &[u8],
        ids: IdGenerator,
    ) -> Result<Converted<Vec<Node>>> {
        let document = self.preprocessor.process(document_bytes)?;
        Ok(ConceptPipeline::new(&self.config).convert(&document, ids)?)
    }

    /// Document bytes → Q&A records, without touching any store.
    pub fn convert_qa(&self, document_bytes: &[u8], ids: IdGenerator) -> Result<Converted<Vec<Qa>>> {
        let document = self.preprocessor.process(document_bytes)?;
        Ok(QaPipeline::new(&self.config).convert(&document, ids)?)
    }

    pub fn process_concepts_file(
        &self,
        job: &ChapterJob,
        profiler: &mut StepProfiler,
    ) -> Result<ChapterOutcome> {
        self.process_file::<ConceptStore, _>(job, profiler, |document, ids| {
            Ok(ConceptPipeline::new(&self.config)
                .with_asset_dir(job.asset_dir(false))
                .convert(document, ids)?)
        })
    }

    pub fn process_qa_file(
        &self,
        job: &ChapterJob,
        profiler: &mut StepProfiler,
    ) -> Result<ChapterOutcome> {
        self.process_file::<QaStore, _>(job, profiler, |document, ids| {
            Ok(QaPipeline::new(&self.config)
                .with_asset_dir(job.asset_dir(true))
                .convert(document, ids)?)
        })
    }

    /// Convert → load store → merge → write images → replace store.
    ///
    /// Any failure before the final step leaves the store untouched; images
    /// are written before the store so it never links to a missing file.
    fn process_file<S, F>(
        &self,
        job: &ChapterJob,
        profiler: &mut StepProfiler,
        convert: F,
    ) -> Result<ChapterOutcome>
    where
        S: ChapterStore,
        F: FnOnce(
            &PreprocessorOutput,
            IdGenerator,
        ) -> Result<Converted<Vec<<S::Entry as ChapterEntry>::Record>>>,
    {
        info!(
            "📄 Processing chapter {} from {} ({})",
            job.chapter_no,
            job.input.display(),
            self.preprocessor.name()
        );
        let ids = job.ids(&self.config);
        let identity = job.identity(&ids);

        let bytes = std::fs::read(&job.input)
            .with_context(|| format!("Failed to read {}", job.input.display()))?;
        let package = profiler.time_step("1. Unpack package", || self.preprocessor.unpack(&bytes))?;
        let document =
            profiler.time_step("2. Parse paragraphs", || self.preprocessor.parse_package(&package))?;
        let converted = profiler
            .time_step("3. Build records", || convert(&document, ids))
            .with_context(|| format!("Failed to convert {}", job.input.display()))?;

        let mut store: S = profiler.time_step("4. Load store", || load_store(&job.store_path))?;
        let records = converted.records.len();
        let upserted = profiler
            .time_step("5. Merge chapter", || {
                upsert(store.chapters_mut(), &identity, converted.records)
            })
            .context("Failed to encode converted records")?;

        let images = converted.images.len();
        if self.dry_run {
            info!("🚫 Dry run: {images} images and the store were not written");
        } else {
            profiler.time_step("6. Write images", || self.write_images(&converted.images))?;
            profiler.time_step("7. Save store", || save_store_atomic(&job.store_path, &store))?;
        }

        info!(
            "✅ Chapter {}: {records} records, {images} images, {} issues",
            job.chapter_no,
            converted.report.len()
        );
        Ok(ChapterOutcome {
            upserted,
            records,
            images,
            report: converted.report,
        })
    }

    fn write_images(&self, images: &[ExtractedImage]) -> Result<()> {
        let (mut created, mut unchanged, mut replaced) = (0, 0, 0);
        for image in images {
            match self.assets.store_asset(&image.filename, &image.bytes)? {
                AssetWrite::Created => created += 1,
                AssetWrite::Unchanged => unchanged += 1,
                AssetWrite::Replaced => {
                    info!("🖼️  Replaced {} with the new version", image.filename);
                    replaced += 1;
                }
            }
        }
        if !images.is_empty() {
            info!("🖼️  Images: {created} new, {replaced} replaced, {unchanged} unchanged");
        }
        Ok(())
    }
}
