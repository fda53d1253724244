//! End-to-end extraction: preprocess, detect, crop, recognize, structure.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::DynamicImage;
use imageproc::drawing::draw_line_segment_mut;
use uuid::Uuid;

use crate::config::ExtractorConfig;
use crate::detection::{self, TableDetector};
use crate::error::{Result, TableError};
use crate::models::{BoundingBox, TableGrid, TextFragment};
use crate::ocr::FusionEngine;
use crate::preprocessing::{PreprocessReport, Preprocessor};
use crate::structure::{BAND_COLOR, StructureAnalyzer};
use crate::telemetry::Telemetry;

/// Where intermediate images are written.
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent; it is created if missing.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if output_dir.exists() {
            if std::fs::read_dir(&output_dir)?.next().is_some() {
                return Err(TableError::Config(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Sub-directory for one of several inputs sharing a debug root.
    pub fn child(&self, name: &str) -> Self {
        Self {
            output_dir: self.output_dir.join(name),
        }
    }

    fn save(&self, step_dir: &str, index: usize, image: &DynamicImage) -> Result<PathBuf> {
        let dir = self.output_dir.join(step_dir);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{:02}.png", index + 1));
        image.save(&path)?;
        tracing::debug!(path = %path.display(), "saved debug image");
        Ok(path)
    }
}

/// One recognized table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    /// Region in preprocessed-image coordinates, after clamping.
    pub region: BoundingBox,
    pub grid: TableGrid,
    /// Fragments recognized in the region, not counting a placeholder.
    pub fragment_count: usize,
    /// Mean fragment confidence; 0 when nothing was recognized.
    pub mean_confidence: f32,
}

/// What happened during a run, for callers that report on degradation.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub run_id: Uuid,
    pub preprocess: PreprocessReport,
    /// Name of the detector tier that produced the regions.
    pub detection_tier: String,
    /// Detection fell back to the whole image.
    pub detection_degraded: bool,
    /// At least one region got only the placeholder fragment.
    pub recognition_unavailable: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub tables: Vec<ExtractedTable>,
    pub diagnostics: Diagnostics,
}

/// The composed pipeline. Immutable once built, so one instance can serve
/// concurrent calls.
pub struct TableExtractor {
    preprocessor: Preprocessor,
    detector: TableDetector,
    ocr: FusionEngine,
    analyzer: StructureAnalyzer,
    telemetry: Telemetry,
}

impl TableExtractor {
    /// Build every stage from configuration. Fails only on invalid configuration;
    /// unavailable backends and models are logged and skipped.
    pub fn from_config(config: &ExtractorConfig, telemetry: Telemetry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(&config.preprocess, telemetry.stage("preprocess")),
            detector: TableDetector::new(&config.detect, telemetry.stage("detect")),
            ocr: FusionEngine::new(&config.ocr, telemetry.stage("recognize")),
            analyzer: StructureAnalyzer::new(&config.structure, telemetry.stage("structure")),
            telemetry,
        })
    }

    /// Assemble from already-built stages.
    pub fn new(
        preprocessor: Preprocessor,
        detector: TableDetector,
        ocr: FusionEngine,
        analyzer: StructureAnalyzer,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            preprocessor,
            detector,
            ocr,
            analyzer,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn detector(&self) -> &TableDetector {
        &self.detector
    }

    pub fn ocr(&self) -> &FusionEngine {
        &self.ocr
    }

    pub fn preprocess(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.preprocessor.process(image)
    }

    /// Never empty.
    pub fn detect_tables(&self, image: &DynamicImage) -> Vec<BoundingBox> {
        self.detector.detect(image)
    }

    pub fn extract_regions(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Vec<DynamicImage> {
        detection::extract_table_regions(image, boxes)
    }

    /// Never empty.
    pub fn recognize(&self, image: &DynamicImage) -> Vec<TextFragment> {
        self.ocr.recognize(image)
    }

    pub fn build_table(&self, fragments: &[TextFragment]) -> TableGrid {
        self.analyzer.analyze(fragments)
    }

    /// Run the full pipeline. Only a malformed image is an error.
    pub fn extract(&self, image: &DynamicImage) -> Result<Extraction> {
        self.extract_with_debug(image, None)
    }

    pub fn extract_with_debug(
        &self,
        image: &DynamicImage,
        debug: Option<&DebugConfig>,
    ) -> Result<Extraction> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(parent: self.telemetry.span(), "extract", %run_id);
        let _guard = span.enter();
        let start = Instant::now();

        if let Some(debug) = debug {
            debug.save("00_input", 0, image)?;
        }

        let (prepared, report) = self.preprocessor.process_with_report(image)?;
        if let Some(debug) = debug {
            debug.save("01_preprocessed", 0, &prepared)?;
        }

        let detection = self.detector.detect_with_outcome(&prepared);
        let regions = detection::extract_regions_with_boxes(&prepared, &detection.boxes);

        let mut tables = Vec::with_capacity(regions.len());
        let mut recognition_unavailable = false;
        for (index, (region, crop)) in regions.into_iter().enumerate() {
            let recognition = self.ocr.recognize_with_outcome(&crop);
            recognition_unavailable |= recognition.unavailable;
            let grid = self.analyzer.analyze(&recognition.fragments);

            if let Some(debug) = debug {
                debug.save("02_regions", index, &crop)?;
                let bands = self.draw_bands(&crop, &recognition.fragments);
                debug.save("03_bands", index, &bands)?;
            }

            let (fragment_count, mean_confidence) = if recognition.unavailable {
                (0, 0.0)
            } else {
                let count = recognition.fragments.len();
                let total: f32 = recognition.fragments.iter().map(|f| f.confidence).sum();
                (count, total / count as f32)
            };

            tracing::info!(
                table = index + 1,
                rows = grid.row_count(),
                cols = grid.col_count(),
                fragments = fragment_count,
                "table extracted"
            );
            tables.push(ExtractedTable {
                region,
                grid,
                fragment_count,
                mean_confidence,
            });
        }

        let elapsed = start.elapsed();
        self.telemetry.record("extract_ms", elapsed.as_secs_f64() * 1000.0);

        Ok(Extraction {
            tables,
            diagnostics: Diagnostics {
                run_id,
                preprocess: report,
                detection_tier: detection.tier,
                detection_degraded: detection.degraded,
                recognition_unavailable,
                elapsed,
            },
        })
    }

    /// Region image with the row and column band starts drawn on it.
    fn draw_bands(&self, region: &DynamicImage, fragments: &[TextFragment]) -> DynamicImage {
        let mut canvas = region.to_rgb8();
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);

        for band in self.analyzer.row_bands(fragments) {
            let y = band.min();
            draw_line_segment_mut(&mut canvas, (0.0, y), (width, y), BAND_COLOR);
        }
        for band in self.analyzer.col_bands(fragments) {
            let x = band.min();
            draw_line_segment_mut(&mut canvas, (x, 0.0), (x, height), BAND_COLOR);
        }
        DynamicImage::ImageRgb8(canvas)
    }
}

/// Load and decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(image)
}
