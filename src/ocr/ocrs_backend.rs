use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;

use crate::config::OcrsConfig;
use crate::error::{Result, TableError};
use crate::geometry::Quad;
use crate::ocr::{ConfidenceScale, RawFragment, RecognitionBackend, recognition_error};

const NAME: &str = "ocrs";

/// Pure-Rust recognition backend running the ocrs detection and recognition models.
pub struct OcrsBackend {
    engine: OcrEngine,
    assumed_confidence: f32,
}

/// Standard ocrs model cache, `~/.cache/ocrs`.
fn default_model_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| TableError::backend_init(NAME, "cannot locate home directory for model cache"))?;
    Ok(Path::new(&home).join(".cache/ocrs"))
}

impl OcrsBackend {
    /// Load both models, from the configured paths or the standard cache.
    pub fn try_init(config: &OcrsConfig) -> Result<Self> {
        let (detection_path, recognition_path) =
            match (&config.detection_model, &config.recognition_model) {
                (Some(det), Some(rec)) => (det.clone(), rec.clone()),
                (det, rec) => {
                    let cache_dir = default_model_dir()?;
                    (
                        det.clone().unwrap_or_else(|| cache_dir.join("text-detection.rten")),
                        rec.clone().unwrap_or_else(|| cache_dir.join("text-recognition.rten")),
                    )
                }
            };

        if !detection_path.exists() || !recognition_path.exists() {
            return Err(TableError::backend_init(
                NAME,
                format!(
                    "models not found, expected {} and {}",
                    detection_path.display(),
                    recognition_path.display()
                ),
            ));
        }

        let detection_model =
            Model::load_file(&detection_path).map_err(|e| TableError::backend_init(NAME, e))?;
        let recognition_model =
            Model::load_file(&recognition_path).map_err(|e| TableError::backend_init(NAME, e))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| TableError::backend_init(NAME, e))?;

        Ok(Self {
            engine,
            assumed_confidence: config.assumed_confidence,
        })
    }
}

impl RecognitionBackend for OcrsBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn confidence_scale(&self) -> ConfidenceScale {
        ConfidenceScale::Unit
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawFragment>> {
        let rgb = image.to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| recognition_error(NAME, e))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| recognition_error(NAME, e))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|e| recognition_error(NAME, e))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| recognition_error(NAME, e))?;

        // ocrs has no per-word score
        let fragments = lines
            .iter()
            .flatten()
            .flat_map(|line| line.words())
            .filter_map(|word| {
                let text = word.to_string().trim().to_string();
                if text.is_empty() {
                    return None;
                }
                let rect = word.bounding_rect();
                Some(RawFragment {
                    quad: Quad::from_rect(
                        rect.left() as f32,
                        rect.top() as f32,
                        rect.right() as f32,
                        rect.bottom() as f32,
                    ),
                    text,
                    confidence: self.assumed_confidence,
                })
            })
            .collect();

        Ok(fragments)
    }
}
