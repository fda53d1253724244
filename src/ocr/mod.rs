//! Multi-engine text recognition.
//!
//! A [`FusionEngine`] holds the recognition backends that initialized
//! successfully at construction. Each call runs every one of them, normalizes
//! their output into [`TextFragment`]s and concatenates the lists. A failing
//! backend is logged and skipped; if nothing is produced at all, a single
//! placeholder fragment covering the image is returned instead.

pub mod ocrs_backend;
pub mod tesseract;

use std::time::Instant;

use image::DynamicImage;

use crate::config::{BackendConfig, OcrConfig};
use crate::error::{Result, TableError};
use crate::geometry::Quad;
use crate::models::TextFragment;
use crate::telemetry::Telemetry;

/// Scale a backend reports confidence on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// Already within `[0, 1]`.
    Unit,
    /// Within `[0, 100]`.
    Percent,
}

/// Map a native confidence onto `[0, 1]`.
pub fn normalize_confidence(value: f32, scale: ConfidenceScale) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    let unit = match scale {
        ConfidenceScale::Unit => value,
        ConfidenceScale::Percent => value / 100.0,
    };
    unit.clamp(0.0, 1.0)
}

/// A backend's output before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

/// An initialized recognition engine.
///
/// Implementations must be safe to call from several threads at once.
pub trait RecognitionBackend: Send + Sync {
    /// Engine identifier stamped on every fragment.
    fn name(&self) -> &str;

    fn confidence_scale(&self) -> ConfidenceScale {
        ConfidenceScale::Unit
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawFragment>>;
}

/// Whether a configured backend could be initialized.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub name: String,
    /// `None` when available, otherwise the initialization failure.
    pub error: Option<String>,
}

impl BackendStatus {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// Try to bring up the engine described by `config`.
pub fn try_init_backend(config: &BackendConfig) -> Result<Box<dyn RecognitionBackend>> {
    let backend: Box<dyn RecognitionBackend> = match config {
        BackendConfig::Ocrs(cfg) => Box::new(ocrs_backend::OcrsBackend::try_init(cfg)?),
        BackendConfig::Tesseract(cfg) => Box::new(tesseract::TesseractBackend::try_init(cfg)?),
    };
    Ok(backend)
}

/// Fragments from one call plus whether any real engine contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub fragments: Vec<TextFragment>,
    /// Only the placeholder came back.
    pub unavailable: bool,
    /// Backends that failed during this call, with the reason.
    pub failures: Vec<(String, String)>,
}

/// Runs every available backend and concatenates their fragments.
pub struct FusionEngine {
    backends: Vec<Box<dyn RecognitionBackend>>,
    statuses: Vec<BackendStatus>,
    telemetry: Telemetry,
}

impl FusionEngine {
    /// Initialize every configured backend; the unavailable ones are recorded and skipped.
    pub fn new(config: &OcrConfig, telemetry: Telemetry) -> Self {
        let mut backends = Vec::new();
        let mut statuses = Vec::new();

        for backend_config in &config.backends {
            let name = backend_config.name().to_string();
            match try_init_backend(backend_config) {
                Ok(backend) => {
                    tracing::info!(backend = %name, "recognition backend ready");
                    statuses.push(BackendStatus { name, error: None });
                    backends.push(backend);
                }
                Err(e) => {
                    tracing::warn!(backend = %name, error = %e, "recognition backend unavailable");
                    statuses.push(BackendStatus {
                        name,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Self {
            backends,
            statuses,
            telemetry,
        }
    }

    /// Engine over already-initialized backends.
    pub fn with_backends(backends: Vec<Box<dyn RecognitionBackend>>, telemetry: Telemetry) -> Self {
        let statuses = backends
            .iter()
            .map(|b| BackendStatus {
                name: b.name().to_string(),
                error: None,
            })
            .collect();
        Self {
            backends,
            statuses,
            telemetry,
        }
    }

    /// Engine with no backends; always answers with the placeholder.
    pub fn empty(telemetry: Telemetry) -> Self {
        Self::with_backends(Vec::new(), telemetry)
    }

    pub fn statuses(&self) -> &[BackendStatus] {
        &self.statuses
    }

    pub fn available_backends(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Fragments from every backend; never empty.
    pub fn recognize(&self, image: &DynamicImage) -> Vec<TextFragment> {
        self.recognize_with_outcome(image).fragments
    }

    pub fn recognize_with_outcome(&self, image: &DynamicImage) -> Recognition {
        let _span = self.telemetry.span().enter();
        let start = Instant::now();
        let mut fragments = Vec::new();
        let mut failures = Vec::new();

        for backend in &self.backends {
            match backend.recognize(image) {
                Ok(raw) => {
                    tracing::debug!(backend = backend.name(), fragments = raw.len(), "recognized");
                    let scale = backend.confidence_scale();
                    fragments.extend(raw.into_iter().map(|r| TextFragment {
                        quad: r.quad,
                        text: r.text,
                        confidence: normalize_confidence(r.confidence, scale),
                        source: backend.name().to_string(),
                    }));
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "backend failed, skipping");
                    self.telemetry.record("backend_failures", 1.0);
                    failures.push((backend.name().to_string(), e.to_string()));
                }
            }
        }

        let unavailable = fragments.is_empty();
        if unavailable {
            tracing::warn!("no recognition output, returning placeholder fragment");
            fragments.push(TextFragment::placeholder(image.width(), image.height()));
        }

        self.telemetry.record("recognize_ms", start.elapsed().as_secs_f64() * 1000.0);
        self.telemetry.record("fragments", fragments.len() as f64);

        Recognition {
            fragments,
            unavailable,
            failures,
        }
    }
}

pub(crate) fn recognition_error(backend: &str, e: impl std::fmt::Display) -> TableError {
    TableError::Recognition(format!("{backend}: {e}"))
}
