use thiserror::Error;

/// Errors surfaced by the table extraction pipeline.
///
/// Only malformed input is fatal to an invocation. Detection and recognition
/// degrade through fallbacks instead of returning these errors; the
/// `BackendInit` and `Recognition` variants are reported by individual
/// backends and absorbed by the fusion engine.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to initialize backend '{backend}': {reason}")]
    BackendInit { backend: String, reason: String },

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn backend_init(backend: impl Into<String>, reason: impl ToString) -> Self {
        TableError::BackendInit {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that mean the input image itself is unusable.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, TableError::Preprocessing(_) | TableError::ImageDecode(_))
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
