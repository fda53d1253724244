pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod preprocessing;
pub mod structure;
pub mod telemetry;

pub use config::ExtractorConfig;
pub use detection::{Detection, DetectorTier, TableDetector, extract_table_regions};
pub use error::{Result, TableError};
pub use models::{BoundingBox, SENTINEL_SOURCE, TableGrid, TextFragment};
pub use ocr::{BackendStatus, ConfidenceScale, FusionEngine, RawFragment, RecognitionBackend};
pub use pipeline::{DebugConfig, Diagnostics, ExtractedTable, Extraction, TableExtractor};
pub use preprocessing::{PreprocessReport, PreprocessStep, Preprocessor, decode_image};
pub use structure::StructureAnalyzer;
pub use telemetry::{MetricsRecorder, Telemetry};
