#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tabscan for tests
pub use tabscan::{
    BoundingBox, ExtractorConfig, FusionEngine, RawFragment, RecognitionBackend, TableDetector,
    TableExtractor, TableGrid, Telemetry, TextFragment,
};
