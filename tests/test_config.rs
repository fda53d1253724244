mod common;

use common::*;
use tabscan::TableError;
use tabscan::config::BackendConfig;

#[test]
fn test_defaults() {
    let config = ExtractorConfig::default();
    assert_eq!(config.structure.row_threshold, 10.0);
    assert_eq!(config.structure.col_threshold, 10.0);
    assert_eq!(config.preprocess.clahe_tile_grid, 8);
    assert_eq!(config.preprocess.max_processing_ms, 200);
    assert_eq!(config.detect.min_area_ratio, 0.01);
    let kinds: Vec<&str> = config.ocr.backends.iter().map(BackendConfig::name).collect();
    assert_eq!(kinds, vec!["ocrs", "tesseract"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = ExtractorConfig::from_toml_str(
        r#"
        [structure]
        row_threshold = 15.0

        [preprocess]
        deskew = false
        "#,
    )
    .unwrap();

    assert_eq!(config.structure.row_threshold, 15.0);
    assert_eq!(config.structure.col_threshold, 10.0);
    assert!(!config.preprocess.deskew);
    assert!(config.preprocess.denoise);
}

#[test]
fn test_backend_list_from_toml() {
    let config = ExtractorConfig::from_toml_str(
        r#"
        [[ocr.backends]]
        kind = "tesseract"
        language = "kor+eng"
        page_segmentation_mode = 4
        "#,
    )
    .unwrap();

    match config.ocr.backends.as_slice() {
        [BackendConfig::Tesseract(t)] => {
            assert_eq!(t.language, "kor+eng");
            assert_eq!(t.page_segmentation_mode, 4);
        }
        other => panic!("unexpected backends: {other:?}"),
    }
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = ExtractorConfig::from_toml_str("[preprocess]\nclahe_clip_limit = 0.0\n").unwrap_err();
    assert!(matches!(err, TableError::Config(_)));

    let err = ExtractorConfig::from_toml_str("[detect]\nmin_area_ratio = 1.5\n").unwrap_err();
    assert!(matches!(err, TableError::Config(_)));

    let err = ExtractorConfig::from_toml_str("[structure]\nrow_threshold = -1.0\n").unwrap_err();
    assert!(matches!(err, TableError::Config(_)));
}

#[test]
fn test_load_from_file() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("tabscan.toml");
    std::fs::write(&path, "[structure]\ncol_threshold = 25.0\n")?;

    let config = ExtractorConfig::load(&path)?;
    assert_eq!(config.structure.col_threshold, 25.0);
    Ok(())
}

#[test]
fn test_invalid_config_fails_extractor_construction() {
    let mut config = ExtractorConfig::default();
    config.preprocess.strong_blur_sigma = 0.0;
    config.ocr.backends.clear();
    assert!(TableExtractor::from_config(&config, Telemetry::disabled()).is_err());
}
