mod common;

use common::*;
use tabscan::SENTINEL_SOURCE;
use tabscan::config::{BackendConfig, OcrConfig, OcrsConfig, TesseractConfig};
use tabscan::ocr::ConfidenceScale;

#[test]
fn test_no_backends_returns_single_placeholder() {
    let engine = FusionEngine::empty(Telemetry::disabled());
    let fragments = engine.recognize(&blank_image(120, 80));

    assert_eq!(fragments.len(), 1);
    let placeholder = &fragments[0];
    assert_eq!(placeholder.source, SENTINEL_SOURCE);
    assert_eq!(placeholder.text, "");
    assert_eq!(placeholder.confidence, 0.0);
    assert_eq!(placeholder.quad.bounds(), (0.0, 0.0, 120.0, 80.0));
}

#[test]
fn test_failing_backend_is_isolated() {
    let engine = FusionEngine::with_backends(
        vec![Box::new(FailingBackend), Box::new(ScriptedBackend::table_words())],
        Telemetry::disabled(),
    );
    let outcome = engine.recognize_with_outcome(&blank_image(500, 500));

    assert!(!outcome.unavailable);
    assert_eq!(outcome.fragments.len(), 4);
    assert!(outcome.fragments.iter().all(|f| f.source == "scripted"));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "failing");
}

#[test]
fn test_all_backends_failing_gives_placeholder() {
    let telemetry = Telemetry::disabled();
    let engine = FusionEngine::with_backends(vec![Box::new(FailingBackend)], telemetry.clone());
    let outcome = engine.recognize_with_outcome(&blank_image(10, 10));

    assert!(outcome.unavailable);
    assert_eq!(outcome.fragments.len(), 1);
    assert!(outcome.fragments[0].is_placeholder());
    assert_eq!(telemetry.metrics().get("backend_failures").map(|s| s.count), Some(1));
}

#[test]
fn test_percent_confidences_are_normalized() {
    let backend = ScriptedBackend {
        name: "percent",
        words: vec![(0.0, 0.0, "87", 87.0), (50.0, 0.0, "over", 140.0)],
        scale: ConfidenceScale::Percent,
    };
    let engine = FusionEngine::with_backends(vec![Box::new(backend)], Telemetry::disabled());
    let fragments = engine.recognize(&blank_image(100, 40));

    assert!((fragments[0].confidence - 0.87).abs() < 1e-6);
    assert_eq!(fragments[1].confidence, 1.0);
}

#[test]
fn test_unavailable_backends_are_reported() {
    let config = OcrConfig {
        backends: vec![
            BackendConfig::Ocrs(OcrsConfig {
                detection_model: Some("/nonexistent/det.rten".into()),
                recognition_model: Some("/nonexistent/rec.rten".into()),
                ..Default::default()
            }),
            BackendConfig::Tesseract(TesseractConfig {
                language: "no-such-language".into(),
                ..Default::default()
            }),
        ],
    };
    let engine = FusionEngine::new(&config, Telemetry::disabled());

    let statuses = engine.statuses();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].name, "ocrs");
    assert_eq!(statuses[1].name, "tesseract");
    assert!(statuses.iter().all(|s| !s.is_available()));
    assert!(engine.available_backends().is_empty());

    // Still total: the placeholder stands in.
    let fragments = engine.recognize(&blank_image(20, 20));
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].is_placeholder());
}
