mod common;

use std::io::Cursor;
use std::sync::Arc;

use common::*;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tabscan::config::PreprocessConfig;
use tabscan::preprocessing::steps::DeskewStep;
use tabscan::preprocessing::{PreprocessReport, PreprocessStep, Preprocessor, image_from_raw};
use tabscan::{TableError, decode_image};

fn preprocessor() -> Preprocessor {
    Preprocessor::new(&PreprocessConfig::default(), Telemetry::disabled())
}

#[test]
fn test_default_steps_run_in_order() {
    let names = preprocessor().step_names().join(", ");
    assert_eq!(
        names,
        "Grayscale Conversion, Skew Correction, Noise Removal, Contrast Enhancement"
    );
}

#[test]
fn test_disabled_steps_are_skipped() {
    let config = PreprocessConfig {
        deskew: false,
        contrast: false,
        ..Default::default()
    };
    let pre = Preprocessor::new(&config, Telemetry::disabled());
    assert_eq!(pre.step_names(), vec!["Grayscale Conversion", "Noise Removal"]);
}

#[test]
fn test_output_is_grayscale_with_same_size() {
    let (output, report) = preprocessor()
        .process_with_report(&sample_table_image())
        .unwrap();

    assert!(matches!(output, DynamicImage::ImageLuma8(_)));
    assert_eq!((output.width(), output.height()), (500, 500));
    assert_eq!(report.steps.len(), 4);
    assert!(report.mean > 0.0);
    // Straight rules need no rotation.
    assert_eq!(report.skew_angle, None);
}

#[test]
fn test_deskew_is_noop_without_lines() {
    let mut img = GrayImage::from_pixel(120, 90, Luma([200]));
    img.put_pixel(10, 10, Luma([0]));
    img.put_pixel(60, 45, Luma([30]));
    let input = DynamicImage::ImageLuma8(img);

    let step = DeskewStep::from_config(&PreprocessConfig::default());
    let mut report = PreprocessReport::default();
    let output = step.apply(&input, &mut report).unwrap();

    assert_eq!(output.as_bytes(), input.as_bytes());
    assert_eq!(report.skew_angle, None);
}

#[test]
fn test_zero_sized_image_is_rejected() {
    let err = preprocessor()
        .process(&DynamicImage::new_luma8(0, 0))
        .unwrap_err();
    assert!(matches!(err, TableError::Preprocessing(_)));
    assert!(err.is_malformed_input());
}

#[test]
fn test_custom_step_list() {
    struct Invert;

    impl PreprocessStep for Invert {
        fn apply(
            &self,
            image: &DynamicImage,
            _report: &mut PreprocessReport,
        ) -> tabscan::Result<DynamicImage> {
            let mut out = image.clone();
            out.invert();
            Ok(out)
        }

        fn name(&self) -> &str {
            "Invert"
        }
    }

    let pre = preprocessor().with_steps(vec![Arc::new(Invert)]);
    let input = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([10])));
    let output = pre.process(&input).unwrap();
    assert_eq!(output.to_luma8().get_pixel(0, 0), &Luma([245]));
}

#[test]
fn test_decode_image_round_trips_png() {
    let mut bytes = Cursor::new(Vec::new());
    sample_table_image()
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();

    let decoded = decode_image(bytes.get_ref()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (500, 500));
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(decode_image(&[]).unwrap_err().is_malformed_input());
    assert!(decode_image(b"not an image").unwrap_err().is_malformed_input());
}

#[test]
fn test_raw_buffer_length_is_checked() {
    assert!(image_from_raw(vec![0; 12], 2, 2, 3).is_ok());
    assert!(image_from_raw(vec![0; 11], 2, 2, 3).is_err());
    assert!(image_from_raw(vec![0; 8], 2, 2, 2).is_err());
}

#[test]
fn test_time_budget_is_advisory() {
    let config = PreprocessConfig {
        max_processing_ms: 0,
        ..Default::default()
    };
    let pre = Preprocessor::new(&config, Telemetry::disabled());
    let (output, report) = pre.process_with_report(&sample_table_image()).unwrap();

    assert!(report.budget_exceeded);
    assert_eq!((output.width(), output.height()), (500, 500));
}

#[test]
fn test_generous_budget_is_not_flagged() {
    let config = PreprocessConfig {
        max_processing_ms: 60_000,
        ..Default::default()
    };
    let pre = Preprocessor::new(&config, Telemetry::disabled());
    let (_, report) = pre.process_with_report(&blank_image(50, 50)).unwrap();
    assert!(!report.budget_exceeded);
}

#[test]
fn test_noisy_image_gets_strong_denoise() {
    // Checkerboard of black and white pixels: intensity std is 127.5.
    let noisy = GrayImage::from_fn(200, 200, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
    let config = PreprocessConfig {
        deskew: false,
        ..Default::default()
    };
    let (_, report) = Preprocessor::new(&config, Telemetry::disabled())
        .process_with_report(&DynamicImage::ImageLuma8(noisy))
        .unwrap();
    assert!(report.strong_denoise);
}

#[test]
fn test_flat_image_gets_light_denoise() {
    let (_, report) = preprocessor()
        .process_with_report(&blank_image(200, 200))
        .unwrap();
    assert!(!report.strong_denoise);
}
