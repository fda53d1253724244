use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tabscan::config::{DetectConfig, PreprocessConfig, StructureConfig};
use tabscan::geometry::Quad;
use tabscan::ocr::ConfidenceScale;
use tabscan::preprocessing::Preprocessor;
use tabscan::structure::StructureAnalyzer;
use tabscan::{
    FusionEngine, RawFragment, RecognitionBackend, TableDetector, TableError, TableExtractor,
    Telemetry,
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Horizontal rule positions of the sample table.
pub const TABLE_ROWS: [u32; 3] = [50, 150, 450];
/// Vertical rule positions of the sample table; the last one sits on the image edge.
pub const TABLE_COLS: [u32; 3] = [100, 300, 500];

/// 500x500 white page with a ruled 2x2 table, lines 2 px thick.
pub fn sample_table_image() -> DynamicImage {
    let mut img = RgbImage::from_pixel(500, 500, WHITE);
    let (left, right) = (TABLE_COLS[0], TABLE_COLS[2]);
    let (top, bottom) = (TABLE_ROWS[0], TABLE_ROWS[2]);

    for &y in &TABLE_ROWS {
        let rect = Rect::at(left as i32, y as i32 - 1).of_size(right - left, 2);
        draw_filled_rect_mut(&mut img, rect, BLACK);
    }
    for &x in &TABLE_COLS {
        // Clamp the edge rule so it stays inside the image.
        let x = x.min(img.width() - 1) as i32 - 1;
        let rect = Rect::at(x, top as i32 - 1).of_size(2, bottom - top + 2);
        draw_filled_rect_mut(&mut img, rect, BLACK);
    }
    DynamicImage::ImageRgb8(img)
}

/// Solid white image with no structure at all.
pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, WHITE))
}

/// Backend returning the same words every call, positioned like the sample
/// table's cell contents (Name/Age header, John/25 body).
pub struct ScriptedBackend {
    pub name: &'static str,
    pub words: Vec<(f32, f32, &'static str, f32)>,
    pub scale: ConfidenceScale,
}

impl ScriptedBackend {
    pub fn table_words() -> Self {
        Self {
            name: "scripted",
            words: vec![
                (150.0, 85.0, "Name", 0.95),
                (350.0, 85.0, "Age", 0.9),
                (150.0, 185.0, "John", 0.85),
                (350.0, 185.0, "25", 0.8),
            ],
            scale: ConfidenceScale::Unit,
        }
    }
}

impl RecognitionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn confidence_scale(&self) -> ConfidenceScale {
        self.scale
    }

    fn recognize(&self, _image: &DynamicImage) -> tabscan::Result<Vec<RawFragment>> {
        Ok(self
            .words
            .iter()
            .map(|&(x, y, text, confidence)| RawFragment {
                quad: Quad::from_rect(x, y, x + 60.0, y + 20.0),
                text: text.to_string(),
                confidence,
            })
            .collect())
    }
}

/// Backend whose every call fails.
pub struct FailingBackend;

impl RecognitionBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn recognize(&self, _image: &DynamicImage) -> tabscan::Result<Vec<RawFragment>> {
        Err(TableError::Recognition("scripted failure".into()))
    }
}

/// Extractor with default preprocessing and contour detection, and the
/// given recognition backends.
pub fn extractor_with_backends(backends: Vec<Box<dyn RecognitionBackend>>) -> TableExtractor {
    let telemetry = Telemetry::new("test");
    TableExtractor::new(
        Preprocessor::new(&PreprocessConfig::default(), telemetry.stage("preprocess")),
        TableDetector::new(&DetectConfig::default(), telemetry.stage("detect")),
        FusionEngine::with_backends(backends, telemetry.stage("recognize")),
        StructureAnalyzer::new(&StructureConfig::default(), telemetry.stage("structure")),
        telemetry,
    )
}
