//! Tesseract recognition backend.
//!
//! Only functional when built with the `tesseract` feature; otherwise
//! initialization always reports the backend as unavailable.

use crate::config::TesseractConfig;
use crate::error::{Result, TableError};

#[cfg(feature = "tesseract")]
pub use enabled::TesseractBackend;

#[cfg(not(feature = "tesseract"))]
pub use disabled::TesseractBackend;

const NAME: &str = "tesseract";

/// Everything fixed when an instance is loaded; equal keys can share one.
#[cfg_attr(not(feature = "tesseract"), allow(dead_code))]
fn cache_key(config: &TesseractConfig) -> String {
    let data = config
        .tessdata_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    format!("{}|{}|{}", config.language, data, config.page_segmentation_mode)
}

#[cfg(feature = "tesseract")]
mod enabled {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};
    use leptess::{LepTess, Variable};

    use super::*;
    use crate::geometry::Quad;
    use crate::ocr::{ConfidenceScale, RawFragment, RecognitionBackend, recognition_error};

    thread_local! {
        // LepTess is not Send, and loading language data is slow, so every
        // worker thread keeps one instance per configuration.
        static INSTANCES: RefCell<HashMap<String, LepTess>> = RefCell::new(HashMap::new());
    }

    pub struct TesseractBackend {
        config: TesseractConfig,
        key: String,
    }

    impl TesseractBackend {
        /// Check that Tesseract loads with the configured language data.
        pub fn try_init(config: &TesseractConfig) -> Result<Self> {
            let backend = Self {
                config: config.clone(),
                key: cache_key(config),
            };
            backend
                .with_instance(|_| Ok(()))
                .map_err(|e| TableError::backend_init(NAME, e))?;
            Ok(backend)
        }

        fn open(&self) -> std::result::Result<LepTess, String> {
            let data_path = self
                .config
                .tessdata_dir
                .as_ref()
                .and_then(|p| p.to_str());
            let mut lt = LepTess::new(data_path, &self.config.language).map_err(|e| {
                format!("language '{}' could not be loaded: {e}", self.config.language)
            })?;
            lt.set_variable(
                Variable::TesseditPagesegMode,
                &self.config.page_segmentation_mode.to_string(),
            )
            .map_err(|e| format!("failed to set page segmentation mode: {e}"))?;
            Ok(lt)
        }

        /// Run `f` on this thread's instance, loading it on first use.
        fn with_instance<T>(
            &self,
            f: impl FnOnce(&mut LepTess) -> std::result::Result<T, String>,
        ) -> std::result::Result<T, String> {
            INSTANCES.with(|cell| {
                let mut instances = cell.borrow_mut();
                if !instances.contains_key(&self.key) {
                    tracing::debug!(language = %self.config.language, "loading tesseract language data");
                    let lt = self.open()?;
                    instances.insert(self.key.clone(), lt);
                }
                match instances.get_mut(&self.key) {
                    Some(lt) => f(lt),
                    None => Err("tesseract instance missing from cache".to_string()),
                }
            })
        }
    }

    fn read_words(lt: &mut LepTess, png: &[u8]) -> std::result::Result<Vec<RawFragment>, String> {
        lt.set_image_from_mem(png).map_err(|e| e.to_string())?;

        // No boxes means no text, not a failure.
        let Some(boxes) =
            lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
        else {
            return Ok(Vec::new());
        };

        let mut fragments = Vec::new();
        for bbox in &boxes {
            let geom = bbox.get_geometry();
            lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);

            let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let (x, y) = (geom.x as f32, geom.y as f32);
            fragments.push(RawFragment {
                quad: Quad::from_rect(x, y, x + geom.w as f32, y + geom.h as f32),
                text,
                confidence: lt.mean_text_conf() as f32,
            });
        }
        Ok(fragments)
    }

    impl RecognitionBackend for TesseractBackend {
        fn name(&self) -> &str {
            NAME
        }

        fn confidence_scale(&self) -> ConfidenceScale {
            ConfidenceScale::Percent
        }

        fn recognize(&self, image: &DynamicImage) -> Result<Vec<RawFragment>> {
            let mut png = Cursor::new(Vec::new());
            image
                .write_to(&mut png, ImageFormat::Png)
                .map_err(|e| recognition_error(NAME, e))?;

            self.with_instance(|lt| read_words(lt, png.get_ref()))
                .map_err(|e| recognition_error(NAME, e))
        }
    }
}

#[cfg(not(feature = "tesseract"))]
mod disabled {
    use image::DynamicImage;

    use super::*;
    use crate::ocr::{RawFragment, RecognitionBackend};

    /// Stand-in when the crate is built without Tesseract support.
    pub struct TesseractBackend {
        _private: (),
    }

    impl TesseractBackend {
        pub fn try_init(_config: &TesseractConfig) -> Result<Self> {
            Err(TableError::backend_init(
                NAME,
                "built without the `tesseract` feature",
            ))
        }
    }

    impl RecognitionBackend for TesseractBackend {
        fn name(&self) -> &str {
            NAME
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<RawFragment>> {
            Ok(Vec::new())
        }
    }
}
