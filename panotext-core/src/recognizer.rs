//! The panorama OCR pipeline: plan perspective views, render and recognize
//! each one, lift fragments onto the sphere and merge duplicates.

use std::path::Path;

use image::DynamicImage;
use serde::Serialize;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    consts::{
        CONFIDENCE_THRESHOLD, DEDUP_IOU_THRESHOLD, DEFAULT_FOV_DEG, DEFAULT_OVERLAP,
        DEFAULT_PITCH_ROWS, DEFAULT_VIEW_SIZE,
    },
    dedup::deduplicate,
    engine::OcrEngine,
    error::*,
    geometry::sphere::SphericalRect,
    projection::{fragment_rect, plan_views, render_view},
};

#[derive(Debug, Clone)]
pub struct PanoOcrConfig {
    /// Horizontal and vertical field of view of each perspective view.
    pub fov_deg: f32,

    /// Fraction by which adjacent views overlap. Text split by a view edge is
    /// whole in the neighbouring view.
    pub overlap: f32,

    /// Pitch angle of each ring of views.
    pub pitch_rows: Vec<f32>,

    /// Side length in pixels of the square rendered views.
    pub view_size: u32,

    /// Fragments below this confidence are dropped before deduplication.
    pub confidence_threshold: f32,

    /// Overlap threshold above which two spherical boxes merge.
    pub dedup_iou_threshold: f32,
}

impl Default for PanoOcrConfig {
    fn default() -> Self {
        Self {
            fov_deg: DEFAULT_FOV_DEG,
            overlap: DEFAULT_OVERLAP,
            pitch_rows: DEFAULT_PITCH_ROWS.to_vec(),
            view_size: DEFAULT_VIEW_SIZE,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            dedup_iou_threshold: DEDUP_IOU_THRESHOLD,
        }
    }
}

/// A recognized piece of text located on the sphere. Serializes flat, with
/// the rect's yaw/pitch/width/height fields alongside text and confidence.
#[derive(Debug, Clone, Serialize)]
pub struct SphericalDetection {
    pub text: String,
    #[serde(flatten)]
    pub rect: SphericalRect,
    pub confidence: f32,
}

/// All detections from one panorama, sorted by confidence descending.
#[derive(Debug, Clone, Serialize)]
pub struct PanoOcrResult {
    pub results: Vec<SphericalDetection>,
}

impl PanoOcrResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PanotextError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).context(IoWriteSnafu {
            path: path.display().to_string(),
        })?;
        serde_json::to_writer_pretty(file, self).context(JsonWriteSnafu {
            path: path.display().to_string(),
        })
    }
}

pub struct PanoOcr<E> {
    engine: E,
    config: PanoOcrConfig,
}

impl<E: OcrEngine> PanoOcr<E> {
    pub fn new(engine: E, config: PanoOcrConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &PanoOcrConfig {
        &self.config
    }

    /// Runs OCR over a full equirectangular panorama, one view at a time.
    pub fn process(&mut self, panorama: &DynamicImage) -> Result<PanoOcrResult, PanotextError> {
        let config = &self.config;
        let views = plan_views(config.fov_deg, config.overlap, &config.pitch_rows);
        info!(
            views = views.len(),
            fov = config.fov_deg,
            engine = self.engine.name(),
            "planned perspective views"
        );

        let mut detections = Vec::new();

        for (index, direction) in views.iter().enumerate() {
            let view = render_view(panorama, *direction, config.fov_deg, config.view_size);
            let fragments = self.engine.recognize(&DynamicImage::ImageRgb8(view))?;

            debug!(
                view = index,
                yaw = direction.yaw,
                pitch = direction.pitch,
                fragments = fragments.len(),
                "view recognized"
            );

            for fragment in fragments {
                if fragment.confidence < config.confidence_threshold {
                    continue;
                }

                let rect =
                    fragment_rect(*direction, config.fov_deg, config.view_size, &fragment.bbox);
                detections.push(SphericalDetection {
                    text: fragment.text,
                    rect,
                    confidence: fragment.confidence,
                });
            }
        }

        let before = detections.len();
        deduplicate(&mut detections, config.dedup_iou_threshold);
        info!(
            detections = detections.len(),
            merged = before - detections.len(),
            "panorama processed"
        );

        Ok(PanoOcrResult {
            results: detections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TextFragment;
    use crate::geometry::bbox::Bbox;

    struct FakeEngine {
        confidence: f32,
        calls: usize,
    }

    impl OcrEngine for FakeEngine {
        fn recognize(
            &mut self,
            image: &DynamicImage,
        ) -> Result<Vec<TextFragment>, PanotextError> {
            self.calls += 1;
            let center = image.width() as f32 / 2.0;
            Ok(vec![TextFragment {
                text: format!("view-{}", self.calls),
                bbox: Bbox::from_center_size(
                    glam::Vec2::new(center, center),
                    glam::Vec2::new(8.0, 4.0),
                ),
                confidence: self.confidence,
            }])
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn small_config() -> PanoOcrConfig {
        PanoOcrConfig {
            pitch_rows: vec![0.0],
            view_size: 64,
            ..PanoOcrConfig::default()
        }
    }

    #[test]
    fn test_process_visits_every_view() {
        let engine = FakeEngine {
            confidence: 0.9,
            calls: 0,
        };
        let mut ocr = PanoOcr::new(engine, small_config());
        let pano = DynamicImage::new_rgb8(256, 128);

        let result = ocr.process(&pano).unwrap();
        let expected_views = plan_views(DEFAULT_FOV_DEG, DEFAULT_OVERLAP, &[0.0]).len();

        // One centered fragment per view, all at distinct yaws.
        assert_eq!(ocr.engine.calls, expected_views);
        assert_eq!(result.len(), expected_views);
    }

    #[test]
    fn test_process_filters_low_confidence() {
        let engine = FakeEngine {
            confidence: 0.2,
            calls: 0,
        };
        let mut ocr = PanoOcr::new(engine, small_config());
        let pano = DynamicImage::new_rgb8(256, 128);

        let result = ocr.process(&pano).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_detection_center_matches_view_direction() {
        let engine = FakeEngine {
            confidence: 0.9,
            calls: 0,
        };
        let mut ocr = PanoOcr::new(engine, small_config());
        let pano = DynamicImage::new_rgb8(256, 128);

        let result = ocr.process(&pano).unwrap();
        let yaws: Vec<f32> = plan_views(DEFAULT_FOV_DEG, DEFAULT_OVERLAP, &[0.0])
            .iter()
            .map(|v| v.yaw)
            .collect();

        for detection in &result.results {
            assert!((detection.rect.pitch).abs() < 1.0);
            assert!(
                yaws.iter()
                    .any(|yaw| {
                        let mut delta = (yaw - detection.rect.yaw).abs();
                        if delta > 180.0 {
                            delta = 360.0 - delta;
                        }
                        delta < 1.0
                    }),
                "detection yaw {} not near any view yaw",
                detection.rect.yaw
            );
        }
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = PanoOcrResult {
            results: vec![SphericalDetection {
                text: "STOP".to_string(),
                rect: SphericalRect::new(12.0, -3.0, 4.0, 2.0),
                confidence: 0.92,
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        let first = &json["results"][0];
        assert_eq!(first["text"], "STOP");
        assert_eq!(first["yaw"], 12.0);
        assert_eq!(first["pitch"], -3.0);
        assert_eq!(first["width"], 4.0);
        assert_eq!(first["height"], 2.0);
        assert!((first["confidence"].as_f64().unwrap() - 0.92).abs() < 1e-6);
    }
}
