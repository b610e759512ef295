use std::collections::HashMap;

use glam::Vec2;
use image::{DynamicImage, GrayImage, Luma, imageops::FilterType};
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::prelude::*;
use ort::session::{Session, builder::SessionBuilder};
use ort::value::TensorRef;
use snafu::{OptionExt, ResultExt};

use crate::{
    consts::{BATCH_SIZE, INPUT_CHANNELS},
    error::*,
    geometry::bbox::Bbox,
    inference::model::{Model, OnnxSession},
};

use super::model::{PaddleDet, PaddleDetConfig};

/// Per-channel normalization applied to detection input, ImageNet statistics.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A text line located by the detection model, in source-image pixels.
#[derive(Clone, Debug)]
pub struct TextBox {
    pub bbox: Bbox,
    pub score: f32,
}

pub struct PaddleDetSession<M: Model> {
    session: Session,
    model: M,
}

impl PaddleDetSession<PaddleDet> {
    pub fn new(builder: SessionBuilder, model: PaddleDet) -> Result<Self, PanotextError> {
        let session = builder
            .commit_from_file(model.path())
            .context(OrtInitSnafu { stage: "commit" })?;

        Ok(Self { session, model })
    }

    /// Finds text lines in an image, returning boxes in source pixels sorted
    /// in reading order (top to bottom, then left to right).
    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<TextBox>, PanotextError> {
        let original_size = Vec2::new(image.width() as f32, image.height() as f32);
        self.run(image, original_size)
    }

    /// Input dimensions for a source image: capped at `max_side_len` and
    /// rounded to the model stride.
    fn scaled_dims(config: &PaddleDetConfig, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height) as f32;
        let ratio = (config.max_side_len as f32 / longest).min(1.0);

        let round = |side: u32| -> u32 {
            let scaled = (side as f32 * ratio / config.stride as f32).round() as u32;
            scaled.max(1) * config.stride
        };

        (round(width), round(height))
    }
}

/// Extracts scored text boxes from a binarized probability map.
///
/// Connected components of the thresholded map become candidate boxes; each
/// box is scored by the mean probability inside it, expanded by the unclip
/// ratio, scaled back to source pixels and clamped to the image.
pub fn boxes_from_prob_map(
    map: ArrayView2<'_, f32>,
    config: &PaddleDetConfig,
    original_size: Vec2,
) -> Vec<TextBox> {
    let (map_h, map_w) = (map.shape()[0], map.shape()[1]);

    let mut binary = GrayImage::new(map_w as u32, map_h as u32);
    for (x, y, pixel) in binary.enumerate_pixels_mut() {
        let p = map[[y as usize, x as usize]];
        *pixel = if p >= config.binary_threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        };
    }

    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    struct Component {
        min: Vec2,
        max: Vec2,
        sum: f32,
        count: usize,
    }

    let mut components: HashMap<u32, Component> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label.0[0] == 0 {
            continue;
        }
        let p = map[[y as usize, x as usize]];
        let point = Vec2::new(x as f32, y as f32);
        components
            .entry(label.0[0])
            .and_modify(|c| {
                c.min = c.min.min(point);
                c.max = c.max.max(point);
                c.sum += p;
                c.count += 1;
            })
            .or_insert(Component {
                min: point,
                max: point,
                sum: p,
                count: 1,
            });
    }

    let scale = original_size / Vec2::new(map_w as f32, map_h as f32);

    let mut boxes: Vec<TextBox> = components
        .into_values()
        .filter_map(|c| {
            // Pixel coordinates address pixel centers; extend to the far edge.
            let bbox = Bbox::new(c.min, c.max + Vec2::ONE);
            let score = c.sum / c.count as f32;

            if bbox.width() < config.min_box_side || bbox.height() < config.min_box_side {
                return None;
            }
            if score < config.box_score_threshold {
                return None;
            }

            let expanded = bbox.expand(config.unclip_ratio);
            let bbox = Bbox {
                min: expanded.min * scale,
                max: expanded.max * scale,
            }
            .clamp(Vec2::ZERO, original_size);

            Some(TextBox { bbox, score })
        })
        .collect();

    boxes.sort_by(|a, b| {
        let ya = a.bbox.min.y;
        let yb = b.bbox.min.y;
        ya.partial_cmp(&yb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .min
                    .x
                    .partial_cmp(&b.bbox.min.x)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    boxes
}

impl OnnxSession<PaddleDet> for PaddleDetSession<PaddleDet> {
    type Output = Vec<TextBox>;
    type Extra = Vec2;

    fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<<PaddleDet as Model>::Input, PanotextError> {
        let config = self.model.config();
        let (target_w, target_h) = Self::scaled_dims(config, image.width(), image.height());

        let resized =
            image::imageops::resize(&image.to_rgb8(), target_w, target_h, FilterType::Triangle);

        let mut input_tensor = Array4::zeros([
            BATCH_SIZE,
            INPUT_CHANNELS,
            target_h as usize,
            target_w as usize,
        ]);

        for (x, y, pixel) in resized.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = pixel.0;
            input_tensor[[0, 0, y, x]] = (r as f32 / 255.0 - MEAN[0]) / STD[0];
            input_tensor[[0, 1, y, x]] = (g as f32 / 255.0 - MEAN[1]) / STD[1];
            input_tensor[[0, 2, y, x]] = (b as f32 / 255.0 - MEAN[2]) / STD[2];
        }

        Ok(input_tensor)
    }

    fn postprocess(
        &self,
        output: <PaddleDet as Model>::Output,
        original_size: Self::Extra,
    ) -> Result<Self::Output, PanotextError> {
        let map = output.slice(ndarray::s![0, 0, .., ..]);
        Ok(boxes_from_prob_map(map, self.model.config(), original_size))
    }

    fn infer(
        &mut self,
        input: <PaddleDet as Model>::Input,
        input_name: &str,
        output_name: &str,
    ) -> Result<<PaddleDet as Model>::Output, PanotextError> {
        let output = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu { stage: "detect-input" })?
            ])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu {
                stage: "detect-extract",
            })?;

        let shape = tensor.shape();
        let output_array = tensor
            .to_shape([shape[0], shape[1], shape[2], shape[3]])
            .context(ShapeSnafu { stage: "detect" })?
            .to_owned();

        Ok(output_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_dims_rounds_to_stride() {
        let config = PaddleDetConfig::default();

        let (w, h) = PaddleDetSession::scaled_dims(&config, 1024, 1024);
        assert_eq!(w % config.stride, 0);
        assert_eq!(h % config.stride, 0);
        assert!(w <= config.max_side_len + config.stride);

        // Small images keep roughly their size.
        let (w, h) = PaddleDetSession::scaled_dims(&config, 100, 60);
        assert_eq!(w, 96);
        assert_eq!(h, 64);

        // Never rounds down to zero.
        let (w, h) = PaddleDetSession::scaled_dims(&config, 5, 5);
        assert_eq!(w, 32);
        assert_eq!(h, 32);
    }

    fn map_with_blob(
        h: usize,
        w: usize,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        p: f32,
    ) -> Array2<f32> {
        let mut map = Array2::zeros([h, w]);
        for y in y0..=y1 {
            for x in x0..=x1 {
                map[[y, x]] = p;
            }
        }
        map
    }

    #[test]
    fn test_boxes_from_prob_map_single_blob() {
        let config = PaddleDetConfig {
            unclip_ratio: 1.0,
            ..PaddleDetConfig::default()
        };
        let map = map_with_blob(64, 64, 10, 20, 29, 25, 0.9);

        let boxes = boxes_from_prob_map(map.view(), &config, Vec2::new(64.0, 64.0));
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].score - 0.9).abs() < 1e-5);
        assert!((boxes[0].bbox.min.x - 10.0).abs() < 1e-3);
        assert!((boxes[0].bbox.max.x - 30.0).abs() < 1e-3);
        assert!((boxes[0].bbox.min.y - 20.0).abs() < 1e-3);
        assert!((boxes[0].bbox.max.y - 26.0).abs() < 1e-3);
    }

    #[test]
    fn test_boxes_from_prob_map_scales_to_source() {
        let config = PaddleDetConfig {
            unclip_ratio: 1.0,
            ..PaddleDetConfig::default()
        };
        let map = map_with_blob(64, 64, 8, 8, 15, 11, 0.8);

        // Source image is twice the map size in both axes.
        let boxes = boxes_from_prob_map(map.view(), &config, Vec2::new(128.0, 128.0));
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].bbox.min.x - 16.0).abs() < 1e-3);
        assert!((boxes[0].bbox.max.x - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_boxes_from_prob_map_filters_noise() {
        let config = PaddleDetConfig {
            unclip_ratio: 1.0,
            ..PaddleDetConfig::default()
        };

        // A 2x2 speck is below min_box_side.
        let speck = map_with_blob(64, 64, 5, 5, 6, 6, 0.9);
        assert!(boxes_from_prob_map(speck.view(), &config, Vec2::new(64.0, 64.0)).is_empty());

        // A weak blob is below the score threshold.
        let weak = map_with_blob(64, 64, 10, 10, 30, 16, 0.35);
        assert!(boxes_from_prob_map(weak.view(), &config, Vec2::new(64.0, 64.0)).is_empty());

        // Below the binary threshold nothing is labelled at all.
        let faint = map_with_blob(64, 64, 10, 10, 30, 16, 0.1);
        assert!(boxes_from_prob_map(faint.view(), &config, Vec2::new(64.0, 64.0)).is_empty());
    }

    #[test]
    fn test_boxes_sorted_in_reading_order() {
        let config = PaddleDetConfig {
            unclip_ratio: 1.0,
            ..PaddleDetConfig::default()
        };
        let mut map = map_with_blob(96, 96, 50, 60, 80, 66, 0.9);
        for y in 10..=16 {
            for x in 10..=40 {
                map[[y, x]] = 0.9;
            }
        }

        let boxes = boxes_from_prob_map(map.view(), &config, Vec2::new(96.0, 96.0));
        assert_eq!(boxes.len(), 2);
        assert!(boxes[0].bbox.min.y < boxes[1].bbox.min.y);
    }

    #[test]
    fn test_unclip_grows_boxes() {
        let tight = PaddleDetConfig {
            unclip_ratio: 1.0,
            ..PaddleDetConfig::default()
        };
        let loose = PaddleDetConfig {
            unclip_ratio: 2.0,
            ..PaddleDetConfig::default()
        };
        let map = map_with_blob(64, 64, 20, 30, 39, 35, 0.9);

        let tight_box = &boxes_from_prob_map(map.view(), &tight, Vec2::new(64.0, 64.0))[0];
        let loose_box = &boxes_from_prob_map(map.view(), &loose, Vec2::new(64.0, 64.0))[0];
        assert!(loose_box.bbox.area() > tight_box.bbox.area() * 1.8);
    }
}
