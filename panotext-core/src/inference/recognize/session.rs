use image::{DynamicImage, imageops::FilterType};
use ndarray::prelude::*;
use ort::session::{Session, builder::SessionBuilder};
use ort::value::TensorRef;
use snafu::{OptionExt, ResultExt, ensure};

use crate::{
    error::*,
    geometry::bbox::Bbox,
    inference::model::{Model, OnnxSession},
};

use super::model::PaddleRec;

pub struct PaddleRecSession<M: Model> {
    session: Session,
    model: M,
    character_dict: Vec<String>,
}

impl PaddleRecSession<PaddleRec> {
    pub fn new(builder: SessionBuilder, model: PaddleRec) -> Result<Self, PanotextError> {
        let session = builder
            .commit_from_file(model.path())
            .context(OrtInitSnafu { stage: "commit" })?;

        // The character dictionary normally ships inside the model metadata;
        // fall back to a dictionary file when the graph carries none.
        let chars = session
            .metadata()
            .ok()
            .and_then(|m| m.custom("character").ok().flatten())
            .filter(|chars| !chars.is_empty());

        let chars = match (chars, model.dict_path()) {
            (Some(chars), _) => chars,
            (None, Some(dict_path)) => {
                std::fs::read_to_string(dict_path).context(IoReadSnafu {
                    path: dict_path.display().to_string(),
                })?
            }
            (None, None) => String::new(),
        };
        ensure!(
            !chars.is_empty(),
            EmptyDictionarySnafu {
                model: PaddleRec::MODEL_NAME,
            }
        );

        let mut character_dict = Vec::with_capacity(chars.lines().count() + 2);
        character_dict.push("#".to_string());
        character_dict.extend(chars.lines().map(|char| char.to_string()));
        character_dict.push(" ".to_string());

        Ok(Self {
            session,
            model,
            character_dict,
        })
    }

    pub fn character_dict(&self) -> &[String] {
        &self.character_dict
    }

    /// Recognizes the text inside one region of an image.
    pub fn recognize_text_region(
        &mut self,
        image: &DynamicImage,
        bbox: &Bbox,
    ) -> Result<(String, f32), PanotextError> {
        let cropped = crop_image_region(image, bbox);
        self.run(&cropped, ())
    }
}

/// Crops an image to a bounding box, clamped to the image bounds. Degenerate
/// boxes yield a 1x1 image rather than an error.
fn crop_image_region(image: &DynamicImage, bbox: &Bbox) -> DynamicImage {
    let clamped = bbox.clamp(
        glam::Vec2::ZERO,
        glam::Vec2::new(image.width() as f32, image.height() as f32),
    );

    let x = clamped.min.x.max(0.0) as u32;
    let y = clamped.min.y.max(0.0) as u32;
    let width = (clamped.width().max(1.0) as u32).min(image.width().saturating_sub(x));
    let height = (clamped.height().max(1.0) as u32).min(image.height().saturating_sub(y));

    if width == 0 || height == 0 {
        return DynamicImage::new_rgb8(1, 1);
    }

    image.crop_imm(x, y, width, height)
}

/// Greedy CTC decode over `[sequence, vocab]` logits. Index 0 is the blank
/// token; repeats of the previous emission collapse. The returned confidence
/// is the mean probability of the emitted characters, 0.0 when nothing is
/// emitted.
pub fn ctc_greedy_decode(probs: ArrayView2<'_, f32>, dict: &[String]) -> (String, f32) {
    let mut text = String::new();
    let mut prob_sum = 0.0f32;
    let mut emitted = 0usize;
    let mut prev_idx = None;

    for timestep in probs.axis_iter(Axis(0)) {
        let (max_idx, max_prob) = timestep
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, prob)| (idx, *prob))
            .unwrap_or((0, 0.0));

        if max_idx != 0 && Some(max_idx) != prev_idx && max_idx < dict.len() {
            text.push_str(&dict[max_idx]);
            prob_sum += max_prob;
            emitted += 1;
        }

        prev_idx = Some(max_idx);
    }

    let confidence = if emitted > 0 {
        prob_sum / emitted as f32
    } else {
        0.0
    };

    (text, confidence)
}

impl OnnxSession<PaddleRec> for PaddleRecSession<PaddleRec> {
    type Output = (String, f32);
    type Extra = ();

    fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<<PaddleRec as Model>::Input, PanotextError> {
        let config = self.model.config();

        let mut img_src = image.to_rgb8();

        // Vertical text reads better rotated to horizontal.
        let aspect_ratio = img_src.height() as f32 / img_src.width() as f32;
        if config.aspect_ratio_threshold > 0.0 && aspect_ratio > config.aspect_ratio_threshold {
            img_src = image::imageops::rotate90(&img_src);
        }

        let scale = config.required_height as f32 / img_src.height() as f32;
        let dst_width = ((img_src.width() as f32 * scale) as u32).max(1);

        let src_resize = image::imageops::resize(
            &img_src,
            dst_width,
            config.required_height as u32,
            FilterType::Triangle,
        );

        let mut input_tensor = Array4::zeros([
            config.batch_size,
            config.input_channels,
            src_resize.height() as _,
            src_resize.width() as _,
        ]);

        for (x, y, pixel) in src_resize.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = pixel.0;

            input_tensor[[0, 0, y, x]] = (r as f32 / 255.0 - 0.5) / 0.5;
            input_tensor[[0, 1, y, x]] = (g as f32 / 255.0 - 0.5) / 0.5;
            input_tensor[[0, 2, y, x]] = (b as f32 / 255.0 - 0.5) / 0.5;
        }

        Ok(input_tensor)
    }

    fn postprocess(
        &self,
        output: <PaddleRec as Model>::Output,
        _extra: Self::Extra,
    ) -> Result<Self::Output, PanotextError> {
        let batch_output = output.slice(ndarray::s![0, .., ..]);
        Ok(ctc_greedy_decode(batch_output, &self.character_dict))
    }

    fn infer(
        &mut self,
        input: <PaddleRec as Model>::Input,
        input_name: &str,
        output_name: &str,
    ) -> Result<<PaddleRec as Model>::Output, PanotextError> {
        let output = self
            .session
            .run(ort::inputs![
                input_name => TensorRef::from_array_view(&input).context(TensorSnafu { stage: "recognize-input" })?
            ])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu {
                stage: "recognize-extract",
            })?;

        let shape = tensor.shape();
        let output_array = tensor
            .to_shape([shape[0], shape[1], shape[2]])
            .context(ShapeSnafu { stage: "recognize" })?
            .to_owned();

        Ok(output_array)
    }
}
