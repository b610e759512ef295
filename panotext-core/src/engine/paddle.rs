use image::DynamicImage;
use tracing::debug;

use crate::{
    error::PanotextError,
    inference::{
        detect::{model::PaddleDet, session::PaddleDetSession},
        model::session_builder,
        recognize::{model::PaddleRec, session::PaddleRecSession},
    },
    models::ModelPaths,
};

use super::{OcrEngine, TextFragment};

/// Two-stage PaddleOCR engine: DBNet text detection followed by CRNN
/// recognition on each detected line.
pub struct PaddleOcrEngine {
    detector: PaddleDetSession<PaddleDet>,
    recognizer: PaddleRecSession<PaddleRec>,
}

impl PaddleOcrEngine {
    pub fn new(paths: &ModelPaths) -> Result<Self, PanotextError> {
        let detector = PaddleDetSession::new(session_builder()?, PaddleDet::new(&paths.det))?;
        let recognizer = PaddleRecSession::new(
            session_builder()?,
            PaddleRec::new(&paths.rec).with_dict(&paths.dict),
        )?;

        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl OcrEngine for PaddleOcrEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<Vec<TextFragment>, PanotextError> {
        let boxes = self.detector.detect(image)?;
        debug!(boxes = boxes.len(), "text detection done");

        let mut fragments = Vec::with_capacity(boxes.len());
        for text_box in boxes {
            let (raw, confidence) = self
                .recognizer
                .recognize_text_region(image, &text_box.bbox)?;

            // Mojibake and stray control characters are common in street-level
            // imagery; clean before reporting.
            let text = plsfix::fix_text(raw.trim(), None);
            if text.is_empty() {
                continue;
            }

            fragments.push(TextFragment {
                text,
                bbox: text_box.bbox,
                confidence,
            });
        }

        Ok(fragments)
    }

    fn name(&self) -> &str {
        "paddleocr"
    }
}
