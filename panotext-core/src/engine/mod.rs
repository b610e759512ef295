use image::DynamicImage;
use serde::Serialize;

use crate::{error::PanotextError, geometry::bbox::Bbox};

pub mod paddle;

/// A piece of text recognized in a single image, in that image's pixels.
#[derive(Clone, Debug, Serialize)]
pub struct TextFragment {
    pub text: String,
    pub bbox: Bbox,
    pub confidence: f32,
}

/// An OCR backend that turns an image into text fragments. The panorama
/// pipeline drives it one perspective view at a time.
pub trait OcrEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<Vec<TextFragment>, PanotextError>;

    fn name(&self) -> &str;
}
