use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PanotextError {
    #[snafu(display("Ort Session init stage `{}` error: {}", stage, source))]
    OrtInit {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Build Tensor for `{}` error: {}", stage, source))]
    Tensor {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Onnx Inference error: {}", source))]
    Inference { source: ort::error::Error },
    #[snafu(display("Onnx Output can not found {}", output_name))]
    NotFoundOutput { output_name: String },
    #[snafu(display("Ndarray Shape error at stage `{}`: {}", stage, source))]
    Shape {
        source: ndarray::ShapeError,
        stage: String,
    },
    #[snafu(display("Image Read error for `{}`: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Image Write error: {}", source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    IoWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Read `{}` error: {}", path, source))]
    IoRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Serialize results to `{}` error: {}", path, source))]
    JsonWrite {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Fetch model asset from `{}` error: {}", url, source))]
    ModelFetch { source: reqwest::Error, url: String },
    #[snafu(display("Model asset `{}` returned HTTP status {}", url, status))]
    ModelStatus { url: String, status: u16 },
    #[snafu(display("No cache directory available for model assets"))]
    NoCacheDir,
    #[snafu(display(
        "Input panorama `{}` not found. Download one with the `gsv` tool or place an equirectangular image at that path",
        path
    ))]
    MissingPanorama { path: String },
    #[snafu(display("Character dictionary is empty for model `{}`", model))]
    EmptyDictionary { model: String },
}
