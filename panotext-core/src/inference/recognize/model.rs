use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Dim, OwnedRepr};

use crate::inference::model::Model;

pub struct PaddleRec {
    path: PathBuf,
    dict_path: Option<PathBuf>,
    config: PaddleRecConfig,
}

pub type PaddleRecInput = ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>>;
pub type PaddleRecOutput = ArrayBase<OwnedRepr<f32>, Dim<[usize; 3]>>;

/// Configuration for the CRNN-style text recognition model.
#[derive(Debug, Clone)]
pub struct PaddleRecConfig {
    /// The model expects text line crops at exactly this height; width scales
    /// with the crop's aspect ratio.
    pub required_height: usize,

    /// Only batch size 1 is supported.
    pub batch_size: usize,

    /// RGB input, 3 channels.
    pub input_channels: usize,

    /// Crops taller than wide beyond this height/width ratio are assumed to
    /// be vertical text and rotated before recognition. Zero disables the
    /// rotation.
    pub aspect_ratio_threshold: f32,
}

impl Default for PaddleRecConfig {
    fn default() -> Self {
        Self {
            required_height: 48,
            batch_size: 1,
            input_channels: 3,
            aspect_ratio_threshold: 1.5,
        }
    }
}

impl PaddleRec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dict_path: None,
            config: PaddleRecConfig::default(),
        }
    }

    /// Character dictionary file used when the model graph does not embed one
    /// in its metadata.
    pub fn with_dict(mut self, dict_path: impl Into<PathBuf>) -> Self {
        self.dict_path = Some(dict_path.into());
        self
    }

    pub fn with_config(mut self, config: PaddleRecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dict_path(&self) -> Option<&Path> {
        self.dict_path.as_deref()
    }
}

impl Model for PaddleRec {
    type Input = PaddleRecInput;

    type Output = PaddleRecOutput;

    type Config = PaddleRecConfig;

    const INPUT_NAME: &'static str = "x";

    const OUTPUT_NAME: &'static str = "fetch_name_0";

    const MODEL_NAME: &'static str = "ppocr-rec";

    fn path(&self) -> &Path {
        &self.path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
