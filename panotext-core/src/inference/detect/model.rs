use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Dim, OwnedRepr};

use crate::consts::{
    DET_BINARY_THRESHOLD, DET_BOX_SCORE_THRESHOLD, DET_STRIDE, DET_UNCLIP_RATIO,
};
use crate::inference::model::Model;

pub struct PaddleDet {
    path: PathBuf,
    config: PaddleDetConfig,
}

pub type PaddleDetInput = ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>>;
pub type PaddleDetOutput = ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>>;

/// Configuration for the DBNet-style text detection model.
#[derive(Debug, Clone)]
pub struct PaddleDetConfig {
    /// Longest input side; larger images are scaled down before inference.
    pub max_side_len: u32,

    /// Both input sides are rounded to a multiple of this stride, as the
    /// model's feature pyramid requires.
    pub stride: u32,

    /// Probability threshold used to binarize the output map.
    pub binary_threshold: f32,

    /// Minimum mean probability inside a component for keeping its box.
    pub box_score_threshold: f32,

    /// Area ratio by which accepted boxes are expanded, compensating for the
    /// shrink the model applies to text regions.
    pub unclip_ratio: f32,

    /// Components with a side shorter than this (in model pixels) are noise.
    pub min_box_side: f32,
}

impl Default for PaddleDetConfig {
    fn default() -> Self {
        Self {
            max_side_len: 960,
            stride: DET_STRIDE,
            binary_threshold: DET_BINARY_THRESHOLD,
            box_score_threshold: DET_BOX_SCORE_THRESHOLD,
            unclip_ratio: DET_UNCLIP_RATIO,
            min_box_side: 3.0,
        }
    }
}

impl PaddleDet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: PaddleDetConfig::default(),
        }
    }

    pub fn with_config(path: impl Into<PathBuf>, config: PaddleDetConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }
}

impl Model for PaddleDet {
    type Input = PaddleDetInput;

    type Output = PaddleDetOutput;

    type Config = PaddleDetConfig;

    const INPUT_NAME: &'static str = "x";

    const OUTPUT_NAME: &'static str = "sigmoid_0.tmp_0";

    const MODEL_NAME: &'static str = "ppocr-det";

    fn path(&self) -> &Path {
        &self.path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
