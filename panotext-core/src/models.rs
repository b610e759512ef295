//! Model asset management: the OCR models are fetched on first use into a
//! per-user cache directory and reused from there afterwards.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, info};

use crate::error::*;

/// One downloadable asset of the PaddleOCR pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAsset {
    /// DBNet text detection model.
    Detection,
    /// CRNN text recognition model.
    Recognition,
    /// Character dictionary for recognition.
    Dictionary,
}

impl ModelAsset {
    pub fn filename(&self) -> &'static str {
        match self {
            ModelAsset::Detection => "det.onnx",
            ModelAsset::Recognition => "rec.onnx",
            ModelAsset::Dictionary => "dict.txt",
        }
    }

    /// PaddleOCR ONNX exports published on Hugging Face (monkt/paddleocr-onnx).
    pub fn download_url(&self) -> &'static str {
        match self {
            ModelAsset::Detection => {
                "https://huggingface.co/monkt/paddleocr-onnx/resolve/main/detection/v3/det.onnx"
            }
            ModelAsset::Recognition => {
                "https://huggingface.co/monkt/paddleocr-onnx/resolve/main/languages/english/rec.onnx"
            }
            ModelAsset::Dictionary => {
                "https://huggingface.co/monkt/paddleocr-onnx/resolve/main/languages/english/dict.txt"
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelAsset::Detection => "text detection",
            ModelAsset::Recognition => "text recognition",
            ModelAsset::Dictionary => "character dictionary",
        }
    }
}

/// Resolved on-disk locations of all assets the OCR engine needs.
pub struct ModelPaths {
    pub det: PathBuf,
    pub rec: PathBuf,
    pub dict: PathBuf,
}

impl ModelPaths {
    /// Ensures all assets exist in the default cache directory, downloading
    /// any that are missing.
    pub fn ensure_all() -> Result<Self, PanotextError> {
        let dir = cache_dir()?;
        Ok(Self {
            det: ensure_asset(&dir, ModelAsset::Detection)?,
            rec: ensure_asset(&dir, ModelAsset::Recognition)?,
            dict: ensure_asset(&dir, ModelAsset::Dictionary)?,
        })
    }
}

fn cache_dir() -> Result<PathBuf, PanotextError> {
    let dirs = ProjectDirs::from("", "", "panotext").context(NoCacheDirSnafu)?;
    let dir = dirs.cache_dir().join("models");
    std::fs::create_dir_all(&dir).context(IoWriteSnafu {
        path: dir.display().to_string(),
    })?;
    Ok(dir)
}

fn ensure_asset(dir: &Path, asset: ModelAsset) -> Result<PathBuf, PanotextError> {
    let path = dir.join(asset.filename());

    if path.exists() {
        debug!(path = %path.display(), "{} model cached", asset.display_name());
        return Ok(path);
    }

    let url = asset.download_url();
    info!(url, "downloading {} model", asset.display_name());

    let response = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()
        .context(ModelFetchSnafu { url })?
        .get(url)
        .send()
        .context(ModelFetchSnafu { url })?;

    ensure!(
        response.status().is_success(),
        ModelStatusSnafu {
            url,
            status: response.status().as_u16(),
        }
    );

    let body = response.bytes().context(ModelFetchSnafu { url })?;

    // Write to a temp name first so an interrupted download is never mistaken
    // for a cached model.
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &body).context(IoWriteSnafu {
        path: temp_path.display().to_string(),
    })?;
    std::fs::rename(&temp_path, &path).context(IoWriteSnafu {
        path: path.display().to_string(),
    })?;

    info!(path = %path.display(), bytes = body.len(), "download complete");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_filenames() {
        assert_eq!(ModelAsset::Detection.filename(), "det.onnx");
        assert_eq!(ModelAsset::Recognition.filename(), "rec.onnx");
        assert_eq!(ModelAsset::Dictionary.filename(), "dict.txt");
    }

    #[test]
    fn test_asset_urls_are_https() {
        for asset in [
            ModelAsset::Detection,
            ModelAsset::Recognition,
            ModelAsset::Dictionary,
        ] {
            assert!(asset.download_url().starts_with("https://"));
            assert!(asset.download_url().ends_with(asset.filename()));
        }
    }
}
