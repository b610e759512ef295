pub mod consts;
pub mod dedup;
pub mod draw;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod inference;
pub mod models;
pub mod projection;
pub mod recognizer;

// Re-export commonly used types
pub use engine::{OcrEngine, TextFragment, paddle::PaddleOcrEngine};
pub use models::ModelPaths;
pub use recognizer::{PanoOcr, PanoOcrConfig, PanoOcrResult, SphericalDetection};
