pub mod api;
pub mod client;
pub mod error;
pub mod model;
pub mod tiles;

// Re-export commonly used types
pub use client::StreetViewClient;
pub use error::StreetviewError;
pub use model::{CaptureDate, CoveragePanorama, HistoricalPanorama, ImageSize, Panorama};
