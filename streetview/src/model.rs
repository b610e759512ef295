//! Panorama metadata as reported by the Street View services.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capture date of a panorama; Google reports year and month only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDate {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One zoom level's full panorama size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub x: u32,
    pub y: u32,
}

/// A nearby panorama reachable through the in-viewer navigation arrows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedPanorama {
    pub id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// An older capture at the same spot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalPanorama {
    pub id: String,
    pub date: Option<CaptureDate>,
}

/// Full metadata for one Street View panorama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panorama {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub date: Option<CaptureDate>,
    /// Camera heading in degrees, clockwise from north.
    pub heading: Option<f64>,
    pub elevation: Option<f64>,
    /// Available resolutions, lowest zoom first.
    pub image_sizes: Vec<ImageSize>,
    /// Side length in pixels of the square tiles the image is served in.
    pub tile_size: u32,
    pub neighbors: Vec<LinkedPanorama>,
    pub historical: Vec<HistoricalPanorama>,
    pub address: Vec<String>,
    pub country_code: Option<String>,
    pub source: Option<String>,
    pub copyright_message: Option<String>,
}

impl Panorama {
    /// Maximum zoom level this panorama is available at.
    pub fn max_zoom(&self) -> u32 {
        self.image_sizes.len().saturating_sub(1) as u32
    }

    /// A Google Maps link that opens this panorama in the browser viewer.
    pub fn permalink(&self) -> String {
        format!(
            "https://www.google.com/maps/@?api=1&map_action=pano&pano={}",
            self.id
        )
    }
}

/// A panorama listed in a coverage tile. Only position is known; fetch full
/// metadata by id when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveragePanorama {
    pub id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_date_display() {
        let date = CaptureDate {
            year: 2019,
            month: 5,
        };
        assert_eq!(date.to_string(), "2019-05");
    }

    #[test]
    fn test_permalink() {
        let pano = Panorama {
            id: "abc123".to_string(),
            lat: 42.36,
            lon: -71.09,
            date: None,
            heading: None,
            elevation: None,
            image_sizes: vec![
                ImageSize { x: 512, y: 256 },
                ImageSize { x: 1024, y: 512 },
            ],
            tile_size: 512,
            neighbors: vec![],
            historical: vec![],
            address: vec![],
            country_code: None,
            source: None,
            copyright_message: None,
        };

        assert_eq!(
            pano.permalink(),
            "https://www.google.com/maps/@?api=1&map_action=pano&pano=abc123"
        );
        assert_eq!(pano.max_zoom(), 1);
    }
}
