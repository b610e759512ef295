//! Async client for the unofficial Street View endpoints.

use std::path::Path;

use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, info};

use crate::api;
use crate::error::*;
use crate::model::{CoveragePanorama, Panorama};
use crate::tiles::{TileGrid, TileStitcher, latlon_to_tile};

/// Search radius used when looking up the panorama nearest a coordinate.
const SEARCH_RADIUS_M: u32 = 50;

pub struct StreetViewClient {
    http: reqwest::Client,
}

impl Default for StreetViewClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StreetViewClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Finds the panorama nearest to a coordinate.
    pub async fn find_panorama(&self, lat: f64, lon: f64) -> Result<Panorama, StreetviewError> {
        let url = api::search_url(lat, lon, SEARCH_RADIUS_M);
        let body = self.fetch_text(&url).await?;
        api::parse_search_response(&body, lat, lon)
    }

    /// Fetches full metadata for a known panorama id.
    pub async fn find_panorama_by_id(&self, id: &str) -> Result<Panorama, StreetviewError> {
        let url = api::photometa_url(id);
        let body = self.fetch_text(&url).await?;
        api::parse_photometa_response(&body, id)
    }

    /// Lists every panorama in one coverage tile.
    pub async fn get_coverage_tile(
        &self,
        tile_x: u32,
        tile_y: u32,
    ) -> Result<Vec<CoveragePanorama>, StreetviewError> {
        let url = api::coverage_tile_url(tile_x, tile_y);
        let body = self.fetch_text(&url).await?;
        api::parse_coverage_tile_response(&body)
    }

    /// Lists every panorama in the coverage tile containing a coordinate.
    pub async fn get_coverage_tile_by_latlon(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<CoveragePanorama>, StreetviewError> {
        let (tile_x, tile_y) = latlon_to_tile(lat, lon, api::COVERAGE_TILE_ZOOM);
        debug!(tile_x, tile_y, "coverage tile for coordinate");
        self.get_coverage_tile(tile_x, tile_y).await
    }

    /// Downloads a panorama at the given zoom level, stitches its tiles and
    /// saves the image. The zoom is clamped to what the panorama offers.
    pub async fn download_panorama(
        &self,
        pano: &Panorama,
        path: impl AsRef<Path>,
        zoom: u32,
    ) -> Result<(), StreetviewError> {
        let path = path.as_ref();
        let zoom = zoom.min(pano.max_zoom());
        let grid = TileGrid::for_panorama(pano, zoom).context(NotFoundSnafu {
            id: pano.id.clone(),
        })?;

        info!(
            id = %pano.id,
            zoom,
            tiles = grid.tile_count(),
            width = grid.width,
            height = grid.height,
            "downloading panorama"
        );

        let mut stitcher = TileStitcher::new(grid);
        for (tile_x, tile_y) in grid.tiles() {
            let url = api::tile_url(&pano.id, tile_x, tile_y, zoom);
            let bytes = self.fetch_bytes(&url).await?;
            let tile = image::load_from_memory(&bytes)
                .context(TileDecodeSnafu)?
                .to_rgba8();
            stitcher.place(tile_x, tile_y, &tile);
        }

        // JPEG output cannot carry the alpha channel.
        let stitched = image::DynamicImage::ImageRgba8(stitcher.finish()).to_rgb8();
        stitched.save(path).context(ImageWriteSnafu {
            path: path.display().to_string(),
        })?;

        info!(path = %path.display(), "panorama saved");
        Ok(())
    }

    async fn fetch_text(&self, url: &str) -> Result<String, StreetviewError> {
        let response = self.http.get(url).send().await.context(HttpSnafu { url })?;
        ensure!(
            response.status().is_success(),
            StatusSnafu {
                url,
                status: response.status().as_u16(),
            }
        );
        response.text().await.context(HttpSnafu { url })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, StreetviewError> {
        let response = self.http.get(url).send().await.context(HttpSnafu { url })?;
        ensure!(
            response.status().is_success(),
            StatusSnafu {
                url,
                status: response.status().as_u16(),
            }
        );
        Ok(response.bytes().await.context(HttpSnafu { url })?.to_vec())
    }
}
