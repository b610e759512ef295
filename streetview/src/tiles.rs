//! Tile arithmetic: the web-mercator grid coverage tiles live on, and the
//! per-panorama tile grid full images are stitched from.

use image::RgbaImage;

use crate::model::{ImageSize, Panorama};

/// Converts a coordinate to web-mercator tile indices at the given zoom.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> (u32, u32) {
    let n = f64::from(1u32 << zoom);
    let lat_rad = lat.to_radians();

    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n;

    let max = (1u32 << zoom) - 1;
    (
        (x.floor() as i64).clamp(0, max as i64) as u32,
        (y.floor() as i64).clamp(0, max as i64) as u32,
    )
}

/// Tile layout of one panorama at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub cols: u32,
    pub rows: u32,
    pub tile_size: u32,
    /// True image size; the last tile row and column carry padding beyond it.
    pub width: u32,
    pub height: u32,
}

impl TileGrid {
    pub fn new(size: ImageSize, tile_size: u32) -> Self {
        Self {
            cols: size.x.div_ceil(tile_size),
            rows: size.y.div_ceil(tile_size),
            tile_size,
            width: size.x,
            height: size.y,
        }
    }

    pub fn for_panorama(pano: &Panorama, zoom: u32) -> Option<Self> {
        let size = pano.image_sizes.get(zoom as usize)?;
        Some(Self::new(*size, pano.tile_size))
    }

    pub fn tile_count(&self) -> u32 {
        self.cols * self.rows
    }

    /// Tile coordinates in fetch order, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.rows).flat_map(move |y| (0..self.cols).map(move |x| (x, y)))
    }
}

/// Assembles fetched tiles into the full panorama, cropping away the padding
/// Google adds past the true image edge.
pub struct TileStitcher {
    grid: TileGrid,
    canvas: RgbaImage,
}

impl TileStitcher {
    pub fn new(grid: TileGrid) -> Self {
        let canvas = RgbaImage::new(grid.cols * grid.tile_size, grid.rows * grid.tile_size);
        Self { grid, canvas }
    }

    pub fn place(&mut self, tile_x: u32, tile_y: u32, tile: &RgbaImage) {
        image::imageops::replace(
            &mut self.canvas,
            tile,
            i64::from(tile_x * self.grid.tile_size),
            i64::from(tile_y * self.grid.tile_size),
        );
    }

    pub fn finish(self) -> RgbaImage {
        image::imageops::crop_imm(&self.canvas, 0, 0, self.grid.width, self.grid.height).to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_latlon_to_tile_known_points() {
        // Null island sits on the grid center.
        let zoom = 17;
        let center = 1u32 << (zoom - 1);
        assert_eq!(latlon_to_tile(0.0, 0.0, zoom), (center, center));

        // MIT campus, northern and western hemisphere.
        let (x, y) = latlon_to_tile(42.3601, -71.0868, zoom);
        assert!(x < center);
        assert!(y < center);

        // Stays on the grid at the poles.
        let (_, y) = latlon_to_tile(89.9999, 0.0, zoom);
        assert_eq!(y, 0);
    }

    #[test]
    fn test_tile_grid_rounds_up() {
        let grid = TileGrid::new(ImageSize { x: 2048, y: 1024 }, 512);
        assert_eq!((grid.cols, grid.rows), (4, 2));

        // A size not divisible by the tile side needs a padded final tile.
        let grid = TileGrid::new(ImageSize { x: 1664, y: 832 }, 512);
        assert_eq!((grid.cols, grid.rows), (4, 2));
        assert_eq!(grid.tile_count(), 8);
    }

    #[test]
    fn test_tiles_iterate_row_major() {
        let grid = TileGrid::new(ImageSize { x: 1024, y: 1024 }, 512);
        let order: Vec<_> = grid.tiles().collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_stitcher_crops_padding() {
        let grid = TileGrid::new(ImageSize { x: 600, y: 300 }, 512);
        let mut stitcher = TileStitcher::new(grid);

        let red = RgbaImage::from_pixel(512, 512, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(512, 512, Rgba([0, 0, 255, 255]));
        stitcher.place(0, 0, &red);
        stitcher.place(1, 0, &blue);

        let stitched = stitcher.finish();
        assert_eq!((stitched.width(), stitched.height()), (600, 300));
        assert_eq!(stitched.get_pixel(100, 100).0, [255, 0, 0, 255]);
        assert_eq!(stitched.get_pixel(550, 100).0, [0, 0, 255, 255]);
    }
}
