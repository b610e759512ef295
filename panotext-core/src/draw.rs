//! Renders detections back onto the source panorama as an annotated image,
//! the review artifact the JSON output pairs with.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use snafu::ResultExt;

use crate::{
    error::*,
    geometry::sphere::{SphericalRect, pitch_to_y, yaw_to_x},
    recognizer::SphericalDetection,
};

const BOX_COLOR: Rgb<u8> = Rgb([0, 220, 0]);

/// Draws every detection's box onto a copy of the panorama. A box that
/// straddles the yaw seam is drawn as two partial boxes, one at each edge.
pub fn annotate_panorama(panorama: &DynamicImage, detections: &[SphericalDetection]) -> RgbImage {
    let mut output = panorama.to_rgb8();
    let (width, height) = (output.width(), output.height());

    for detection in detections {
        for (x, y, w, h) in pixel_rects(&detection.rect, width, height) {
            draw_thick_rect(&mut output, x, y, w, h);
        }
    }

    output
}

pub fn save_annotated(
    panorama: &DynamicImage,
    detections: &[SphericalDetection],
    path: impl AsRef<Path>,
) -> Result<(), PanotextError> {
    let path = path.as_ref();
    annotate_panorama(panorama, detections)
        .save(path)
        .context(ImageWriteSnafu {
            path: path.display().to_string(),
        })
}

/// Converts a spherical rect to one or two pixel rects `(x, y, w, h)`,
/// splitting at the image edge when the rect crosses the yaw seam.
fn pixel_rects(rect: &SphericalRect, image_width: u32, image_height: u32) -> Vec<(i32, i32, u32, u32)> {
    let x0 = yaw_to_x(rect.yaw - rect.width / 2.0, image_width as f32);
    let x1 = yaw_to_x(rect.yaw + rect.width / 2.0, image_width as f32);
    let y0 = pitch_to_y(rect.pitch + rect.height / 2.0, image_height as f32);
    let y1 = pitch_to_y(rect.pitch - rect.height / 2.0, image_height as f32);

    let y = y0 as i32;
    let h = ((y1 - y0).max(1.0)) as u32;

    if x1 >= x0 {
        vec![(x0 as i32, y, ((x1 - x0).max(1.0)) as u32, h)]
    } else {
        vec![
            (x0 as i32, y, ((image_width as f32 - x0).max(1.0)) as u32, h),
            (0, y, (x1.max(1.0)) as u32, h),
        ]
    }
}

fn draw_thick_rect(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }

    for offset in 0..3 {
        let thick_rect = Rect::at(x - offset, y - offset)
            .of_size(width + (offset * 2) as u32, height + (offset * 2) as u32);
        draw_hollow_rect_mut(image, thick_rect, BOX_COLOR);
    }
}
