use glam::{Vec2, Vec3};
use image::{DynamicImage, Rgb, RgbImage};

use crate::geometry::bbox::Bbox;
use crate::geometry::sphere::{SphericalRect, normalize_yaw, pitch_to_y, yaw_to_x};

/// Direction a perspective view faces, in degrees on the panorama sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewDirection {
    pub yaw: f32,
    pub pitch: f32,
}

impl ViewDirection {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw: normalize_yaw(yaw),
            pitch,
        }
    }
}

/// Plans a set of view directions covering the full 360° of yaw at each
/// requested pitch row.
///
/// The nominal yaw step is `fov * (1 - overlap)`; the number of views per row
/// is rounded up so the ring closes and adjacent views overlap by at least
/// the requested fraction.
pub fn plan_views(fov_deg: f32, overlap: f32, pitch_rows: &[f32]) -> Vec<ViewDirection> {
    let nominal_step = fov_deg * (1.0 - overlap.clamp(0.0, 0.95));
    let per_row = (360.0 / nominal_step).ceil().max(1.0) as usize;
    let step = 360.0 / per_row as f32;

    let mut views = Vec::with_capacity(per_row * pitch_rows.len());
    for &pitch in pitch_rows {
        for i in 0..per_row {
            views.push(ViewDirection::new(i as f32 * step, pitch));
        }
    }
    views
}

/// Pinhole camera frame for a view direction: orthonormal basis plus focal
/// length in pixels for the requested field of view and output size.
struct Camera {
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    focal: f32,
    half_size: f32,
}

impl Camera {
    fn new(dir: ViewDirection, fov_deg: f32, view_size: u32) -> Self {
        let forward = ray_from_angles(dir.yaw, dir.pitch);
        let right = ray_from_angles(dir.yaw + 90.0, 0.0);
        let up = forward.cross(right);
        let half_size = view_size as f32 / 2.0;
        let focal = half_size / (fov_deg.to_radians() / 2.0).tan();

        Self {
            forward,
            right,
            up,
            focal,
            half_size,
        }
    }

    /// World-space ray through a pixel of the view image.
    fn ray(&self, px: Vec2) -> Vec3 {
        let a = px.x - self.half_size;
        let b = self.half_size - px.y;
        (self.forward * self.focal + self.right * a + self.up * b).normalize()
    }
}

/// Unit direction vector for a yaw/pitch pair. Yaw 0 faces +Z, yaw 90 faces
/// +X, pitch 90 faces +Y (up).
fn ray_from_angles(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
    let yaw = yaw_deg.to_radians();
    let pitch = pitch_deg.to_radians();
    Vec3::new(
        pitch.cos() * yaw.sin(),
        pitch.sin(),
        pitch.cos() * yaw.cos(),
    )
}

/// Spherical angles for a unit direction, in degrees.
fn angles_from_ray(dir: Vec3) -> (f32, f32) {
    let yaw = dir.x.atan2(dir.z).to_degrees();
    let pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees();
    (normalize_yaw(yaw), pitch)
}

/// Renders a square rectilinear perspective view of the panorama by inverse
/// mapping with bilinear sampling. The panorama must be equirectangular.
pub fn render_view(
    pano: &DynamicImage,
    dir: ViewDirection,
    fov_deg: f32,
    view_size: u32,
) -> RgbImage {
    let camera = Camera::new(dir, fov_deg, view_size);
    let pano = pano.to_rgb8();
    let (pano_w, pano_h) = (pano.width() as f32, pano.height() as f32);

    let mut view = RgbImage::new(view_size, view_size);
    for (x, y, pixel) in view.enumerate_pixels_mut() {
        let ray = camera.ray(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
        let (yaw, pitch) = angles_from_ray(ray);
        let src_x = yaw_to_x(yaw, pano_w);
        let src_y = pitch_to_y(pitch, pano_h);
        *pixel = sample_bilinear(&pano, src_x, src_y);
    }
    view
}

/// Bilinear sample with horizontal wraparound (the panorama is periodic in
/// yaw) and vertical clamping.
fn sample_bilinear(pano: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = (pano.width() as i64, pano.height() as i64);

    let x = x - 0.5;
    let y = (y - 0.5).clamp(0.0, (h - 1) as f32);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let wrap_x = |v: i64| -> u32 { v.rem_euclid(w) as u32 };
    let clamp_y = |v: i64| -> u32 { v.clamp(0, h - 1) as u32 };

    let (x0i, y0i) = (x0 as i64, y0 as i64);
    let p00 = pano.get_pixel(wrap_x(x0i), clamp_y(y0i));
    let p10 = pano.get_pixel(wrap_x(x0i + 1), clamp_y(y0i));
    let p01 = pano.get_pixel(wrap_x(x0i), clamp_y(y0i + 1));
    let p11 = pano.get_pixel(wrap_x(x0i + 1), clamp_y(y0i + 1));

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00.0[c] as f32 * (1.0 - fx) + p10.0[c] as f32 * fx;
        let bottom = p01.0[c] as f32 * (1.0 - fx) + p11.0[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Maps a pixel position inside a rendered view back to yaw/pitch on the
/// panorama sphere.
pub fn unproject(dir: ViewDirection, fov_deg: f32, view_size: u32, px: Vec2) -> (f32, f32) {
    let camera = Camera::new(dir, fov_deg, view_size);
    angles_from_ray(camera.ray(px))
}

/// Converts a pixel bbox inside a rendered view into an angular box on the
/// sphere. The center comes from the exact inverse camera ray; the angular
/// extent from the arc between unprojected edge midpoints.
pub fn fragment_rect(
    dir: ViewDirection,
    fov_deg: f32,
    view_size: u32,
    bbox: &Bbox,
) -> SphericalRect {
    let camera = Camera::new(dir, fov_deg, view_size);
    let center = bbox.center();

    let (yaw, pitch) = angles_from_ray(camera.ray(center));

    let left = camera.ray(Vec2::new(bbox.min.x, center.y));
    let right = camera.ray(Vec2::new(bbox.max.x, center.y));
    let top = camera.ray(Vec2::new(center.x, bbox.min.y));
    let bottom = camera.ray(Vec2::new(center.x, bbox.max.y));

    let width = left.dot(right).clamp(-1.0, 1.0).acos().to_degrees();
    let height = top.dot(bottom).clamp(-1.0, 1.0).acos().to_degrees();

    SphericalRect::new(yaw, pitch, width, height)
}
