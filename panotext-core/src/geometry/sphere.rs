use serde::Serialize;

/// Wraps a yaw angle into the [-180, 180) range.
pub fn normalize_yaw(yaw: f32) -> f32 {
    let mut yaw = yaw % 360.0;
    if yaw < -180.0 {
        yaw += 360.0;
    } else if yaw >= 180.0 {
        yaw -= 360.0;
    }
    yaw
}

/// Horizontal equirectangular position for a yaw angle. Yaw -180 maps to the
/// left edge, 0 to the image center, +180 back to the left edge.
pub fn yaw_to_x(yaw: f32, image_width: f32) -> f32 {
    (normalize_yaw(yaw) / 360.0 + 0.5) * image_width
}

/// Vertical equirectangular position for a pitch angle. Pitch +90 (zenith)
/// maps to the top edge, -90 (nadir) to the bottom edge.
pub fn pitch_to_y(pitch: f32, image_height: f32) -> f32 {
    (0.5 - pitch / 180.0) * image_height
}

pub fn x_to_yaw(x: f32, image_width: f32) -> f32 {
    normalize_yaw((x / image_width - 0.5) * 360.0)
}

pub fn y_to_pitch(y: f32, image_height: f32) -> f32 {
    (0.5 - y / image_height) * 180.0
}

/// An angular box on the panorama sphere: center yaw/pitch plus angular
/// extent, all in degrees. Yaw wraps at the ±180° seam; all pairwise
/// operations pick the wrapped copy of `other` closest to `self` first.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SphericalRect {
    pub yaw: f32,
    pub pitch: f32,
    pub width: f32,
    pub height: f32,
}

impl SphericalRect {
    pub fn new(yaw: f32, pitch: f32, width: f32, height: f32) -> Self {
        Self {
            yaw: normalize_yaw(yaw),
            pitch,
            width,
            height,
        }
    }

    /// Angular area in square degrees. Good enough as a dedup metric; no
    /// solid-angle correction is applied.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Yaw of `other` shifted by a whole turn so it is numerically closest
    /// to this rect's yaw.
    fn closest_yaw(&self, other: &Self) -> f32 {
        let mut yaw = other.yaw;
        if yaw - self.yaw > 180.0 {
            yaw -= 360.0;
        } else if self.yaw - yaw > 180.0 {
            yaw += 360.0;
        }
        yaw
    }

    pub fn intersection(&self, other: &Self) -> f32 {
        let other_yaw = self.closest_yaw(other);

        let min_x = (self.yaw - self.width / 2.0).max(other_yaw - other.width / 2.0);
        let max_x = (self.yaw + self.width / 2.0).min(other_yaw + other.width / 2.0);
        let min_y = (self.pitch - self.height / 2.0).max(other.pitch - other.height / 2.0);
        let max_y = (self.pitch + self.height / 2.0).min(other.pitch + other.height / 2.0);

        if max_x > min_x && max_y > min_y {
            (max_x - min_x) * (max_y - min_y)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    pub fn overlap_ratio(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let min_area = self.area().min(other.area());

        if min_area > 0.0 {
            intersection_area / min_area
        } else {
            0.0
        }
    }

    pub fn contains(&self, other: &Self) -> bool {
        let other_yaw = self.closest_yaw(other);

        self.yaw - self.width / 2.0 <= other_yaw - other.width / 2.0
            && self.yaw + self.width / 2.0 >= other_yaw + other.width / 2.0
            && self.pitch - self.height / 2.0 <= other.pitch - other.height / 2.0
            && self.pitch + self.height / 2.0 >= other.pitch + other.height / 2.0
    }

    /// Smallest angular box covering both rects, wrap-aware.
    pub fn union(&self, other: &Self) -> Self {
        let other_yaw = self.closest_yaw(other);

        let min_x = (self.yaw - self.width / 2.0).min(other_yaw - other.width / 2.0);
        let max_x = (self.yaw + self.width / 2.0).max(other_yaw + other.width / 2.0);
        let min_y = (self.pitch - self.height / 2.0).min(other.pitch - other.height / 2.0);
        let max_y = (self.pitch + self.height / 2.0).max(other.pitch + other.height / 2.0);

        Self::new(
            (min_x + max_x) / 2.0,
            (min_y + max_y) / 2.0,
            max_x - min_x,
            max_y - min_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_yaw() {
        assert_eq!(normalize_yaw(0.0), 0.0);
        assert_eq!(normalize_yaw(180.0), -180.0);
        assert_eq!(normalize_yaw(-180.0), -180.0);
        assert_eq!(normalize_yaw(190.0), -170.0);
        assert_eq!(normalize_yaw(-190.0), 170.0);
        assert_eq!(normalize_yaw(360.0), 0.0);
        assert_eq!(normalize_yaw(540.0), -180.0);
    }

    #[test]
    fn test_equirect_mapping() {
        // 4096 x 2048 panorama.
        assert_eq!(yaw_to_x(0.0, 4096.0), 2048.0);
        assert_eq!(yaw_to_x(-180.0, 4096.0), 0.0);
        assert_eq!(yaw_to_x(90.0, 4096.0), 3072.0);
        assert_eq!(pitch_to_y(90.0, 2048.0), 0.0);
        assert_eq!(pitch_to_y(0.0, 2048.0), 1024.0);
        assert_eq!(pitch_to_y(-90.0, 2048.0), 2048.0);
    }

    #[test]
    fn test_equirect_roundtrip() {
        for yaw in [-179.5f32, -90.0, 0.0, 45.25, 135.0] {
            let x = yaw_to_x(yaw, 8192.0);
            assert!((x_to_yaw(x, 8192.0) - yaw).abs() < 1e-3);
        }
        for pitch in [-89.0f32, -30.5, 0.0, 60.0, 89.0] {
            let y = pitch_to_y(pitch, 4096.0);
            assert!((y_to_pitch(y, 4096.0) - pitch).abs() < 1e-3);
        }
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = SphericalRect::new(10.0, 5.0, 8.0, 4.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let far = SphericalRect::new(-90.0, 5.0, 8.0, 4.0);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_intersection_across_seam() {
        // Two boxes straddling the ±180° seam overlap even though their
        // numeric yaws are far apart.
        let west = SphericalRect::new(179.0, 0.0, 6.0, 4.0);
        let east = SphericalRect::new(-179.0, 0.0, 6.0, 4.0);

        // Yaw spans [176, 182] and [178, 184] in the shifted frame: 4° x 4°.
        assert!((west.intersection(&east) - 16.0).abs() < 1e-4);
        assert!(west.iou(&east) > 0.4);
    }

    #[test]
    fn test_union_across_seam() {
        let west = SphericalRect::new(178.0, 0.0, 4.0, 4.0);
        let east = SphericalRect::new(-178.0, 0.0, 4.0, 4.0);
        let union = west.union(&east);

        assert_eq!(union.width, 8.0);
        assert_eq!(union.height, 4.0);
        // Center sits on the seam.
        assert!((union.yaw - (-180.0)).abs() < 1e-4 || (union.yaw - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_containment() {
        let outer = SphericalRect::new(0.0, 0.0, 20.0, 10.0);
        let inner = SphericalRect::new(2.0, 1.0, 4.0, 2.0);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert_eq!(outer.overlap_ratio(&inner), 1.0);
    }
}
