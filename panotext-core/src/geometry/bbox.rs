use serde::Serialize;

/// A 2D axis-aligned bounding box in pixel space, represented by minimum and
/// maximum points. Used for text fragments inside a single perspective view.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Bbox {
    pub min: glam::Vec2,
    pub max: glam::Vec2,
}

impl Bbox {
    pub fn new(min: glam::Vec2, max: glam::Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_min_size(min: glam::Vec2, size: glam::Vec2) -> Self {
        Self {
            min,
            max: min + size,
        }
    }

    /// YOLO-style constructor from (center, size).
    pub fn from_center_size(center: glam::Vec2, size: glam::Vec2) -> Self {
        let half_size = size / 2.0;
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        let length = self.max - self.min;

        length.x * length.y
    }

    pub fn center(&self) -> glam::Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Overlapping area with `other`, 0.0 when the boxes are disjoint.
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Intersection over union, in [0, 1].
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Intersection over the smaller of the two areas. More lenient than IoU
    /// when a small box sits inside a large one.
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
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Smallest box that covers both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn clamp(&self, min_bounds: glam::Vec2, max_bounds: glam::Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds),
            max: self.max.min(max_bounds),
        }
    }

    /// Grows the box around its center so its area scales by `ratio`.
    /// Used to unclip shrunk detection-model boxes.
    pub fn expand(&self, ratio: f32) -> Self {
        let scale = ratio.max(0.0).sqrt();
        let half_size = (self.max - self.min) * scale / 2.0;
        let center = self.center();

        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_area_and_center() {
        let bbox = Bbox::from_min_size(Vec2::ZERO, Vec2::new(4.0, 3.0));
        assert_eq!(bbox.area(), 12.0);
        assert_eq!(bbox.center(), Vec2::new(2.0, 1.5));
        assert_eq!(bbox.width(), 4.0);
        assert_eq!(bbox.height(), 3.0);
    }

    #[test]
    fn test_from_center_size() {
        let bbox = Bbox::from_center_size(Vec2::new(100.0, 200.0), Vec2::new(50.0, 80.0));
        assert_eq!(bbox.min, Vec2::new(75.0, 160.0));
        assert_eq!(bbox.max, Vec2::new(125.0, 240.0));
        assert_eq!(bbox.center(), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_intersection_and_iou() {
        let bbox1 = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
        let bbox2 = Bbox::new(Vec2::new(2.0, 2.0), Vec2::new(6.0, 6.0));
        assert_eq!(bbox1.intersection(&bbox2), 4.0);
        assert!((bbox1.iou(&bbox2) - 4.0 / 28.0).abs() < 1e-6);

        let disjoint = Bbox::new(Vec2::new(10.0, 10.0), Vec2::new(12.0, 12.0));
        assert_eq!(bbox1.intersection(&disjoint), 0.0);
        assert_eq!(bbox1.iou(&disjoint), 0.0);

        // Edge touching counts as no overlap.
        let touching = Bbox::new(Vec2::new(4.0, 0.0), Vec2::new(8.0, 4.0));
        assert_eq!(bbox1.intersection(&touching), 0.0);
    }

    #[test]
    fn test_overlap_ratio_containment() {
        let large = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
        let small = Bbox::new(Vec2::new(10.0, 10.0), Vec2::new(30.0, 30.0));

        assert_eq!(large.overlap_ratio(&small), 1.0);
        assert!(large.iou(&small) < large.overlap_ratio(&small));
        assert!(large.contains(&small));
        assert!(!small.contains(&large));
    }

    #[test]
    fn test_union_and_clamp() {
        let bbox1 = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(5.0, 5.0));
        let bbox2 = Bbox::new(Vec2::new(3.0, 3.0), Vec2::new(8.0, 8.0));
        let union = bbox1.union(&bbox2);
        assert_eq!(union.min, Vec2::new(0.0, 0.0));
        assert_eq!(union.max, Vec2::new(8.0, 8.0));

        let oversized = Bbox::new(Vec2::new(-10.0, -5.0), Vec2::new(1030.0, 1030.0));
        let clamped = oversized.clamp(Vec2::ZERO, Vec2::new(1023.0, 1023.0));
        assert_eq!(clamped.min, Vec2::ZERO);
        assert_eq!(clamped.max, Vec2::new(1023.0, 1023.0));
    }

    #[test]
    fn test_expand_scales_area() {
        let bbox = Bbox::from_center_size(Vec2::new(50.0, 50.0), Vec2::new(10.0, 4.0));
        let expanded = bbox.expand(1.6);

        assert_eq!(expanded.center(), bbox.center());
        assert!((expanded.area() - bbox.area() * 1.6).abs() < 1e-3);

        // Ratio 1.0 is the identity.
        let same = bbox.expand(1.0);
        assert!((same.area() - bbox.area()).abs() < 1e-6);
    }
}
