//! Integer axis-aligned bounding boxes and Intersection-over-Union.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates (top-left origin, y down).
///
/// Same convention as OpenCV's `cv::Rect`: the box covers
/// `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest integer box containing every point, with OpenCV `boundingRect`
    /// semantics for float points: origin is the floor of the minimum and the
    /// extent is `floor(max) - floor(min) + 1`.
    ///
    /// Returns `None` for an empty point set or non-finite coordinates.
    pub fn enclosing(points: &[Point2<f32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        if ![x_min, y_min, x_max, y_max].iter().all(|v| v.is_finite()) {
            return None;
        }

        let x0 = x_min.floor() as i32;
        let y0 = y_min.floor() as i32;
        let x1 = x_max.floor() as i32;
        let y1 = y_max.floor() as i32;
        Some(Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area in square pixels (zero for degenerate boxes).
    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Box shifted by a (rounded) pixel offset.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.x + dx.round() as i32,
            self.y + dy.round() as i32,
            self.width,
            self.height,
        )
    }

    /// Overlap area, or zero when the boxes do not intersect.
    pub fn intersection_area(&self, other: &Self) -> i64 {
        let x_left = self.x.max(other.x);
        let y_top = self.y.max(other.y);
        let x_right = self.right().min(other.right());
        let y_bottom = self.bottom().min(other.bottom());

        if x_right < x_left || y_bottom < y_top {
            return 0;
        }
        (x_right - x_left) as i64 * (y_bottom - y_top) as i64
    }

    /// Intersection-over-Union in `[0, 1]`.
    ///
    /// Returns `Some(0.0)` for disjoint boxes and `None` when the union area is
    /// zero (both boxes degenerate), where the ratio is undefined.
    pub fn iou(&self, other: &Self) -> Option<f64> {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return None;
        }
        Some(intersection as f64 / union as f64)
    }
}

impl From<opencv::core::Rect> for BoundingBox {
    fn from(r: opencv::core::Rect) -> Self {
        Self::new(r.x, r.y, r.width, r.height)
    }
}

impl From<BoundingBox> for opencv::core::Rect {
    fn from(b: BoundingBox) -> Self {
        opencv::core::Rect::new(b.x, b.y, b.width, b.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_iou_identity() {
        let a = BoundingBox::new(100, 100, 50, 100);
        assert_relative_eq!(a.iou(&a).unwrap(), 1.0);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(50, 50, 10, 10);
        assert_eq!(a.iou(&b), Some(0.0));
    }

    #[test]
    fn test_iou_touching_edges_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(10, 0, 10, 10);
        assert_eq!(a.iou(&b), Some(0.0));
    }

    #[test]
    fn test_iou_partial_overlap() {
        // Intersection 5x10 = 50, union 100 + 100 - 50 = 150.
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(5, 0, 10, 10);
        assert_relative_eq!(a.iou(&b).unwrap(), 50.0 / 150.0, epsilon = 1e-12);
    }

    #[test]
    fn test_iou_containment() {
        let outer = BoundingBox::new(0, 0, 20, 20);
        let inner = BoundingBox::new(5, 5, 10, 10);
        assert_relative_eq!(outer.iou(&inner).unwrap(), 100.0 / 400.0, epsilon = 1e-12);
    }

    #[test]
    fn test_iou_degenerate_union_is_none() {
        let a = BoundingBox::new(3, 3, 0, 0);
        let b = BoundingBox::new(3, 3, 0, 5);
        assert_eq!(a.iou(&b), None);
    }

    #[test]
    fn test_iou_symmetric_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = BoundingBox::new(
                rng.random_range(0..200),
                rng.random_range(0..200),
                rng.random_range(1..80),
                rng.random_range(1..80),
            );
            let b = BoundingBox::new(
                rng.random_range(0..200),
                rng.random_range(0..200),
                rng.random_range(1..80),
                rng.random_range(1..80),
            );
            let ab = a.iou(&b).unwrap();
            let ba = b.iou(&a).unwrap();
            assert_relative_eq!(ab, ba, epsilon = 1e-12);
            assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_enclosing_matches_bounding_rect_semantics() {
        let pts = [
            Point2::new(110.0f32, 50.0),
            Point2::new(130.0, 50.0),
            Point2::new(130.0, 150.0),
            Point2::new(110.0, 150.0),
        ];
        let bbox = BoundingBox::enclosing(&pts).unwrap();
        assert_eq!(bbox, BoundingBox::new(110, 50, 21, 101));

        let fractional = [Point2::new(10.7f32, 20.2), Point2::new(15.1, 29.9)];
        let bbox = BoundingBox::enclosing(&fractional).unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 20, 6, 10));
    }

    #[test]
    fn test_enclosing_rejects_empty_and_nan() {
        assert!(BoundingBox::enclosing(&[]).is_none());
        assert!(BoundingBox::enclosing(&[Point2::new(f32::NAN, 1.0)]).is_none());
    }

    #[test]
    fn test_translated_rounds_offset() {
        let b = BoundingBox::new(10, 10, 5, 5).translated(2.6, -1.4);
        assert_eq!(b, BoundingBox::new(13, 9, 5, 5));
    }
}
