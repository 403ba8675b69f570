//! Conversion of a light-bar pair into the plate's ordered image quadrilateral.

use nalgebra::Point2;

use crate::detection::light_bar::LightBar;
use crate::detection::pairing::ArmorPair;
use crate::geometry::BoundingBox;

/// Plate corners in image space: left-top, right-top, right-bottom, left-bottom.
pub type ArmorCorners = [Point2<f32>; 4];

/// One frame's plate hypothesis, the tracker's input unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub corners: ArmorCorners,
}

impl Detection {
    /// Detection whose box encloses the given corners.
    pub fn from_corners(corners: ArmorCorners) -> Option<Self> {
        let bbox = BoundingBox::enclosing(&corners)?;
        Some(Self { bbox, corners })
    }
}

/// The two vertices of `bar` on the requested side of its center, top first.
/// `None` unless exactly two vertices qualify.
fn inner_edge(bar: &LightBar, facing_right: bool) -> Option<[Point2<f32>; 2]> {
    let mut picked = bar.vertices().into_iter().filter(|p| {
        if facing_right {
            p.x > bar.center.x
        } else {
            p.x < bar.center.x
        }
    });
    let (a, b) = (picked.next()?, picked.next()?);
    if picked.next().is_some() {
        return None;
    }
    if b.y < a.y { Some([b, a]) } else { Some([a, b]) }
}

/// Resolve the ordered corners of a pair: the left bar contributes the two
/// vertices right of its center, the right bar the two left of its center.
///
/// Returns `None` for degenerate bars (e.g. rotated so a vertex sits on the
/// center column), which must not become detections.
pub fn resolve_corners(pair: &ArmorPair) -> Option<ArmorCorners> {
    let [left_top, left_bottom] = inner_edge(&pair.left, true)?;
    let [right_top, right_bottom] = inner_edge(&pair.right, false)?;
    Some([left_top, right_top, right_bottom, left_bottom])
}

/// Corners plus enclosing box; `None` when the corners cannot be resolved.
pub fn resolve_detection(pair: &ArmorPair) -> Option<Detection> {
    Detection::from_corners(resolve_corners(pair)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_bar(x: f32) -> LightBar {
        LightBar::new(Point2::new(x, 100.0), 20.0, 100.0, 0.0)
    }

    fn assert_near(p: &Point2<f32>, x: f32, y: f32) {
        assert!((p.x - x).abs() < 1.0 && (p.y - y).abs() < 1.0, "{:?} vs ({}, {})", p, x, y);
    }

    #[test]
    fn test_vertical_pair_corner_order() {
        let pair = ArmorPair::ordered(vertical_bar(100.0), vertical_bar(140.0));
        let corners = resolve_corners(&pair).unwrap();
        assert_near(&corners[0], 110.0, 50.0);
        assert_near(&corners[1], 130.0, 50.0);
        assert_near(&corners[2], 130.0, 150.0);
        assert_near(&corners[3], 110.0, 150.0);
    }

    #[test]
    fn test_swapped_opencv_convention() {
        // minAreaRect may report a vertical bar as width=long, angle=90.
        let left = LightBar::new(Point2::new(100.0, 100.0), 100.0, 20.0, 90.0);
        let right = LightBar::new(Point2::new(140.0, 100.0), 100.0, 20.0, 90.0);
        let corners = resolve_corners(&ArmorPair::ordered(left, right)).unwrap();
        assert_near(&corners[0], 110.0, 50.0);
        assert_near(&corners[1], 130.0, 50.0);
        assert_near(&corners[2], 130.0, 150.0);
        assert_near(&corners[3], 110.0, 150.0);
    }

    #[test]
    fn test_tilted_pair() {
        let left = LightBar::new(Point2::new(100.0, 100.0), 10.0, 80.0, 10.0);
        let right = LightBar::new(Point2::new(180.0, 100.0), 10.0, 80.0, 10.0);
        let corners = resolve_corners(&ArmorPair::ordered(left, right)).unwrap();
        // Top corners above bottom corners, left corners left of right ones.
        assert!(corners[0].y < corners[3].y);
        assert!(corners[1].y < corners[2].y);
        assert!(corners[0].x < corners[1].x);
        assert!(corners[3].x < corners[2].x);
    }

    #[test]
    fn test_degenerate_bar_rejected() {
        // Zero-width bar: every vertex sits on the center column.
        let line = LightBar::new(Point2::new(100.0, 100.0), 0.0, 80.0, 0.0);
        let pair = ArmorPair::ordered(line, vertical_bar(160.0));
        assert!(resolve_corners(&pair).is_none());

        let pair = ArmorPair::ordered(vertical_bar(40.0), line);
        assert!(resolve_corners(&pair).is_none());

        let point = LightBar::new(Point2::new(100.0, 100.0), 0.0, 0.0, 0.0);
        let pair = ArmorPair::ordered(point, vertical_bar(160.0));
        assert!(resolve_corners(&pair).is_none());
    }

    #[test]
    fn test_detection_bbox_encloses_corners() {
        let pair = ArmorPair::ordered(vertical_bar(100.0), vertical_bar(140.0));
        let detection = resolve_detection(&pair).unwrap();
        assert_eq!(detection.bbox, BoundingBox::new(110, 50, 21, 101));
    }
}
