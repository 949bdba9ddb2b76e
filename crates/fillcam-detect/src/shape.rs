//! Shape descriptors of a traced contour.

use fillcam_core::Region;
use imageproc::geometry::{arc_length, convex_hull, min_area_rect};
use imageproc::point::Point;

/// Polygon area by the shoelace formula (absolute value).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (acc * 0.5).abs()
}

/// Axis-aligned bounding box of a contour, far edge exclusive.
pub fn bounding_region(points: &[Point<i32>]) -> Option<Region> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Region::new(x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32)
}

/// Geometry of one candidate contour.
#[derive(Clone, Debug)]
pub struct ShapeMetrics {
    pub area: f64,
    pub perimeter: f64,
    /// Long side over short side of the minimum-area rectangle, `>= 1`.
    pub elongation: f64,
    /// Contour area over convex hull area, in `[0, 1]`.
    pub convexity: f64,
    /// `4πA / P²`: 1 for a disc, towards 0 for thin or ragged shapes.
    pub circularity: f64,
    pub min_rect: [Point<i32>; 4],
    pub bbox: Region,
}

impl ShapeMetrics {
    /// Measure a closed contour. `None` for degenerate (zero-area) input.
    pub fn from_contour(points: &[Point<i32>]) -> Option<Self> {
        let area = polygon_area(points);
        if area <= 0.0 {
            return None;
        }
        let bbox = bounding_region(points)?;
        let perimeter = arc_length(points, true);

        let hull = convex_hull(points);
        let hull_area = polygon_area(&hull);
        let convexity = if hull_area > 0.0 {
            (area / hull_area).min(1.0)
        } else {
            0.0
        };

        let min_rect = min_area_rect(points);
        let side = |a: Point<i32>, b: Point<i32>| {
            let dx = (a.x - b.x) as f64;
            let dy = (a.y - b.y) as f64;
            (dx * dx + dy * dy).sqrt()
        };
        let s0 = side(min_rect[0], min_rect[1]);
        let s1 = side(min_rect[1], min_rect[2]);
        let elongation = s0.max(s1) / s0.min(s1).max(1.0);

        let circularity = if perimeter > 0.0 {
            (4.0 * std::f64::consts::PI * area / (perimeter * perimeter)).min(1.0)
        } else {
            0.0
        };

        Some(Self {
            area,
            perimeter,
            elongation: elongation.max(1.0),
            convexity,
            circularity,
            min_rect,
            bbox,
        })
    }

    pub fn min_rect_polyline(&self) -> [(f32, f32); 4] {
        self.min_rect.map(|p| (p.x as f32, p.y as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in x0..x1 {
            pts.push(Point::new(x, y0));
        }
        for y in y0..y1 {
            pts.push(Point::new(x1, y));
        }
        for x in (x0 + 1..=x1).rev() {
            pts.push(Point::new(x, y1));
        }
        for y in (y0 + 1..=y1).rev() {
            pts.push(Point::new(x0, y));
        }
        pts
    }

    #[test]
    fn shoelace_of_axis_aligned_square() {
        let sq = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_relative_eq!(polygon_area(&sq), 100.0);
        assert_eq!(polygon_area(&sq[..2]), 0.0);
    }

    #[test]
    fn elongated_rectangle_is_convex_and_not_circular() {
        let pts = rect_outline(0, 0, 20, 80);
        let m = ShapeMetrics::from_contour(&pts).unwrap();
        assert_relative_eq!(m.area, 1600.0);
        assert_relative_eq!(m.elongation, 4.0, epsilon = 1e-6);
        assert_relative_eq!(m.convexity, 1.0, epsilon = 1e-6);
        assert!(m.circularity < 0.7);
        assert_eq!(m.bbox, Region::new(0.0, 0.0, 21.0, 81.0).unwrap());
    }

    #[test]
    fn square_has_unit_elongation() {
        let pts = rect_outline(5, 5, 45, 45);
        let m = ShapeMetrics::from_contour(&pts).unwrap();
        assert_relative_eq!(m.elongation, 1.0, epsilon = 1e-6);
        assert!(m.circularity > 0.7);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let pts: Vec<_> = (0..10).map(|x| Point::new(x, 3)).collect();
        assert!(ShapeMetrics::from_contour(&pts).is_none());
    }
}
