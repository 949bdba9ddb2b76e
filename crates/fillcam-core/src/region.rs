use crate::container::ToolClass;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixels, `x1 < x2`, `y1 < y2`.
///
/// Coordinates are exclusive at the far edge: a one-pixel box at `(3, 4)`
/// is `Region { x1: 3.0, y1: 4.0, x2: 4.0, y2: 5.0 }`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Region {
    /// Build a region, returning `None` unless it has positive extent.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
        (finite && x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Width over height.
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width() / self.height()
    }

    pub fn iou(&self, other: &Region) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Shrink by a fraction of width/height on every side.
    pub fn inset(&self, frac: f32) -> Option<Region> {
        let dx = self.width() * frac;
        let dy = self.height() * frac;
        Region::new(self.x1 + dx, self.y1 + dy, self.x2 - dx, self.y2 - dy)
    }

    /// Integer pixel rectangle `(x, y, w, h)` clipped to an image of the
    /// given size. `None` when nothing of the region is inside the image.
    pub fn pixel_rect(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = |v: f32, hi: u32| v.round().clamp(0.0, hi as f32) as u32;
        let x0 = clip(self.x1, image_width);
        let y0 = clip(self.y1, image_height);
        let x1 = clip(self.x2, image_width);
        let y1 = clip(self.y2, image_height);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1 - x0, y1 - y0))
    }
}

/// A located, classified measuring tool in one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub region: Region,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub class: ToolClass,
    /// Strategy-specific label (`"spoon"`, a model class name, ...).
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_rejects_empty_and_inverted() {
        assert!(Region::new(0.0, 0.0, 0.0, 5.0).is_none());
        assert!(Region::new(4.0, 0.0, 2.0, 5.0).is_none());
        assert!(Region::new(0.0, 0.0, f32::NAN, 5.0).is_none());
        assert!(Region::new(0.0, 0.0, 1.0, 1.0).is_some());
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = Region::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Region::new(5.0, 0.0, 15.0, 10.0).unwrap();
        assert_relative_eq!(a.iou(&b), 50.0 / 150.0, epsilon = 1e-6);
        assert_relative_eq!(a.iou(&a), 1.0);
        let far = Region::new(100.0, 100.0, 110.0, 110.0).unwrap();
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn pixel_rect_clips_to_image() {
        let r = Region::new(-5.0, 10.0, 30.0, 200.0).unwrap();
        assert_eq!(r.pixel_rect(20, 100), Some((0, 10, 20, 90)));

        let outside = Region::new(50.0, 50.0, 60.0, 60.0).unwrap();
        assert_eq!(outside.pixel_rect(20, 20), None);
    }

    #[test]
    fn inset_shrinks_symmetrically() {
        let r = Region::new(0.0, 0.0, 100.0, 50.0).unwrap();
        let i = r.inset(0.1).unwrap();
        assert_relative_eq!(i.x1, 10.0);
        assert_relative_eq!(i.y2, 45.0);
        assert!(r.inset(0.5).is_none());
    }
}
