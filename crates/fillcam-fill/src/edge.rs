//! Edge-contour fallback: the top of the largest edge structure is the
//! fill line.

use image::{GrayImage, RgbImage};
use imageproc::contours::find_contours;
use imageproc::edges::canny;

use crate::bands::PixelRect;
use crate::params::EdgeFallbackParams;

/// Canny edge map of a sub-rectangle of the frame.
pub fn edge_map(frame: &RgbImage, rect: PixelRect, params: &EdgeFallbackParams) -> GrayImage {
    let (x, y, w, h) = rect;
    let crop = image::imageops::crop_imm(frame, x, y, w, h).to_image();
    let gray = image::imageops::grayscale(&crop);
    canny(&gray, params.canny_low, params.canny_high)
}

/// Fraction of non-zero pixels in an edge map.
pub fn edge_density(edges: &GrayImage) -> f32 {
    let total = edges.width() as u64 * edges.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let hits = edges.pixels().filter(|p| p.0[0] > 0).count() as u64;
    (hits as f64 / total as f64) as f32
}

/// Topmost row (in `edges` coordinates) of the contour with the largest
/// bounding box, or `None` when the edge map is empty.
pub fn fill_line_row(edges: &GrayImage) -> Option<u32> {
    let contours = find_contours::<i32>(edges);
    let mut best: Option<(i64, i32)> = None;
    for c in &contours {
        let Some(first) = c.points.first() else {
            continue;
        };
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &c.points {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        let area = (x1 - x0 + 1) as i64 * (y1 - y0 + 1) as i64;
        if best.is_none_or(|(a, _)| area > a) {
            best = Some((area, y0));
        }
    }
    best.map(|(_, top)| top.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn blank_crop_has_no_line() {
        let frame = RgbImage::from_pixel(60, 60, Rgb([250, 250, 250]));
        let edges = edge_map(&frame, (10, 10, 40, 40), &EdgeFallbackParams::default());
        assert_eq!(edges.dimensions(), (40, 40));
        assert_eq!(edge_density(&edges), 0.0);
        assert_eq!(fill_line_row(&edges), None);
    }

    #[test]
    fn largest_contour_top_row() {
        let mut edges = GrayImage::new(50, 50);
        // Small blob near the top, large rectangle outline lower down.
        edges.put_pixel(5, 2, Luma([255]));
        for x in 10..40 {
            edges.put_pixel(x, 20, Luma([255]));
            edges.put_pixel(x, 45, Luma([255]));
        }
        for y in 20..=45 {
            edges.put_pixel(10, y, Luma([255]));
            edges.put_pixel(39, y, Luma([255]));
        }
        assert_eq!(fill_line_row(&edges), Some(20));
    }

    #[test]
    fn horizontal_step_yields_edges() {
        let frame = RgbImage::from_fn(40, 40, |_, y| {
            if y >= 20 {
                Rgb([30, 30, 30])
            } else {
                Rgb([240, 240, 240])
            }
        });
        let edges = edge_map(&frame, (0, 0, 40, 40), &EdgeFallbackParams::default());
        assert!(edge_density(&edges) > 0.0);
        let row = fill_line_row(&edges).unwrap();
        assert!((18..=21).contains(&row));
    }
}
