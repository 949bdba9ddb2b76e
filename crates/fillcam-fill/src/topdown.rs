//! Top-down view: ingredient area over container area.

use image::RgbImage;

use crate::bands::PixelRect;

/// Fraction of pixels in `rect` whose HSV value is at or below `value_max`.
pub fn mask_fraction(hsv: &RgbImage, rect: PixelRect, value_max: u8) -> f32 {
    let (x, y, w, h) = rect;
    let total = w as u64 * h as u64;
    if total == 0 {
        return 0.0;
    }
    let mut hits = 0u64;
    for yy in y..y + h {
        for xx in x..x + w {
            if hsv.get_pixel(xx, yy).0[2] <= value_max {
                hits += 1;
            }
        }
    }
    (hits as f64 / total as f64) as f32
}
