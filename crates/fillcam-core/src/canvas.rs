//! Annotated copies of input frames for operators.
//!
//! Drawing is purely diagnostic; nothing here feeds back into measurement.

use crate::region::Region;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;

pub mod colors {
    use image::Rgb;

    pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
    pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
    pub const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
}

const TEXT_SCALE: f32 = 22.0;
const TEXT_LINE_STEP: i32 = 28;
const TEXT_MARGIN: i32 = 10;

pub struct DebugCanvas {
    image: RgbImage,
    font: Option<FontArc>,
    text_y: i32,
}

impl DebugCanvas {
    pub fn new(frame: &RgbImage) -> Self {
        Self {
            image: frame.clone(),
            font: None,
            text_y: TEXT_MARGIN,
        }
    }

    /// Enable text overlays. Without a font, [`DebugCanvas::text_line`] is a no-op.
    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Outline a region with the given stroke thickness in pixels.
    pub fn draw_region(&mut self, region: &Region, color: Rgb<u8>, thickness: u32) {
        let Some((x, y, w, h)) = region.pixel_rect(self.image.width(), self.image.height()) else {
            return;
        };
        for t in 0..thickness.max(1) {
            if w <= 2 * t || h <= 2 * t {
                break;
            }
            let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(w - 2 * t, h - 2 * t);
            draw_hollow_rect_mut(&mut self.image, rect, color);
        }
    }

    /// Draw a closed polyline through the given points.
    pub fn draw_closed_polyline(&mut self, points: &[(f32, f32)], color: Rgb<u8>) {
        if points.len() < 2 {
            return;
        }
        for (i, &start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(&mut self.image, start, end, color);
        }
    }

    pub fn draw_hline(&mut self, y: f32, x0: f32, x1: f32, color: Rgb<u8>) {
        draw_line_segment_mut(&mut self.image, (x0, y), (x1, y), color);
    }

    /// Blend a translucent colour over a region.
    pub fn tint_region(&mut self, region: &Region, color: Rgb<u8>, alpha: f32) {
        let Some((x, y, w, h)) = region.pixel_rect(self.image.width(), self.image.height()) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        for yy in y..y + h {
            for xx in x..x + w {
                let px = self.image.get_pixel_mut(xx, yy);
                for c in 0..3 {
                    let blended = (1.0 - a) * px.0[c] as f32 + a * color.0[c] as f32;
                    px.0[c] = blended.round() as u8;
                }
            }
        }
    }

    /// Append one line of text in the top-left corner.
    pub fn text_line(&mut self, text: &str, color: Rgb<u8>) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        draw_text_mut(
            &mut self.image,
            color,
            TEXT_MARGIN,
            self.text_y,
            PxScale::from(TEXT_SCALE),
            font,
            text,
        );
        self.text_y += TEXT_LINE_STEP;
    }
}
