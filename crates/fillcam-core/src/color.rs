//! 8-bit HSV in the OpenCV convention: hue in `0..180`, saturation and
//! value in `0..=255`.

use image::{Rgb, RgbImage};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

#[inline]
pub fn rgb_to_hsv(px: Rgb<u8>) -> Hsv {
    let [r, g, b] = px.0;
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h_deg = if delta <= 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    Hsv {
        h: ((h_deg / 2.0).round() as u32 % 180) as u8,
        s: s.round().clamp(0.0, 255.0) as u8,
        v: v as u8,
    }
}

/// Convert a whole frame; channels of the output are `[h, s, v]`.
pub fn hsv_image(img: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        let hsv = rgb_to_hsv(*src);
        *dst = Rgb([hsv.h, hsv.s, hsv.v]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_match_opencv_scale() {
        assert_eq!(rgb_to_hsv(Rgb([255, 0, 0])), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(Rgb([0, 255, 0])), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 255])), Hsv { h: 120, s: 255, v: 255 });
    }

    #[test]
    fn greys_have_no_saturation() {
        for g in [0u8, 17, 128, 255] {
            let hsv = rgb_to_hsv(Rgb([g, g, g]));
            assert_eq!(hsv.s, 0);
            assert_eq!(hsv.h, 0);
            assert_eq!(hsv.v, g);
        }
    }

    #[test]
    fn brown_is_saturated_and_mid_value() {
        let hsv = rgb_to_hsv(Rgb([150, 90, 40]));
        assert_eq!(hsv.v, 150);
        assert!(hsv.s > 150);
        assert!(hsv.h < 20);
    }
}
