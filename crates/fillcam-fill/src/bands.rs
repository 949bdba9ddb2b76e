//! Horizontal band statistics for side-view fill scans.

use image::RgbImage;

use crate::params::BandThresholds;

/// Integer pixel rectangle `(x, y, w, h)`.
pub type PixelRect = (u32, u32, u32, u32);

/// Running HSV statistics over a set of pixels.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct HsvAccumulator {
    n: u64,
    sum_s: f64,
    sum_v: f64,
    sum_h: f64,
    sum_h2: f64,
}

impl HsvAccumulator {
    #[inline]
    pub(crate) fn push(&mut self, hsv: [u8; 3]) {
        let h = hsv[0] as f64;
        self.n += 1;
        self.sum_h += h;
        self.sum_h2 += h * h;
        self.sum_s += hsv[1] as f64;
        self.sum_v += hsv[2] as f64;
    }

    pub(crate) fn over(hsv: &RgbImage, rect: PixelRect) -> Self {
        let (x, y, w, h) = rect;
        let mut acc = Self::default();
        for yy in y..y + h {
            for xx in x..x + w {
                acc.push(hsv.get_pixel(xx, yy).0);
            }
        }
        acc
    }

    pub(crate) fn mean_saturation(&self) -> f32 {
        self.mean(self.sum_s)
    }

    pub(crate) fn mean_value(&self) -> f32 {
        self.mean(self.sum_v)
    }

    pub(crate) fn hue_std(&self) -> f32 {
        if self.n == 0 {
            return 0.0;
        }
        let n = self.n as f64;
        let mean = self.sum_h / n;
        ((self.sum_h2 / n - mean * mean).max(0.0)).sqrt() as f32
    }

    fn mean(&self, sum: f64) -> f32 {
        if self.n == 0 {
            0.0
        } else {
            (sum / self.n as f64) as f32
        }
    }
}

/// Statistics and verdict for one band.
#[derive(Clone, Debug, PartialEq)]
pub struct BandStats {
    /// Top row (inclusive).
    pub y0: u32,
    /// Bottom row (exclusive).
    pub y1: u32,
    pub mean_saturation: f32,
    pub mean_value: f32,
    pub hue_std: f32,
    pub filled: bool,
}

impl BandThresholds {
    pub fn is_filled(&self, mean_saturation: f32, mean_value: f32, hue_std: f32) -> bool {
        let colored = mean_saturation > self.saturation_min && mean_value < self.value_max;
        let textured = hue_std > self.hue_std_min && mean_value < self.texture_value_max;
        colored || textured
    }
}

/// Split `rect` into `n` bands and classify each, bottom band first.
pub fn band_stats(
    hsv: &RgbImage,
    rect: PixelRect,
    n: usize,
    thresholds: &BandThresholds,
) -> Vec<BandStats> {
    let (x, y, w, h) = rect;
    let n = n.max(1);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        // Band i counted from the bottom edge.
        let y1 = y + h - ((i as u64 * h as u64) / n as u64) as u32;
        let y0 = y + h - (((i as u64 + 1) * h as u64) / n as u64) as u32;
        let acc = HsvAccumulator::over(hsv, (x, y0, w, y1 - y0));
        let (s, v, hs) = (acc.mean_saturation(), acc.mean_value(), acc.hue_std());
        out.push(BandStats {
            y0,
            y1,
            mean_saturation: s,
            mean_value: v,
            hue_std: hs,
            filled: y1 > y0 && thresholds.is_filled(s, v, hs),
        });
    }
    out
}

/// Count the contiguous run of filled bands from the bottom.
///
/// Empty bands below the first filled one are skipped; the first empty band
/// above a filled one ends the run.
pub fn count_filled(bands: &[BandStats]) -> usize {
    let mut count = 0;
    for band in bands {
        if band.filled {
            count += 1;
        } else if count > 0 {
            break;
        }
    }
    count
}
