use serde::{Deserialize, Serialize};

/// Pixel statistics backing a fill estimate, kept for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FillEvidence {
    /// Mean HSV saturation over the scanned area (0..255).
    pub mean_saturation: f32,
    /// Mean HSV value over the scanned area (0..255).
    pub mean_value: f32,
    /// Standard deviation of hue over the scanned area (OpenCV 0..180 scale).
    pub hue_std: f32,
    /// Fraction of edge pixels in the scanned area.
    pub edge_density: f32,
}

/// How full a detected container is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    /// Occupied fraction of the container height or area, in `[0, 1]`.
    pub fill_fraction: f32,
    /// Height of the ingredient column in pixels; the calibration input.
    ///
    /// Always `fill_fraction * scan_height_px`.
    pub pixel_height: f32,
    /// Height in pixels of the area the estimator scanned.
    pub scan_height_px: f32,
    pub evidence: FillEvidence,
}

impl FillResult {
    pub fn new(fill_fraction: f32, scan_height_px: f32, evidence: FillEvidence) -> Self {
        let fill_fraction = if fill_fraction.is_finite() {
            fill_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let scan_height_px = scan_height_px.max(0.0);
        Self {
            fill_fraction,
            pixel_height: fill_fraction * scan_height_px,
            scan_height_px,
            evidence,
        }
    }

    /// Result for a region with nothing to scan.
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, FillEvidence::default())
    }

    /// Fill as an integer percentage.
    pub fn percentage(&self) -> u32 {
        (self.fill_fraction * 100.0).round() as u32
    }
}
