use fillcam_core::{colors, hsv_image, DebugCanvas, FillEvidence, FillResult, Region, ToolClass};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::bands::{band_stats, count_filled, BandStats, HsvAccumulator, PixelRect};
use crate::edge::{edge_density, edge_map, fill_line_row};
use crate::params::{FillParams, ViewMode};
use crate::topdown::mask_fraction;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum FillError {
    #[error("invalid fill parameters: {0}")]
    InvalidParams(&'static str),
}

/// Viewpoint a single estimate was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Side,
    Angled,
    Top,
}

/// Which heuristic produced the fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    BandScan,
    TopDownMask,
    EdgeContour,
    /// Region had no pixels inside the frame.
    Degenerate,
}

/// A fill result plus what it was derived from.
#[derive(Clone, Debug)]
pub struct FillEstimate {
    pub result: FillResult,
    pub view: View,
    pub method: FillMethod,
    /// Fraction before snapping.
    pub raw_fraction: f32,
    /// Scanned region (bowl part for spoons when configured).
    pub scan_region: Option<Region>,
    /// Per-band verdicts, bottom first. Empty unless a band scan ran.
    pub bands: Vec<BandStats>,
    /// Absolute fill line row found by the edge fallback.
    pub fill_line_y: Option<f32>,
}

impl FillEstimate {
    fn degenerate(view: View) -> Self {
        Self {
            result: FillResult::empty(),
            view,
            method: FillMethod::Degenerate,
            raw_fraction: 0.0,
            scan_region: None,
            bands: Vec::new(),
            fill_line_y: None,
        }
    }
}

/// Estimates how full a detected container is from pixel content.
#[derive(Clone, Debug, Default)]
pub struct FillEstimator {
    params: FillParams,
}

impl FillEstimator {
    pub fn new(params: FillParams) -> Result<Self, FillError> {
        params.check().map_err(FillError::InvalidParams)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &FillParams {
        &self.params
    }

    /// Viewpoint for a region under the configured [`ViewMode`].
    pub fn classify_view(&self, region: &Region) -> View {
        match self.params.view_mode {
            ViewMode::Side => View::Side,
            ViewMode::Top => View::Top,
            ViewMode::Auto => {
                let aspect = region.aspect();
                let [lo, hi] = self.params.view.top_aspect;
                if (lo..=hi).contains(&aspect) {
                    View::Top
                } else if aspect > self.params.view.side_aspect_min {
                    View::Side
                } else {
                    View::Angled
                }
            }
        }
    }

    /// Region actually scanned: the lower bowl part of spoons when configured.
    pub fn scan_region(&self, region: &Region, class: ToolClass) -> Region {
        match (class, self.params.spoon_bowl_fraction) {
            (ToolClass::Spoon, Some(frac)) if region.height() > region.width() => {
                let top = region.y2 - region.height() * frac;
                Region::new(region.x1, top, region.x2, region.y2).unwrap_or(*region)
            }
            _ => *region,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(class = %class))
    )]
    pub fn estimate(&self, frame: &RgbImage, region: &Region, class: ToolClass) -> FillEstimate {
        let view = self.classify_view(region);
        let scan = self.scan_region(region, class);
        let Some(rect) = scan.pixel_rect(frame.width(), frame.height()) else {
            log::debug!("fill: region {region:?} is outside the frame");
            return FillEstimate::degenerate(view);
        };
        let (x, y, w, h) = rect;
        let crop = image::imageops::crop_imm(frame, x, y, w, h).to_image();
        let hsv = hsv_image(&crop);
        let local: PixelRect = (0, 0, w, h);

        let acc = HsvAccumulator::over(&hsv, local);
        let edges = edge_map(frame, rect, &self.params.edge);
        let evidence = FillEvidence {
            mean_saturation: acc.mean_saturation(),
            mean_value: acc.mean_value(),
            hue_std: acc.hue_std(),
            edge_density: edge_density(&edges),
        };

        let mut bands = Vec::new();
        let mut fill_line_y = None;
        let (raw, method) = if view == View::Top {
            (
                mask_fraction(&hsv, local, self.params.topdown_value_max),
                FillMethod::TopDownMask,
            )
        } else {
            bands = band_stats(&hsv, local, self.params.bands, &self.params.band)
                .into_iter()
                .map(|mut b| {
                    b.y0 += y;
                    b.y1 += y;
                    b
                })
                .collect();
            let filled = count_filled(&bands);
            if filled == 0 && self.params.edge.enabled {
                match self.edge_fraction(frame, &scan) {
                    Some((frac, line)) => {
                        fill_line_y = Some(line);
                        (frac, FillMethod::EdgeContour)
                    }
                    None => (0.0, FillMethod::BandScan),
                }
            } else {
                (filled as f32 / bands.len() as f32, FillMethod::BandScan)
            }
        };

        let fraction = self.params.snap(raw);
        log::debug!(
            "fill: view {view:?}, {method:?}, raw {raw:.3} -> {fraction:.2} over {h} px"
        );
        FillEstimate {
            result: FillResult::new(fraction, h as f32, evidence),
            view,
            method,
            raw_fraction: raw,
            scan_region: Some(scan),
            bands,
            fill_line_y,
        }
    }

    /// Fill line from the largest edge contour inside an inset of `scan`.
    fn edge_fraction(&self, frame: &RgbImage, scan: &Region) -> Option<(f32, f32)> {
        let inner = scan.inset(self.params.edge.inset)?;
        let rect = inner.pixel_rect(frame.width(), frame.height())?;
        let edges = edge_map(frame, rect, &self.params.edge);
        let row = fill_line_row(&edges)?;
        let line_y = (rect.1 + row) as f32;
        let frac = 1.0 - (line_y - scan.y1) / scan.height();
        log::debug!("fill: edge fallback line at y={line_y}");
        Some((frac.clamp(0.0, 1.0), line_y))
    }

    /// Overlay band verdicts or the detected fill line.
    pub fn annotate(&self, canvas: &mut DebugCanvas, estimate: &FillEstimate) {
        let Some(scan) = estimate.scan_region else {
            return;
        };
        for band in &estimate.bands {
            let Some(r) = Region::new(scan.x1, band.y0 as f32, scan.x2, band.y1 as f32) else {
                continue;
            };
            let color = if band.filled { colors::GREEN } else { colors::RED };
            canvas.tint_region(&r, color, 0.25);
            canvas.draw_hline(band.y0 as f32, scan.x1, scan.x2 - 1.0, colors::YELLOW);
        }
        if let Some(line) = estimate.fill_line_y {
            canvas.draw_hline(line, scan.x1, scan.x2 - 1.0, colors::MAGENTA);
        }
        if estimate.method == FillMethod::TopDownMask {
            canvas.draw_region(&scan, colors::MAGENTA, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([250, 250, 250]);
    const BROWN: Rgb<u8> = Rgb([150, 90, 40]);

    fn paint(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, c: Rgb<u8>) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, c);
            }
        }
    }

    fn region(x1: f32, y1: f32, x2: f32, y2: f32) -> Region {
        Region::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn half_filled_side_view() {
        let mut img = RgbImage::from_pixel(200, 200, WHITE);
        paint(&mut img, 50, 100, 150, 150, BROWN);
        let est = FillEstimator::default().estimate(&img, &region(50.0, 50.0, 150.0, 150.0), ToolClass::Cup);
        assert_eq!(est.method, FillMethod::BandScan);
        assert_eq!(est.view, View::Side);
        assert_relative_eq!(est.result.fill_fraction, 0.5);
        assert_relative_eq!(est.result.pixel_height, 50.0);
        assert_relative_eq!(est.result.scan_height_px, 100.0);
        assert_eq!(est.bands.len(), 10);
        assert!(est.result.evidence.mean_saturation > 0.0);
    }

    #[test]
    fn nearly_full_snaps_to_one_and_sliver_to_zero() {
        let mut img = RgbImage::from_pixel(100, 100, WHITE);
        paint(&mut img, 0, 10, 100, 100, BROWN);
        let est = FillEstimator::default().estimate(&img, &region(0.0, 0.0, 100.0, 100.0), ToolClass::Cup);
        assert_relative_eq!(est.raw_fraction, 0.9);
        assert_eq!(est.result.fill_fraction, 1.0);

        let mut img = RgbImage::from_pixel(100, 100, WHITE);
        paint(&mut img, 0, 90, 100, 100, BROWN);
        let est = FillEstimator::default().estimate(&img, &region(0.0, 0.0, 100.0, 100.0), ToolClass::Cup);
        assert_eq!(est.result.fill_fraction, 0.0);
    }

    #[test]
    fn degenerate_region_is_zero() {
        let img = RgbImage::from_pixel(50, 50, WHITE);
        let est = FillEstimator::default().estimate(&img, &region(60.0, 60.0, 80.0, 80.0), ToolClass::Cup);
        assert_eq!(est.method, FillMethod::Degenerate);
        assert_eq!(est.result.fill_fraction, 0.0);
        assert_eq!(est.result.pixel_height, 0.0);
    }

    #[test]
    fn edge_fallback_finds_unsaturated_fill_line() {
        // Grey ingredient: neither saturated nor textured.
        let mut img = RgbImage::from_pixel(200, 200, WHITE);
        paint(&mut img, 0, 120, 200, 200, Rgb([90, 90, 90]));
        let est = FillEstimator::default().estimate(&img, &region(0.0, 0.0, 200.0, 200.0), ToolClass::Cup);
        assert_eq!(est.method, FillMethod::EdgeContour);
        let line = est.fill_line_y.unwrap();
        assert!((117.0..=122.0).contains(&line), "line at {line}");
        assert!((est.raw_fraction - 0.4).abs() < 0.02);
    }

    #[test]
    fn auto_view_uses_mask_for_square_regions() {
        let mut img = RgbImage::from_pixel(100, 100, WHITE);
        paint(&mut img, 0, 0, 100, 60, BROWN);
        let est = FillEstimator::new(FillParams {
            view_mode: ViewMode::Auto,
            ..FillParams::default()
        })
        .unwrap()
        .estimate(&img, &region(0.0, 0.0, 100.0, 100.0), ToolClass::Cup);
        assert_eq!(est.view, View::Top);
        assert_eq!(est.method, FillMethod::TopDownMask);
        assert_relative_eq!(est.result.fill_fraction, 0.6);
    }

    #[test]
    fn spoon_bowl_restricts_scan() {
        let est = FillEstimator::new(FillParams {
            spoon_bowl_fraction: Some(0.4),
            ..FillParams::default()
        })
        .unwrap();
        let r = region(10.0, 0.0, 40.0, 100.0);
        let scan = est.scan_region(&r, ToolClass::Spoon);
        assert_relative_eq!(scan.y1, 60.0);
        assert_eq!(est.scan_region(&r, ToolClass::Cup), r);
    }

    #[test]
    fn annotate_tints_bands() {
        let mut img = RgbImage::from_pixel(100, 100, WHITE);
        paint(&mut img, 0, 50, 100, 100, BROWN);
        let estimator = FillEstimator::default();
        let est = estimator.estimate(&img, &region(0.0, 0.0, 100.0, 100.0), ToolClass::Cup);
        let mut canvas = DebugCanvas::new(&img);
        estimator.annotate(&mut canvas, &est);
        let top = canvas.image().get_pixel(50, 25).0;
        assert!(top[0] > top[1], "empty band is tinted red: {top:?}");
    }
}
