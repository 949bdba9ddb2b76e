//! Classical detector: adaptive threshold, morphology, contour shape scoring.

use fillcam_core::{colors, DebugCanvas, Detection, ToolClass};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, open};

use crate::detector::DetectionReport;
use crate::params::ContourDetectorParams;
use crate::shape::ShapeMetrics;
use crate::DetectError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A scored contour before the confidence cut.
#[derive(Clone, Debug)]
pub struct ContourCandidate {
    pub metrics: ShapeMetrics,
    /// Heuristic score in `[0, 100]`.
    pub score: f32,
    pub class: ToolClass,
}

impl ContourCandidate {
    fn to_detection(&self) -> Detection {
        Detection {
            region: self.metrics.bbox,
            confidence: self.score / 100.0,
            class: self.class,
            label: self.class.as_str().to_string(),
        }
    }
}

/// Detects measuring tools from their outline alone.
#[derive(Clone, Debug)]
pub struct ContourDetector {
    params: ContourDetectorParams,
}

impl ContourDetector {
    pub fn new(params: ContourDetectorParams) -> Result<Self, DetectError> {
        params.check().map_err(DetectError::InvalidParams)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ContourDetectorParams {
        &self.params
    }

    /// Foreground mask: dark structure against its local neighbourhood.
    pub fn binarize(&self, frame: &RgbImage) -> GrayImage {
        let p = &self.params;
        let gray = image::imageops::grayscale(frame);
        let blurred = gaussian_blur_f32(&gray, p.blur_sigma);
        let binary = adaptive_threshold_inv(&blurred, p.block_radius, p.threshold_offset);
        if p.morph_radius == 0 {
            return binary;
        }
        let closed = close(&binary, Norm::LInf, p.morph_radius);
        open(&closed, Norm::LInf, p.morph_radius)
    }

    /// Score every external contour of the frame.
    pub fn candidates(&self, frame: &RgbImage) -> Vec<ContourCandidate> {
        let binary = self.binarize(frame);
        let contours = find_contours::<i32>(&binary);
        let mut out = Vec::new();
        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        {
            let Some(metrics) = ShapeMetrics::from_contour(&contour.points) else {
                continue;
            };
            if metrics.area < self.params.min_area as f64 {
                continue;
            }
            let score = self.score(&metrics);
            let class = if metrics.elongation > self.params.spoon_elongation as f64 {
                ToolClass::Spoon
            } else {
                ToolClass::Cup
            };
            out.push(ContourCandidate {
                metrics,
                score,
                class,
            });
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        out
    }

    /// Elongation, convexity and non-circularity blended into `[0, 100]`.
    pub fn score(&self, m: &ShapeMetrics) -> f32 {
        let p = &self.params;
        let w = &p.weights;
        let elong = ((m.elongation as f32 - 1.0) / (p.elongation_cap - 1.0)).clamp(0.0, 1.0);
        let convexity = (m.convexity as f32).clamp(0.0, 1.0);
        let non_circ = (1.0 - m.circularity as f32).clamp(0.0, 1.0);
        let total = w.elongation + w.convexity + w.non_circularity;
        if total <= 0.0 {
            return 0.0;
        }
        100.0 * (w.elongation * elong + w.convexity * convexity + w.non_circularity * non_circ)
            / total
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &RgbImage) -> DetectionReport {
        let candidates = self.candidates(frame);
        let mut canvas = DebugCanvas::new(frame);
        for c in &candidates {
            canvas.draw_closed_polyline(&c.metrics.min_rect_polyline(), colors::BLUE);
        }

        let detections: Vec<Detection> = candidates
            .iter()
            .filter(|c| c.score / 100.0 >= self.params.min_confidence)
            .map(ContourCandidate::to_detection)
            .collect();
        if let Some(best) = detections.first() {
            canvas.draw_region(&best.region, colors::RED, 2);
        }
        log::debug!(
            "contour detector: {} candidate(s), {} above confidence {:.2}",
            candidates.len(),
            detections.len(),
            self.params.min_confidence
        );

        DetectionReport {
            detections,
            candidates: candidates.len(),
            debug_image: canvas.into_image(),
        }
    }
}

/// Inverted adaptive threshold with a Gaussian-weighted local mean.
///
/// A pixel becomes 255 when it is at least `offset` below the mean of its
/// `(2r + 1)²` neighbourhood, else 0.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, offset: f32) -> GrayImage {
    // Kernel sigma for a block of size k, as used for Gaussian adaptive thresholds.
    let k = (2 * block_radius + 1) as f32;
    let sigma = 0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = gaussian_blur_f32(gray, sigma);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0] as f32;
        let m = mean.get_pixel(x, y).0[0] as f32;
        if v <= m - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
