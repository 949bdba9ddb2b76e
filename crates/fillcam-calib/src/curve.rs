//! Quadratic pixel-height → volume curves.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// Fit degree.
pub const DEGREE: usize = 2;
/// Minimum number of samples (and distinct heights) for a fit.
pub const MIN_SAMPLES: usize = DEGREE + 1;

/// One operator-supplied ground-truth point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    /// Nominal fill level the operator set up, informational only.
    #[serde(default)]
    pub fill_level: Option<f64>,
    pub pixel_height: f64,
    #[serde(alias = "volume")]
    pub volume_ml: f64,
}

impl CalibrationSample {
    pub fn new(pixel_height: f64, volume_ml: f64) -> Self {
        Self {
            fill_level: None,
            pixel_height,
            volume_ml,
        }
    }
}

/// Fitted curve for one tool type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub tool_type: String,
    /// Polynomial coefficients, highest degree first.
    pub coefficients: Vec<f64>,
    pub min_height: f64,
    pub max_height: f64,
    pub min_volume: f64,
    pub max_volume: f64,
}

impl CalibrationCurve {
    /// Least-squares quadratic fit of volume against pixel height.
    pub fn fit(
        tool_type: impl Into<String>,
        samples: &[CalibrationSample],
    ) -> Result<Self, CalibrationError> {
        if samples.len() < MIN_SAMPLES {
            return Err(CalibrationError::TooFewSamples {
                got: samples.len(),
                min: MIN_SAMPLES,
            });
        }
        for (index, s) in samples.iter().enumerate() {
            let ok = s.pixel_height.is_finite()
                && s.volume_ml.is_finite()
                && s.pixel_height >= 0.0
                && s.volume_ml >= 0.0;
            if !ok {
                return Err(CalibrationError::NonFiniteSample { index });
            }
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.volume_ml.total_cmp(&b.volume_ml));

        let mut heights: Vec<f64> = sorted.iter().map(|s| s.pixel_height).collect();
        heights.sort_by(f64::total_cmp);
        heights.dedup_by(|a, b| (*a - *b).abs() <= 1e-9);
        if heights.len() < MIN_SAMPLES {
            return Err(CalibrationError::DegenerateHeights {
                distinct: heights.len(),
            });
        }

        // Vandermonde rows [h², h, 1].
        let n = sorted.len();
        let a = DMatrix::<f64>::from_fn(n, DEGREE + 1, |r, c| {
            sorted[r].pixel_height.powi((DEGREE - c) as i32)
        });
        let b = DVector::<f64>::from_iterator(n, sorted.iter().map(|s| s.volume_ml));
        let svd = a.svd(true, true);
        let x = svd.solve(&b, 1e-12).map_err(CalibrationError::FitFailed)?;
        if x.iter().any(|c| !c.is_finite()) {
            return Err(CalibrationError::FitFailed("non-finite coefficients"));
        }

        let (mut min_h, mut max_h) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for s in &sorted {
            min_h = min_h.min(s.pixel_height);
            max_h = max_h.max(s.pixel_height);
            min_v = min_v.min(s.volume_ml);
            max_v = max_v.max(s.volume_ml);
        }
        Ok(Self {
            tool_type: tool_type.into(),
            coefficients: x.iter().copied().collect(),
            min_height: min_h,
            max_height: max_h,
            min_volume: min_v,
            max_volume: max_v,
        })
    }

    /// Unclamped polynomial value (Horner).
    pub fn evaluate(&self, pixel_height: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, c| acc * pixel_height + c)
    }

    /// Volume at `pixel_height`, clamped to the calibrated volume range.
    pub fn volume_at(&self, pixel_height: f64) -> f64 {
        let v = self.evaluate(pixel_height);
        if v.is_nan() {
            return self.min_volume;
        }
        v.clamp(self.min_volume, self.max_volume)
    }

    /// Whether `volume` lies within the calibrated range.
    pub fn contains_volume(&self, volume: f64) -> bool {
        (self.min_volume..=self.max_volume).contains(&volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn samples(points: &[(f64, f64)]) -> Vec<CalibrationSample> {
        points
            .iter()
            .map(|&(h, v)| CalibrationSample::new(h, v))
            .collect()
    }

    #[test]
    fn recovers_exact_quadratic() {
        // v = 0.01 h² + 0.5 h + 2
        let pts: Vec<(f64, f64)> = [10.0, 30.0, 50.0, 80.0]
            .iter()
            .map(|&h| (h, 0.01 * h * h + 0.5 * h + 2.0))
            .collect();
        let c = CalibrationCurve::fit("small_cup", &samples(&pts)).unwrap();
        assert_relative_eq!(c.coefficients[0], 0.01, epsilon = 1e-9);
        assert_relative_eq!(c.coefficients[1], 0.5, epsilon = 1e-7);
        assert_relative_eq!(c.coefficients[2], 2.0, epsilon = 1e-6);
        assert_eq!(c.min_height, 10.0);
        assert_eq!(c.max_height, 80.0);
        for (h, v) in pts {
            assert_relative_eq!(c.volume_at(h), v, epsilon = 1e-6);
        }
    }

    #[test]
    fn evaluation_is_clamped_to_observed_volumes() {
        let c = CalibrationCurve::fit(
            "teaspoon",
            &samples(&[(10.0, 1.0), (20.0, 2.5), (30.0, 5.0)]),
        )
        .unwrap();
        for h in [-100.0, 0.0, 5.0, 1e6, f64::NAN] {
            let v = c.volume_at(h);
            assert!((1.0..=5.0).contains(&v), "h={h} -> {v}");
        }
        assert!(c.contains_volume(3.0));
        assert!(!c.contains_volume(5.5));
    }

    #[test]
    fn rejects_too_few_and_duplicate_heights() {
        assert!(matches!(
            CalibrationCurve::fit("x", &samples(&[(1.0, 1.0), (2.0, 2.0)])),
            Err(CalibrationError::TooFewSamples { got: 2, min: 3 })
        ));
        assert!(matches!(
            CalibrationCurve::fit("x", &samples(&[(5.0, 1.0), (5.0, 2.0), (9.0, 3.0)])),
            Err(CalibrationError::DegenerateHeights { distinct: 2 })
        ));
        assert!(matches!(
            CalibrationCurve::fit("x", &samples(&[(1.0, 1.0), (f64::NAN, 2.0), (3.0, 3.0)])),
            Err(CalibrationError::NonFiniteSample { index: 1 })
        ));
    }

    #[test]
    fn sample_json_accepts_volume_alias() {
        let s: CalibrationSample =
            serde_json::from_str(r#"{"fill_level": 0.5, "pixel_height": 42.0, "volume": 125.0}"#)
                .unwrap();
        assert_eq!(s.volume_ml, 125.0);
        assert_eq!(s.fill_level, Some(0.5));
    }
}
