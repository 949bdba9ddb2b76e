use serde::{Deserialize, Serialize};

/// Camera viewpoint assumed when estimating fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Side or angled view: band scan from the bottom up.
    #[default]
    Side,
    /// Looking down into the container: area mask.
    Top,
    /// Classify per detection from the region aspect.
    Auto,
}

/// Per-band "filled" rule. A band is filled when it is saturated and not
/// too bright, or textured (hue spread) and not too bright.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub saturation_min: f32,
    pub value_max: f32,
    pub hue_std_min: f32,
    pub texture_value_max: f32,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            saturation_min: 40.0,
            value_max: 200.0,
            hue_std_min: 25.0,
            texture_value_max: 180.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeFallbackParams {
    pub enabled: bool,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Fraction of the region trimmed on every side so walls are ignored.
    pub inset: f32,
}

impl Default for EdgeFallbackParams {
    fn default() -> Self {
        Self {
            enabled: true,
            canny_low: 50.0,
            canny_high: 150.0,
            inset: 0.1,
        }
    }
}

/// Aspect (width / height) bounds used by [`ViewMode::Auto`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewClassifier {
    pub top_aspect: [f32; 2],
    pub side_aspect_min: f32,
}

impl Default for ViewClassifier {
    fn default() -> Self {
        Self {
            top_aspect: [0.9, 1.1],
            side_aspect_min: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillParams {
    /// Number of horizontal bands in a side-view scan.
    pub bands: usize,
    pub band: BandThresholds,
    /// Top-down mask: pixels with HSV value at or below this are ingredient.
    pub topdown_value_max: u8,
    /// Fractions at or above this snap to 1.
    pub snap_high: f32,
    /// Fractions at or below this snap to 0.
    pub snap_low: f32,
    pub view_mode: ViewMode,
    pub view: ViewClassifier,
    pub edge: EdgeFallbackParams,
    /// For spoons, scan only this bottom fraction of the region (the bowl).
    pub spoon_bowl_fraction: Option<f32>,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            bands: 10,
            band: BandThresholds::default(),
            topdown_value_max: 150,
            snap_high: 0.9,
            snap_low: 0.1,
            view_mode: ViewMode::Side,
            view: ViewClassifier::default(),
            edge: EdgeFallbackParams::default(),
            spoon_bowl_fraction: None,
        }
    }
}

impl FillParams {
    pub fn check(&self) -> Result<(), &'static str> {
        if !(1..=64).contains(&self.bands) {
            return Err("bands must be in 1..=64");
        }
        if !(0.0..=1.0).contains(&self.snap_low)
            || !(0.0..=1.0).contains(&self.snap_high)
            || self.snap_low >= self.snap_high
        {
            return Err("snap thresholds must satisfy 0 <= snap_low < snap_high <= 1");
        }
        if !(0.0..0.5).contains(&self.edge.inset) {
            return Err("edge inset must be in [0, 0.5)");
        }
        if let Some(f) = self.spoon_bowl_fraction {
            if !(f > 0.0 && f <= 1.0) {
                return Err("spoon_bowl_fraction must be in (0, 1]");
            }
        }
        Ok(())
    }

    /// Snap near-empty and near-full fractions to the extremes.
    pub fn snap(&self, fraction: f32) -> f32 {
        if !fraction.is_finite() {
            return 0.0;
        }
        if fraction >= self.snap_high {
            1.0
        } else if fraction <= self.snap_low {
            0.0
        } else {
            fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapping_extremes() {
        let p = FillParams::default();
        assert_eq!(p.snap(0.93), 1.0);
        assert_eq!(p.snap(0.9), 1.0);
        assert_eq!(p.snap(0.1), 0.0);
        assert_eq!(p.snap(0.03), 0.0);
        assert_eq!(p.snap(0.5), 0.5);
        assert_eq!(p.snap(f32::NAN), 0.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let p: FillParams =
            serde_json::from_str(r#"{"bands": 20, "view_mode": "auto"}"#).unwrap();
        assert_eq!(p.bands, 20);
        assert_eq!(p.view_mode, ViewMode::Auto);
        assert_eq!(p.topdown_value_max, 150);
        assert!(p.check().is_ok());
    }

    #[test]
    fn check_rejects_inverted_snaps() {
        let p = FillParams {
            snap_low: 0.95,
            ..FillParams::default()
        };
        assert!(p.check().is_err());
    }
}
