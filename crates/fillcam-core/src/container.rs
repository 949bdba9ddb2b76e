//! Physical description of measuring tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse tool family a detector can tell apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    /// Elongated tools: teaspoons, tablespoons.
    Spoon,
    /// Compact open vessels: measuring cups, bowls.
    Cup,
}

impl ToolClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolClass::Spoon => "spoon",
            ToolClass::Cup => "cup",
        }
    }
}

impl fmt::Display for ToolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape primitive used for partial-fill volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerShape {
    /// Constant cross-section; volume is linear in fill height.
    Cylinder,
    /// Rounded bowl; partial fill is a spherical cap.
    Hemisphere,
}

/// Static geometry of one tool type.
///
/// Dimensions are centimeters, capacity is milliliters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Unique key, e.g. `"teaspoon"`.
    pub type_id: String,
    pub class: ToolClass,
    pub shape: ContainerShape,
    pub height_cm: f64,
    pub diameter_cm: f64,
    pub reference_volume_ml: f64,
}

impl ContainerSpec {
    pub fn new(
        type_id: impl Into<String>,
        class: ToolClass,
        shape: ContainerShape,
        height_cm: f64,
        diameter_cm: f64,
        reference_volume_ml: f64,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            class,
            shape,
            height_cm,
            diameter_cm,
            reference_volume_ml,
        }
    }

    /// Radius of the opening in centimeters.
    #[inline]
    pub fn radius_cm(&self) -> f64 {
        0.5 * self.diameter_cm
    }

    /// Check the positivity invariants; returns the name of the first
    /// offending field.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.type_id.trim().is_empty() {
            return Err("type_id");
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.height_cm) {
            return Err("height_cm");
        }
        if !positive(self.diameter_cm) {
            return Err("diameter_cm");
        }
        if !positive(self.reference_volume_ml) {
            return Err("reference_volume_ml");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_rejects_non_positive_dimensions() {
        let mut spec = ContainerSpec::new(
            "cup",
            ToolClass::Cup,
            ContainerShape::Cylinder,
            8.0,
            7.0,
            250.0,
        );
        assert!(spec.check().is_ok());

        spec.diameter_cm = 0.0;
        assert_eq!(spec.check(), Err("diameter_cm"));

        spec.diameter_cm = 7.0;
        spec.reference_volume_ml = f64::NAN;
        assert_eq!(spec.check(), Err("reference_volume_ml"));
    }

    #[test]
    fn shapes_serialize_snake_case() {
        let json = serde_json::to_string(&ContainerShape::Hemisphere).unwrap();
        assert_eq!(json, "\"hemisphere\"");
        let class: ToolClass = serde_json::from_str("\"spoon\"").unwrap();
        assert_eq!(class, ToolClass::Spoon);
    }
}
