//! Fill fraction → volume: calibration first, then geometry, then unit table.

use std::f64::consts::PI;
use std::sync::Arc;

use fillcam_calib::Calibrator;
use fillcam_core::{ContainerShape, ContainerSpec, FillResult, GeometryCatalog};
use serde::{Deserialize, Serialize};

use crate::lookup::MeasurementUnitLookup;
use crate::MeasureError;

/// Where a reported volume came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    Calibration,
    Geometry,
    MeasurementUnit,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeEstimate {
    pub volume_ml: f64,
    pub source: VolumeSource,
}

/// Volume of a spherical cap of height `h` on a sphere of radius `r`.
#[inline]
pub fn spherical_cap_cm3(r: f64, h: f64) -> f64 {
    let h = h.clamp(0.0, 2.0 * r);
    PI * h * h * (3.0 * r - h) / 3.0
}

/// Filled volume (cm³) of a hemispherical container.
///
/// Up to half full the filled part is a cap of height `height × f`; above
/// that the empty part is a cap of height `height × (1 − f)` taken off the
/// full hemisphere `(2/3)πr³`.
pub fn hemisphere_fill_cm3(spec: &ContainerSpec, fill_fraction: f64) -> f64 {
    let f = fill_fraction.clamp(0.0, 1.0);
    let r = spec.radius_cm();
    if f <= 0.5 {
        spherical_cap_cm3(r, spec.height_cm * f)
    } else {
        let full = 2.0 / 3.0 * PI * r.powi(3);
        (full - spherical_cap_cm3(r, spec.height_cm * (1.0 - f))).max(0.0)
    }
}

/// Filled volume (cm³) of a cylindrical container.
pub fn cylinder_fill_cm3(spec: &ContainerSpec, fill_fraction: f64) -> f64 {
    let r = spec.radius_cm();
    PI * r * r * spec.height_cm * fill_fraction.clamp(0.0, 1.0)
}

/// Geometric volume in ml, scaled so a full container holds its
/// reference volume.
pub fn geometric_volume_ml(spec: &ContainerSpec, fill_fraction: f64) -> f64 {
    let f = fill_fraction.clamp(0.0, 1.0);
    match spec.shape {
        ContainerShape::Cylinder => spec.reference_volume_ml * f,
        ContainerShape::Hemisphere => {
            let full = hemisphere_fill_cm3(spec, 1.0);
            if full <= 0.0 {
                return 0.0;
            }
            spec.reference_volume_ml * hemisphere_fill_cm3(spec, f) / full
        }
    }
}

/// Converts fill results to volumes for a tool type.
pub struct VolumeCalculator {
    catalog: Arc<GeometryCatalog>,
    calibrator: Arc<Calibrator>,
    units: Arc<dyn MeasurementUnitLookup>,
}

impl VolumeCalculator {
    pub fn new(
        catalog: Arc<GeometryCatalog>,
        calibrator: Arc<Calibrator>,
        units: Arc<dyn MeasurementUnitLookup>,
    ) -> Self {
        Self {
            catalog,
            calibrator,
            units,
        }
    }

    /// Volume for `tool_type` at the given fill.
    ///
    /// A calibration curve is evaluated at the implied pixel height
    /// `fill_fraction × scan_height_px`. Without one, catalog geometry is
    /// used, then a linear scale of the unit table's reference volume.
    pub fn volume(&self, tool_type: &str, fill: &FillResult) -> Result<VolumeEstimate, MeasureError> {
        let fraction = fill.fill_fraction as f64;
        let implied_height = fraction * fill.scan_height_px as f64;
        if let Ok(volume_ml) = self.calibrator.get_volume(tool_type, implied_height) {
            return Ok(VolumeEstimate {
                volume_ml,
                source: VolumeSource::Calibration,
            });
        }
        if let Some(spec) = self.catalog.get(tool_type) {
            return Ok(VolumeEstimate {
                volume_ml: geometric_volume_ml(spec, fraction),
                source: VolumeSource::Geometry,
            });
        }
        match self.units.lookup_measurement_unit(tool_type) {
            Ok(Some(unit)) => Ok(VolumeEstimate {
                volume_ml: unit.reference_volume_ml * fraction.clamp(0.0, 1.0),
                source: VolumeSource::MeasurementUnit,
            }),
            Ok(None) => Err(MeasureError::UnknownTool(tool_type.to_string())),
            Err(e) => {
                log::warn!("measurement unit lookup for {tool_type} failed: {e}");
                Err(MeasureError::UnknownTool(tool_type.to_string()))
            }
        }
    }
}
