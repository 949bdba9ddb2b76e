//! High-level facade for camera-based ingredient measurement.
//!
//! A [`MeasurementPipeline`] takes one camera frame showing a measuring
//! spoon or cup and returns a [`MeasurementResult`]: the detected tool, its
//! fill percentage, the volume (from a calibration curve, catalog geometry
//! or the unit table, in that order) and, when the ingredient is known, the
//! weight through its density.
//!
//! ## Quickstart
//!
//! ```no_run
//! use fillcam::{Frame, MeasurementConfig, MeasurementPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = MeasurementPipeline::new(MeasurementConfig::default())?;
//! let bytes = std::fs::read("cup.jpg")?;
//! let result = pipeline.process_measurement(Frame::Encoded(&bytes), "small_cup", "flour");
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Calibration
//!
//! Per tool type, capture a few frames with known volumes through
//! [`MeasurementPipeline::begin_calibration_capture`], pair each capture with
//! its volume ([`CalibrationCapture::sample`]) and hand the samples to
//! [`MeasurementPipeline::save_calibration`]. Curves persist to
//! `calibration_path` when configured.
//!
//! ## API map
//! - `fillcam::core`: regions, fill results, geometry catalog, debug canvas.
//! - `fillcam::detect`: classical contour and learned-proposal detectors.
//!   The `onnx` feature lets a learned detector load a YOLO-style model
//!   from `detector.model` in the configuration.
//! - `fillcam::fill`: band scan, top-down mask and edge fallback fill estimation.
//! - `fillcam::calib`: calibration curves and their stores.

pub use fillcam_calib as calib;
pub use fillcam_core as core;
pub use fillcam_detect as detect;
pub use fillcam_fill as fill;

mod cache;
mod config;
mod debug;
mod density;
mod error;
mod frame;
mod lookup;
mod pipeline;
mod result;
mod volume;

pub use cache::{BoundedCache, CacheParams};
pub use config::{DebugConfig, MeasurementConfig};
pub use debug::{encode_jpeg_data_uri, load_font};
pub use density::{IngredientRecord, TemperaturePoint};
pub use error::{ConfigError, MeasureError};
pub use frame::{decode_data_uri, Frame};
pub use lookup::{
    class_from_name, CachedLookup, IngredientLookup, LookupError, MeasurementUnit, MeasurementUnitLookup,
    StaticIngredientTable, StaticUnitTable,
};
pub use pipeline::{CalibrationCapture, MeasurementPipeline, MeasurementRequest, PipelineBuilder};
pub use result::{round_to, FailureKind, MeasurementResult};
pub use volume::{
    cylinder_fill_cm3, geometric_volume_ml, hemisphere_fill_cm3, spherical_cap_cm3,
    VolumeCalculator, VolumeEstimate, VolumeSource,
};

pub use fillcam_calib::{CalibrationCurve, CalibrationError, CalibrationSample};
pub use fillcam_core::{ContainerSpec, Detection, FillResult, GeometryCatalog, Region, ToolClass};
