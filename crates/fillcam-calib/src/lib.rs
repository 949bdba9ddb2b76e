//! Calibration of measured pixel heights to volumes, per tool type.
//!
//! Operators record a few frames of a tool filled to known volumes. The
//! measured pixel heights and the known volumes are fitted with a quadratic
//! ([`CalibrationCurve::fit`]); later readings are evaluated on that curve
//! and clamped to the volumes seen during calibration.
//!
//! The [`Calibrator`] holds every curve in memory, persists the whole map
//! on each successful calibration through a [`CalibrationStore`] and
//! publishes the new map only after the write succeeded.

mod calibrator;
mod curve;
mod error;
mod store;

pub use calibrator::Calibrator;
pub use curve::{CalibrationCurve, CalibrationSample, DEGREE, MIN_SAMPLES};
pub use error::{CalibrationError, StoreError};
pub use store::{CalibrationStore, CurveMap, JsonFileStore, MemoryStore};
