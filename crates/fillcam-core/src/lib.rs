//! Core types and utilities for camera-based ingredient measurement.
//!
//! This crate holds what every stage of the pipeline shares: the container
//! geometry catalog, detection regions, fill results, HSV conversion and a
//! small debug canvas. It does *not* know about any concrete detector or
//! calibration backend.

mod canvas;
mod catalog;
mod color;
mod container;
mod fill;
mod logger;
mod region;

pub use canvas::{colors, DebugCanvas};
pub use catalog::{CatalogError, GeometryCatalog};
pub use color::{hsv_image, rgb_to_hsv, Hsv};
pub use container::{ContainerShape, ContainerSpec, ToolClass};
pub use fill::{FillEvidence, FillResult};
pub use region::{Detection, Region};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_filter, init_with_level, LogFilter, LOG_ENV};
