//! Fill level estimation inside a detected measuring tool.
//!
//! Side and angled views are scanned in horizontal bands from the bottom
//! up; a band is filled when it is saturated and not bright, or textured.
//! Top-down views use a brightness mask over the region. When no band
//! reads as filled, the top of the largest edge contour inside the region
//! is taken as the fill line. Fractions near the extremes snap to 0 or 1.

mod bands;
mod edge;
mod estimator;
mod params;
mod topdown;

pub use bands::{band_stats, count_filled, BandStats, PixelRect};
pub use edge::{edge_density, edge_map, fill_line_row};
pub use estimator::{FillError, FillEstimate, FillEstimator, FillMethod, View};
pub use params::{BandThresholds, EdgeFallbackParams, FillParams, ViewClassifier, ViewMode};
pub use topdown::mask_fraction;
