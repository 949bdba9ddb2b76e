//! Measuring tool detection.
//!
//! Two strategies share one output shape ([`DetectionReport`]):
//!
//! - [`ContourDetector`] thresholds the frame, traces external contours and
//!   scores them by elongation, convexity and non-circularity. Elongated
//!   outlines are spoons, compact ones cups.
//! - [`LearnedDetector`] post-filters labelled boxes from any
//!   [`RegionProposer`] with per-class confidence, aspect and NMS rules.
//!   With the `onnx` feature, `OnnxProposer` runs a YOLO-style model
//!   configured under [`LearnedDetectorParams::model`].
//!
//! [`ToolDetector`] picks the strategy from [`DetectorParams`] and selects
//! the detection to measure given an optional tool class hint.

mod contour;
mod detector;
mod error;
mod learned;
mod onnx;
mod params;
mod shape;

pub use contour::{adaptive_threshold_inv, ContourCandidate, ContourDetector};
pub use detector::{select_best, select_hinted, DetectionReport, ToolDetector};
pub use error::DetectError;
pub use learned::{nms, LearnedDetector, Proposal, RegionProposer};
#[cfg(feature = "onnx")]
pub use onnx::OnnxProposer;
pub use onnx::{decode_yolo, letterbox_tensor, Letterbox};
pub use params::{
    coco_tool_labels, ClassRule, ContourDetectorParams, DetectorParams, LearnedDetectorParams,
    OnnxModelParams, ScoreWeights,
};
pub use shape::{bounding_region, polygon_area, ShapeMetrics};
