use fillcam_core::ToolClass;
use serde::{Deserialize, Serialize};

use crate::volume::VolumeSource;
use crate::MeasureError;

/// Machine-readable failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoTool,
    ToolMismatch,
    EmptyContainer,
    UnknownReference,
    MalformedInput,
}

/// Outcome of one measurement request, ready to serialize to JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub success: bool,
    pub message: String,
    pub failure: Option<FailureKind>,
    pub volume_ml: Option<f64>,
    pub weight_g: Option<f64>,
    pub fill_percentage: Option<u32>,
    pub tool_type: Option<String>,
    pub detected_class: Option<ToolClass>,
    pub confidence: Option<f32>,
    pub volume_source: Option<VolumeSource>,
    pub ingredient: Option<String>,
    pub density_g_per_ml: Option<f64>,
    pub pixel_height: Option<f32>,
    /// `data:image/jpeg;base64,...`
    pub debug_image: Option<String>,
}

impl MeasurementResult {
    pub fn failure(error: &MeasureError, tool_type: &str, debug_image: Option<String>) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            failure: Some(error.kind()),
            tool_type: Some(tool_type.to_string()),
            debug_image,
            ..Self::default()
        }
    }
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
