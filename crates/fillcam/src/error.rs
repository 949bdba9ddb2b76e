use fillcam_detect::DetectError;

use crate::result::FailureKind;

fn percent(fraction: &f32) -> u32 {
    (fraction * 100.0).round().max(0.0) as u32
}

/// Why a measurement could not be completed.
#[derive(thiserror::Error, Debug)]
pub enum MeasureError {
    #[error(transparent)]
    Detection(#[from] DetectError),
    #[error("empty container: fill level {}% is below the minimum", percent(.fill_fraction))]
    EmptyContainer { fill_fraction: f32 },
    #[error("unknown tool type `{0}`")]
    UnknownTool(String),
    #[error("unknown ingredient `{0}`")]
    UnknownIngredient(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl MeasureError {
    pub fn kind(&self) -> FailureKind {
        match self {
            MeasureError::Detection(DetectError::ToolMismatch { .. }) => FailureKind::ToolMismatch,
            MeasureError::Detection(_) => FailureKind::NoTool,
            MeasureError::EmptyContainer { .. } => FailureKind::EmptyContainer,
            MeasureError::UnknownTool(_) | MeasureError::UnknownIngredient(_) => {
                FailureKind::UnknownReference
            }
            MeasureError::MalformedInput(_) => FailureKind::MalformedInput,
        }
    }
}

/// Errors while assembling a pipeline from configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] fillcam_core::CatalogError),
    #[error(transparent)]
    Detector(#[from] DetectError),
    #[error(transparent)]
    Fill(#[from] fillcam_fill::FillError),
    #[error(transparent)]
    Store(#[from] fillcam_calib::StoreError),
    #[error("failed to load font {path}: {reason}")]
    Font { path: String, reason: String },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
