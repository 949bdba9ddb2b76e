use fillcam_core::ToolClass;

/// Errors returned by the tool detector.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("no measuring tool detected ({candidates} candidate(s) rejected)")]
    NoToolDetected { candidates: usize },
    #[error("detected a {found}, but expected a {expected}")]
    ToolMismatch { expected: ToolClass, found: ToolClass },
    #[error("region proposer failed: {0}")]
    Proposer(String),
    #[error("failed to load detection model {0}")]
    Model(String),
    #[error("invalid detector parameters: {0}")]
    InvalidParams(&'static str),
}
