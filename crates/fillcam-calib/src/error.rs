use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("calibration store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("calibration store is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("need at least {min} samples, got {got}")]
    TooFewSamples { got: usize, min: usize },
    #[error("need at least 3 distinct pixel heights, got {distinct}")]
    DegenerateHeights { distinct: usize },
    #[error("sample {index} has a non-finite or negative value")]
    NonFiniteSample { index: usize },
    #[error("least squares fit failed: {0}")]
    FitFailed(&'static str),
    #[error("no calibration data for {0}")]
    NotCalibrated(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
