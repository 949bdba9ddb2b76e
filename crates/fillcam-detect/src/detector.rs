use fillcam_core::{Detection, ToolClass};
use image::RgbImage;

use crate::contour::ContourDetector;
use crate::learned::{LearnedDetector, RegionProposer};
use crate::params::{DetectorParams, OnnxModelParams};
use crate::DetectError;

/// Everything one detection pass produces.
#[derive(Clone, Debug)]
pub struct DetectionReport {
    /// Accepted detections, highest confidence first.
    pub detections: Vec<Detection>,
    /// Number of candidates considered before filtering.
    pub candidates: usize,
    /// Frame annotated with candidates and accepted boxes.
    pub debug_image: RgbImage,
}

/// Detector strategy chosen by configuration.
#[derive(Debug)]
pub enum ToolDetector {
    Classical(ContourDetector),
    Learned(LearnedDetector),
}

impl ToolDetector {
    /// Build the configured strategy.
    ///
    /// A learned detector uses `proposer` when given, otherwise it loads the
    /// model named in its parameters.
    pub fn from_params(
        params: &DetectorParams,
        proposer: Option<Box<dyn RegionProposer>>,
    ) -> Result<Self, DetectError> {
        match params {
            DetectorParams::Classical(p) => Ok(Self::Classical(ContourDetector::new(p.clone())?)),
            DetectorParams::Learned(p) => {
                let proposer = match (proposer, &p.model) {
                    (Some(proposer), _) => proposer,
                    (None, Some(model)) => load_model(model)?,
                    (None, None) => {
                        return Err(DetectError::InvalidParams(
                            "learned detector needs a model or a region proposer",
                        ))
                    }
                };
                Ok(Self::Learned(LearnedDetector::new(p.clone(), proposer)?))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Classical(_) => "classical",
            Self::Learned(_) => "learned",
        }
    }

    pub fn detect(&self, frame: &RgbImage) -> Result<DetectionReport, DetectError> {
        match self {
            Self::Classical(d) => Ok(d.detect(frame)),
            Self::Learned(d) => d.detect(frame),
        }
    }

    /// Pick the detection to measure, honouring an optional class hint.
    pub fn select(
        &self,
        report: &DetectionReport,
        hint: Option<ToolClass>,
    ) -> Result<Detection, DetectError> {
        match self {
            Self::Classical(_) => select_best(report, hint),
            Self::Learned(_) => select_hinted(report, hint),
        }
    }
}

#[cfg(feature = "onnx")]
fn load_model(model: &OnnxModelParams) -> Result<Box<dyn RegionProposer>, DetectError> {
    Ok(Box::new(crate::onnx::OnnxProposer::load(model)?))
}

#[cfg(not(feature = "onnx"))]
fn load_model(model: &OnnxModelParams) -> Result<Box<dyn RegionProposer>, DetectError> {
    Err(DetectError::Model(format!(
        "{}: built without the `onnx` feature",
        model.path.display()
    )))
}

/// Best detection overall; a class different from the hint is a mismatch.
pub fn select_best(
    report: &DetectionReport,
    hint: Option<ToolClass>,
) -> Result<Detection, DetectError> {
    let best = report
        .detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .ok_or(DetectError::NoToolDetected {
            candidates: report.candidates,
        })?;
    match hint {
        Some(expected) if expected != best.class => Err(DetectError::ToolMismatch {
            expected,
            found: best.class,
        }),
        _ => Ok(best.clone()),
    }
}

/// Best detection of the hinted class; other classes only yield a mismatch
/// when nothing of the hinted class was found.
pub fn select_hinted(
    report: &DetectionReport,
    hint: Option<ToolClass>,
) -> Result<Detection, DetectError> {
    let Some(expected) = hint else {
        return select_best(report, None);
    };
    let of_class = report
        .detections
        .iter()
        .filter(|d| d.class == expected)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
    if let Some(d) = of_class {
        return Ok(d.clone());
    }
    match report
        .detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    {
        Some(other) => Err(DetectError::ToolMismatch {
            expected,
            found: other.class,
        }),
        None => Err(DetectError::NoToolDetected {
            candidates: report.candidates,
        }),
    }
}
