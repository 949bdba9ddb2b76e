use std::collections::BTreeMap;
use std::path::PathBuf;

use fillcam_core::ToolClass;
use serde::{Deserialize, Serialize};

/// Relative weights of the shape features in the classical score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub elongation: f32,
    pub convexity: f32,
    pub non_circularity: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            elongation: 0.4,
            convexity: 0.3,
            non_circularity: 0.3,
        }
    }
}

/// Parameters of the contour-based detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourDetectorParams {
    /// Gaussian pre-blur sigma (a 5x5 OpenCV kernel is ~1.1).
    pub blur_sigma: f32,
    /// Adaptive threshold neighbourhood radius; block size is `2r + 1`.
    pub block_radius: u32,
    /// A pixel is foreground when it is at least this much darker than its
    /// neighbourhood mean.
    pub threshold_offset: f32,
    /// Radius of the square structuring element for close/open.
    pub morph_radius: u8,
    /// Contours with a smaller polygon area (px²) are ignored.
    pub min_area: f32,
    /// Elongation at which the elongation term saturates.
    pub elongation_cap: f32,
    /// Elongation above which a candidate is classified as a spoon.
    pub spoon_elongation: f32,
    /// Candidates scoring below this confidence are dropped.
    pub min_confidence: f32,
    pub weights: ScoreWeights,
}

impl Default for ContourDetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            block_radius: 5,
            threshold_offset: 2.0,
            morph_radius: 1,
            min_area: 200.0,
            elongation_cap: 4.0,
            spoon_elongation: 1.3,
            min_confidence: 0.25,
            weights: ScoreWeights::default(),
        }
    }
}

impl ContourDetectorParams {
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err("blur_sigma must be > 0");
        }
        if self.block_radius == 0 {
            return Err("block_radius must be >= 1");
        }
        if !(self.elongation_cap.is_finite() && self.elongation_cap > 1.0) {
            return Err("elongation_cap must be > 1");
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err("min_confidence must be in [0, 1]");
        }
        Ok(())
    }
}

/// Post-filter rule for one tool class of a learned detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    pub class: ToolClass,
    /// Model labels that map onto this class.
    pub labels: Vec<String>,
    pub min_confidence: f32,
    /// Proposals overlapping a stronger one by more than this are dropped.
    pub nms_iou: f32,
    /// Plausible width/height range of the box.
    pub aspect_range: [f32; 2],
}

impl ClassRule {
    pub fn matches_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// ONNX object detection model with a YOLO-style head
/// (`[1, 4 + classes, boxes]`, centre-size boxes in input pixels).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnnxModelParams {
    pub path: PathBuf,
    /// Model class id to label; unlisted ids are ignored.
    #[serde(default = "coco_tool_labels")]
    pub labels: BTreeMap<u32, String>,
    /// Square input side; read from the model when absent.
    #[serde(default)]
    pub input_size: Option<u32>,
    /// Boxes scoring below this never reach the class rules.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

/// COCO ids of the kitchen objects that stand in for measuring tools.
pub fn coco_tool_labels() -> BTreeMap<u32, String> {
    [(41, "cup"), (44, "spoon"), (45, "bowl")]
        .into_iter()
        .map(|(id, l)| (id, l.to_string()))
        .collect()
}

fn default_min_score() -> f32 {
    0.1
}

impl OnnxModelParams {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            labels: coco_tool_labels(),
            input_size: None,
            min_score: default_min_score(),
        }
    }
}

/// Parameters of the learned (proposal-filtering) detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnedDetectorParams {
    pub classes: Vec<ClassRule>,
    /// Keep at most this many detections after NMS.
    pub max_detections: usize,
    /// Model run when no proposer is supplied in code.
    pub model: Option<OnnxModelParams>,
}

impl Default for LearnedDetectorParams {
    fn default() -> Self {
        let labels = |ls: &[&str]| ls.iter().map(|s| s.to_string()).collect();
        Self {
            // Thin spoons get weak, jittery boxes: looser thresholds.
            classes: vec![
                ClassRule {
                    class: ToolClass::Spoon,
                    labels: labels(&["spoon", "teaspoon", "tablespoon", "smallspoon"]),
                    min_confidence: 0.15,
                    nms_iou: 0.5,
                    aspect_range: [0.15, 6.0],
                },
                ClassRule {
                    class: ToolClass::Cup,
                    labels: labels(&["cup", "small_cup", "small cup", "big_cup", "large_cup", "bowl"]),
                    min_confidence: 0.5,
                    nms_iou: 0.3,
                    aspect_range: [0.5, 2.0],
                },
            ],
            max_detections: 5,
            model: None,
        }
    }
}

impl LearnedDetectorParams {
    pub fn rule_for_label(&self, label: &str) -> Option<&ClassRule> {
        self.classes.iter().find(|r| r.matches_label(label))
    }

    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if self.classes.is_empty() {
            return Err("learned detector needs at least one class rule");
        }
        for rule in &self.classes {
            if !(0.0..=1.0).contains(&rule.min_confidence) {
                return Err("class min_confidence must be in [0, 1]");
            }
            if !(0.0..=1.0).contains(&rule.nms_iou) {
                return Err("class nms_iou must be in [0, 1]");
            }
            if !(rule.aspect_range[0] > 0.0 && rule.aspect_range[0] <= rule.aspect_range[1]) {
                return Err("class aspect_range must be positive and ordered");
            }
        }
        if let Some(model) = &self.model {
            if model.labels.is_empty() {
                return Err("model needs at least one labelled class id");
            }
            if model.input_size == Some(0) {
                return Err("model input_size must be > 0");
            }
        }
        Ok(())
    }
}

/// Detector strategy selection, as found in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorParams {
    Classical(ContourDetectorParams),
    Learned(LearnedDetectorParams),
}

impl Default for DetectorParams {
    fn default() -> Self {
        DetectorParams::Classical(ContourDetectorParams::default())
    }
}
