//! Learned detector: post-filtering of boxes from an external region proposer.
//!
//! Model inference is not part of this crate. A [`RegionProposer`] yields
//! labelled boxes; this module maps labels onto tool classes, applies
//! per-class confidence and aspect checks, and suppresses overlaps.

use std::collections::BTreeMap;

use fillcam_core::{colors, DebugCanvas, Detection, Region, ToolClass};
use image::RgbImage;

use crate::detector::DetectionReport;
use crate::params::LearnedDetectorParams;
use crate::DetectError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One raw box from a proposer.
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    pub region: Region,
    pub score: f32,
    pub label: String,
}

/// Source of labelled candidate boxes, typically an object detection model.
pub trait RegionProposer: Send + Sync {
    fn name(&self) -> &str;

    fn propose(
        &self,
        frame: &RgbImage,
    ) -> Result<Vec<Proposal>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Greedy non-maximum suppression within one class.
///
/// Detections are kept in descending confidence order; any detection whose
/// IoU with an already kept one exceeds `iou_threshold` is dropped.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if keep
            .iter()
            .all(|k| k.region.iou(&det.region) <= iou_threshold)
        {
            keep.push(det);
        }
    }
    keep
}

pub struct LearnedDetector {
    params: LearnedDetectorParams,
    proposer: Box<dyn RegionProposer>,
}

impl std::fmt::Debug for LearnedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedDetector")
            .field("params", &self.params)
            .field("proposer", &self.proposer.name())
            .finish()
    }
}

impl LearnedDetector {
    pub fn new(
        params: LearnedDetectorParams,
        proposer: Box<dyn RegionProposer>,
    ) -> Result<Self, DetectError> {
        params.check().map_err(DetectError::InvalidParams)?;
        Ok(Self { params, proposer })
    }

    pub fn params(&self) -> &LearnedDetectorParams {
        &self.params
    }

    /// Apply label mapping, per-class thresholds and NMS to raw proposals.
    pub fn filter(&self, proposals: &[Proposal]) -> Vec<Detection> {
        let mut by_class: BTreeMap<ToolClass, Vec<Detection>> = BTreeMap::new();
        for p in proposals {
            let Some(rule) = self.params.rule_for_label(&p.label) else {
                continue;
            };
            if !p.score.is_finite() || p.score < rule.min_confidence {
                continue;
            }
            let aspect = p.region.aspect();
            if aspect < rule.aspect_range[0] || aspect > rule.aspect_range[1] {
                log::debug!(
                    "dropping {} box with implausible aspect {:.2}",
                    p.label,
                    aspect
                );
                continue;
            }
            by_class.entry(rule.class).or_default().push(Detection {
                region: p.region,
                confidence: p.score.clamp(0.0, 1.0),
                class: rule.class,
                label: p.label.clone(),
            });
        }

        let mut out = Vec::new();
        for (class, dets) in by_class {
            let iou = self
                .params
                .classes
                .iter()
                .find(|r| r.class == class)
                .map_or(0.5, |r| r.nms_iou);
            out.extend(nms(dets, iou));
        }
        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        out.truncate(self.params.max_detections);
        out
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &RgbImage) -> Result<DetectionReport, DetectError> {
        let proposals = self
            .proposer
            .propose(frame)
            .map_err(|e| DetectError::Proposer(e.to_string()))?;
        let detections = self.filter(&proposals);

        let mut canvas = DebugCanvas::new(frame);
        for p in &proposals {
            canvas.draw_region(&p.region, colors::YELLOW, 1);
        }
        for d in &detections {
            canvas.draw_region(&d.region, colors::GREEN, 2);
        }
        log::debug!(
            "{}: {} proposal(s), {} kept",
            self.proposer.name(),
            proposals.len(),
            detections.len()
        );

        Ok(DetectionReport {
            detections,
            candidates: proposals.len(),
            debug_image: canvas.into_image(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProposer(Vec<Proposal>);

    impl RegionProposer for FixedProposer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn propose(
            &self,
            _frame: &RgbImage,
        ) -> Result<Vec<Proposal>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.0.clone())
        }
    }

    fn prop(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, label: &str) -> Proposal {
        Proposal {
            region: Region::new(x1, y1, x2, y2).unwrap(),
            score,
            label: label.to_string(),
        }
    }

    fn detector(props: Vec<Proposal>) -> LearnedDetector {
        LearnedDetector::new(
            LearnedDetectorParams::default(),
            Box::new(FixedProposer(props)),
        )
        .unwrap()
    }

    #[test]
    fn nms_keeps_strongest_of_overlapping_boxes() {
        let d = |x: f32, c: f32| Detection {
            region: Region::new(x, 0.0, x + 10.0, 10.0).unwrap(),
            confidence: c,
            class: ToolClass::Cup,
            label: "cup".into(),
        };
        let kept = nms(vec![d(0.0, 0.6), d(1.0, 0.9), d(50.0, 0.7)], 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn per_class_thresholds_apply() {
        let det = detector(vec![
            prop(0.0, 0.0, 20.0, 80.0, 0.2, "teaspoon"),
            prop(100.0, 0.0, 180.0, 80.0, 0.4, "cup"),
            prop(200.0, 0.0, 280.0, 80.0, 0.9, "banana"),
        ]);
        let out = det.detect(&RgbImage::new(300, 100)).unwrap();
        assert_eq!(out.detections.len(), 1);
        assert_eq!(out.detections[0].class, ToolClass::Spoon);
        assert_eq!(out.candidates, 3);
    }

    #[test]
    fn implausible_cup_aspect_is_dropped() {
        let props = vec![prop(0.0, 0.0, 200.0, 20.0, 0.95, "cup")];
        let det = detector(Vec::new());
        assert!(det.filter(&props).is_empty());
    }

    #[test]
    fn output_is_sorted_and_capped() {
        let props = (0..8)
            .map(|i| {
                let x = i as f32 * 100.0;
                prop(x, 0.0, x + 60.0, 60.0, 0.5 + i as f32 * 0.05, "bowl")
            })
            .collect();
        let det = detector(props);
        let out = det.detect(&RgbImage::new(800, 60)).unwrap();
        assert_eq!(out.detections.len(), 5);
        assert!(out
            .detections
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn proposer_failure_is_reported() {
        struct Failing;
        impl RegionProposer for Failing {
            fn name(&self) -> &str {
                "failing"
            }
            fn propose(
                &self,
                _frame: &RgbImage,
            ) -> Result<Vec<Proposal>, Box<dyn std::error::Error + Send + Sync>> {
                Err("model not loaded".into())
            }
        }
        let det = LearnedDetector::new(LearnedDetectorParams::default(), Box::new(Failing)).unwrap();
        let err = det.detect(&RgbImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, DetectError::Proposer(msg) if msg.contains("model not loaded")));
    }
}
