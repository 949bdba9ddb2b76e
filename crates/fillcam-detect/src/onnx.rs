//! Region proposals from a YOLO-style ONNX detection model.
//!
//! Frames are letterboxed into the model's square input, run through an
//! ONNX Runtime session (feature `onnx`) and decoded back into frame
//! coordinates. Pre- and post-processing are plain functions and are
//! available without the runtime.

use std::collections::BTreeMap;

use fillcam_core::Region;
use image::{imageops, Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD};

use crate::learned::Proposal;

const PAD: Rgb<u8> = Rgb([114, 114, 114]);

/// Placement of a frame inside the padded square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    /// Resized frame extent inside the input.
    pub inner_width: u32,
    pub inner_height: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = size as f32 / width.max(height).max(1) as f32;
        let inner = |v: u32| ((v as f32 * scale).round() as u32).clamp(1, size);
        let (inner_width, inner_height) = (inner(width), inner(height));
        Self {
            size,
            scale,
            pad_x: (size - inner_width) / 2,
            pad_y: (size - inner_height) / 2,
            inner_width,
            inner_height,
        }
    }

    /// Model input coordinates to frame coordinates.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// `[1, 3, size, size]` NCHW tensor in `[0, 1]` with grey padding.
pub fn letterbox_tensor(frame: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let lb = Letterbox::fit(frame.width(), frame.height(), size);
    let resized = imageops::resize(
        frame,
        lb.inner_width,
        lb.inner_height,
        imageops::FilterType::Triangle,
    );
    let mut input = RgbImage::from_pixel(size, size, PAD);
    imageops::replace(&mut input, &resized, lb.pad_x as i64, lb.pad_y as i64);

    let s = size as usize;
    let tensor = Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
        input.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });
    (tensor, lb)
}

/// Decode a `[1, 4 + classes, boxes]` head (centre-size boxes followed by
/// per-class scores) into proposals clipped to the frame.
///
/// Each box keeps its best class; boxes below `min_score` or with a class
/// id missing from `labels` are skipped.
pub fn decode_yolo(
    output: &ArrayViewD<'_, f32>,
    letterbox: &Letterbox,
    labels: &BTreeMap<u32, String>,
    min_score: f32,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Proposal>, String> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
        return Err(format!(
            "expected a [1, 4 + classes, boxes] output, got {shape:?}"
        ));
    }
    let classes = shape[1] - 4;
    let (fw, fh) = (frame_width as f32, frame_height as f32);

    let mut proposals = Vec::new();
    for i in 0..shape[2] {
        let (class, score) = (0..classes)
            .map(|c| (c, output[[0, 4 + c, i]]))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if !(score >= min_score) {
            continue;
        }
        let Some(label) = labels.get(&(class as u32)) else {
            continue;
        };
        let (cx, cy) = (output[[0, 0, i]], output[[0, 1, i]]);
        let (hw, hh) = (output[[0, 2, i]] / 2.0, output[[0, 3, i]] / 2.0);
        let (x1, y1) = letterbox.to_frame(cx - hw, cy - hh);
        let (x2, y2) = letterbox.to_frame(cx + hw, cy + hh);
        let Some(region) = Region::new(
            x1.clamp(0.0, fw),
            y1.clamp(0.0, fh),
            x2.clamp(0.0, fw),
            y2.clamp(0.0, fh),
        ) else {
            continue;
        };
        proposals.push(Proposal {
            region,
            score,
            label: label.clone(),
        });
    }
    Ok(proposals)
}

#[cfg(feature = "onnx")]
pub use runtime::OnnxProposer;

#[cfg(feature = "onnx")]
mod runtime {
    use std::collections::BTreeMap;
    use std::fmt::Display;
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    use image::RgbImage;
    use ort::session::Session;
    use ort::value::{Tensor, ValueType};

    use super::{decode_yolo, letterbox_tensor};
    use crate::learned::{Proposal, RegionProposer};
    use crate::params::OnnxModelParams;
    use crate::DetectError;

    const DEFAULT_INPUT: u32 = 640;

    fn model_err<E: Display>(path: &Path) -> impl Fn(E) -> DetectError + '_ {
        move |e| DetectError::Model(format!("{}: {e}", path.display()))
    }

    /// [`RegionProposer`] backed by an ONNX Runtime session.
    pub struct OnnxProposer {
        name: String,
        session: Mutex<Session>,
        input: String,
        output: String,
        input_size: u32,
        labels: BTreeMap<u32, String>,
        min_score: f32,
    }

    impl std::fmt::Debug for OnnxProposer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OnnxProposer")
                .field("name", &self.name)
                .field("input_size", &self.input_size)
                .field("labels", &self.labels)
                .finish_non_exhaustive()
        }
    }

    impl OnnxProposer {
        pub fn load(params: &OnnxModelParams) -> Result<Self, DetectError> {
            let path = params.path.as_path();
            let session = Session::builder()
                .map_err(model_err(path))?
                .commit_from_file(path)
                .map_err(model_err(path))?;

            let (Some(input), Some(output)) = (session.inputs.first(), session.outputs.first())
            else {
                return Err(DetectError::Model(format!(
                    "{}: model has no inputs or outputs",
                    path.display()
                )));
            };
            let model_side = match &input.input_type {
                ValueType::Tensor { shape, .. } => {
                    shape.to_vec().last().copied().filter(|&d| d > 0)
                }
                _ => None,
            };
            let input_size = params
                .input_size
                .or(model_side.map(|d| d as u32))
                .unwrap_or(DEFAULT_INPUT);
            log::info!(
                "loaded detection model {} ({} -> {}, {input_size}px input)",
                path.display(),
                input.name,
                output.name
            );

            Ok(Self {
                name: format!("onnx:{}", path.display()),
                input: input.name.clone(),
                output: output.name.clone(),
                session: Mutex::new(session),
                input_size,
                labels: params.labels.clone(),
                min_score: params.min_score,
            })
        }
    }

    impl RegionProposer for OnnxProposer {
        fn name(&self) -> &str {
            &self.name
        }

        fn propose(
            &self,
            frame: &RgbImage,
        ) -> Result<Vec<Proposal>, Box<dyn std::error::Error + Send + Sync>> {
            let (tensor, letterbox) = letterbox_tensor(frame, self.input_size);
            let input = Tensor::from_array(tensor)?;
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let outputs = session.run(ort::inputs![self.input.as_str() => &input])?;
            let raw = outputs[self.output.as_str()].try_extract_array::<f32>()?;
            let proposals = decode_yolo(
                &raw,
                &letterbox,
                &self.labels,
                self.min_score,
                frame.width(),
                frame.height(),
            )?;
            Ok(proposals)
        }
    }
}
