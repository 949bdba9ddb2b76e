//! Input frames as they arrive from callers.

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::RgbImage;

use crate::MeasureError;

/// One camera frame in any of the accepted encodings.
#[derive(Clone, Copy, Debug)]
pub enum Frame<'a> {
    /// Encoded image file bytes (JPEG, PNG, ...).
    Encoded(&'a [u8]),
    /// `data:image/...;base64,<payload>` as posted by a browser, or a bare
    /// base64 payload.
    DataUri(&'a str),
    /// Already decoded pixels.
    Image(&'a RgbImage),
}

impl<'a> Frame<'a> {
    pub fn decode(&self) -> Result<Cow<'a, RgbImage>, MeasureError> {
        match *self {
            Frame::Image(img) => {
                if img.width() == 0 || img.height() == 0 {
                    return Err(MeasureError::MalformedInput("empty image".into()));
                }
                Ok(Cow::Borrowed(img))
            }
            Frame::Encoded(bytes) => decode_bytes(bytes).map(Cow::Owned),
            Frame::DataUri(uri) => {
                let bytes = decode_data_uri(uri)?;
                decode_bytes(&bytes).map(Cow::Owned)
            }
        }
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<RgbImage, MeasureError> {
    if bytes.is_empty() {
        return Err(MeasureError::MalformedInput("no image data provided".into()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| MeasureError::MalformedInput(format!("invalid image data: {e}")))?;
    Ok(img.to_rgb8())
}

/// Payload bytes of a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, MeasureError> {
    let uri = uri.trim();
    let payload = match uri.split_once(',') {
        Some((header, payload)) => {
            if !header.starts_with("data:") || !header.ends_with(";base64") {
                return Err(MeasureError::MalformedInput(
                    "invalid image data format".into(),
                ));
            }
            payload
        }
        None => uri,
    };
    B64.decode(payload.trim())
        .map_err(|e| MeasureError::MalformedInput(format!("invalid base64 image data: {e}")))
}
