//! Debug image encoding and overlay font loading.

use std::path::Path;

use ab_glyph::FontArc;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::ConfigError;

/// Encode as JPEG and wrap in a `data:image/jpeg;base64,` URI.
pub fn encode_jpeg_data_uri(img: &RgbImage, quality: u8) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(img)?;
    Ok(format!("data:image/jpeg;base64,{}", B64.encode(&buf)))
}

/// Load a TrueType/OpenType font for overlay text.
pub fn load_font(path: &Path) -> Result<FontArc, ConfigError> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|e| ConfigError::Font {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
