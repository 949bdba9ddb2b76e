use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use fillcam_detect::DetectorParams;
use fillcam_fill::FillParams;
use serde::{Deserialize, Serialize};

use crate::cache::CacheParams;
use crate::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Encode and return an annotated debug image with every result.
    pub enabled: bool,
    pub jpeg_quality: u8,
    /// TrueType/OpenType font for metric text; text is skipped without one.
    pub font_path: Option<PathBuf>,
    pub draw_text: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jpeg_quality: 85,
            font_path: None,
            draw_text: true,
        }
    }
}

/// Everything needed to build a [`crate::MeasurementPipeline`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub detector: DetectorParams,
    pub fill: FillParams,
    /// Fills below this fraction are reported as an empty container.
    pub min_fill_fraction: f32,
    pub debug: DebugConfig,
    /// Geometry catalog JSON; the builtin catalog when absent.
    pub catalog_path: Option<PathBuf>,
    /// Calibration store file; calibration is kept in memory when absent.
    pub calibration_path: Option<PathBuf>,
    pub lookup_cache: CacheParams,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            detector: DetectorParams::default(),
            fill: FillParams::default(),
            min_fill_fraction: 0.05,
            debug: DebugConfig::default(),
            catalog_path: None,
            calibration_path: None,
            lookup_cache: CacheParams::default(),
        }
    }
}

impl MeasurementConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.min_fill_fraction) {
            return Err(ConfigError::Invalid("min_fill_fraction must be in [0, 1)"));
        }
        if !(1..=100).contains(&self.debug.jpeg_quality) {
            return Err(ConfigError::Invalid("debug.jpeg_quality must be in 1..=100"));
        }
        Ok(())
    }
}
