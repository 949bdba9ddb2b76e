use std::sync::Arc;

use ab_glyph::FontArc;
use fillcam_calib::{
    CalibrationCurve, CalibrationError, CalibrationSample, CalibrationStore, Calibrator,
    JsonFileStore, MemoryStore,
};
use fillcam_core::{colors, DebugCanvas, Detection, GeometryCatalog, ToolClass};
use fillcam_detect::{RegionProposer, ToolDetector};
use fillcam_fill::{FillEstimate, FillEstimator};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::config::MeasurementConfig;
use crate::debug::{encode_jpeg_data_uri, load_font};
use crate::frame::Frame;
use crate::lookup::{
    class_from_name, CachedLookup, IngredientLookup, MeasurementUnitLookup, StaticIngredientTable,
    StaticUnitTable,
};
use crate::result::{round_to, MeasurementResult};
use crate::volume::{VolumeCalculator, VolumeEstimate, VolumeSource};
use crate::{ConfigError, MeasureError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One measurement request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    pub tool_type: String,
    pub ingredient: Option<String>,
    /// Physical state (`"packed"`, `"melted"`, ...) for density adjustment.
    pub state: Option<String>,
    pub temperature_c: Option<f64>,
}

impl MeasurementRequest {
    pub fn new(tool_type: impl Into<String>, ingredient: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            ingredient: Some(ingredient.into()),
            ..Self::default()
        }
    }
}

/// Pixel reading of a frame showing a tool filled to a known volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCapture {
    pub tool_type: String,
    pub pixel_height: f32,
    pub fill_fraction: f32,
    pub scan_height_px: f32,
    pub confidence: f32,
    pub debug_image: Option<String>,
}

impl CalibrationCapture {
    /// Pair this reading with the volume the operator poured.
    pub fn sample(&self, volume_ml: f64) -> CalibrationSample {
        CalibrationSample {
            fill_level: Some(self.fill_fraction as f64),
            ..CalibrationSample::new(self.pixel_height as f64, volume_ml)
        }
    }
}

struct Analysis {
    detection: Detection,
    fill: FillEstimate,
}

/// Assembles a [`MeasurementPipeline`], defaulting every collaborator that
/// is not supplied from the configuration.
pub struct PipelineBuilder {
    config: MeasurementConfig,
    catalog: Option<GeometryCatalog>,
    store: Option<Box<dyn CalibrationStore>>,
    calibrator: Option<Arc<Calibrator>>,
    ingredients: Option<Arc<dyn IngredientLookup>>,
    units: Option<Arc<dyn MeasurementUnitLookup>>,
    proposer: Option<Box<dyn RegionProposer>>,
}

impl PipelineBuilder {
    pub fn new(config: MeasurementConfig) -> Self {
        Self {
            config,
            catalog: None,
            store: None,
            calibrator: None,
            ingredients: None,
            units: None,
            proposer: None,
        }
    }

    pub fn catalog(mut self, catalog: GeometryCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Calibration store; ignored when a calibrator is supplied.
    pub fn calibration_store(mut self, store: Box<dyn CalibrationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share a calibrator with other pipelines.
    pub fn calibrator(mut self, calibrator: Arc<Calibrator>) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    pub fn ingredients(mut self, lookup: Arc<dyn IngredientLookup>) -> Self {
        self.ingredients = Some(lookup);
        self
    }

    pub fn units(mut self, lookup: Arc<dyn MeasurementUnitLookup>) -> Self {
        self.units = Some(lookup);
        self
    }

    /// Region proposer for the learned detector.
    pub fn proposer(mut self, proposer: Box<dyn RegionProposer>) -> Self {
        self.proposer = Some(proposer);
        self
    }

    pub fn build(self) -> Result<MeasurementPipeline, ConfigError> {
        let config = self.config;
        config.check()?;

        let catalog = match (self.catalog, &config.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => GeometryCatalog::load_json(path)?,
            (None, None) => GeometryCatalog::builtin(),
        };
        let catalog = Arc::new(catalog);

        let calibrator = match self.calibrator {
            Some(calibrator) => calibrator,
            None => {
                let store = match (self.store, &config.calibration_path) {
                    (Some(store), _) => store,
                    (None, Some(path)) => Box::new(JsonFileStore::new(path)),
                    (None, None) => Box::new(MemoryStore::default()),
                };
                Arc::new(Calibrator::open(store)?)
            }
        };

        let cache = config.lookup_cache.clone();
        let ingredients: Arc<dyn IngredientLookup> = match self.ingredients {
            Some(inner) => Arc::new(CachedLookup::new(inner, cache.clone())),
            None => Arc::new(CachedLookup::new(StaticIngredientTable::builtin(), cache.clone())),
        };
        let units: Arc<dyn MeasurementUnitLookup> = match self.units {
            Some(inner) => Arc::new(CachedLookup::new(inner, cache)),
            None => Arc::new(CachedLookup::new(StaticUnitTable::builtin(), cache)),
        };

        let detector = ToolDetector::from_params(&config.detector, self.proposer)?;
        let fill = FillEstimator::new(config.fill.clone())?;
        let font = config
            .debug
            .font_path
            .as_deref()
            .map(load_font)
            .transpose()?;
        let volume = VolumeCalculator::new(catalog.clone(), calibrator.clone(), units.clone());

        log::info!(
            "measurement pipeline ready: {} detector, {} catalog entries, {} calibrated tools",
            detector.kind(),
            catalog.len(),
            calibrator.tool_types().len()
        );

        Ok(MeasurementPipeline {
            config,
            catalog,
            detector,
            fill,
            calibrator,
            ingredients,
            units,
            volume,
            font,
        })
    }
}

/// Frame in, measurement out.
///
/// Detects the measuring tool, estimates how full it is, converts the fill
/// to a volume (calibration curve, then catalog geometry, then unit table)
/// and the volume to a weight through the ingredient's density. Every
/// outcome, failures included, is a [`MeasurementResult`].
pub struct MeasurementPipeline {
    config: MeasurementConfig,
    catalog: Arc<GeometryCatalog>,
    detector: ToolDetector,
    fill: FillEstimator,
    calibrator: Arc<Calibrator>,
    ingredients: Arc<dyn IngredientLookup>,
    units: Arc<dyn MeasurementUnitLookup>,
    volume: VolumeCalculator,
    font: Option<FontArc>,
}

impl std::fmt::Debug for MeasurementPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementPipeline")
            .field("detector", &self.detector.kind())
            .field("catalog", &self.catalog.len())
            .field("calibrator", &self.calibrator)
            .finish_non_exhaustive()
    }
}

impl MeasurementPipeline {
    pub fn new(config: MeasurementConfig) -> Result<Self, ConfigError> {
        PipelineBuilder::new(config).build()
    }

    pub fn builder(config: MeasurementConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    pub fn catalog(&self) -> &GeometryCatalog {
        &self.catalog
    }

    pub fn calibrator(&self) -> &Arc<Calibrator> {
        &self.calibrator
    }

    pub fn units(&self) -> &Arc<dyn MeasurementUnitLookup> {
        &self.units
    }

    /// Measure `ingredient` in the `tool_type` shown by `frame`.
    pub fn process_measurement(
        &self,
        frame: Frame<'_>,
        tool_type: &str,
        ingredient: &str,
    ) -> MeasurementResult {
        self.process_request(frame, &MeasurementRequest::new(tool_type, ingredient))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(tool_type = %request.tool_type))
    )]
    pub fn process_request(&self, frame: Frame<'_>, request: &MeasurementRequest) -> MeasurementResult {
        let tool_type = request.tool_type.as_str();
        let image = match frame.decode() {
            Ok(image) => image,
            Err(e) => {
                log::info!("rejected frame for {tool_type}: {e}");
                return MeasurementResult::failure(&e, tool_type, None);
            }
        };

        let (mut canvas, analysis) = self.analyze(&image, tool_type);
        let Analysis { detection, fill } = match analysis {
            Ok(a) => a,
            Err(e) => return self.fail(e, tool_type, canvas),
        };
        let fill_result = &fill.result;

        canvas.text_line(
            &format!(
                "{} {:.0}%  fill {}%",
                detection.class,
                detection.confidence * 100.0,
                fill_result.percentage()
            ),
            colors::WHITE,
        );

        if fill_result.fill_fraction < self.config.min_fill_fraction {
            let e = MeasureError::EmptyContainer {
                fill_fraction: fill_result.fill_fraction,
            };
            return self.fail(e, tool_type, canvas);
        }

        let VolumeEstimate { volume_ml, source } = match self.volume.volume(tool_type, fill_result)
        {
            Ok(v) => v,
            Err(e) => return self.fail(e, tool_type, canvas),
        };
        if source == VolumeSource::Calibration
            && matches!(self.calibrator.validate(tool_type, volume_ml), Ok(false))
        {
            log::warn!("{tool_type}: {volume_ml:.2} ml is outside the calibrated range");
        }
        let raw_volume_ml = volume_ml;
        let volume_ml = round_to(raw_volume_ml, 2);

        let density = request
            .ingredient
            .as_deref()
            .map(|name| (name, self.density(name, request)));
        let (weight_g, density_g_per_ml, message) = match density {
            Some((name, Ok(d))) => {
                let weight = round_to(raw_volume_ml * d, 1);
                (
                    Some(weight),
                    Some(d),
                    format!("measured {volume_ml:.2} ml ({weight:.1} g) of {name}"),
                )
            }
            Some((name, Err(e))) => {
                log::warn!("weight unavailable for {name}: {e}");
                (
                    None,
                    None,
                    format!("measured {volume_ml:.2} ml; {e}, weight unavailable"),
                )
            }
            None => (None, None, format!("measured {volume_ml:.2} ml")),
        };

        canvas.text_line(&format!("volume {volume_ml:.2} ml"), colors::WHITE);
        if let Some(w) = weight_g {
            canvas.text_line(&format!("weight {w:.1} g"), colors::WHITE);
        }

        log::info!(
            "{tool_type}: fill {}%, {volume_ml:.2} ml via {source:?}, weight {weight_g:?}",
            fill_result.percentage()
        );

        MeasurementResult {
            success: true,
            message,
            failure: None,
            volume_ml: Some(volume_ml),
            weight_g,
            fill_percentage: Some(fill_result.percentage()),
            tool_type: Some(tool_type.to_string()),
            detected_class: Some(detection.class),
            confidence: Some(detection.confidence),
            volume_source: Some(source),
            ingredient: request.ingredient.clone(),
            density_g_per_ml,
            pixel_height: Some(fill_result.pixel_height),
            debug_image: self.encode(canvas.image()),
        }
    }

    /// Read the pixel height of a tool filled to a known volume.
    ///
    /// Unlike a measurement, an empty tool is a valid reading.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, frame)))]
    pub fn begin_calibration_capture(
        &self,
        frame: Frame<'_>,
        tool_type: &str,
    ) -> Result<CalibrationCapture, MeasureError> {
        let image = frame.decode()?;
        let (canvas, analysis) = self.analyze(&image, tool_type);
        let Analysis { detection, fill } = analysis?;
        log::debug!(
            "calibration capture for {tool_type}: {:.1} px of {:.1} px",
            fill.result.pixel_height,
            fill.result.scan_height_px
        );
        Ok(CalibrationCapture {
            tool_type: tool_type.to_string(),
            pixel_height: fill.result.pixel_height,
            fill_fraction: fill.result.fill_fraction,
            scan_height_px: fill.result.scan_height_px,
            confidence: detection.confidence,
            debug_image: self.encode(canvas.image()),
        })
    }

    /// Fit and persist a calibration curve from captured samples.
    pub fn save_calibration(
        &self,
        tool_type: &str,
        samples: &[CalibrationSample],
    ) -> Result<CalibrationCurve, CalibrationError> {
        self.calibrator.calibrate(tool_type, samples)
    }

    /// Expected tool class: catalog geometry first, then the unit table,
    /// then the tool type's name.
    fn class_hint(&self, tool_type: &str) -> Option<ToolClass> {
        if let Some(spec) = self.catalog.get(tool_type) {
            return Some(spec.class);
        }
        match self.units.lookup_measurement_unit(tool_type) {
            Ok(Some(unit)) => unit.tool_class(),
            Ok(None) => class_from_name(tool_type),
            Err(e) => {
                log::warn!("unit lookup failed for {tool_type}: {e}");
                class_from_name(tool_type)
            }
        }
    }

    fn canvas(&self, image: &RgbImage) -> DebugCanvas {
        let font = self.config.debug.draw_text.then(|| self.font.clone()).flatten();
        DebugCanvas::new(image).with_font(font)
    }

    /// Detect, select and estimate fill; the canvas is returned even when
    /// a stage fails so the failure can still be shown.
    fn analyze(&self, image: &RgbImage, tool_type: &str) -> (DebugCanvas, Result<Analysis, MeasureError>) {
        let report = match self.detector.detect(image) {
            Ok(report) => report,
            Err(e) => return (self.canvas(image), Err(e.into())),
        };
        let mut canvas = self.canvas(&report.debug_image);
        let detection = match self.detector.select(&report, self.class_hint(tool_type)) {
            Ok(d) => d,
            Err(e) => return (canvas, Err(e.into())),
        };
        canvas.draw_region(&detection.region, colors::RED, 2);
        let fill = self.fill.estimate(image, &detection.region, detection.class);
        self.fill.annotate(&mut canvas, &fill);
        (canvas, Ok(Analysis { detection, fill }))
    }

    fn density(&self, name: &str, request: &MeasurementRequest) -> Result<f64, MeasureError> {
        match self.ingredients.lookup_ingredient(name) {
            Ok(Some(record)) => Ok(record.density(request.state.as_deref(), request.temperature_c)),
            Ok(None) => Err(MeasureError::UnknownIngredient(name.to_string())),
            Err(e) => {
                log::warn!("ingredient lookup failed for {name}: {e}");
                Err(MeasureError::UnknownIngredient(name.to_string()))
            }
        }
    }

    fn fail(&self, error: MeasureError, tool_type: &str, mut canvas: DebugCanvas) -> MeasurementResult {
        log::info!("measurement of {tool_type} failed: {error}");
        canvas.text_line(&error.to_string(), colors::RED);
        MeasurementResult::failure(&error, tool_type, self.encode(canvas.image()))
    }

    fn encode(&self, image: &RgbImage) -> Option<String> {
        if !self.config.debug.enabled {
            return None;
        }
        match encode_jpeg_data_uri(image, self.config.debug.jpeg_quality) {
            Ok(uri) => Some(uri),
            Err(e) => {
                log::warn!("failed to encode debug image: {e}");
                None
            }
        }
    }
}
