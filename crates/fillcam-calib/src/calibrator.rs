use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::curve::{CalibrationCurve, CalibrationSample};
use crate::store::{CalibrationStore, CurveMap};
use crate::{CalibrationError, StoreError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Holds the calibration curves of every tool type.
///
/// Reads share an immutable snapshot of the map. Writes are serialized,
/// persisted through the store, and only then published by swapping the
/// snapshot, so a reader sees either the old or the new map.
pub struct Calibrator {
    store: Box<dyn CalibrationStore>,
    curves: RwLock<Arc<CurveMap>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for Calibrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calibrator")
            .field("tool_types", &self.tool_types())
            .finish_non_exhaustive()
    }
}

impl Calibrator {
    /// Load the stored curves.
    pub fn open(store: Box<dyn CalibrationStore>) -> Result<Self, StoreError> {
        let curves = store.load()?;
        log::info!("loaded calibration for {} tool type(s)", curves.len());
        Ok(Self {
            store,
            curves: RwLock::new(Arc::new(curves)),
            write_lock: Mutex::new(()),
        })
    }

    /// Current snapshot of all curves.
    pub fn snapshot(&self) -> Arc<CurveMap> {
        self.curves
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn curve(&self, tool_type: &str) -> Option<CalibrationCurve> {
        self.snapshot().get(tool_type).cloned()
    }

    pub fn is_calibrated(&self, tool_type: &str) -> bool {
        self.snapshot().contains_key(tool_type)
    }

    pub fn tool_types(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Fit and persist a curve for `tool_type`, replacing any previous one.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, samples), fields(samples = samples.len()))
    )]
    pub fn calibrate(
        &self,
        tool_type: &str,
        samples: &[CalibrationSample],
    ) -> Result<CalibrationCurve, CalibrationError> {
        let curve = CalibrationCurve::fit(tool_type, samples)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = (*self.snapshot()).clone();
        next.insert(tool_type.to_string(), curve.clone());
        self.store.persist(&next)?;
        *self.curves.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);

        log::info!(
            "calibrated {tool_type}: {} samples, height {:.1}..{:.1} px, volume {:.2}..{:.2} ml",
            samples.len(),
            curve.min_height,
            curve.max_height,
            curve.min_volume,
            curve.max_volume
        );
        Ok(curve)
    }

    /// Calibrated volume at `pixel_height`, clamped to the observed range.
    pub fn get_volume(&self, tool_type: &str, pixel_height: f64) -> Result<f64, CalibrationError> {
        self.snapshot()
            .get(tool_type)
            .map(|c| c.volume_at(pixel_height))
            .ok_or_else(|| CalibrationError::NotCalibrated(tool_type.to_string()))
    }

    /// Whether `volume` is inside the tool's calibrated range.
    pub fn validate(&self, tool_type: &str, volume: f64) -> Result<bool, CalibrationError> {
        self.snapshot()
            .get(tool_type)
            .map(|c| c.contains_volume(volume))
            .ok_or_else(|| CalibrationError::NotCalibrated(tool_type.to_string()))
    }

    /// Replace the in-memory map with the store's current content.
    pub fn reload(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let curves = self.store.load()?;
        let n = curves.len();
        *self.curves.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(curves);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use approx::assert_relative_eq;

    fn teaspoon_samples() -> Vec<CalibrationSample> {
        vec![
            CalibrationSample::new(30.0, 5.0),
            CalibrationSample::new(10.0, 1.0),
            CalibrationSample::new(20.0, 2.5),
        ]
    }

    struct FailingStore;

    impl CalibrationStore for FailingStore {
        fn load(&self) -> Result<CurveMap, StoreError> {
            Ok(CurveMap::new())
        }

        fn persist(&self, _curves: &CurveMap) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "unwritable".into(),
                source: std::io::Error::other("read-only"),
            })
        }
    }

    #[test]
    fn calibrate_then_query() {
        let cal = Calibrator::open(Box::new(MemoryStore::default())).unwrap();
        assert!(matches!(
            cal.get_volume("teaspoon", 10.0),
            Err(CalibrationError::NotCalibrated(_))
        ));
        cal.calibrate("teaspoon", &teaspoon_samples()).unwrap();
        assert_relative_eq!(cal.get_volume("teaspoon", 20.0).unwrap(), 2.5, epsilon = 1e-6);
        assert_relative_eq!(cal.get_volume("teaspoon", 500.0).unwrap(), 5.0);
        assert!(cal.validate("teaspoon", 4.0).unwrap());
        assert!(!cal.validate("teaspoon", 6.0).unwrap());
        assert_eq!(cal.tool_types(), vec!["teaspoon".to_string()]);
    }

    #[test]
    fn failed_persist_leaves_map_unchanged() {
        let cal = Calibrator::open(Box::new(FailingStore)).unwrap();
        let err = cal.calibrate("teaspoon", &teaspoon_samples()).unwrap_err();
        assert!(matches!(err, CalibrationError::Store(_)));
        assert!(!cal.is_calibrated("teaspoon"));
    }

    #[test]
    fn reopen_restores_clamped_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let before = {
            let cal = Calibrator::open(Box::new(JsonFileStore::new(&path))).unwrap();
            cal.calibrate("teaspoon", &teaspoon_samples()).unwrap();
            [0.0, 15.0, 99.0].map(|h| cal.get_volume("teaspoon", h).unwrap())
        };
        let cal = Calibrator::open(Box::new(JsonFileStore::new(&path))).unwrap();
        let after = [0.0, 15.0, 99.0].map(|h| cal.get_volume("teaspoon", h).unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cal = Arc::new(Calibrator::open(Box::new(MemoryStore::default())).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cal = Arc::clone(&cal);
                std::thread::spawn(move || {
                    let tool = format!("tool_{i}");
                    let samples: Vec<_> = (1..=3)
                        .map(|k| CalibrationSample::new(k as f64 * 10.0, k as f64 * (i + 1) as f64))
                        .collect();
                    cal.calibrate(&tool, &samples).unwrap();
                    cal.get_volume(&tool, 20.0).unwrap()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_relative_eq!(h.join().unwrap(), 2.0 * (i + 1) as f64, epsilon = 1e-6);
        }
        assert_eq!(cal.tool_types().len(), 4);
    }
}
