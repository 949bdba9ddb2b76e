//! Durable storage of the tool type → curve map.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::curve::CalibrationCurve;
use crate::StoreError;

/// All curves, keyed by tool type.
pub type CurveMap = BTreeMap<String, CalibrationCurve>;

/// Backend that loads the full curve map and persists it whole.
pub trait CalibrationStore: Send + Sync {
    fn load(&self) -> Result<CurveMap, StoreError>;

    /// Replace the stored map. Readers of the store never see a partial map.
    fn persist(&self, curves: &CurveMap) -> Result<(), StoreError>;
}

/// JSON object file `{ "<tool_type>": { coefficients, min_height, ... } }`.
///
/// Writes go to a sibling `.tmp` file which is synced and renamed over the
/// target.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CalibrationStore for JsonFileStore {
    /// A missing file is an empty map.
    fn load(&self) -> Result<CurveMap, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CurveMap::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        let mut curves: CurveMap = serde_json::from_slice(&bytes)?;
        // The key is authoritative.
        for (tool_type, curve) in curves.iter_mut() {
            curve.tool_type.clone_from(tool_type);
        }
        Ok(curves)
    }

    fn persist(&self, curves: &CurveMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_vec_pretty(curves)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
            f.write_all(&json).map_err(|e| self.io_err(e))?;
            f.sync_all().map_err(|e| self.io_err(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

/// In-process store, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    curves: Mutex<CurveMap>,
}

impl MemoryStore {
    pub fn new(curves: CurveMap) -> Self {
        Self {
            curves: Mutex::new(curves),
        }
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self) -> Result<CurveMap, StoreError> {
        Ok(self
            .curves
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn persist(&self, curves: &CurveMap) -> Result<(), StoreError> {
        *self
            .curves
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = curves.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(tool: &str) -> CalibrationCurve {
        CalibrationCurve {
            tool_type: tool.to_string(),
            coefficients: vec![0.0, 2.0, 1.0],
            min_height: 0.0,
            max_height: 50.0,
            min_volume: 1.0,
            max_volume: 101.0,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("calibration.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn persist_then_load_round_trips_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("calibration.json");
        let store = JsonFileStore::new(&path);
        let mut map = CurveMap::new();
        map.insert("small_cup".into(), curve("small_cup"));
        store.persist(&map).unwrap();

        assert_eq!(store.load().unwrap(), map);
        assert!(!path.with_extension("tmp").exists());

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(raw["small_cup"]["coefficients"].is_array());
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Json(_))
        ));
    }
}
