//! External reference data: ingredient densities and measurement units.
//!
//! The real store lives outside this crate; the traits here are its seam.
//! [`StaticIngredientTable`] and [`StaticUnitTable`] are in-memory,
//! JSON-loadable implementations and [`CachedLookup`] puts a bounded cache
//! in front of any backend.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use fillcam_core::ToolClass;
use serde::{Deserialize, Serialize};

use crate::cache::{BoundedCache, CacheParams};
use crate::density::IngredientRecord;

#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("lookup backend failed: {0}")]
    Backend(String),
    #[error("failed to read lookup table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lookup table json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named volume unit such as `cup` or `teaspoon`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementUnit {
    pub name: String,
    pub reference_volume_ml: f64,
    /// Tool family that holds this unit; `None` for abstract units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ToolClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MeasurementUnit {
    /// Tool class implied by the unit, falling back to its name.
    pub fn tool_class(&self) -> Option<ToolClass> {
        self.class.or_else(|| class_from_name(&self.name))
    }
}

/// `*cup*` names are cups, `*spoon*` names are spoons.
pub fn class_from_name(name: &str) -> Option<ToolClass> {
    let name = name.to_lowercase();
    if name.contains("cup") {
        Some(ToolClass::Cup)
    } else if name.contains("spoon") {
        Some(ToolClass::Spoon)
    } else {
        None
    }
}

/// `Ok(None)` means the name is unknown; `Err` means the backend failed.
pub trait IngredientLookup: Send + Sync {
    fn lookup_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, LookupError>;
}

pub trait MeasurementUnitLookup: Send + Sync {
    fn lookup_measurement_unit(&self, name: &str) -> Result<Option<MeasurementUnit>, LookupError>;
}

impl<T: IngredientLookup + ?Sized> IngredientLookup for Arc<T> {
    fn lookup_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, LookupError> {
        (**self).lookup_ingredient(name)
    }
}

impl<T: MeasurementUnitLookup + ?Sized> MeasurementUnitLookup for Arc<T> {
    fn lookup_measurement_unit(&self, name: &str) -> Result<Option<MeasurementUnit>, LookupError> {
        (**self).lookup_measurement_unit(name)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Serialize, Deserialize)]
struct IngredientFile {
    ingredients: Vec<IngredientRecord>,
}

/// In-memory ingredient table keyed by lower-cased name.
#[derive(Clone, Debug, Default)]
pub struct StaticIngredientTable {
    records: BTreeMap<String, IngredientRecord>,
}

impl StaticIngredientTable {
    pub fn new(records: impl IntoIterator<Item = IngredientRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (normalize(&r.name), r))
                .collect(),
        }
    }

    /// Common baking ingredients with their bulk densities (g/ml).
    pub fn builtin() -> Self {
        Self::new([
            IngredientRecord::new("all-purpose flour", 0.59)
                .with_state("sifted", 0.763)
                .with_state("packed", 1.102),
            IngredientRecord::new("bread flour", 0.58),
            IngredientRecord::new("whole wheat flour", 0.64),
            IngredientRecord::new("cornstarch", 0.45),
            IngredientRecord::new("granulated sugar", 0.85),
            IngredientRecord::new("brown sugar", 0.93),
            IngredientRecord::new("powdered sugar", 0.56),
            IngredientRecord::new("honey", 1.42)
                .with_temperature(20.0, 1.0)
                .with_temperature(35.0, 0.958),
            IngredientRecord::new("maple syrup", 1.37)
                .with_temperature(4.0, 1.036)
                .with_temperature(20.0, 1.0),
            IngredientRecord::new("butter", 0.911)
                .with_state("melted", 1.01)
                .with_state("softened", 1.0)
                .with_state("cold", 1.054)
                .with_temperature(4.0, 1.054)
                .with_temperature(20.0, 1.0)
                .with_temperature(35.0, 1.01),
            IngredientRecord::new("vegetable oil", 0.92),
            IngredientRecord::new("olive oil", 0.92),
            IngredientRecord::new("whole milk", 1.03),
            IngredientRecord::new("heavy cream", 0.994),
            IngredientRecord::new("table salt", 2.17),
            IngredientRecord::new("kosher salt", 1.2),
            IngredientRecord::new("baking powder", 0.9),
            IngredientRecord::new("baking soda", 0.85),
            IngredientRecord::new("cocoa powder", 0.53),
            IngredientRecord::new("rolled oats", 0.41),
            IngredientRecord::new("rice", 0.75),
            IngredientRecord::new("almonds", 0.45)
                .with_state("whole", 1.0)
                .with_state("chopped", 1.22)
                .with_state("ground", 1.44),
        ])
    }

    /// Load `{"ingredients": [...]}`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let file = File::open(path)?;
        let parsed: IngredientFile = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::new(parsed.ingredients))
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LookupError> {
        let file = File::create(path)?;
        let out = IngredientFile {
            ingredients: self.records.values().cloned().collect(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &out)?;
        Ok(())
    }

    pub fn insert(&mut self, record: IngredientRecord) {
        self.records.insert(normalize(&record.name), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IngredientLookup for StaticIngredientTable {
    fn lookup_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, LookupError> {
        Ok(self.records.get(&normalize(name)).cloned())
    }
}

#[derive(Serialize, Deserialize)]
struct UnitFile {
    units: Vec<MeasurementUnit>,
}

/// In-memory measurement unit table keyed by lower-cased name.
#[derive(Clone, Debug, Default)]
pub struct StaticUnitTable {
    units: BTreeMap<String, MeasurementUnit>,
}

impl StaticUnitTable {
    pub fn new(units: impl IntoIterator<Item = MeasurementUnit>) -> Self {
        Self {
            units: units.into_iter().map(|u| (normalize(&u.name), u)).collect(),
        }
    }

    /// US customary and metric kitchen units.
    pub fn builtin() -> Self {
        let unit = |name: &str, ml: f64, desc: &str| MeasurementUnit {
            name: name.to_string(),
            reference_volume_ml: ml,
            class: class_from_name(name),
            description: Some(desc.to_string()),
        };
        Self::new([
            unit("cup", 236.588, "Standard US cup"),
            unit("half_cup", 118.294, "1/2 US cup"),
            unit("third_cup", 78.863, "1/3 US cup"),
            unit("quarter_cup", 59.147, "1/4 US cup"),
            unit("eighth_cup", 29.573, "1/8 US cup"),
            unit("tablespoon", 14.787, "US tablespoon"),
            unit("half_tablespoon", 7.393, "1/2 US tablespoon"),
            unit("teaspoon", 4.929, "US teaspoon"),
            unit("half_teaspoon", 2.464, "1/2 US teaspoon"),
            unit("quarter_teaspoon", 1.232, "1/4 US teaspoon"),
            unit("fluid_ounce", 29.5735, "US fluid ounce"),
            unit("milliliter", 1.0, "Metric milliliter"),
            unit("liter", 1000.0, "Metric liter"),
        ])
    }

    /// Load `{"units": [...]}`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let file = File::open(path)?;
        let parsed: UnitFile = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::new(parsed.units))
    }
}

impl MeasurementUnitLookup for StaticUnitTable {
    fn lookup_measurement_unit(&self, name: &str) -> Result<Option<MeasurementUnit>, LookupError> {
        Ok(self.units.get(&normalize(name)).cloned())
    }
}

/// Read-through cache in front of a lookup backend.
///
/// Only found entries are cached, so records added to the backend become
/// visible on the next miss.
#[derive(Debug)]
pub struct CachedLookup<L> {
    inner: L,
    ingredients: Mutex<BoundedCache<String, IngredientRecord>>,
    units: Mutex<BoundedCache<String, MeasurementUnit>>,
}

impl<L> CachedLookup<L> {
    pub fn new(inner: L, params: CacheParams) -> Self {
        Self {
            inner,
            ingredients: Mutex::new(BoundedCache::new(params.clone())),
            units: Mutex::new(BoundedCache::new(params)),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Drop cached entries for `name` from both caches.
    pub fn invalidate(&self, name: &str) {
        let key = normalize(name);
        self.ingredients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(&key);
        self.units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(&key);
    }

    pub fn clear(&self) {
        self.ingredients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.units.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<L: IngredientLookup> IngredientLookup for CachedLookup<L> {
    fn lookup_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, LookupError> {
        let key = normalize(name);
        if let Some(hit) = self
            .ingredients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Some(hit));
        }
        let found = self.inner.lookup_ingredient(name)?;
        if let Some(record) = &found {
            self.ingredients
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, record.clone());
        }
        Ok(found)
    }
}

impl<L: MeasurementUnitLookup> MeasurementUnitLookup for CachedLookup<L> {
    fn lookup_measurement_unit(&self, name: &str) -> Result<Option<MeasurementUnit>, LookupError> {
        let key = normalize(name);
        if let Some(hit) = self
            .units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Some(hit));
        }
        let found = self.inner.lookup_measurement_unit(name)?;
        if let Some(unit) = &found {
            self.units
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, unit.clone());
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTable {
        calls: AtomicUsize,
    }

    impl IngredientLookup for CountingTable {
        fn lookup_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((name == "flour").then(|| IngredientRecord::new("flour", 0.59)))
        }
    }

    #[test]
    fn static_tables_are_case_insensitive() {
        let t = StaticIngredientTable::builtin();
        let r = t.lookup_ingredient("  Granulated Sugar ").unwrap().unwrap();
        assert_eq!(r.base_density_g_per_ml, 0.85);
        assert!(t.lookup_ingredient("unobtainium").unwrap().is_none());

        let u = StaticUnitTable::builtin();
        assert_eq!(
            u.lookup_measurement_unit("CUP").unwrap().unwrap().reference_volume_ml,
            236.588
        );
    }

    #[test]
    fn cache_serves_repeat_hits_but_not_misses() {
        let cached = CachedLookup::new(CountingTable::default(), CacheParams::default());
        for _ in 0..3 {
            assert!(cached.lookup_ingredient("flour").unwrap().is_some());
        }
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);

        for _ in 0..2 {
            assert!(cached.lookup_ingredient("saffron").unwrap().is_none());
        }
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 3);

        cached.invalidate("flour");
        cached.lookup_ingredient("flour").unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn units_carry_their_tool_class() {
        let u = StaticUnitTable::builtin();
        let class = |name: &str| u.lookup_measurement_unit(name).unwrap().unwrap().tool_class();
        assert_eq!(class("half_teaspoon"), Some(ToolClass::Spoon));
        assert_eq!(class("quarter_cup"), Some(ToolClass::Cup));
        assert_eq!(class("milliliter"), None);

        let parsed: MeasurementUnit =
            serde_json::from_str(r#"{"name": "Dessert Spoon", "reference_volume_ml": 10.0}"#).unwrap();
        assert_eq!(parsed.class, None);
        assert_eq!(parsed.tool_class(), Some(ToolClass::Spoon));
    }

    #[test]
    fn ingredient_table_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingredients.json");
        let mut table = StaticIngredientTable::default();
        table.insert(IngredientRecord::new("Rye Flour", 0.62).with_state("sifted", 0.8));
        table.write_json(&path).unwrap();

        let loaded = StaticIngredientTable::load_json(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let rec = loaded.lookup_ingredient("rye flour").unwrap().unwrap();
        assert_eq!(rec.states.get("sifted"), Some(&0.8));
    }
}
