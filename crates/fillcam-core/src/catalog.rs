//! Geometry catalog: tool type -> physical container description.

use crate::container::{ContainerShape, ContainerSpec, ToolClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Errors raised while building or loading a catalog.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("container `{type_id}` has invalid {field}")]
    InvalidSpec { type_id: String, field: &'static str },
    #[error("container `{0}` is listed twice")]
    Duplicate(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    containers: Vec<ContainerSpec>,
}

/// Read-only lookup of container geometry.
///
/// Built once at startup and shared by reference; adding a tool type is a
/// data change (JSON file or [`GeometryCatalog::from_specs`]).
#[derive(Clone, Debug, Default)]
pub struct GeometryCatalog {
    specs: BTreeMap<String, ContainerSpec>,
}

impl GeometryCatalog {
    /// Validate and index the given specs.
    pub fn from_specs(
        specs: impl IntoIterator<Item = ContainerSpec>,
    ) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for spec in specs {
            spec.check().map_err(|field| CatalogError::InvalidSpec {
                type_id: spec.type_id.clone(),
                field,
            })?;
            if map.contains_key(&spec.type_id) {
                return Err(CatalogError::Duplicate(spec.type_id));
            }
            map.insert(spec.type_id.clone(), spec);
        }
        Ok(Self { specs: map })
    }

    /// Standard kitchen measuring tools.
    pub fn builtin() -> Self {
        use ContainerShape::{Cylinder, Hemisphere};
        use ToolClass::{Cup, Spoon};
        let specs = [
            ContainerSpec::new("teaspoon", Spoon, Hemisphere, 2.5, 4.0, 5.0),
            ContainerSpec::new("tablespoon", Spoon, Hemisphere, 3.0, 5.0, 15.0),
            ContainerSpec::new("small_bowl", Cup, Hemisphere, 6.0, 12.0, 500.0),
            ContainerSpec::new("small_cup", Cup, Cylinder, 8.0, 7.0, 250.0),
            ContainerSpec::new("large_cup", Cup, Cylinder, 10.0, 8.0, 350.0),
        ];
        let specs = specs
            .into_iter()
            .map(|s| (s.type_id.clone(), s))
            .collect();
        Self { specs }
    }

    /// Load a catalog from a JSON file of the form `{"containers": [...]}`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        Self::from_specs(file.containers)
    }

    /// Write the catalog as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = CatalogFile {
            containers: self.specs.values().cloned().collect(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    #[inline]
    pub fn get(&self, type_id: &str) -> Option<&ContainerSpec> {
        self.specs.get(type_id)
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
