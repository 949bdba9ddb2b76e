//! Ingredient density with state and temperature adjustments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Density multiplier measured at one temperature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperaturePoint {
    pub celsius: f64,
    pub multiplier: f64,
}

/// What the ingredient store knows about one ingredient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub base_density_g_per_ml: f64,
    /// Physical state (`"sifted"`, `"melted"`, ...) → density multiplier.
    #[serde(default)]
    pub states: BTreeMap<String, f64>,
    #[serde(default)]
    pub temperature_points: Vec<TemperaturePoint>,
}

impl IngredientRecord {
    pub fn new(name: impl Into<String>, base_density_g_per_ml: f64) -> Self {
        Self {
            name: name.into(),
            base_density_g_per_ml,
            states: BTreeMap::new(),
            temperature_points: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>, multiplier: f64) -> Self {
        self.states.insert(state.into(), multiplier);
        self
    }

    pub fn with_temperature(mut self, celsius: f64, multiplier: f64) -> Self {
        self.temperature_points.push(TemperaturePoint { celsius, multiplier });
        self
    }

    /// Multiplier of the point closest to `celsius`, if any are known.
    pub fn temperature_multiplier(&self, celsius: f64) -> Option<f64> {
        self.temperature_points
            .iter()
            .min_by(|a, b| {
                (a.celsius - celsius)
                    .abs()
                    .total_cmp(&(b.celsius - celsius).abs())
            })
            .map(|p| p.multiplier)
    }

    /// `base × state multiplier × nearest temperature multiplier`.
    ///
    /// Unknown states and missing temperature data leave the density as is.
    pub fn density(&self, state: Option<&str>, temperature_c: Option<f64>) -> f64 {
        let mut density = self.base_density_g_per_ml;
        if let Some(m) = state.and_then(|s| self.states.get(s)) {
            density *= m;
        }
        if let Some(m) = temperature_c.and_then(|t| self.temperature_multiplier(t)) {
            density *= m;
        }
        density
    }
}
