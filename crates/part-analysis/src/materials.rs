//! Material density lookup.

use std::collections::HashMap;

/// Material assumed when none is given or the given one is unknown.
pub const DEFAULT_MATERIAL: &str = "steel";

/// Density of [`DEFAULT_MATERIAL`] (kg/m³).
pub const STEEL_DENSITY: f64 = 7850.0;

/// Built-in densities in kg/m³.
const STANDARD_DENSITIES: &[(&str, f64)] = &[
    ("steel", STEEL_DENSITY),
    ("stainless steel", 8000.0),
    ("cast iron", 7200.0),
    ("aluminum", 2700.0),
    ("aluminium", 2700.0),
    ("brass", 8500.0),
    ("bronze", 8800.0),
    ("copper", 8960.0),
    ("abs", 1040.0),
    ("pla", 1240.0),
    ("nylon", 1150.0),
];

/// Result of a density lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Density {
    /// kg/m³
    pub value: f64,
    /// True when the material was not in the table and steel was used.
    pub fallback: bool,
}

/// Immutable mapping from lower-cased material name to density (kg/m³).
#[derive(Debug, Clone)]
pub struct MaterialDensityTable {
    densities: HashMap<String, f64>,
}

impl MaterialDensityTable {
    /// The built-in table.
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_DENSITIES.iter().map(|&(k, v)| (k.to_string(), v)))
    }

    /// The built-in table with `overrides` added or replacing entries.
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut table = Self::standard();
        for (name, density) in overrides {
            table.densities.insert(normalize(&name), density);
        }
        table
    }

    fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            densities: entries.into_iter().map(|(k, v)| (normalize(&k), v)).collect(),
        }
    }

    /// Case-insensitive lookup, falling back to steel for unknown names.
    pub fn lookup(&self, material: &str) -> Density {
        match self.densities.get(&normalize(material)) {
            Some(&value) => Density {
                value,
                fallback: false,
            },
            None => Density {
                value: self.fallback_density(),
                fallback: true,
            },
        }
    }

    pub fn density(&self, material: &str) -> f64 {
        self.lookup(material).value
    }

    pub fn contains(&self, material: &str) -> bool {
        self.densities.contains_key(&normalize(material))
    }

    fn fallback_density(&self) -> f64 {
        self.densities
            .get(DEFAULT_MATERIAL)
            .copied()
            .unwrap_or(STEEL_DENSITY)
    }
}

impl Default for MaterialDensityTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
