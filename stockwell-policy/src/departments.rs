//! Department sets and the staple registry.
//!
//! Single source of truth for essential/staple department categorization,
//! used across width filtering, demand scaling, and depth prioritization.

use std::collections::HashSet;

use crate::error::PolicyResult;
use crate::thresholds::STAPLE_VELOCITY_FLOOR;

/// Departments a store cannot credibly trade without.
pub const ESSENTIAL_DEPARTMENTS: &[&str] = &[
    // Dairy & fresh
    "FRESH MILK",
    "BREAD",
    "EGGS",
    "YOGHURT",
    "BUTTER",
    // Pantry staples
    "FLOUR",
    "COOKING OIL",
    "SUGAR",
    "RICE",
    "SALT",
    // Beverages
    "MINERAL WATER",
    "SODA",
    // Household basics
    "TOILET ROLL",
    "TISSUE PAPER",
    // Other staples
    "BREAKFAST CEREALS",
    "GHEE",
    "BEANS",
    "LENTILS",
    "DAIRY",
    "PULSES",
];

/// Survival-staple departments prioritized for depth in small stores.
pub const FAST_FIVE_DEPARTMENTS: &[&str] =
    &["FRESH MILK", "BREAD", "COOKING OIL", "FLOUR", "SUGAR"];

/// Spoilage-risk departments.
pub const FRESH_DEPARTMENTS: &[&str] = &[
    "FRESH MILK",
    "BREAD",
    "POULTRY",
    "MEAT",
    "VEGETABLES",
    "FRUITS",
    "BAKERY FOODPLUS",
    "DELICATESSEN",
    "PASTRY",
    "EGGS",
    "YOGHURT",
    "CHEESE",
    "BUTTER",
];

/// Departments produced in-house, never purchased from suppliers.
/// The second entry is a misspelled variant that appears in source data.
pub const INTERNAL_PRODUCTION_DEPARTMENTS: &[&str] = &["BAKERY FOODPLUS", "BALERY FOODPLU"];

/// Canonical department/product key: trimmed, uppercased.
pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

pub fn is_essential_department(department: &str) -> bool {
    let d = normalize(department);
    ESSENTIAL_DEPARTMENTS.contains(&d.as_str())
}

pub fn is_fast_five(department: &str) -> bool {
    let d = normalize(department);
    FAST_FIVE_DEPARTMENTS.contains(&d.as_str())
}

pub fn is_fresh_department(department: &str) -> bool {
    let d = normalize(department);
    FRESH_DEPARTMENTS.contains(&d.as_str())
}

pub fn is_internal_production(department: &str) -> bool {
    let d = normalize(department);
    INTERNAL_PRODUCTION_DEPARTMENTS.contains(&d.as_str())
}

/// Curated staple allow-list plus the velocity fallback heuristic.
///
/// The explicit list is the golden record; the fallback catches essential
/// items the curation missed but the sales floor clearly treats as staples.
#[derive(Debug, Clone, Default)]
pub struct StapleRegistry {
    names: HashSet<String>,
}

impl StapleRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StapleRegistry {
            names: names.into_iter().map(|n| normalize(n.as_ref())).collect(),
        }
    }

    /// Parse the external JSON surface: `[ "<PRODUCT NAME>", ... ]`.
    pub fn from_json_str(raw: &str) -> PolicyResult<Self> {
        let names: Vec<String> = serde_json::from_str(raw)?;
        Ok(Self::new(names))
    }

    /// Explicit-list membership only.
    pub fn is_listed(&self, product_name: &str) -> bool {
        self.names.contains(&normalize(product_name))
    }

    /// Staple test: curated list, or essential department moving at staple
    /// velocity.
    pub fn is_staple(&self, product_name: &str, department: &str, velocity: f64) -> bool {
        if self.is_listed(product_name) {
            return true;
        }
        is_essential_department(department) && velocity >= STAPLE_VELOCITY_FLOOR
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
