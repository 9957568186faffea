//! File loaders for the three external configuration surfaces.
//!
//! Every loader reads, parses, validates, and logs what it found. Absent
//! files are the caller's concern (compiled-in defaults exist for tiers and
//! staples; an empty weight table routes all spend through GENERAL).

use std::fs;
use std::path::Path;

use crate::departments::StapleRegistry;
use crate::error::PolicyResult;
use crate::tiers::TierTable;
use crate::wallets::CapitalWeights;

/// Load and validate a tier keyframe table from JSON.
pub fn load_tier_table<P: AsRef<Path>>(path: P) -> PolicyResult<TierTable> {
    let raw = fs::read_to_string(&path)?;
    let table = TierTable::from_json_str(&raw)?;
    log::info!(
        "Loaded {} tier keyframes from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Load and validate a department capital-weight table from JSON.
pub fn load_capital_weights<P: AsRef<Path>>(path: P) -> PolicyResult<CapitalWeights> {
    let raw = fs::read_to_string(&path)?;
    let weights = CapitalWeights::from_json_str(&raw)?;
    log::info!("Loaded capital weights from {}", path.as_ref().display());
    Ok(weights)
}

/// Load the curated staple list from JSON.
pub fn load_staples<P: AsRef<Path>>(path: P) -> PolicyResult<StapleRegistry> {
    let raw = fs::read_to_string(&path)?;
    let registry = StapleRegistry::from_json_str(&raw)?;
    log::info!(
        "Loaded {} staples from {}",
        registry.len(),
        path.as_ref().display()
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = load_tier_table("/nonexistent/tiers.json").unwrap_err();
        assert!(matches!(err, crate::error::PolicyError::Io(_)));
    }

    #[test]
    fn staple_list_parses_from_json() {
        let reg = StapleRegistry::from_json_str(r#"["Supa Loaf 400g", "EXE FLOUR 2KG"]"#).unwrap();
        assert_eq!(reg.len(), 2);
        assert!(reg.is_listed("supa loaf 400g"));
    }
}
