use std::collections::{HashMap, HashSet};

use stockwell_policy::departments::is_essential_department;

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::types::{SkipReason, Stage};

/// Supplier consolidation for small stores.
///
/// A small store cannot manage thirty staple suppliers. Suppliers serving
/// essential departments are ranked by revenue potential (velocity times
/// price summed over their candidates) and only the tier's top N keep
/// their essential-department lines; the rest are cut before width spends
/// anything. Non-essential lines of a cut supplier are untouched.
pub struct SupplierConsolidation;

impl AllocationPass for SupplierConsolidation {
    fn enable(&self, run: &AllocationRun) -> bool {
        run.is_small()
    }

    fn run(&self, run: &mut AllocationRun) {
        let limit = run.profile.staple_supplier_limit as usize;

        let mut revenue: HashMap<&str, f64> = HashMap::new();
        for line in &run.lines {
            if is_essential_department(&line.sku.department) {
                *revenue.entry(line.sku.supplier.as_str()).or_insert(0.0) +=
                    line.sku.velocity() * line.sku.unit_price;
            }
        }
        if revenue.len() <= limit {
            return;
        }

        let mut ranked: Vec<(&str, f64)> = revenue.into_iter().collect();
        // Name tie-break keeps the cut deterministic across runs.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        let kept: HashSet<String> = ranked
            .iter()
            .take(limit)
            .map(|(name, _)| (*name).to_string())
            .collect();
        let cut_count = ranked.len() - limit;
        log::info!(
            "Supplier consolidation: keeping {} of {} essential-department suppliers",
            limit,
            ranked.len()
        );

        for idx in 0..run.lines.len() {
            let (supplier, essential) = {
                let sku = &run.lines[idx].sku;
                (
                    sku.supplier.clone(),
                    is_essential_department(&sku.department),
                )
            };
            if essential && !kept.contains(&supplier) {
                run.lines[idx].excluded = true;
                run.skip_line(
                    idx,
                    Stage::Consolidation,
                    "supplier-cut",
                    format!("{} outside top {} by revenue", supplier, limit),
                    SkipReason::SupplierConsolidated,
                );
            }
        }
        log::debug!("Supplier consolidation cut {} suppliers", cut_count);
    }
}
