//! Minimum-order-value screening over a replenishment batch.
//!
//! Suppliers refuse or surcharge orders under their minimum, so a run
//! that leaves a supplier with a token batch wastes a delivery slot.
//! Sub-minimum batches are deferred whole to the next cycle, unless a
//! line in the batch cannot wait that long.

use std::collections::HashMap;

use stockwell_engine::types::{Recommendation, SkuCandidate, Stage, TraceEvent};
use stockwell_policy::thresholds::{CRITICAL_BUFFER_DRY_DAYS, CRITICAL_BUFFER_FRESH_DAYS};

/// Zero out every supplier batch whose cash value lands under the
/// minimum order value.
///
/// Consignment lines neither count toward a batch nor get deferred. A
/// batch holding any critical line, an empty shelf or coverage too thin
/// to survive another cycle, ships regardless of size.
pub fn defer_small_batches(
    recommendations: Vec<Recommendation>,
    skus: &[SkuCandidate],
    min_order_value: f64,
) -> Vec<Recommendation> {
    let mut out = recommendations;
    if min_order_value <= 0.0 {
        return out;
    }

    let states: HashMap<&str, &SkuCandidate> =
        skus.iter().map(|s| (s.name.as_str(), s)).collect();
    let consigned = |rec: &Recommendation| {
        states
            .get(rec.product_name.as_str())
            .is_some_and(|s| s.is_consignment)
    };

    // Supplier -> (cash value, holds a critical line).
    let mut batches: HashMap<String, (f64, bool)> = HashMap::new();
    for rec in &out {
        if rec.quantity == 0 || consigned(rec) {
            continue;
        }
        let entry = batches.entry(rec.supplier.clone()).or_insert((0.0, false));
        entry.0 += rec.est_cost;
        if states
            .get(rec.product_name.as_str())
            .is_some_and(|s| is_critical(s))
        {
            entry.1 = true;
        }
    }

    let mut deferred = 0usize;
    for rec in out.iter_mut() {
        if rec.quantity == 0 || consigned(rec) {
            continue;
        }
        let value = match batches.get(rec.supplier.as_str()) {
            Some((value, critical)) if *value < min_order_value && !critical => *value,
            _ => continue,
        };
        rec.trace.push(TraceEvent::new(
            Stage::Guard,
            "mov-deferral",
            format!(
                "supplier batch {:.2} under minimum {:.2}, held for next cycle",
                value, min_order_value
            ),
            rec.quantity,
            0,
        ));
        rec.quantity = 0;
        rec.est_cost = 0.0;
        deferred += 1;
    }

    if deferred > 0 {
        log::info!("MOV screen: deferred {} lines across sub-minimum batches", deferred);
    }
    out
}

/// A line the store cannot leave for another cycle: empty shelf, or
/// coverage that runs out inside the supplier's lead time plus a safety
/// buffer.
fn is_critical(sku: &SkuCandidate) -> bool {
    if sku.stock_on_hand <= 0.0 {
        return true;
    }
    let buffer = if sku.is_fresh {
        CRITICAL_BUFFER_FRESH_DAYS
    } else {
        CRITICAL_BUFFER_DRY_DAYS
    };
    sku.coverage_days() < sku.lead_time_days + buffer
}
