//! Last-line enforcement over finished recommendations.
//!
//! The replenishment engine already applies the aging and pack rules
//! while deciding. The guard re-derives them from current SKU state so a
//! quantity that arrives from anywhere else, a manual override or an
//! older run, still lands inside the same fences before export. Every
//! rule is written as a cap or a floor over observable state, so running
//! the guard on its own output changes no quantity.

use std::collections::HashMap;

use stockwell_engine::rounding::{round_to_pack, RoundDirection, StockoutRisk};
use stockwell_engine::staleness::{classify, StaleClass, StaleReason};
use stockwell_engine::types::{Recommendation, SkuCandidate, Stage, TraceEvent};
use stockwell_policy::thresholds::{
    DRY_SLOW_CAP_DAYS, EARLY_WARNING_FACTOR, MAX_PACK_OVERAGE_RATIO, SLOW_MOVER_MIN_PACK_RATIO,
};

/// Which rule set the guard applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardMode {
    /// Day-one allocation output. A store with no trading history has
    /// nothing to age, so only presentation minimums and pack alignment
    /// apply.
    Greenfield,
    /// Ongoing replenishment output: the full aging rule set plus pack
    /// alignment.
    Replenishment,
}

/// Enforce the guard rules over a finished batch.
///
/// Quantities are matched to state by product name; a recommendation
/// with no matching SKU passes through untouched. Adjustments append
/// [`Stage::Guard`] trace events and recompute the cost estimate.
pub fn enforce(
    recommendations: Vec<Recommendation>,
    skus: &[SkuCandidate],
    mode: GuardMode,
) -> Vec<Recommendation> {
    let states: HashMap<&str, &SkuCandidate> =
        skus.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut out = recommendations;
    let mut adjusted = 0usize;
    let mut unmatched = 0usize;
    for rec in out.iter_mut() {
        match states.get(rec.product_name.as_str()) {
            Some(sku) => {
                if enforce_one(rec, sku, mode) {
                    adjusted += 1;
                }
            }
            None => unmatched += 1,
        }
    }

    if unmatched > 0 {
        log::warn!("Guard: {} recommendations had no matching SKU state", unmatched);
    }
    if adjusted > 0 {
        log::info!(
            "Guard ({:?}): adjusted {} of {} recommendations",
            mode,
            adjusted,
            out.len()
        );
    }
    out
}

/// Apply the mode's rules to one recommendation. Returns true when the
/// quantity moved.
fn enforce_one(rec: &mut Recommendation, sku: &SkuCandidate, mode: GuardMode) -> bool {
    let before = rec.quantity;
    let pack = sku.pack_size.max(1);

    match mode {
        GuardMode::Greenfield => {
            // A token opening order looks broken on the shelf. Zero stays
            // zero; anything positive is at least one sellable pack.
            if rec.quantity > 0 && rec.quantity < pack {
                rec.trace.push(TraceEvent::new(
                    Stage::Guard,
                    "display-minimum",
                    format!("below one {}-unit pack", pack),
                    rec.quantity,
                    pack,
                ));
                rec.quantity = pack;
            }
        }
        GuardMode::Replenishment => {
            apply_aging_rules(rec, sku);
        }
    }

    // Pack alignment last, over whatever the caps left standing. Zero is
    // final: the guard never revives a zeroed line here.
    if rec.quantity > 0 {
        let risk = StockoutRisk::classify(sku.stock_on_hand, sku.coverage_days());
        let rounded = round_to_pack(
            rec.quantity as f64,
            sku.pack_size,
            sku.is_key_sku,
            risk,
            MAX_PACK_OVERAGE_RATIO,
        );
        if rounded.direction != RoundDirection::Unchanged && rounded.qty != rec.quantity {
            rec.trace.push(TraceEvent::new(
                Stage::Guard,
                "pack-rounding",
                format!("{} ({})", rounded.direction, rounded.reason),
                rec.quantity,
                rounded.qty,
            ));
            rec.quantity = rounded.qty;
        }
    }

    if rec.quantity != before {
        rec.est_cost = rec.quantity as f64 * sku.unit_cost();
        true
    } else {
        false
    }
}

/// Re-derive the aging class and enforce it as a hard ceiling.
fn apply_aging_rules(rec: &mut Recommendation, sku: &SkuCandidate) {
    match classify(sku) {
        StaleClass::Block(reason) => {
            if rec.quantity > 0 {
                let rule = match reason {
                    StaleReason::FreshAged => "stale-fresh-aged",
                    StaleReason::FreshNoSales => "stale-fresh-no-sales",
                    StaleReason::DryNoSales => "stale-dead-stock",
                };
                rec.trace.push(TraceEvent::new(
                    Stage::Guard,
                    rule,
                    format!("{:.0}d since delivery", sku.days_since_delivery),
                    rec.quantity,
                    0,
                ));
                rec.quantity = 0;
            }
        }
        StaleClass::CoverageCap { days } => {
            let allowed = capped_order(sku, days);
            cap_to(
                rec,
                allowed,
                "stale-coverage-cap",
                format!("post-order cover capped at {:.0}d", days),
            );
        }
        StaleClass::RescueFill { days } => {
            // The engine's rescue places one pack on an empty A-class
            // shelf. Floor the ceiling there so the guard cannot undo it.
            let allowed = capped_order(sku, days).max(sku.pack_size.max(1) as f64);
            cap_to(
                rec,
                allowed,
                "rescue-fill",
                format!("rescue cover capped at {:.0}d", days),
            );
        }
        StaleClass::Dampen { factor } => {
            let allowed =
                factor * (DRY_SLOW_CAP_DAYS * sku.effective_daily() - sku.stock_on_hand).max(0.0);
            cap_to(
                rec,
                allowed,
                "early-warning-cap",
                format!(
                    "{:.0}d idle, cover held to {:.0}% of the slow-mover cap",
                    sku.days_since_delivery,
                    EARLY_WARNING_FACTOR * 100.0
                ),
            );
        }
        StaleClass::Active => {}
    }
}

/// Coverage-capped order ceiling with the half-pack rule: an allowance
/// under half a pack is not worth shipping and collapses to zero.
fn capped_order(sku: &SkuCandidate, cap_days: f64) -> f64 {
    let max_order = (cap_days * sku.effective_daily() - sku.stock_on_hand).max(0.0);
    if max_order < sku.pack_size as f64 * SLOW_MOVER_MIN_PACK_RATIO {
        0.0
    } else {
        max_order
    }
}

fn cap_to(rec: &mut Recommendation, allowed: f64, rule: &'static str, detail: String) {
    if (rec.quantity as f64) > allowed {
        let capped = allowed.max(0.0).floor() as u32;
        rec.trace.push(TraceEvent::new(Stage::Guard, rule, detail, rec.quantity, capped));
        rec.quantity = capped;
    }
}
