//! Replenishment decision engine.
//!
//! `decide` evaluates one SKU through a fixed rule order: hard blocks,
//! sunset wind-down, overstock zoning, the aging state machine, base
//! quantity, clamps and floors, then pack rounding. Pure and stateless;
//! `decide_batch` fans it out across SKUs with rayon.

use rayon::prelude::*;

use stockwell_policy::thresholds::{
    BASE_SAFETY_DAYS_DRY, BASE_SAFETY_DAYS_FRESH, MAX_PACK_OVERAGE_RATIO,
    QUALITY_PENALTY_FACTOR, QUALITY_PENALTY_RETURNS, SHELF_SAFETY_DAYS, SLOW_MOVER_MIN_PACK_RATIO,
    SUNSET_MINIMAL_FILL, TOP_CLASS_BUMP, TREND_BOOST, TREND_CUT, TREND_GROWTH_PCT,
};
use stockwell_policy::TierProfile;

use crate::overstock::{
    dynamic_upper_bound, is_strategic, projected_position_days, strong_override, zone_for,
    OverstockZone,
};
use crate::rounding::{round_to_pack, RoundDirection, StockoutRisk};
use crate::staleness::{classify, StaleClass, StaleReason};
use crate::types::{AbcClass, Confidence, Recommendation, SalesTrend, SkuCandidate, Stage, TraceEvent};

/// Per-run replenishment knobs. Standalone runs use the default; a run
/// with tier context takes the profile's presentation floor.
#[derive(Clone, Copy, Debug)]
pub struct ReplenishPolicy {
    /// Presentation floor (units) applied to positive orders. Zero
    /// disables the floor.
    pub min_display_qty: u32,
    pub max_overage_ratio: f64,
}

impl Default for ReplenishPolicy {
    fn default() -> Self {
        ReplenishPolicy {
            min_display_qty: 0,
            max_overage_ratio: MAX_PACK_OVERAGE_RATIO,
        }
    }
}

impl ReplenishPolicy {
    pub fn from_profile(profile: &TierProfile) -> Self {
        ReplenishPolicy {
            min_display_qty: profile.min_display_qty,
            ..ReplenishPolicy::default()
        }
    }
}

fn finish(sku: &SkuCandidate, qty: u32, confidence: Confidence, trace: Vec<TraceEvent>) -> Recommendation {
    Recommendation {
        product_name: sku.name.clone(),
        department: sku.department.clone(),
        supplier: sku.supplier.clone(),
        quantity: qty,
        confidence,
        est_cost: qty as f64 * sku.unit_cost(),
        trace,
    }
}

fn units(q: f64) -> u32 {
    q.max(0.0).round() as u32
}

/// Decide the order quantity for one SKU.
pub fn decide(sku: &SkuCandidate, policy: &ReplenishPolicy) -> Recommendation {
    let mut trace: Vec<TraceEvent> = Vec::new();

    if sku.purchase_blocked {
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "purchase-blocked",
            "purchase flag blocks all orders",
            0,
            0,
        ));
        return finish(sku, 0, Confidence::High, trace);
    }

    if sku.is_sunset {
        if sku.stock_on_hand > 0.0 {
            trace.push(TraceEvent::new(
                Stage::Replenish,
                "sunset-wind-down",
                format!("sunset line selling down {:.0} units", sku.stock_on_hand),
                0,
                0,
            ));
            return finish(sku, 0, Confidence::High, trace);
        }
        let qty = match sku.abc_class {
            AbcClass::A | AbcClass::B => SUNSET_MINIMAL_FILL,
            AbcClass::C => 0,
        };
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "sunset-minimal-fill",
            format!("{} class sunset line with empty shelf", sku.abc_class),
            0,
            qty,
        ));
        return finish(sku, qty, Confidence::High, trace);
    }

    let bound = dynamic_upper_bound(sku);
    let overridden = strong_override(sku);
    let zone = zone_for(sku, bound);
    if zone == OverstockZone::Red && !overridden {
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "overstock-red",
            format!(
                "projected {:.1}d cover exceeds hard limit {:.1}d",
                projected_position_days(sku),
                bound * 1.2
            ),
            0,
            0,
        ));
        return finish(sku, 0, Confidence::High, trace);
    }

    let stale = classify(sku);
    if let StaleClass::Block(reason) = stale {
        let rule = match reason {
            StaleReason::FreshAged => "stale-fresh-aged",
            StaleReason::FreshNoSales => "stale-fresh-no-sales",
            StaleReason::DryNoSales => "stale-dead-stock",
        };
        trace.push(TraceEvent::new(
            Stage::Replenish,
            rule,
            format!("{:.0}d since delivery", sku.days_since_delivery),
            0,
            0,
        ));
        return finish(sku, 0, Confidence::High, trace);
    }

    // Base quantity: historical baseline when it exists, else a computed
    // net requirement.
    let eff = sku.effective_daily();
    let (mut qty, confidence) = if sku.avg_order_qty > 0.0 {
        let mut q = sku.avg_order_qty;
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "historical-baseline",
            format!("average past order {:.0}", q),
            0,
            units(q),
        ));
        match sku.sales_trend {
            SalesTrend::Growing if sku.sales_trend_pct > TREND_GROWTH_PCT => {
                let before = units(q);
                q *= TREND_BOOST;
                trace.push(TraceEvent::new(
                    Stage::Replenish,
                    "trend-boost",
                    format!("growing {:.0}%", sku.sales_trend_pct),
                    before,
                    units(q),
                ));
            }
            SalesTrend::Declining => {
                let before = units(q);
                q *= TREND_CUT;
                trace.push(TraceEvent::new(
                    Stage::Replenish,
                    "trend-cut",
                    format!("declining {:.0}%", sku.sales_trend_pct.abs()),
                    before,
                    units(q),
                ));
            }
            _ => {}
        }
        (q, Confidence::High)
    } else if sku.daily_demand_90d > 0.0 || sku.daily_demand_30d > 0.0 {
        let base_safety = if sku.is_fresh {
            BASE_SAFETY_DAYS_FRESH
        } else {
            BASE_SAFETY_DAYS_DRY
        };
        let buffer = base_safety
            * (1.0 + 2.0 * sku.demand_cv)
            * (1.0 + (1.0 - sku.supplier_reliability));
        let mut coverage = sku.lead_time_days + sku.order_frequency_days + buffer;
        if sku.is_fresh {
            if let Some(shelf) = sku.shelf_life_days {
                coverage = coverage.min((shelf - SHELF_SAFETY_DAYS).max(1.0));
            }
        }
        let target = eff * coverage;
        let mut net = (target - sku.stock_on_hand - sku.on_order).max(0.0);
        if sku.abc_class == AbcClass::A {
            net *= TOP_CLASS_BUMP;
        }
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "net-requirement",
            format!("{:.1}d target cover at {:.2}/day", coverage, eff),
            0,
            units(net),
        ));
        (net, Confidence::Medium)
    } else {
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "no-data",
            "no order history and no sales".to_string(),
            0,
            0,
        ));
        (0.0, Confidence::Low)
    };

    // Ordered clamps. Each only ever lowers the quantity, except the
    // strategic health floor and the MOQ/presentation floors.
    if let StaleClass::Dampen { factor } = stale {
        let before = units(qty);
        qty *= factor;
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "early-warning-dampener",
            format!("{:.0}d idle, approaching slow-mover age", sku.days_since_delivery),
            before,
            units(qty),
        ));
    }

    let slow_mover_cap = match stale {
        StaleClass::CoverageCap { days } => Some(("stale-coverage-cap", days)),
        StaleClass::RescueFill { days } => Some(("rescue-fill", days)),
        _ => None,
    };
    if let Some((rule, cap_days)) = slow_mover_cap {
        let mut max_order = (cap_days * eff - sku.stock_on_hand).max(0.0);
        if max_order < sku.pack_size as f64 * SLOW_MOVER_MIN_PACK_RATIO {
            max_order = 0.0;
        }
        if qty > max_order {
            let before = units(qty);
            qty = max_order;
            trace.push(TraceEvent::new(
                Stage::Replenish,
                rule,
                format!("post-order cover capped at {:.0}d", cap_days),
                before,
                units(qty),
            ));
        }
    }

    if !overridden {
        let max_order = (bound * eff - sku.stock_on_hand - sku.on_order).max(0.0);
        if qty > max_order {
            let before = units(qty);
            if zone == OverstockZone::Yellow && is_strategic(sku) {
                let health_min = sku.moq.max(1) as f64;
                qty = max_order.max(health_min);
                trace.push(TraceEvent::new(
                    Stage::Replenish,
                    "health-floor",
                    format!("yellow zone, strategic line held at {:.0}", qty),
                    before,
                    units(qty),
                ));
            } else {
                qty = max_order;
                trace.push(TraceEvent::new(
                    Stage::Replenish,
                    "overstock-cap",
                    format!("capped to keep cover within {:.1}d", bound),
                    before,
                    units(qty),
                ));
            }
        }
    }

    let is_slow_mover = slow_mover_cap.is_some();
    if qty > 0.0 && !is_slow_mover {
        if sku.moq > 0 && qty < sku.moq as f64 {
            let before = units(qty);
            qty = sku.moq as f64;
            trace.push(TraceEvent::new(
                Stage::Replenish,
                "moq-floor",
                format!("supplier minimum {}", sku.moq),
                before,
                units(qty),
            ));
        }
        if qty < policy.min_display_qty as f64 {
            let before = units(qty);
            qty = policy.min_display_qty as f64;
            trace.push(TraceEvent::new(
                Stage::Replenish,
                "display-floor",
                format!("presentation minimum {}", policy.min_display_qty),
                before,
                units(qty),
            ));
        }
    }

    if sku.expiry_return_value > QUALITY_PENALTY_RETURNS {
        let before = units(qty);
        qty *= QUALITY_PENALTY_FACTOR;
        trace.push(TraceEvent::new(
            Stage::Replenish,
            "quality-penalty",
            format!("expiry returns {:.0} against supplier", sku.expiry_return_value),
            before,
            units(qty),
        ));
    }

    let risk = StockoutRisk::classify(sku.stock_on_hand, sku.coverage_days());
    let rounded = round_to_pack(
        qty,
        sku.pack_size,
        sku.is_key_sku,
        risk,
        policy.max_overage_ratio,
    );
    if rounded.direction != RoundDirection::Unchanged || rounded.qty != units(qty) {
        trace.push(TraceEvent::new(
            Stage::Rounding,
            "pack-rounding",
            format!("{} ({})", rounded.direction, rounded.reason),
            units(qty),
            rounded.qty,
        ));
    }

    finish(sku, rounded.qty, confidence, trace)
}

/// Decide a whole batch in parallel. Output order matches input order.
pub fn decide_batch(skus: &[SkuCandidate], policy: &ReplenishPolicy) -> Vec<Recommendation> {
    skus.par_iter().map(|sku| decide(sku, policy)).collect()
}
