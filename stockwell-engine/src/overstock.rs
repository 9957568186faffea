//! Dynamic overstock bounds and zone classification.
//!
//! The upper bound is a coverage ceiling in days, widened for volatile
//! demand, long lead times and unreliable suppliers, and tightened for
//! slow CZ-class lines down to their reorder rhythm. Zones compare the
//! projected position (on hand plus on order) against the bound.

use serde::Serialize;

use stockwell_policy::thresholds::{
    BASE_UPPER_COVERAGE_DAYS, CZ_BOUND_BIWEEKLY_DAYS, CZ_BOUND_SLOW_DAYS, CZ_BOUND_WEEKLY_DAYS,
    CZ_FREQ_BIWEEKLY_DAYS, CZ_FREQ_WEEKLY_DAYS, MARGIN_WIDEN_HIGH_FACTOR, MARGIN_WIDEN_HIGH_PCT,
    MARGIN_WIDEN_MID_FACTOR, MARGIN_WIDEN_MID_PCT, OVERSTOCK_HARD_FACTOR, STRATEGIC_RECENCY_DAYS,
};

use crate::types::{AbcClass, SkuCandidate, XyzClass};

/// Volatility gain applied to the bound adjustment, dry goods.
const VOLATILITY_GAIN_DRY: f64 = 1.0;

/// Volatility gain applied to the bound adjustment, fresh goods. Halved
/// so spoilage risk is never traded away for volatility cover.
const VOLATILITY_GAIN_FRESH: f64 = 0.5;

/// Overstock zone over the projected position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OverstockZone {
    Green,
    Yellow,
    Red,
}

/// Coverage ceiling (days) for one line.
///
/// Base is 45 days, except CZ-class lines which shrink to their supplier
/// rhythm (weekly 21, bi-weekly 28, slower 35). The volatility adjustment
/// can at most double the base; margin widening applies on top.
pub fn dynamic_upper_bound(sku: &SkuCandidate) -> f64 {
    let base = if sku.abc_class == AbcClass::C && sku.xyz_class == XyzClass::Z {
        if sku.order_frequency_days <= CZ_FREQ_WEEKLY_DAYS {
            CZ_BOUND_WEEKLY_DAYS
        } else if sku.order_frequency_days <= CZ_FREQ_BIWEEKLY_DAYS {
            CZ_BOUND_BIWEEKLY_DAYS
        } else {
            CZ_BOUND_SLOW_DAYS
        }
    } else {
        BASE_UPPER_COVERAGE_DAYS
    };

    let gain = if sku.is_fresh {
        VOLATILITY_GAIN_FRESH
    } else {
        VOLATILITY_GAIN_DRY
    };
    let adjustment = gain
        * (sku.demand_cv * sku.effective_daily())
        * (sku.lead_time_days / 7.0)
        * (1.0 + (1.0 - sku.supplier_reliability));

    let mut bound = (base + adjustment).clamp(base, base * 2.0);

    let margin = sku.margin_percent();
    if margin > MARGIN_WIDEN_HIGH_PCT {
        bound *= MARGIN_WIDEN_HIGH_FACTOR;
    } else if margin > MARGIN_WIDEN_MID_PCT {
        bound *= MARGIN_WIDEN_MID_FACTOR;
    }

    bound
}

/// Projected coverage in days: stock on hand plus inbound orders.
pub fn projected_position_days(sku: &SkuCandidate) -> f64 {
    (sku.stock_on_hand + sku.on_order) / sku.effective_daily()
}

/// Zone the projected position against a bound.
pub fn zone_for(sku: &SkuCandidate, bound_days: f64) -> OverstockZone {
    let position = projected_position_days(sku);
    if position > bound_days * OVERSTOCK_HARD_FACTOR {
        OverstockZone::Red
    } else if position > bound_days {
        OverstockZone::Yellow
    } else {
        OverstockZone::Green
    }
}

/// Promotions and supplier-contracted MOQs outrank zone enforcement.
pub fn strong_override(sku: &SkuCandidate) -> bool {
    sku.on_promotion || sku.moq > 0
}

/// A line worth keeping on the shelf even when the zone says stop
/// ordering: open, not sunsetting, commercially important and recently
/// supplied.
pub fn is_strategic(sku: &SkuCandidate) -> bool {
    if sku.purchase_blocked || sku.is_sunset {
        return false;
    }
    if sku.days_since_delivery > STRATEGIC_RECENCY_DAYS {
        return false;
    }
    if sku.is_key_sku || sku.is_top_seller {
        return true;
    }
    matches!(
        (sku.abc_class, sku.xyz_class),
        (AbcClass::A, XyzClass::X) | (AbcClass::A, XyzClass::Y) | (AbcClass::B, XyzClass::X)
    )
}
