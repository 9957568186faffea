//! Aging state machine for replenishment.
//!
//! Classifies how long a line has sat since its last delivery and what
//! that means for ordering. The classes are mutually exclusive and the
//! rules run in strict order, so a line lands in exactly one state. The
//! same classification drives both the replenishment engine and the
//! safety guard, which is what makes the guard idempotent.

use serde::Serialize;

use stockwell_policy::thresholds::{
    DRY_IDLE_BLOCK_DAYS, DRY_SLOW_CAP_DAYS, EARLY_WARNING_FACTOR, EARLY_WARNING_FROM_DAYS,
    FRESH_IDLE_BLOCK_DAYS, FRESH_IDLE_WATCH_DAYS, FRESH_WATCH_CAP_DAYS, RESCUE_CAP_DAYS,
};

use crate::types::{AbcClass, SkuCandidate};

/// Why an aged line is blocked from ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StaleReason {
    /// Fresh line idle past the hard block age.
    FreshAged,
    /// Fresh line on the watchlist with no sales at all.
    FreshNoSales,
    /// Dry line at confirmed slow-mover age with no sales at all.
    DryNoSales,
}

/// Aging class of one line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum StaleClass {
    /// Normal trading line; no aging rule applies.
    Active,
    /// Never order.
    Block(StaleReason),
    /// Orderable, but post-order coverage is capped at `days`. Orders
    /// smaller than half a pack collapse to zero.
    CoverageCap { days: f64 },
    /// A-class line at slow-mover age with no stock on the shelf: allow a
    /// minimal fill, coverage capped at `days`.
    RescueFill { days: f64 },
    /// Early-warning window; the computed quantity is dampened by `factor`.
    Dampen { factor: f64 },
}

impl StaleClass {
    pub fn is_block(&self) -> bool {
        matches!(self, StaleClass::Block(_))
    }
}

/// Classify a line's aging state. Rules are ordered; the first match wins.
pub fn classify(sku: &SkuCandidate) -> StaleClass {
    let idle = sku.days_since_delivery;
    let no_sales = sku.units_sold_90d <= 0.0;

    if sku.is_fresh {
        if idle > FRESH_IDLE_BLOCK_DAYS {
            return StaleClass::Block(StaleReason::FreshAged);
        }
        if idle > FRESH_IDLE_WATCH_DAYS {
            if no_sales {
                return StaleClass::Block(StaleReason::FreshNoSales);
            }
            return StaleClass::CoverageCap {
                days: FRESH_WATCH_CAP_DAYS,
            };
        }
    } else if idle >= DRY_IDLE_BLOCK_DAYS {
        if no_sales {
            // Zero-stock A-class lines earn a rescue instead: an empty
            // shelf on a top revenue line costs more than a small bet.
            if sku.abc_class == AbcClass::A && sku.stock_on_hand <= 0.0 {
                return StaleClass::RescueFill {
                    days: RESCUE_CAP_DAYS,
                };
            }
            return StaleClass::Block(StaleReason::DryNoSales);
        }
        return StaleClass::CoverageCap {
            days: DRY_SLOW_CAP_DAYS,
        };
    }

    if idle >= EARLY_WARNING_FROM_DAYS {
        return StaleClass::Dampen {
            factor: EARLY_WARNING_FACTOR,
        };
    }

    StaleClass::Active
}
