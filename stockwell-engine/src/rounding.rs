//! Pack rounding resolver.
//!
//! Converts a fractional target quantity into a supplier-pack-aligned
//! order. Every call produces a concrete quantity and a stated reason;
//! the caller never re-derives the decision.

use serde::Serialize;
use std::fmt;

use stockwell_policy::thresholds::{HIGH_RISK_COVER_DAYS, LOW_RISK_COVER_DAYS};

/// Stockout exposure of the SKU being rounded. Biases the rounding
/// direction: High prefers up, Low prefers down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StockoutRisk {
    Low,
    Medium,
    High,
}

impl StockoutRisk {
    /// Classify from current stock and coverage. Zero or negative stock is
    /// always High; ample coverage is Low.
    pub fn classify(stock_on_hand: f64, coverage_days: f64) -> Self {
        if stock_on_hand <= 0.0 || coverage_days < HIGH_RISK_COVER_DAYS {
            StockoutRisk::High
        } else if coverage_days > LOW_RISK_COVER_DAYS {
            StockoutRisk::Low
        } else {
            StockoutRisk::Medium
        }
    }
}

/// Direction the quantity moved relative to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RoundDirection {
    Up,
    Down,
    Unchanged,
}

impl fmt::Display for RoundDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundDirection::Up => write!(f, "up"),
            RoundDirection::Down => write!(f, "down"),
            RoundDirection::Unchanged => write!(f, "none"),
        }
    }
}

/// Outcome of one rounding decision.
#[derive(Clone, Debug, Serialize)]
pub struct RoundedOrder {
    pub qty: u32,
    pub direction: RoundDirection,
    pub reason: &'static str,
    /// Units ordered beyond the target (0 when rounding down).
    pub overage_units: u32,
    /// Units short of the target (0 when rounding up).
    pub shortage_units: u32,
}

impl RoundedOrder {
    fn new(qty: u32, direction: RoundDirection, reason: &'static str, target: f64) -> Self {
        let overage = (qty as f64 - target).max(0.0);
        let shortage = (target - qty as f64).max(0.0);
        RoundedOrder {
            qty,
            direction,
            reason,
            overage_units: overage as u32,
            shortage_units: shortage as u32,
        }
    }
}

/// Round `target_qty` to a whole number of supplier packs.
///
/// Decision heuristic:
/// - key SKUs and High risk round up while the overage stays within
///   `max_overage_ratio`, else down;
/// - Low risk rounds down while the shortage stays within 10%, else up;
/// - Medium risk takes whichever direction deviates less, ties up.
///
/// A non-positive target normally means no order, but key/High-risk SKUs
/// get one pack so the shelf never goes empty on a critical line.
pub fn round_to_pack(
    target_qty: f64,
    pack_size: u32,
    is_key_sku: bool,
    risk: StockoutRisk,
    max_overage_ratio: f64,
) -> RoundedOrder {
    if pack_size == 0 {
        let qty = target_qty.round().max(0.0) as u32;
        return RoundedOrder::new(qty, RoundDirection::Unchanged, "no pack constraint", target_qty);
    }

    let pack = pack_size as f64;
    let packs_exact = target_qty / pack;
    let qty_down = packs_exact.floor() * pack;
    let qty_up = packs_exact.ceil() * pack;

    if target_qty <= 0.0 {
        if is_key_sku || risk == StockoutRisk::High {
            return RoundedOrder::new(
                pack_size,
                RoundDirection::Up,
                "critical line, minimum one pack",
                target_qty,
            );
        }
        return RoundedOrder::new(0, RoundDirection::Down, "nothing to order", target_qty);
    }

    if (packs_exact - packs_exact.round()).abs() < 1e-9 {
        let qty = target_qty.round() as u32;
        return RoundedOrder::new(qty, RoundDirection::Unchanged, "already pack aligned", target_qty);
    }

    let overage_ratio_up = (qty_up - target_qty).max(0.0) / target_qty;
    let shortage_ratio_down = (target_qty - qty_down).max(0.0) / target_qty;

    if is_key_sku || risk == StockoutRisk::High {
        if overage_ratio_up <= max_overage_ratio {
            RoundedOrder::new(
                qty_up as u32,
                RoundDirection::Up,
                "critical line, overage within tolerance",
                target_qty,
            )
        } else {
            RoundedOrder::new(
                qty_down as u32,
                RoundDirection::Down,
                "critical line but overage beyond tolerance",
                target_qty,
            )
        }
    } else if risk == StockoutRisk::Low {
        if shortage_ratio_down <= 0.10 {
            RoundedOrder::new(
                qty_down as u32,
                RoundDirection::Down,
                "low risk, small shortage acceptable",
                target_qty,
            )
        } else {
            RoundedOrder::new(
                qty_up as u32,
                RoundDirection::Up,
                "low risk but shortage too large",
                target_qty,
            )
        }
    } else if overage_ratio_up <= shortage_ratio_down {
        RoundedOrder::new(
            qty_up as u32,
            RoundDirection::Up,
            "medium risk, up is closer",
            target_qty,
        )
    } else {
        RoundedOrder::new(
            qty_down as u32,
            RoundDirection::Down,
            "medium risk, down is closer",
            target_qty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwell_policy::thresholds::MAX_PACK_OVERAGE_RATIO;

    fn round(target: f64, pack: u32, key: bool, risk: StockoutRisk) -> RoundedOrder {
        round_to_pack(target, pack, key, risk, MAX_PACK_OVERAGE_RATIO)
    }

    #[test]
    fn no_pack_constraint_rounds_to_nearest() {
        let r = round(7.4, 0, false, StockoutRisk::Medium);
        assert_eq!(r.qty, 7);
        assert_eq!(r.direction, RoundDirection::Unchanged);
    }

    #[test]
    fn zero_target_orders_one_pack_only_when_critical() {
        let r = round(0.0, 6, false, StockoutRisk::High);
        assert_eq!(r.qty, 6, "high risk revives one pack");
        assert_eq!(r.direction, RoundDirection::Up);

        let r = round(0.0, 6, true, StockoutRisk::Low);
        assert_eq!(r.qty, 6, "key SKU revives one pack");

        let r = round(0.0, 6, false, StockoutRisk::Medium);
        assert_eq!(r.qty, 0);
        assert_eq!(r.direction, RoundDirection::Down);
    }

    #[test]
    fn aligned_target_is_untouched() {
        let r = round(24.0, 6, false, StockoutRisk::Medium);
        assert_eq!(r.qty, 24);
        assert_eq!(r.direction, RoundDirection::Unchanged);
        assert_eq!(r.overage_units, 0);
        assert_eq!(r.shortage_units, 0);
    }

    #[test]
    fn high_risk_rounds_up_within_overage_tolerance() {
        // 22 -> 24 is +9%, inside the 25% tolerance.
        let r = round(22.0, 6, false, StockoutRisk::High);
        assert_eq!(r.qty, 24);
        assert_eq!(r.direction, RoundDirection::Up);
        assert_eq!(r.overage_units, 2);

        // 13 -> 24 would be +85%; falls back to 12.
        let r = round(13.0, 12, false, StockoutRisk::High);
        assert_eq!(r.qty, 12);
        assert_eq!(r.direction, RoundDirection::Down);
        assert_eq!(r.shortage_units, 1);
    }

    #[test]
    fn high_risk_small_target_can_round_down_to_zero() {
        // 2 -> 12 is +500%; the tolerance check drops it to the floor pack,
        // which is zero.
        let r = round(2.0, 12, false, StockoutRisk::High);
        assert_eq!(r.qty, 0);
        assert_eq!(r.direction, RoundDirection::Down);
    }

    #[test]
    fn low_risk_prefers_down_unless_shortage_is_large() {
        // 25 -> 24 loses 4%; tolerated.
        let r = round(25.0, 6, false, StockoutRisk::Low);
        assert_eq!(r.qty, 24);
        assert_eq!(r.direction, RoundDirection::Down);

        // 5 -> 0 would lose 100%; forced up to one pack.
        let r = round(5.0, 6, false, StockoutRisk::Low);
        assert_eq!(r.qty, 6);
        assert_eq!(r.direction, RoundDirection::Up);
    }

    #[test]
    fn medium_risk_takes_the_closer_side_ties_up() {
        // 20 with pack 6: down loses 2/20=10%, up adds 4/20=20%; down wins.
        let r = round(20.0, 6, false, StockoutRisk::Medium);
        assert_eq!(r.qty, 18);

        // 21 with pack 6: 3 either way; tie goes up.
        let r = round(21.0, 6, false, StockoutRisk::Medium);
        assert_eq!(r.qty, 24);
        assert_eq!(r.direction, RoundDirection::Up);
    }

    #[test]
    fn risk_classification_from_stock_and_coverage() {
        assert_eq!(StockoutRisk::classify(0.0, 50.0), StockoutRisk::High);
        assert_eq!(StockoutRisk::classify(-3.0, 50.0), StockoutRisk::High);
        assert_eq!(StockoutRisk::classify(5.0, 2.0), StockoutRisk::High);
        assert_eq!(StockoutRisk::classify(5.0, 10.0), StockoutRisk::Medium);
        assert_eq!(StockoutRisk::classify(5.0, 25.0), StockoutRisk::Low);
    }
}
