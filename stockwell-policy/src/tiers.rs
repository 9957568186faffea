//! Store tier policy profiles.
//!
//! A total budget maps to a policy profile by piecewise-linear interpolation
//! between named keyframes (Micro through Ultra). Integer fields truncate,
//! float fields round to two decimals, and boolean/name fields take the
//! lower keyframe so a store never inherits a permission it has not grown
//! into. Out-of-range budgets clamp to the first/last keyframe.
//!
//! Every numeric field must be monotonically non-decreasing in budget;
//! `TierTable::validate` enforces that at load time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Policy values pinned to one budget threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierKeyframe {
    #[serde(default)]
    pub tier_name: String,
    pub depth_days: u32,
    pub price_ceiling: f64,
    pub max_packs: u32,
    pub min_display_qty: u32,
    pub allow_low_revenue_class: bool,
    #[serde(default)]
    pub stale_stock_allowed: bool,
    pub wallet_buffer_pct: f64,
    pub min_order_value: f64,
    pub width_spend_cap_pct: f64,
    pub discretionary_share: f64,
    pub fresh_sku_cap: u32,
    pub staple_supplier_limit: u32,
}

/// Interpolated policy snapshot for one budget value. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierProfile {
    pub tier_name: String,
    pub budget: f64,
    pub depth_days: u32,
    pub price_ceiling: f64,
    pub max_packs: u32,
    pub min_display_qty: u32,
    pub allow_low_revenue_class: bool,
    pub stale_stock_allowed: bool,
    pub wallet_buffer_pct: f64,
    pub min_order_value: f64,
    pub width_spend_cap_pct: f64,
    pub discretionary_share: f64,
    pub fresh_sku_cap: u32,
    pub staple_supplier_limit: u32,
}

impl TierProfile {
    /// Small-store band: staple consolidation, fast-five priority, tighter
    /// share caps.
    pub fn is_small(&self) -> bool {
        self.budget < crate::thresholds::SMALL_STORE_BUDGET
    }

    /// Micro band: kiosk-scale width discipline.
    pub fn is_micro(&self) -> bool {
        self.budget < crate::thresholds::MICRO_STORE_BUDGET
    }
}

/// Ordered keyframe table. Construct via `Default` for the built-in tiers or
/// `from_json_str` for an external table, then call `profile_for`.
#[derive(Debug, Clone)]
pub struct TierTable {
    // Sorted ascending by budget. Invariant checked by validate().
    frames: Vec<(f64, TierKeyframe)>,
}

impl Default for TierTable {
    fn default() -> Self {
        let frames = vec![
            (
                0.0,
                TierKeyframe {
                    tier_name: "Micro".to_string(),
                    depth_days: 7,
                    price_ceiling: 300.0,
                    max_packs: 12,
                    min_display_qty: 3,
                    allow_low_revenue_class: false,
                    stale_stock_allowed: false,
                    wallet_buffer_pct: 0.10,
                    min_order_value: 1_000.0,
                    width_spend_cap_pct: 0.70,
                    discretionary_share: 0.05,
                    fresh_sku_cap: 6,
                    staple_supplier_limit: 2,
                },
            ),
            (
                200_000.0,
                TierKeyframe {
                    tier_name: "Micro+".to_string(),
                    depth_days: 10,
                    price_ceiling: 500.0,
                    max_packs: 18,
                    min_display_qty: 3,
                    allow_low_revenue_class: false,
                    stale_stock_allowed: false,
                    wallet_buffer_pct: 0.15,
                    min_order_value: 2_500.0,
                    width_spend_cap_pct: 0.75,
                    discretionary_share: 0.20,
                    fresh_sku_cap: 10,
                    staple_supplier_limit: 3,
                },
            ),
            (
                1_000_000.0,
                TierKeyframe {
                    tier_name: "Mini-Mart".to_string(),
                    depth_days: 14,
                    price_ceiling: 2_500.0,
                    max_packs: 24,
                    min_display_qty: 6,
                    allow_low_revenue_class: true,
                    stale_stock_allowed: false,
                    wallet_buffer_pct: 0.25,
                    min_order_value: 8_000.0,
                    width_spend_cap_pct: 0.85,
                    discretionary_share: 0.40,
                    fresh_sku_cap: 40,
                    staple_supplier_limit: 8,
                },
            ),
            (
                10_000_000.0,
                TierKeyframe {
                    tier_name: "Supermarket".to_string(),
                    depth_days: 21,
                    price_ceiling: 20_000.0,
                    max_packs: 48,
                    min_display_qty: 12,
                    allow_low_revenue_class: true,
                    stale_stock_allowed: true,
                    wallet_buffer_pct: 0.50,
                    min_order_value: 15_000.0,
                    width_spend_cap_pct: 0.90,
                    discretionary_share: 0.40,
                    fresh_sku_cap: 200,
                    staple_supplier_limit: 99,
                },
            ),
            (
                50_000_000.0,
                TierKeyframe {
                    tier_name: "Mega".to_string(),
                    depth_days: 30,
                    price_ceiling: 100_000.0,
                    max_packs: 999,
                    min_display_qty: 24,
                    allow_low_revenue_class: true,
                    stale_stock_allowed: true,
                    wallet_buffer_pct: 1.00,
                    min_order_value: 25_000.0,
                    width_spend_cap_pct: 0.95,
                    discretionary_share: 0.40,
                    fresh_sku_cap: 999,
                    staple_supplier_limit: 999,
                },
            ),
            (
                200_000_000.0,
                TierKeyframe {
                    tier_name: "Ultra".to_string(),
                    depth_days: 60,
                    price_ceiling: 999_999.0,
                    max_packs: 9_999,
                    min_display_qty: 48,
                    allow_low_revenue_class: true,
                    stale_stock_allowed: true,
                    wallet_buffer_pct: 2.00,
                    min_order_value: 25_000.0,
                    width_spend_cap_pct: 0.95,
                    discretionary_share: 0.40,
                    fresh_sku_cap: 999,
                    staple_supplier_limit: 999,
                },
            ),
        ];
        TierTable { frames }
    }
}

impl TierTable {
    /// Build from explicit (budget, keyframe) pairs. Sorts by budget and
    /// validates.
    pub fn new(mut frames: Vec<(f64, TierKeyframe)>) -> PolicyResult<Self> {
        frames.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let table = TierTable { frames };
        table.validate()?;
        Ok(table)
    }

    /// Parse the external JSON surface: `{ "<budget>": { ...keyframe } }`.
    pub fn from_json_str(raw: &str) -> PolicyResult<Self> {
        let parsed: BTreeMap<String, TierKeyframe> = serde_json::from_str(raw)?;
        let mut frames = Vec::with_capacity(parsed.len());
        for (key, frame) in parsed {
            let budget: f64 = key.trim().replace('_', "").parse().map_err(|_| {
                PolicyError::InvalidKeyframe {
                    budget: -1.0,
                    reason: format!("budget key `{}` is not a number", key),
                }
            })?;
            frames.push((budget, frame));
        }
        Self::new(frames)
    }

    /// Fail fast on an inconsistent table: empty, unordered, or any numeric
    /// field decreasing in budget.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.frames.is_empty() {
            return Err(PolicyError::EmptyKeyframeTable);
        }
        for (budget, frame) in &self.frames {
            if !budget.is_finite() || *budget < 0.0 {
                return Err(PolicyError::InvalidKeyframeBudget(*budget));
            }
            if frame.wallet_buffer_pct < 0.0 {
                return Err(PolicyError::InvalidKeyframe {
                    budget: *budget,
                    reason: "wallet_buffer_pct is negative".to_string(),
                });
            }
            if frame.width_spend_cap_pct <= 0.0 || frame.width_spend_cap_pct > 1.0 {
                return Err(PolicyError::InvalidKeyframe {
                    budget: *budget,
                    reason: "width_spend_cap_pct must be in (0, 1]".to_string(),
                });
            }
            if frame.discretionary_share < 0.0 || frame.discretionary_share > 1.0 {
                return Err(PolicyError::InvalidKeyframe {
                    budget: *budget,
                    reason: "discretionary_share must be in [0, 1]".to_string(),
                });
            }
        }
        for pair in self.frames.windows(2) {
            let (lo_budget, lo) = &pair[0];
            let (hi_budget, hi) = &pair[1];
            if hi_budget <= lo_budget {
                return Err(PolicyError::InvalidKeyframeBudget(*hi_budget));
            }
            let checks: [(&'static str, f64, f64); 10] = [
                ("depth_days", lo.depth_days as f64, hi.depth_days as f64),
                ("price_ceiling", lo.price_ceiling, hi.price_ceiling),
                ("max_packs", lo.max_packs as f64, hi.max_packs as f64),
                (
                    "min_display_qty",
                    lo.min_display_qty as f64,
                    hi.min_display_qty as f64,
                ),
                ("wallet_buffer_pct", lo.wallet_buffer_pct, hi.wallet_buffer_pct),
                ("min_order_value", lo.min_order_value, hi.min_order_value),
                (
                    "width_spend_cap_pct",
                    lo.width_spend_cap_pct,
                    hi.width_spend_cap_pct,
                ),
                (
                    "discretionary_share",
                    lo.discretionary_share,
                    hi.discretionary_share,
                ),
                ("fresh_sku_cap", lo.fresh_sku_cap as f64, hi.fresh_sku_cap as f64),
                (
                    "staple_supplier_limit",
                    lo.staple_supplier_limit as f64,
                    hi.staple_supplier_limit as f64,
                ),
            ];
            for (field, lo_val, hi_val) in checks {
                if hi_val < lo_val {
                    return Err(PolicyError::NonMonotonicKeyframe {
                        field,
                        budget: *hi_budget,
                    });
                }
            }
        }
        Ok(())
    }

    /// Interpolated profile for a budget. Pure; clamps out-of-range budgets.
    pub fn profile_for(&self, budget: f64) -> TierProfile {
        let budget = if budget.is_finite() { budget.max(0.0) } else { 0.0 };

        let (first_budget, first) = &self.frames[0];
        let (last_budget, last) = &self.frames[self.frames.len() - 1];

        let (lo_budget, lo, hi_budget, hi) = if budget <= *first_budget {
            (*first_budget, first, *first_budget, first)
        } else if budget >= *last_budget {
            (*last_budget, last, *last_budget, last)
        } else {
            let mut bracket = (*first_budget, first, *last_budget, last);
            for pair in self.frames.windows(2) {
                let (a_budget, a) = &pair[0];
                let (b_budget, b) = &pair[1];
                if *a_budget <= budget && budget <= *b_budget {
                    bracket = (*a_budget, a, *b_budget, b);
                    break;
                }
            }
            bracket
        };

        let ratio = if hi_budget == lo_budget {
            0.0
        } else {
            (budget - lo_budget) / (hi_budget - lo_budget)
        };

        let lerp_u32 = |a: u32, b: u32| -> u32 {
            (a as f64 + (b as f64 - a as f64) * ratio) as u32
        };
        let lerp_f64 = |a: f64, b: f64| -> f64 {
            let v = a + (b - a) * ratio;
            (v * 100.0).round() / 100.0
        };

        TierProfile {
            tier_name: lo.tier_name.clone(),
            budget,
            depth_days: lerp_u32(lo.depth_days, hi.depth_days),
            price_ceiling: lerp_f64(lo.price_ceiling, hi.price_ceiling),
            max_packs: lerp_u32(lo.max_packs, hi.max_packs),
            min_display_qty: lerp_u32(lo.min_display_qty, hi.min_display_qty),
            // Conservative: permissions unlock only at the threshold itself.
            allow_low_revenue_class: lo.allow_low_revenue_class,
            stale_stock_allowed: lo.stale_stock_allowed,
            wallet_buffer_pct: lerp_f64(lo.wallet_buffer_pct, hi.wallet_buffer_pct),
            min_order_value: lerp_f64(lo.min_order_value, hi.min_order_value),
            width_spend_cap_pct: lerp_f64(lo.width_spend_cap_pct, hi.width_spend_cap_pct),
            discretionary_share: lerp_f64(lo.discretionary_share, hi.discretionary_share),
            fresh_sku_cap: lerp_u32(lo.fresh_sku_cap, hi.fresh_sku_cap),
            staple_supplier_limit: lerp_u32(lo.staple_supplier_limit, hi.staple_supplier_limit),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_keyframe_budget_returns_keyframe_values() {
        let table = TierTable::default();
        let p = table.profile_for(1_000_000.0);
        assert_eq!(p.tier_name, "Mini-Mart");
        assert_eq!(p.depth_days, 14);
        assert!((p.price_ceiling - 2_500.0).abs() < 0.01);
        assert_eq!(p.max_packs, 24);
        assert_eq!(p.min_display_qty, 6);
        assert!(p.allow_low_revenue_class);
        assert!(!p.stale_stock_allowed);
    }

    #[test]
    fn midpoint_interpolates_numeric_fields() {
        let table = TierTable::default();
        // Halfway between 0 and 200k.
        let p = table.profile_for(100_000.0);
        assert_eq!(p.depth_days, 8); // 7 + (10-7)*0.5 = 8.5, truncated
        assert!((p.price_ceiling - 400.0).abs() < 0.01);
        assert_eq!(p.max_packs, 15);
        assert!((p.wallet_buffer_pct - 0.12).abs() < 0.011);
        // Booleans stay at the lower keyframe.
        assert!(!p.allow_low_revenue_class);
    }

    #[test]
    fn budgets_clamp_outside_the_table() {
        let table = TierTable::default();
        let low = table.profile_for(-50.0);
        assert_eq!(low.tier_name, "Micro");
        assert_eq!(low.depth_days, 7);

        let high = table.profile_for(5_000_000_000.0);
        assert_eq!(high.tier_name, "Ultra");
        assert_eq!(high.depth_days, 60);
        assert_eq!(high.min_display_qty, 48);
    }

    #[test]
    fn small_and_micro_bands_follow_budget() {
        let table = TierTable::default();
        assert!(table.profile_for(100_000.0).is_micro());
        assert!(table.profile_for(100_000.0).is_small());
        assert!(!table.profile_for(500_000.0).is_micro());
        assert!(table.profile_for(500_000.0).is_small());
        assert!(!table.profile_for(2_000_000.0).is_small());
    }

    #[test]
    fn numeric_fields_never_decrease_with_budget() {
        let table = TierTable::default();
        let budgets = [
            0.0, 50_000.0, 200_000.0, 600_000.0, 1_000_000.0, 4_000_000.0,
            10_000_000.0, 30_000_000.0, 50_000_000.0, 120_000_000.0, 200_000_000.0,
        ];
        let mut prev: Option<TierProfile> = None;
        for b in budgets {
            let p = table.profile_for(b);
            if let Some(q) = &prev {
                assert!(p.depth_days >= q.depth_days, "depth_days dipped at {}", b);
                assert!(p.price_ceiling >= q.price_ceiling, "ceiling dipped at {}", b);
                assert!(p.max_packs >= q.max_packs, "max_packs dipped at {}", b);
                assert!(
                    p.min_display_qty >= q.min_display_qty,
                    "min_display_qty dipped at {}",
                    b
                );
                assert!(
                    p.min_order_value >= q.min_order_value,
                    "min_order_value dipped at {}",
                    b
                );
            }
            prev = Some(p);
        }
    }

    #[test]
    fn non_monotonic_table_is_rejected() {
        let mut frames = TierTable::default().frames;
        frames[3].1.price_ceiling = 1.0; // Supermarket cheaper than Mini-Mart
        let err = TierTable::new(frames).unwrap_err();
        match err {
            PolicyError::NonMonotonicKeyframe { field, .. } => {
                assert_eq!(field, "price_ceiling")
            }
            other => panic!("expected NonMonotonicKeyframe, got {:?}", other),
        }
    }

    #[test]
    fn json_table_round_trips() {
        let raw = r#"{
            "0": {
                "tier_name": "Tiny",
                "depth_days": 5,
                "price_ceiling": 100.0,
                "max_packs": 6,
                "min_display_qty": 2,
                "allow_low_revenue_class": false,
                "wallet_buffer_pct": 0.1,
                "min_order_value": 500.0,
                "width_spend_cap_pct": 0.7,
                "discretionary_share": 0.1,
                "fresh_sku_cap": 4,
                "staple_supplier_limit": 2
            },
            "1000000": {
                "tier_name": "Big",
                "depth_days": 20,
                "price_ceiling": 5000.0,
                "max_packs": 60,
                "min_display_qty": 10,
                "allow_low_revenue_class": true,
                "wallet_buffer_pct": 0.5,
                "min_order_value": 9000.0,
                "width_spend_cap_pct": 0.9,
                "discretionary_share": 0.4,
                "fresh_sku_cap": 100,
                "staple_supplier_limit": 20
            }
        }"#;
        let table = TierTable::from_json_str(raw).unwrap();
        assert_eq!(table.len(), 2);
        let p = table.profile_for(500_000.0);
        assert_eq!(p.tier_name, "Tiny");
        assert_eq!(p.depth_days, 12); // 5 + 15*0.5 = 12.5 truncated
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = TierTable::new(Vec::new()).unwrap_err();
        assert!(matches!(err, PolicyError::EmptyKeyframeTable));
    }
}
