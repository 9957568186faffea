use std::collections::HashMap;

use stockwell_policy::departments::{is_essential_department, is_internal_production};
use stockwell_policy::thresholds::{
    DEAD_STOCK_VELOCITY, DEMAND_WINDOW_DAYS, LAUNCH_BUFFER_DAYS, MEGA_REFERENCE_BUDGET,
    SCALED_DEMAND_FLOOR, SHELF_SAFETY_DAYS,
};

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::types::{AbcClass, SkipReason, Stage};

/// Fresh lines never launch with more days of cover than this, whatever
/// the lead time says.
const FRESH_LAUNCH_CAP_DAYS: f64 = 3.0;

enum Verdict {
    Skip(SkipReason, &'static str, String),
    Stock {
        qty: u32,
        rule: &'static str,
        detail: String,
    },
}

/// Pass 1: breadth. Walk the priority-sorted candidates once and give
/// every survivor a launch quantity, whole packs, charged to its
/// department wallet without a wallet check (pruning and the reserve
/// guard below keep pass-1 honest instead).
///
/// Filters, in order: internal production, tier price ceiling (staples
/// bypass; essential departments get widened limits), dead C-class
/// stock, store-scaled demand, and the small-store fresh SKU cap.
///
/// The budget guard trips once pass-1 cash crosses the tier's width
/// spend cap; from then on staples continue at half the display minimum
/// and everything else is skipped. Independently, a hard double-check
/// refuses any line that would push total committed value (cash plus
/// consignment) past the budget itself.
pub struct WidthPass;

impl AllocationPass for WidthPass {
    fn run(&self, run: &mut AllocationRun) {
        let spend_cap = run.profile.width_spend_cap_pct * run.total_budget;
        let mut width_cash = 0.0;
        let mut guard_tripped = false;
        let mut fresh_stocked: HashMap<String, u32> = HashMap::new();

        for idx in 0..run.lines.len() {
            if run.lines[idx].excluded {
                continue;
            }
            let verdict = {
                let line = &run.lines[idx];
                let sku = &line.sku;
                let staple = line.band.is_staple();
                let pack = sku.pack_size.max(1);

                if is_internal_production(&sku.department) {
                    Verdict::Skip(
                        SkipReason::InternalProduction,
                        "internal-production",
                        format!("{} is produced in-store", sku.department),
                    )
                } else if !staple && over_price_ceiling(run, sku.unit_price, &sku.department, pack)
                {
                    Verdict::Skip(
                        SkipReason::PriceCeiling,
                        "price-ceiling",
                        format!("unit price {:.0} over tier ceiling", sku.unit_price),
                    )
                } else if !run.profile.allow_low_revenue_class
                    && sku.abc_class == AbcClass::C
                    && sku.velocity() < DEAD_STOCK_VELOCITY
                {
                    Verdict::Skip(
                        SkipReason::DeadStock,
                        "dead-stock",
                        format!("C class at {:.2}/day", sku.velocity()),
                    )
                } else if below_scaled_demand(run, line) {
                    Verdict::Skip(
                        SkipReason::LowDemand,
                        "low-scaled-demand",
                        format!(
                            "{:.2} units per window at this store size",
                            scaled_window_demand(run, line)
                        ),
                    )
                } else if run.is_small()
                    && sku.is_fresh
                    && fresh_stocked.get(&sku.department).copied().unwrap_or(0)
                        >= run.profile.fresh_sku_cap
                {
                    Verdict::Skip(
                        SkipReason::FreshSkuCap,
                        "fresh-sku-cap",
                        format!(
                            "{} already at {} fresh lines",
                            sku.department, run.profile.fresh_sku_cap
                        ),
                    )
                } else if guard_tripped && !staple {
                    Verdict::Skip(
                        SkipReason::BudgetExhausted,
                        "width-budget-guard",
                        "width cash past spend cap".to_string(),
                    )
                } else {
                    let (units, rule, detail) = if guard_tripped {
                        (
                            (run.profile.min_display_qty / 2).max(1) as f64,
                            "width-guard-staple",
                            "half display minimum under budget guard".to_string(),
                        )
                    } else {
                        let demand = run.planning_demand(line);
                        let buffer = launch_buffer_days(sku.lead_time_days, sku.is_fresh, sku.shelf_life_days);
                        let launch = demand * buffer;
                        let units = (run.profile.min_display_qty as f64)
                            .max(sku.moq as f64)
                            .max(launch);
                        (
                            units,
                            "width-stock",
                            format!("{:.1}d launch cover at {:.2}/day", buffer, demand),
                        )
                    };
                    let packs = ((units / pack as f64).ceil() as u32)
                        .clamp(1, run.profile.max_packs);
                    let qty = packs * pack;
                    let cost = qty as f64 * sku.unit_cost();
                    if run.committed() + cost > run.total_budget {
                        Verdict::Skip(
                            SkipReason::BudgetExhausted,
                            "budget-exhausted",
                            format!("{:.0} would exceed total budget", cost),
                        )
                    } else {
                        Verdict::Stock { qty, rule, detail }
                    }
                }
            };

            match verdict {
                Verdict::Skip(reason, rule, detail) => {
                    run.skip_line(idx, Stage::Width, rule, detail, reason);
                }
                Verdict::Stock { qty, rule, detail } => {
                    run.commit_units(idx, qty, Stage::Width, rule, detail);
                    run.lines[idx].width_allocated = true;
                    let sku = &run.lines[idx].sku;
                    if sku.is_fresh {
                        *fresh_stocked.entry(sku.department.clone()).or_insert(0) += 1;
                    }
                    if !sku.is_consignment {
                        width_cash += run.lines[idx].cash_cost;
                        if !guard_tripped && width_cash > spend_cap {
                            guard_tripped = true;
                            log::warn!(
                                "Width budget guard tripped at {:.0} of {:.0} cap",
                                width_cash,
                                spend_cap
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Tier price ceiling with essential-department widening: essential
/// departments get double the limit, triple when the item cases up in
/// packs of six or more.
fn over_price_ceiling(run: &AllocationRun, unit_price: f64, department: &str, pack: u32) -> bool {
    let mut limit = run.profile.price_ceiling;
    if is_essential_department(department) {
        limit *= if pack >= 6 { 3.0 } else { 2.0 };
    }
    unit_price > limit
}

/// Demand over the planning window scaled by store size against the
/// mega-store reference budget.
fn scaled_window_demand(run: &AllocationRun, line: &crate::types::AllocationLine) -> f64 {
    run.planning_demand(line) * DEMAND_WINDOW_DAYS * (run.total_budget / MEGA_REFERENCE_BUDGET)
}

/// Small stores drop established slow movers whose scaled window demand
/// rounds to nothing. Staples, new products and look-alike-backed lines
/// are exempt; micro stores skip the filter because everything would
/// fail it.
fn below_scaled_demand(run: &AllocationRun, line: &crate::types::AllocationLine) -> bool {
    if !run.is_small()
        || run.is_micro()
        || line.band.is_staple()
        || line.sku.is_new_product()
        || line.sku.lookalike_daily_demand.is_some()
    {
        return false;
    }
    scaled_window_demand(run, line) < SCALED_DEMAND_FLOOR
}

/// Days of cover a launch quantity should carry. Fresh lines are clamped
/// by shelf life and an absolute fresh cap.
fn launch_buffer_days(lead_time_days: f64, is_fresh: bool, shelf_life_days: Option<f64>) -> f64 {
    let base = lead_time_days + LAUNCH_BUFFER_DAYS;
    if !is_fresh {
        return base;
    }
    let shelf_cap = match shelf_life_days {
        Some(shelf) if shelf > 0.0 => (shelf - SHELF_SAFETY_DAYS).max(1.0),
        _ => f64::INFINITY,
    };
    base.min(shelf_cap).min(FRESH_LAUNCH_CAP_DAYS)
}
