use stockwell_policy::departments::{is_fast_five, is_fresh_department};
use stockwell_policy::thresholds::{
    ANCHOR_CASE_FLOOR, ANCHOR_CASE_FLOOR_CHEAP, ANCHOR_CHEAP_PRICE, ANCHOR_DEPTH_DAYS,
    FRESH_ANCHOR_CLAMP_DAYS, LINE_SHARE_CAP, LINE_SHARE_CAP_SMALL, NEW_PRODUCT_CAP_DRY_DAYS,
    NEW_PRODUCT_CAP_FRESH_DAYS, PERISHABLE_SHELF_DAYS, RISK_MULTIPLIER_CAP,
    RISK_RELIABILITY_FLOOR, RISK_UNRELIABLE_BONUS, RISK_VOLATILE_BONUS, RISK_VOLATILITY_CEILING,
    SHELF_SAFETY_DAYS,
};

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::types::{AbcClass, AllocationLine, Stage};

/// One entry in a round-robin fill queue.
#[derive(Clone, Copy)]
pub(crate) struct FillItem {
    pub line_idx: usize,
    pub target_units: u32,
    /// Units this fill has already added, for the single trace event
    /// written when the item leaves the queue.
    pub added: u32,
}

impl FillItem {
    pub fn new(line_idx: usize, target_units: u32) -> Self {
        FillItem {
            line_idx,
            target_units,
            added: 0,
        }
    }
}

/// Which brakes apply during a fill. The pool always applies.
#[derive(Clone, Copy)]
pub(crate) struct FillCaps {
    pub share: bool,
    pub wallet: bool,
}

impl FillCaps {
    /// Depth sub-passes: line share cap and wallet both bind.
    pub fn checked() -> Self {
        FillCaps {
            share: true,
            wallet: true,
        }
    }

    /// Priority and flex fills: only the pool brakes.
    pub fn open() -> Self {
        FillCaps {
            share: false,
            wallet: false,
        }
    }

    /// Anchoring reinvestment and mop-up: wallets bind, the
    /// concentration cap does not.
    pub fn wallet_only() -> Self {
        FillCaps {
            share: false,
            wallet: true,
        }
    }
}

/// Pass 2: depth. Deepen the width survivors toward a coverage target,
/// one pack per line per turn, so a pool running dry leaves every line
/// partially deepened instead of the first few lines full and the rest
/// untouched.
///
/// Three sub-passes share the machinery: small-store fast-five staples
/// first against the whole remaining pot with the caps off, then the
/// remaining staples against the staple share, then everything else
/// against the discretionary share.
pub struct DepthPass;

impl AllocationPass for DepthPass {
    fn run(&self, run: &mut AllocationRun) {
        if run.is_small() {
            let queue = build_queue(run, |run, l| {
                l.band.is_staple() && is_fast_five(&l.sku.department)
            });
            let pool = run.budget_remaining();
            let spent =
                round_robin_fill(run, queue, pool, Stage::Depth, "depth-fill", FillCaps::open());
            log::debug!("Depth anchor staples spent {:.0}", spent);
        }

        let queue = build_queue(run, |run, l| {
            l.band.is_staple() && !(run.is_small() && is_fast_five(&l.sku.department))
        });
        let pool = run.budget_remaining() * (1.0 - run.profile.discretionary_share);
        let spent = round_robin_fill(run, queue, pool, Stage::Depth, "depth-fill", FillCaps::checked());
        log::debug!("Depth staples spent {:.0}", spent);

        let queue = build_queue(run, |_, l| !l.band.is_staple());
        let pool = run.budget_remaining() * run.profile.discretionary_share;
        let spent = round_robin_fill(run, queue, pool, Stage::Depth, "depth-fill", FillCaps::checked());
        log::debug!("Depth discretionary spent {:.0}", spent);
    }
}

/// Queue up the width survivors a sub-pass may deepen, skipping lines
/// already at or past target.
fn build_queue<P>(run: &AllocationRun, eligible: P) -> Vec<FillItem>
where
    P: Fn(&AllocationRun, &AllocationLine) -> bool,
{
    run.lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.quantity > 0 && l.width_allocated && eligible(run, l))
        .filter_map(|(idx, l)| {
            let target = depth_target_units(run, l);
            if target > l.quantity {
                Some(FillItem::new(idx, target))
            } else {
                None
            }
        })
        .collect()
}

/// Coverage target in units for one line.
///
/// Starts from the tier's depth days, stretched for supply risk, then
/// clamped by the small-store anchor rules, the new-product caps, and
/// shelf life. Case floors guarantee anchors a full case even when the
/// demand arithmetic says less, and anchors are the one place the
/// tier's pack cap does not apply.
pub(crate) fn depth_target_units(run: &AllocationRun, line: &AllocationLine) -> u32 {
    let sku = &line.sku;
    let demand = run.planning_demand(line);
    let mut days = run.profile.depth_days as f64;

    // Unreliable suppliers and volatile demand earn extra cover,
    // additive, capped. C class never stretches.
    if sku.abc_class != AbcClass::C {
        let mut mult = 1.0;
        if sku.supplier_reliability < RISK_RELIABILITY_FLOOR {
            mult += RISK_UNRELIABLE_BONUS;
        }
        if sku.demand_cv > RISK_VOLATILITY_CEILING {
            mult += RISK_VOLATILE_BONUS;
        }
        days *= mult.min(RISK_MULTIPLIER_CAP);
    }

    let anchor = run.is_small() && is_fast_five(&sku.department);
    let mut case_floor = 0u32;
    if anchor {
        if is_fresh_department(&sku.department) {
            days = days.min(FRESH_ANCHOR_CLAMP_DAYS);
        } else {
            days = days.max(ANCHOR_DEPTH_DAYS);
            case_floor = if sku.unit_price < ANCHOR_CHEAP_PRICE {
                ANCHOR_CASE_FLOOR_CHEAP
            } else {
                ANCHOR_CASE_FLOOR
            };
        }
    }
    if sku.is_new_product() {
        days = days.min(if sku.is_fresh {
            NEW_PRODUCT_CAP_FRESH_DAYS
        } else {
            NEW_PRODUCT_CAP_DRY_DAYS
        });
    }
    if let Some(shelf) = sku.shelf_life_days {
        if shelf > 0.0 && shelf < PERISHABLE_SHELF_DAYS {
            days = days.min((shelf - SHELF_SAFETY_DAYS).max(1.0));
        }
    }

    let mut units = (demand * days).ceil() as u32;
    units = units.max(case_floor);
    if !anchor {
        units = units.min(run.profile.max_packs * sku.pack_size.max(1));
    }
    units
}

/// The shared pack-at-a-time fill engine.
///
/// Each turn hands the current line one pack if the pool and the active
/// caps allow, then moves on. A line leaves the queue when it reaches
/// target, the pool cannot afford its pack, or a cap refuses it (the
/// refusal is traced). Every turn either adds a pack or removes a queue
/// entry, so the loop terminates. Returns the value committed (cash
/// plus consignment).
pub(crate) fn round_robin_fill(
    run: &mut AllocationRun,
    mut queue: Vec<FillItem>,
    mut pool: f64,
    stage: Stage,
    rule: &'static str,
    caps: FillCaps,
) -> f64 {
    let share_pct = if run.is_small() {
        LINE_SHARE_CAP_SMALL
    } else {
        LINE_SHARE_CAP
    };
    let mut spent = 0.0;
    let mut i = 0usize;

    while !queue.is_empty() {
        if i >= queue.len() {
            i = 0;
        }
        let item = queue[i];
        let (pack, pack_cost, quantity, cash_cost, consignment, department) = {
            let line = &run.lines[item.line_idx];
            let pack = line.sku.pack_size.max(1);
            (
                pack,
                pack as f64 * line.sku.unit_cost(),
                line.quantity,
                line.cash_cost,
                line.sku.is_consignment,
                line.sku.department.clone(),
            )
        };

        if quantity >= item.target_units || pack_cost > pool {
            flush_gain(run, &queue[i], stage, rule);
            queue.remove(i);
            continue;
        }
        if !consignment {
            if caps.share {
                let share_cap = share_pct * run.wallets.allocated(&department);
                if cash_cost + pack_cost > share_cap {
                    flush_gain(run, &queue[i], stage, rule);
                    run.lines[item.line_idx].push_event(
                        stage,
                        "share-cap",
                        format!("{:.0} spent of {:.0} line share", cash_cost, share_cap),
                        quantity,
                    );
                    queue.remove(i);
                    continue;
                }
            }
            if caps.wallet && !run.wallets.check(&department, pack_cost) {
                flush_gain(run, &queue[i], stage, rule);
                run.lines[item.line_idx].push_event(
                    stage,
                    "wallet-cap",
                    format!("{} wallet cannot absorb a {:.0} pack", department, pack_cost),
                    quantity,
                );
                queue.remove(i);
                continue;
            }
        }

        let cost = run.charge(item.line_idx, pack, stage);
        pool -= cost;
        spent += cost;
        queue[i].added += pack;
        i += 1;
    }
    spent
}

/// Write the one accumulated trace event for a line leaving a fill queue.
fn flush_gain(run: &mut AllocationRun, item: &FillItem, stage: Stage, rule: &'static str) {
    if item.added > 0 {
        let qty = run.lines[item.line_idx].quantity;
        run.lines[item.line_idx].push_event(
            stage,
            rule,
            format!("+{} units toward {}-unit target", item.added, item.target_units),
            qty - item.added,
        );
    }
}
