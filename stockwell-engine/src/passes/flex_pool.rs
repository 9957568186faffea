use stockwell_policy::thresholds::FLEX_POOL_TRIGGER_PCT;

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::passes::depth::{depth_target_units, round_robin_fill, FillCaps, FillItem};
use crate::passes::{revenue_score, sort_desc_by};
use crate::types::{AbcClass, Stage};

/// Pass 3: flex pool. When more than the trigger share of the budget
/// survives depth, the caps themselves are what is holding spend back,
/// so the leftover is poured into the proven winners the caps refused:
/// staple or A-class dry lines, ranked by revenue score, filled toward
/// their original coverage targets with the caps bypassed. Only the pool
/// brakes the fill.
pub struct FlexPoolPass;

impl AllocationPass for FlexPoolPass {
    fn enable(&self, run: &AllocationRun) -> bool {
        run.budget_remaining() > FLEX_POOL_TRIGGER_PCT * run.total_budget
    }

    fn run(&self, run: &mut AllocationRun) {
        let pool = run.budget_remaining();
        let mut entries: Vec<(usize, f64, u32)> = run
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                l.quantity > 0
                    && !l.sku.is_fresh
                    && (l.band.is_staple() || l.sku.abc_class == AbcClass::A)
                    && (l.fired_at(Stage::Depth, "share-cap")
                        || l.fired_at(Stage::Depth, "wallet-cap"))
            })
            .filter_map(|(idx, l)| {
                let target = depth_target_units(run, l);
                if target > l.quantity {
                    Some((idx, revenue_score(l), target))
                } else {
                    None
                }
            })
            .collect();
        if entries.is_empty() {
            return;
        }
        sort_desc_by(&mut entries, |e| e.1);

        let queue: Vec<FillItem> = entries
            .iter()
            .map(|(idx, _, target)| FillItem::new(*idx, *target))
            .collect();
        let count = queue.len();
        let spent = round_robin_fill(run, queue, pool, Stage::FlexPool, "flex-fill", FillCaps::open());
        log::info!(
            "Flex pool reinvested {:.0} across {} capped lines",
            spent,
            count
        );
    }
}
