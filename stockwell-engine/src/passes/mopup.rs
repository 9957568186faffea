use stockwell_policy::thresholds::{MOPUP_CEILING_DAYS, MOPUP_TRIGGER_PCT};

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::passes::depth::{round_robin_fill, FillCaps, FillItem};
use crate::passes::{revenue_score, sort_desc_by};
use crate::types::Stage;

/// Pass 5: mop-up. When only scraps remain, push them into the staples
/// the store already carries, best revenue score first, toward a hard
/// ceiling of sixty days cover. Whole packs, wallet-checked; whatever
/// still cannot be placed is reported as unused budget.
pub struct MopUpPass;

impl AllocationPass for MopUpPass {
    fn enable(&self, run: &AllocationRun) -> bool {
        let remaining = run.budget_remaining();
        remaining > 0.0 && remaining <= MOPUP_TRIGGER_PCT * run.total_budget
    }

    fn run(&self, run: &mut AllocationRun) {
        let pool = run.budget_remaining();
        let mut entries: Vec<(usize, f64, u32)> = run
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.quantity > 0 && l.band.is_staple())
            .filter_map(|(idx, l)| {
                let ceiling = (run.planning_demand(l) * MOPUP_CEILING_DAYS).ceil() as u32;
                if ceiling > l.quantity {
                    Some((idx, revenue_score(l), ceiling))
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
            .map(|(idx, _, ceiling)| FillItem::new(*idx, *ceiling))
            .collect();
        let spent = round_robin_fill(run, queue, pool, Stage::MopUp, "mopup-fill", FillCaps::wallet_only());
        if spent > 0.0 {
            log::info!("Mop-up placed {:.0} of the last {:.0}", spent, pool);
        }
    }
}
