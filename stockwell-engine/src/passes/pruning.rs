use std::cmp::Ordering;

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::types::{PriorityBand, SkipReason, Stage};

/// Pass 1.5: restore the depth reserve.
///
/// Width spends without wallet checks, so a long candidate list can eat
/// into the share of the budget the later passes are entitled to. While
/// committed value leaves less than the reserve, release the
/// slowest-velocity discretionary width line, lowest first, until the
/// reserve is whole or nothing prunable remains. Staple and
/// essential-department lines are never pruned.
pub struct PruningPass;

impl AllocationPass for PruningPass {
    fn run(&self, run: &mut AllocationRun) {
        let reserve = (1.0 - run.profile.width_spend_cap_pct) * run.total_budget;
        let mut released = 0u32;

        while run.budget_remaining() < reserve {
            let victim = run
                .lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.quantity > 0 && l.band == PriorityBand::Discretionary)
                .min_by(|(_, a), (_, b)| {
                    a.sku
                        .velocity()
                        .partial_cmp(&b.sku.velocity())
                        .unwrap_or(Ordering::Equal)
                })
                .map(|(idx, _)| idx);
            match victim {
                Some(idx) => {
                    let velocity = run.lines[idx].sku.velocity();
                    run.release_line(
                        idx,
                        Stage::Pruning,
                        "liquidity-prune",
                        format!("released at {:.2}/day to restore depth reserve", velocity),
                        SkipReason::Pruned,
                    );
                    released += 1;
                }
                None => break,
            }
        }
        if released > 0 {
            log::info!(
                "Pruned {} discretionary lines; {:.0} free of {:.0} reserve",
                released,
                run.budget_remaining(),
                reserve
            );
        }
    }
}
