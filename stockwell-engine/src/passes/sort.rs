use std::cmp::Ordering;

use crate::context::AllocationRun;
use crate::pass::AllocationPass;

/// Orders the candidate list for every later pass: priority band first
/// (fast staples ahead of plain staples ahead of essential-department
/// lines ahead of discretionary), descending velocity within a band.
///
/// Width walks this order top to bottom, so when its budget guard trips
/// the casualties are always the weakest discretionary tail.
pub struct PrioritySort;

impl AllocationPass for PrioritySort {
    fn run(&self, run: &mut AllocationRun) {
        run.lines.sort_by(|a, b| {
            a.band.cmp(&b.band).then_with(|| {
                let va = a.sku.velocity();
                let vb = b.sku.velocity();
                match (va.is_nan(), vb.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => vb.partial_cmp(&va).unwrap_or(Ordering::Equal),
                }
            })
        });
    }
}
