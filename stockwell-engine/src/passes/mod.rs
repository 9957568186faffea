//! The greenfield allocation passes, in execution order.

use std::cmp::Ordering;

use crate::types::AllocationLine;

pub mod anchoring;
pub mod consolidation;
pub mod depth;
pub mod flex_pool;
pub mod mopup;
pub mod pruning;
pub mod sort;
pub mod width;

/// Revenue-priority score used when leftover cash picks its winners.
pub(crate) fn revenue_score(line: &AllocationLine) -> f64 {
    line.sku.velocity() * line.sku.unit_price * line.sku.margin_fraction()
}

/// Descending sort by a float score. Explicit total ordering: NaN goes
/// to the end, ties keep their prior (priority) order.
pub(crate) fn sort_desc_by<T, F>(items: &mut [T], score: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| {
        let sa = score(a);
        let sb = score(b);
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
        }
    });
}
