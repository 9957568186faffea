//! The safety guard: the single trusted choke point between any
//! recommender and a purchase order.
//!
//! Whatever produced a recommendation set, `guard::enforce` re-derives
//! the hard business invariants from the SKU states and lowers
//! quantities that violate them, then re-runs pack rounding. The pass is
//! idempotent, so it can sit in front of the order export and be applied
//! as many times as the plumbing happens to call it.

pub mod guard;
pub mod mov;

pub use guard::{enforce, GuardMode};
pub use mov::defer_small_batches;
