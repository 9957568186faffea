use crate::context::AllocationRun;
use crate::util;

/// Allocation passes run sequentially over the shared run context. Each
/// pass mutates lines, wallets and the summary, and appends trace events
/// for every quantity it changes.
pub trait AllocationPass {
    /// Decide if this pass should run for the given run.
    fn enable(&self, _run: &AllocationRun) -> bool {
        true
    }

    /// Execute the pass against the run context.
    fn run(&self, run: &mut AllocationRun);

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
