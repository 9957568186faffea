pub mod allocator;
pub mod context;
pub mod error;
pub mod loader;
pub mod overstock;
pub mod pass;
pub mod passes;
pub mod replenish;
pub mod rounding;
pub mod staleness;
pub mod types;
pub mod util;

pub use allocator::GreenfieldAllocator;
pub use context::{AllocationRun, SeasonalFactors};
pub use error::{EngineError, EngineResult};
pub use loader::{load_candidates, load_candidates_file, LoaderReport};
pub use pass::AllocationPass;
pub use replenish::{decide, decide_batch, ReplenishPolicy};
pub use rounding::{round_to_pack, RoundDirection, RoundedOrder, StockoutRisk};
pub use types::{
    AbcClass, AllocationLine, AllocationSummary, Confidence, PriorityBand, Recommendation,
    SalesTrend, SkipReason, SkuCandidate, Stage, TraceEvent, XyzClass,
};
