use stockwell_policy::{CapitalWeights, StapleRegistry, TierTable, WalletBook};

use crate::context::{AllocationRun, SeasonalFactors};
use crate::pass::AllocationPass;
use crate::passes::anchoring::SupplierAnchoring;
use crate::passes::consolidation::SupplierConsolidation;
use crate::passes::depth::DepthPass;
use crate::passes::flex_pool::FlexPoolPass;
use crate::passes::mopup::MopUpPass;
use crate::passes::pruning::PruningPass;
use crate::passes::sort::PrioritySort;
use crate::passes::width::WidthPass;
use crate::types::{AllocationLine, AllocationSummary, PriorityBand, SkuCandidate};

/// The greenfield allocation engine: stocks an empty store from a
/// candidate list and a budget.
///
/// Pass flow:
/// 1. PrioritySort orders candidates band-then-velocity
/// 2. SupplierConsolidation cuts small stores to a manageable supplier set
/// 3. WidthPass gives every survivor a launch quantity
/// 4. PruningPass walks back weak lines until the depth reserve is whole
/// 5. DepthPass deepens survivors round-robin toward coverage targets
/// 6. FlexPoolPass pours large leftovers into capped winners
/// 7. SupplierAnchoring releases sub-minimum supplier batches
/// 8. MopUpPass pushes the last scraps into proven staples
///
/// Every pass runs against the shared `AllocationRun`; a disabled pass
/// (wrong store size, trigger not met) is skipped whole.
pub struct GreenfieldAllocator {
    tiers: TierTable,
    weights: CapitalWeights,
    staples: StapleRegistry,
    passes: Vec<Box<dyn AllocationPass>>,
}

impl GreenfieldAllocator {
    pub fn new(tiers: TierTable, weights: CapitalWeights, staples: StapleRegistry) -> Self {
        let passes: Vec<Box<dyn AllocationPass>> = vec![
            Box::new(PrioritySort),
            Box::new(SupplierConsolidation),
            Box::new(WidthPass),
            Box::new(PruningPass),
            Box::new(DepthPass),
            Box::new(FlexPoolPass),
            Box::new(SupplierAnchoring),
            Box::new(MopUpPass),
        ];
        Self {
            tiers,
            weights,
            staples,
            passes,
        }
    }

    /// Allocate a budget across candidates. Returns every candidate as a
    /// line (stocked or skipped, each carrying its trace) plus the run
    /// summary.
    pub fn allocate(
        &self,
        candidates: Vec<SkuCandidate>,
        total_budget: f64,
        seasonal: &SeasonalFactors,
    ) -> (Vec<AllocationLine>, AllocationSummary) {
        let profile = self.tiers.profile_for(total_budget);
        log::info!(
            "Allocating {:.0} across {} candidates ({} tier)",
            total_budget,
            candidates.len(),
            profile.tier_name
        );
        let wallets = WalletBook::initialize(total_budget, profile.wallet_buffer_pct, &self.weights);
        let lines = candidates
            .into_iter()
            .map(|sku| {
                let band = PriorityBand::classify(&sku, &self.staples);
                AllocationLine::new(sku, band)
            })
            .collect();

        let mut run = AllocationRun {
            profile,
            total_budget,
            wallets,
            staples: self.staples.clone(),
            weights: self.weights.clone(),
            seasonal: seasonal.clone(),
            lines,
            summary: AllocationSummary::default(),
        };

        for pass in &self.passes {
            if pass.enable(&run) {
                pass.run(&mut run);
                log::info!(
                    "{}: committed {:.0} of {:.0}",
                    pass.name(),
                    run.committed(),
                    run.total_budget
                );
            } else {
                log::debug!("{} disabled for this run", pass.name());
            }
        }

        run.finalize_summary();
        (run.lines, run.summary)
    }
}
