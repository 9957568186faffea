//! Shared mutable context for one greenfield allocation run.

use std::collections::BTreeMap;

use stockwell_policy::{CapitalWeights, StapleRegistry, TierProfile, WalletBook};

use crate::types::{AllocationLine, AllocationSummary, SkipReason, Stage};

/// Per-department demand multipliers for seasonal planning. Departments
/// absent from the map run at factor 1.0.
pub type SeasonalFactors = BTreeMap<String, f64>;

/// Everything one allocation run owns: the policy snapshot, the wallet
/// book, every candidate as a line, and the accumulating summary. Passes
/// receive `&mut AllocationRun` and nothing else.
pub struct AllocationRun {
    pub profile: TierProfile,
    pub total_budget: f64,
    pub wallets: WalletBook,
    pub staples: StapleRegistry,
    pub weights: CapitalWeights,
    pub seasonal: SeasonalFactors,
    pub lines: Vec<AllocationLine>,
    pub summary: AllocationSummary,
}

impl AllocationRun {
    /// Cash plus consignment committed so far. The budget is the total
    /// shelf-capital envelope: consignment skips wallet checks but still
    /// counts against it.
    pub fn committed(&self) -> f64 {
        self.summary.total_cash + self.summary.total_consignment
    }

    pub fn budget_remaining(&self) -> f64 {
        (self.total_budget - self.committed()).max(0.0)
    }

    pub fn is_small(&self) -> bool {
        self.profile.is_small()
    }

    pub fn is_micro(&self) -> bool {
        self.profile.is_micro()
    }

    /// Seasonal factor for a department, 1.0 when unlisted.
    pub fn seasonal_factor(&self, department: &str) -> f64 {
        self.seasonal.get(department).copied().unwrap_or(1.0)
    }

    /// Planning demand for a line: velocity (look-alike/baseline for new
    /// products) scaled by the department's seasonal factor.
    pub fn planning_demand(&self, line: &AllocationLine) -> f64 {
        line.sku.planning_daily_demand() * self.seasonal_factor(&line.sku.department)
    }

    /// Add units to a line, charging the wallet or the consignment
    /// ledger. No trace; pack-by-pack passes charge repeatedly and trace
    /// once. Returns the cost charged. The caller has already done the
    /// affordability checks it cares about.
    pub fn charge(&mut self, idx: usize, add_units: u32, stage: Stage) -> f64 {
        let cost = add_units as f64 * self.lines[idx].sku.unit_cost();
        {
            let line = &mut self.lines[idx];
            line.quantity += add_units;
            if line.sku.is_consignment {
                line.consignment_value += cost;
            } else {
                line.cash_cost += cost;
            }
        }
        if self.lines[idx].sku.is_consignment {
            self.summary.total_consignment += cost;
        } else {
            let department = self.lines[idx].sku.department.clone();
            self.wallets.spend(&department, cost);
            self.summary.record_cash(stage, cost);
        }
        cost
    }

    /// `charge` plus a trace event for the change.
    pub fn commit_units(
        &mut self,
        idx: usize,
        add_units: u32,
        stage: Stage,
        rule: &'static str,
        detail: impl Into<String>,
    ) {
        let before = self.lines[idx].quantity;
        self.charge(idx, add_units, stage);
        self.lines[idx].push_event(stage, rule, detail, before);
    }

    /// Zero a line, refunding its wallet spend and consignment value,
    /// and trace the removal with a categorized skip reason.
    pub fn release_line(
        &mut self,
        idx: usize,
        stage: Stage,
        rule: &'static str,
        detail: impl Into<String>,
        reason: SkipReason,
    ) {
        let before = self.lines[idx].quantity;
        let cash = self.lines[idx].cash_cost;
        let consignment = self.lines[idx].consignment_value;
        if cash > 0.0 {
            let department = self.lines[idx].sku.department.clone();
            self.wallets.refund(&department, cash);
            self.summary.record_refund(stage, cash);
        }
        if consignment > 0.0 {
            self.summary.total_consignment -= consignment;
        }
        {
            let line = &mut self.lines[idx];
            line.quantity = 0;
            line.cash_cost = 0.0;
            line.consignment_value = 0.0;
        }
        self.lines[idx].push_event(stage, rule, detail, before);
        self.summary.record_skip(reason);
    }

    /// Mark a candidate as skipped without touching money (it never
    /// bought anything).
    pub fn skip_line(
        &mut self,
        idx: usize,
        stage: Stage,
        rule: &'static str,
        detail: impl Into<String>,
        reason: SkipReason,
    ) {
        let before = self.lines[idx].quantity;
        self.lines[idx].push_event(stage, rule, detail, before);
        self.summary.record_skip(reason);
    }

    /// Close out the run-level accounting after the last pass.
    pub fn finalize_summary(&mut self) {
        self.summary.total_budget = self.total_budget;
        self.summary.lines_stocked = self.lines.iter().filter(|l| l.quantity > 0).count();
        self.summary.department_utilization = self.wallets.utilization();
        self.summary.unused_budget = (self.total_budget - self.committed()).max(0.0);
        self.summary.utilization_pct = if self.total_budget > 0.0 {
            (self.committed() / self.total_budget * 1000.0).round() / 10.0
        } else {
            0.0
        };
    }
}
