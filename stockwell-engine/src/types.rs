use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use stockwell_policy::departments::{is_essential_department, is_fast_five};
use stockwell_policy::thresholds::{
    DEFAULT_COST_RATIO, LOOKALIKE_DISCOUNT, MIN_DAILY_DEMAND, NEW_PRODUCT_BASELINE_DRY,
    NEW_PRODUCT_BASELINE_FRESH, STAPLE_VELOCITY_FLOOR,
};
use stockwell_policy::StapleRegistry;

// ---------------------------------------------------------------------------
// Classification types
// ---------------------------------------------------------------------------

/// Revenue-contribution class, A best. Unranked items default to B so they
/// are neither protected as A nor culled as C.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum AbcClass {
    A,
    #[default]
    B,
    C,
}

impl AbcClass {
    /// Parse a rank code, tolerating case and unknown values.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "A" | "a" => AbcClass::A,
            "C" | "c" => AbcClass::C,
            _ => AbcClass::B,
        }
    }
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbcClass::A => write!(f, "A"),
            AbcClass::B => write!(f, "B"),
            AbcClass::C => write!(f, "C"),
        }
    }
}

/// Demand-stability class, X steady through Z erratic. Unranked items
/// default to Z, the conservative end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum XyzClass {
    X,
    Y,
    #[default]
    Z,
}

impl XyzClass {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "X" | "x" => XyzClass::X,
            "Y" | "y" => XyzClass::Y,
            _ => XyzClass::Z,
        }
    }
}

impl fmt::Display for XyzClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XyzClass::X => write!(f, "X"),
            XyzClass::Y => write!(f, "Y"),
            XyzClass::Z => write!(f, "Z"),
        }
    }
}

/// Which direction recent sales are heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SalesTrend {
    Growing,
    #[default]
    Stable,
    Declining,
}

impl SalesTrend {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "growing" | "up" => SalesTrend::Growing,
            "declining" | "down" => SalesTrend::Declining,
            _ => SalesTrend::Stable,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate types
// ---------------------------------------------------------------------------

/// One product candidate, the unit both engines work over.
///
/// Quantities are whole units (`u32`); money and day counts are `f64`.
/// Missing reference data is represented as `None` and resolved through
/// the documented defaults by the accessor methods below.
#[derive(Clone, Debug, Serialize)]
pub struct SkuCandidate {
    pub name: String,
    pub department: String,
    pub supplier: String,
    /// Unit selling price. Always positive for a loaded candidate.
    pub unit_price: f64,
    /// Historical purchase cost when known; see `unit_cost()`.
    pub historical_cost: Option<f64>,
    /// Gross margin in percent (30.0 = 30%).
    pub margin_pct: Option<f64>,
    /// Average daily demand over the trailing 90 days (units/day).
    pub daily_demand_90d: f64,
    /// Average daily demand over the trailing 30 days (units/day).
    pub daily_demand_30d: f64,
    pub demand_cv: f64,
    pub lead_time_days: f64,
    pub order_frequency_days: f64,
    /// Supplier shipping pack size, at least 1.
    pub pack_size: u32,
    pub is_fresh: bool,
    pub shelf_life_days: Option<f64>,
    /// Consignment stock is paid on sale, never from the cash budget.
    pub is_consignment: bool,
    pub abc_class: AbcClass,
    pub xyz_class: XyzClass,
    pub is_key_sku: bool,
    pub is_top_seller: bool,
    pub on_promotion: bool,
    pub is_sunset: bool,
    pub purchase_blocked: bool,
    /// Minimum order quantity imposed by the supplier, 0 when none.
    pub moq: u32,
    /// Supplier reliability in 0..1.
    pub supplier_reliability: f64,
    /// Value of expired/defective goods returned to this supplier.
    pub expiry_return_value: f64,
    pub days_since_delivery: f64,
    pub units_sold_90d: f64,
    pub stock_on_hand: f64,
    pub on_order: f64,
    /// Demand of the closest established look-alike, for new products.
    pub lookalike_daily_demand: Option<f64>,
    /// Historical average order quantity from past purchase orders.
    pub avg_order_qty: f64,
    pub sales_trend: SalesTrend,
    /// Trend magnitude in percent, positive for growth.
    pub sales_trend_pct: f64,
}

impl SkuCandidate {
    /// Unit cost: historical purchase cost when known, else derived from
    /// margin, else price at the default cost ratio.
    pub fn unit_cost(&self) -> f64 {
        if let Some(cost) = self.historical_cost {
            if cost > 0.0 {
                return cost;
            }
        }
        if let Some(margin) = self.margin_pct {
            if margin > 0.0 && margin < 100.0 {
                return self.unit_price * (1.0 - margin / 100.0);
            }
        }
        self.unit_price * DEFAULT_COST_RATIO
    }

    /// Gross margin in percent, falling back to the spread between price
    /// and derived cost.
    pub fn margin_percent(&self) -> f64 {
        if let Some(m) = self.margin_pct {
            return m;
        }
        if self.unit_price > 0.0 {
            (self.unit_price - self.unit_cost()) / self.unit_price * 100.0
        } else {
            0.0
        }
    }

    /// Margin as a fraction of price, for revenue-priority scoring.
    pub fn margin_fraction(&self) -> f64 {
        (self.margin_percent() / 100.0).clamp(0.0, 1.0)
    }

    /// Trailing-90d daily demand, the engines' primary velocity signal.
    pub fn velocity(&self) -> f64 {
        self.daily_demand_90d
    }

    /// Effective daily demand: the 90-day rate floored at a small epsilon
    /// so coverage arithmetic stays finite, overridden by the 30-day rate
    /// when the item is currently selling.
    pub fn effective_daily(&self) -> f64 {
        if self.daily_demand_30d > 0.0 {
            self.daily_demand_30d
        } else {
            self.daily_demand_90d.max(MIN_DAILY_DEMAND)
        }
    }

    /// No demand history at all: a brand-new line.
    pub fn is_new_product(&self) -> bool {
        self.daily_demand_90d <= 0.0 && self.units_sold_90d <= 0.0
    }

    /// Demand basis for depth planning. Established items use their real
    /// velocity; new products use a discounted look-alike or a conservative
    /// baseline.
    pub fn planning_daily_demand(&self) -> f64 {
        if !self.is_new_product() {
            return self.velocity();
        }
        match self.lookalike_daily_demand {
            Some(d) if d > 0.0 => d * LOOKALIKE_DISCOUNT,
            _ => {
                if self.is_fresh {
                    NEW_PRODUCT_BASELINE_FRESH
                } else {
                    NEW_PRODUCT_BASELINE_DRY
                }
            }
        }
    }

    /// Current coverage in days over on-hand stock only.
    pub fn coverage_days(&self) -> f64 {
        self.stock_on_hand / self.effective_daily()
    }
}

/// Width-pass priority band, best first. Derived `Ord` sorts
/// `StapleFast` ahead of `Discretionary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PriorityBand {
    StapleFast,
    Staple,
    Essential,
    Discretionary,
}

impl PriorityBand {
    pub fn classify(sku: &SkuCandidate, staples: &StapleRegistry) -> Self {
        let staple = staples.is_staple(&sku.name, &sku.department, sku.velocity());
        if staple && sku.velocity() >= STAPLE_VELOCITY_FLOOR {
            PriorityBand::StapleFast
        } else if staple {
            PriorityBand::Staple
        } else if is_essential_department(&sku.department) {
            PriorityBand::Essential
        } else {
            PriorityBand::Discretionary
        }
    }

    pub fn is_staple(self) -> bool {
        matches!(self, PriorityBand::StapleFast | PriorityBand::Staple)
    }
}

// ---------------------------------------------------------------------------
// Decision output types
// ---------------------------------------------------------------------------

/// Pipeline stage that produced a trace event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Consolidation,
    Width,
    Pruning,
    Depth,
    FlexPool,
    Anchoring,
    MopUp,
    Replenish,
    Guard,
    Rounding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Consolidation => "consolidation",
            Stage::Width => "width",
            Stage::Pruning => "pruning",
            Stage::Depth => "depth",
            Stage::FlexPool => "flex-pool",
            Stage::Anchoring => "anchoring",
            Stage::MopUp => "mop-up",
            Stage::Replenish => "replenish",
            Stage::Guard => "guard",
            Stage::Rounding => "rounding",
        };
        write!(f, "{}", name)
    }
}

/// One structured reasoning step. `rule` is a stable machine-readable tag
/// for assertions and tallies; `detail` is for humans.
#[derive(Clone, Debug, Serialize)]
pub struct TraceEvent {
    pub stage: Stage,
    pub rule: &'static str,
    pub detail: String,
    pub qty_before: u32,
    pub qty_after: u32,
}

impl TraceEvent {
    pub fn new(
        stage: Stage,
        rule: &'static str,
        detail: impl Into<String>,
        qty_before: u32,
        qty_after: u32,
    ) -> Self {
        TraceEvent {
            stage,
            rule,
            detail: detail.into(),
            qty_before,
            qty_after,
        }
    }
}

/// Confidence tier attached to a replenishment decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

/// Final decision for one SKU. Produced fresh per decision; only the
/// safety guard pass may lower the quantity afterwards, appending to the
/// trace.
#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
    pub product_name: String,
    pub department: String,
    pub supplier: String,
    pub quantity: u32,
    pub confidence: Confidence,
    pub est_cost: f64,
    pub trace: Vec<TraceEvent>,
}

impl Recommendation {
    /// True when some trace event fired the given rule tag.
    pub fn fired(&self, rule: &str) -> bool {
        self.trace.iter().any(|e| e.rule == rule)
    }
}

// ---------------------------------------------------------------------------
// Allocation output types
// ---------------------------------------------------------------------------

/// One line of the greenfield basket: a candidate plus everything the
/// passes decided about it.
#[derive(Clone, Debug, Serialize)]
pub struct AllocationLine {
    pub sku: SkuCandidate,
    pub band: PriorityBand,
    pub quantity: u32,
    /// Cash charged to the department wallet. Zero for consignment lines.
    pub cash_cost: f64,
    /// Value carried on the consignment ledger. Zero for cash lines.
    pub consignment_value: f64,
    /// Set by the width pass; depth only deepens lines that earned a slot.
    pub width_allocated: bool,
    /// Set by supplier consolidation; later passes never stock the line.
    pub excluded: bool,
    pub trace: Vec<TraceEvent>,
}

impl AllocationLine {
    pub fn new(sku: SkuCandidate, band: PriorityBand) -> Self {
        AllocationLine {
            sku,
            band,
            quantity: 0,
            cash_cost: 0.0,
            consignment_value: 0.0,
            width_allocated: false,
            excluded: false,
            trace: Vec::new(),
        }
    }

    pub fn push_event(
        &mut self,
        stage: Stage,
        rule: &'static str,
        detail: impl Into<String>,
        qty_before: u32,
    ) {
        let qty_after = self.quantity;
        self.trace
            .push(TraceEvent::new(stage, rule, detail, qty_before, qty_after));
    }

    /// True when some trace event fired the given rule tag.
    pub fn fired(&self, rule: &str) -> bool {
        self.trace.iter().any(|e| e.rule == rule)
    }

    /// True when the rule fired during a specific stage. Cap refusals
    /// share tags across stages, so callers care where one fired.
    pub fn fired_at(&self, stage: Stage, rule: &str) -> bool {
        self.trace.iter().any(|e| e.stage == stage && e.rule == rule)
    }

    /// Collapse the line into the shared recommendation shape, trace and
    /// all. Confidence reflects the evidence behind the quantity: proven
    /// staples high, ordinary lines medium, no-history launches low.
    pub fn into_recommendation(self) -> Recommendation {
        let confidence = if self.sku.is_new_product() {
            Confidence::Low
        } else if self.band == PriorityBand::StapleFast {
            Confidence::High
        } else {
            Confidence::Medium
        };
        Recommendation {
            est_cost: self.cash_cost + self.consignment_value,
            product_name: self.sku.name,
            department: self.sku.department,
            supplier: self.sku.supplier,
            quantity: self.quantity,
            confidence,
            trace: self.trace,
        }
    }
}

/// Why a candidate was excluded or cut, for the run tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SkipReason {
    InternalProduction,
    PriceCeiling,
    DeadStock,
    LowDemand,
    FreshSkuCap,
    BudgetExhausted,
    SupplierConsolidated,
    BelowMov,
    Pruned,
}

/// Run-level accounting accumulated across passes. Read-only downstream.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AllocationSummary {
    pub total_budget: f64,
    /// Cash committed per pass, keyed by stage name.
    pub cash_by_stage: BTreeMap<String, f64>,
    pub total_cash: f64,
    pub total_consignment: f64,
    pub lines_stocked: usize,
    pub skipped: BTreeMap<SkipReason, u32>,
    /// Spend as a percentage of each wallet's ceiling.
    pub department_utilization: BTreeMap<String, f64>,
    pub unused_budget: f64,
    pub utilization_pct: f64,
}

impl AllocationSummary {
    pub fn record_cash(&mut self, stage: Stage, amount: f64) {
        if amount > 0.0 {
            *self.cash_by_stage.entry(stage.to_string()).or_insert(0.0) += amount;
            self.total_cash += amount;
        }
    }

    /// Reverse committed cash (pruning, supplier anchoring). Shows up as
    /// a negative entry against the releasing stage.
    pub fn record_refund(&mut self, stage: Stage, amount: f64) {
        if amount > 0.0 {
            *self.cash_by_stage.entry(stage.to_string()).or_insert(0.0) -= amount;
            self.total_cash -= amount;
        }
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skip_count(&self, reason: SkipReason) -> u32 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}
