//! Centralized policy thresholds for allocation and replenishment.
//!
//! These values are calibrated for general-trade grocery retail (kiosk
//! through hypermarket). Changing a value here affects BOTH the greenfield
//! allocation passes and the replenishment rule engine; tier-dependent
//! thresholds live in the keyframe table (`tiers.rs`) instead.

/// Budget below which a store runs small-store policy (staple consolidation,
/// tighter share caps, fast-five priority).
pub const SMALL_STORE_BUDGET: f64 = 1_000_000.0;

/// Budget below which a store is a micro outlet (kiosk band).
pub const MICRO_STORE_BUDGET: f64 = 200_000.0;

/// Reference flagship budget used to scale demand-density expectations
/// down to smaller stores.
pub const MEGA_REFERENCE_BUDGET: f64 = 114_000_000.0;

/// Window (days) over which scaled demand density is projected at intake.
pub const DEMAND_WINDOW_DAYS: f64 = 45.0;

/// Budget-scaled demand (units over the window) below which a non-staple
/// does not earn a shelf slot in a small store.
pub const SCALED_DEMAND_FLOOR: f64 = 0.5;

/// Daily velocity below which a C-class item counts as dead stock at intake.
pub const DEAD_STOCK_VELOCITY: f64 = 0.2;

/// Daily velocity at or above which an essential-department item passes the
/// staple fallback heuristic (covers curation gaps in the explicit list).
pub const STAPLE_VELOCITY_FLOOR: f64 = 5.0;

/// GENERAL wallet share of the total budget (allocated).
pub const GENERAL_WALLET_ALLOC_PCT: f64 = 0.05;

/// GENERAL wallet hard ceiling as a share of the total budget.
pub const GENERAL_WALLET_MAX_PCT: f64 = 0.10;

/// Budget share reserved for zero-weight departments, split evenly among
/// them so no mapped department is ever excluded outright.
pub const ZERO_WEIGHT_POOL_PCT: f64 = 0.02;

/// Unspent budget share above which the flex pool (Pass 2B) activates.
pub const FLEX_POOL_TRIGGER_PCT: f64 = 0.05;

/// Remaining budget share at or below which the mop-up pass activates.
pub const MOPUP_TRIGGER_PCT: f64 = 0.05;

/// Ceiling (days of cover) for mop-up spending on staples.
pub const MOPUP_CEILING_DAYS: f64 = 60.0;

/// Extra days of cover on top of lead time for the width-pass launch buffer.
pub const LAUNCH_BUFFER_DAYS: f64 = 3.0;

/// Days idle after which a fresh item is blocked outright.
pub const FRESH_IDLE_BLOCK_DAYS: f64 = 180.0;

/// Days idle after which a fresh item enters the watchlist.
pub const FRESH_IDLE_WATCH_DAYS: f64 = 120.0;

/// Post-order coverage cap (days) for watchlisted fresh items.
pub const FRESH_WATCH_CAP_DAYS: f64 = 7.0;

/// Days idle at which a dry item is a confirmed slow mover.
pub const DRY_IDLE_BLOCK_DAYS: f64 = 200.0;

/// Post-order coverage cap (days) for steady dry slow movers.
pub const DRY_SLOW_CAP_DAYS: f64 = 21.0;

/// Post-order coverage cap (days) for the A-class zero-stock rescue fill.
pub const RESCUE_CAP_DAYS: f64 = 14.0;

/// Start of the early-warning idle window (days). The window ends where the
/// dry slow-mover rule begins.
pub const EARLY_WARNING_FROM_DAYS: f64 = 160.0;

/// Quantity dampener applied inside the early-warning window.
pub const EARLY_WARNING_FACTOR: f64 = 0.8;

/// Default upper coverage bound (days) before dynamic adjustment.
pub const BASE_UPPER_COVERAGE_DAYS: f64 = 45.0;

/// Red-zone threshold as a multiple of the dynamic upper bound.
pub const OVERSTOCK_HARD_FACTOR: f64 = 1.2;

/// Volatility buffer base (days), dry goods.
pub const BASE_SAFETY_DAYS_DRY: f64 = 1.5;

/// Volatility buffer base (days), fresh goods.
pub const BASE_SAFETY_DAYS_FRESH: f64 = 4.0;

/// Net-requirement bump for A-class items, biasing against stockout.
pub const TOP_CLASS_BUMP: f64 = 1.2;

/// CZ-class items ordered weekly or better: overstock base bound (days).
pub const CZ_BOUND_WEEKLY_DAYS: f64 = 21.0;

/// CZ-class items ordered bi-weekly: overstock base bound (days).
pub const CZ_BOUND_BIWEEKLY_DAYS: f64 = 28.0;

/// CZ-class items ordered monthly or slower: overstock base bound (days).
pub const CZ_BOUND_SLOW_DAYS: f64 = 35.0;

/// Supplier order frequency counted as weekly (days).
pub const CZ_FREQ_WEEKLY_DAYS: f64 = 7.0;

/// Supplier order frequency counted as bi-weekly (days).
pub const CZ_FREQ_BIWEEKLY_DAYS: f64 = 14.0;

/// Margin percentage above which the overstock bound widens by 20%.
pub const MARGIN_WIDEN_HIGH_PCT: f64 = 30.0;

/// Margin percentage above which the overstock bound widens by 10%.
pub const MARGIN_WIDEN_MID_PCT: f64 = 15.0;

/// Bound multiplier for high-margin lines.
pub const MARGIN_WIDEN_HIGH_FACTOR: f64 = 1.2;

/// Bound multiplier for mid-margin lines.
pub const MARGIN_WIDEN_MID_FACTOR: f64 = 1.1;

/// Slow-mover max orders smaller than this fraction of a pack collapse to
/// zero instead of forcing a broken-pack order.
pub const SLOW_MOVER_MIN_PACK_RATIO: f64 = 0.5;

/// Supplier expiry-return value above which the quality penalty applies.
pub const QUALITY_PENALTY_RETURNS: f64 = 1000.0;

/// Quality penalty multiplier.
pub const QUALITY_PENALTY_FACTOR: f64 = 0.9;

/// Days since last delivery within which a line still counts as actively
/// trading for the strategic health check.
pub const STRATEGIC_RECENCY_DAYS: f64 = 60.0;

/// Sunset items of A/B class with no stock get this minimal fill (units).
pub const SUNSET_MINIMAL_FILL: u32 = 3;

/// Sales-trend growth percentage above which the trend boost applies.
pub const TREND_GROWTH_PCT: f64 = 10.0;

/// Historical-baseline multiplier for a confirmed growing trend.
pub const TREND_BOOST: f64 = 1.15;

/// Historical-baseline multiplier for a declining trend.
pub const TREND_CUT: f64 = 0.9;

/// Default supplier lead time (days) when reference data is missing.
pub const DEFAULT_LEAD_TIME_DAYS: f64 = 7.0;

/// Default supplier order frequency (days) when reference data is missing.
pub const DEFAULT_ORDER_FREQUENCY_DAYS: f64 = 7.0;

/// Default supplier reliability (0..1) when reference data is missing.
pub const DEFAULT_RELIABILITY: f64 = 0.9;

/// Default demand coefficient of variation when reference data is missing.
pub const DEFAULT_DEMAND_CV: f64 = 0.5;

/// Default unit cost as a share of selling price when neither historical
/// cost nor margin is known.
pub const DEFAULT_COST_RATIO: f64 = 0.75;

/// Floor for effective daily demand. Keeps coverage arithmetic finite for
/// zero-sales items; stockout-risk classification must always produce an
/// answer.
pub const MIN_DAILY_DEMAND: f64 = 0.01;

/// Overage tolerated when rounding a key/high-risk quantity up to a pack.
pub const MAX_PACK_OVERAGE_RATIO: f64 = 0.25;

/// Shortage tolerated when rounding a low-risk quantity down to a pack.
pub const MAX_PACK_SHORTAGE_RATIO: f64 = 0.10;

/// Current coverage (days) below which stockout risk is High.
pub const HIGH_RISK_COVER_DAYS: f64 = 3.0;

/// Current coverage (days) above which stockout risk is Low.
pub const LOW_RISK_COVER_DAYS: f64 = 20.0;

/// Conservative daily-demand baseline for brand-new fresh products.
pub const NEW_PRODUCT_BASELINE_FRESH: f64 = 0.3;

/// Conservative daily-demand baseline for brand-new dry products.
pub const NEW_PRODUCT_BASELINE_DRY: f64 = 0.5;

/// Depth cap (days) for new fresh products regardless of tier.
pub const NEW_PRODUCT_CAP_FRESH_DAYS: f64 = 7.0;

/// Depth cap (days) for new dry products regardless of tier.
pub const NEW_PRODUCT_CAP_DRY_DAYS: f64 = 14.0;

/// Share of look-alike demand credited to a new product.
pub const LOOKALIKE_DISCOUNT: f64 = 0.5;

/// Depth-target bonus for lines from unreliable suppliers (non-C only).
pub const RISK_UNRELIABLE_BONUS: f64 = 0.25;

/// Supplier reliability (0..1) below which the unreliable bonus applies.
pub const RISK_RELIABILITY_FLOOR: f64 = 0.70;

/// Depth-target bonus for volatile-demand lines (non-C only).
pub const RISK_VOLATILE_BONUS: f64 = 0.15;

/// Demand CV above which the volatile bonus applies.
pub const RISK_VOLATILITY_CEILING: f64 = 0.8;

/// Hard cap on the combined depth risk multiplier.
pub const RISK_MULTIPLIER_CAP: f64 = 1.5;

/// Shelf life (days) under which the expiry cap engages.
pub const PERISHABLE_SHELF_DAYS: f64 = 30.0;

/// Days subtracted from shelf life to leave room for delivery and display.
pub const SHELF_SAFETY_DAYS: f64 = 2.0;

/// Depth floor (days) for small-store anchor staples (oil, flour, sugar).
pub const ANCHOR_DEPTH_DAYS: f64 = 30.0;

/// Case-presentation unit floor for cheap anchor lines (sachet strips).
pub const ANCHOR_CASE_FLOOR_CHEAP: u32 = 12;

/// Case-presentation unit floor for regular anchor lines (half case).
pub const ANCHOR_CASE_FLOOR: u32 = 6;

/// Unit price below which an anchor line counts as cheap.
pub const ANCHOR_CHEAP_PRICE: f64 = 50.0;

/// Depth clamp (days) for the spoilage-critical fresh anchors (milk, bread).
pub const FRESH_ANCHOR_CLAMP_DAYS: f64 = 2.0;

/// Single line's depth spend cap as a share of its department's allocated
/// wallet, small stores.
pub const LINE_SHARE_CAP_SMALL: f64 = 0.25;

/// Single line's depth spend cap as a share of its department's allocated
/// wallet, standard stores.
pub const LINE_SHARE_CAP: f64 = 0.50;

/// Safety buffer (days) added to lead time when judging a fresh line
/// critical for MOV batch approval.
pub const CRITICAL_BUFFER_FRESH_DAYS: f64 = 3.0;

/// Safety buffer (days) added to lead time when judging a dry line critical
/// for MOV batch approval.
pub const CRITICAL_BUFFER_DRY_DAYS: f64 = 2.0;

/// Reinvestment targets kept after supplier anchoring (top N by spend).
pub const ANCHOR_SUPPLIER_COUNT: usize = 3;
