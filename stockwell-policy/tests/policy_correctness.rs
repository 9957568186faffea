//! Correctness tests for stockwell-policy.
//!
//! Validates that:
//! 1. Tier interpolation is continuous, clamped, and never regresses in budget
//! 2. Wallet partitioning conserves the budget split it describes
//! 3. The staple heuristic combines the curated list and the fallback
//! 4. Broken configuration fails fast instead of mid-run

use stockwell_policy::departments::{is_fast_five, StapleRegistry};
use stockwell_policy::tiers::TierTable;
use stockwell_policy::wallets::{CapitalWeights, WalletBook, GENERAL_WALLET};

fn weights() -> CapitalWeights {
    CapitalWeights::new([
        ("FRESH MILK", 0.25),
        ("BREAD", 0.15),
        ("COOKING OIL", 0.20),
        ("DETERGENTS", 0.10),
        ("COSMETICS", 0.0),
    ])
    .unwrap()
}

#[test]
fn profile_sweep_is_monotone_across_the_full_range() {
    let table = TierTable::default();
    let mut budget = 0.0;
    let mut prev_depth = 0;
    let mut prev_ceiling = 0.0;
    let mut prev_mov = 0.0;
    while budget <= 250_000_000.0 {
        let p = table.profile_for(budget);
        assert!(
            p.depth_days >= prev_depth,
            "depth_days regressed at budget {}",
            budget
        );
        assert!(
            p.price_ceiling >= prev_ceiling,
            "price_ceiling regressed at budget {}",
            budget
        );
        assert!(
            p.min_order_value >= prev_mov,
            "min_order_value regressed at budget {}",
            budget
        );
        prev_depth = p.depth_days;
        prev_ceiling = p.price_ceiling;
        prev_mov = p.min_order_value;
        budget += 1_370_000.0;
    }
}

#[test]
fn profile_and_wallets_compose_into_a_run_context() {
    let table = TierTable::default();
    let profile = table.profile_for(500_000.0);
    assert!(profile.is_small());
    assert!(!profile.is_micro());

    let mut book = WalletBook::initialize(500_000.0, profile.wallet_buffer_pct, &weights());

    // Allocated shares (excluding GENERAL and the zero-weight pool) match
    // the weights exactly.
    let milk = book.get("FRESH MILK").unwrap();
    assert!((milk.allocated - 125_000.0).abs() < 0.01);

    // One purchase moves exactly one wallet.
    assert!(book.check("FRESH MILK", 10_000.0));
    book.spend("FRESH MILK", 10_000.0);
    assert!((book.total_spent() - 10_000.0).abs() < 0.01);
    assert!((book.get("BREAD").unwrap().spent).abs() < 0.01);

    // Unmapped departments land in GENERAL.
    book.spend("HARDWARE", 2_500.0);
    assert!((book.get(GENERAL_WALLET).unwrap().spent - 2_500.0).abs() < 0.01);
}

#[test]
fn zero_budget_still_builds_a_coherent_book() {
    let table = TierTable::default();
    let profile = table.profile_for(0.0);
    let book = WalletBook::initialize(0.0, profile.wallet_buffer_pct, &weights());
    assert!(!book.check("FRESH MILK", 1.0));
    assert!((book.total_spent()).abs() < 1e-9);
}

#[test]
fn staple_heuristic_spans_list_and_fallback() {
    let registry =
        StapleRegistry::from_json_str(r#"["GOLDEN LOAF 400G", "SALIT OIL 1L"]"#).unwrap();

    // Curated names pass at any velocity.
    assert!(registry.is_staple("Golden Loaf 400g", "BREAD", 0.0));
    // Essential department at staple velocity passes the fallback.
    assert!(registry.is_staple("COUNTY BREAD 600G", "BREAD", 6.0));
    // Non-essential department cannot ride the fallback.
    assert!(!registry.is_staple("GLITTER PEN", "STATIONERY", 40.0));

    assert!(is_fast_five("BREAD"));
    assert!(!is_fast_five("DETERGENTS"));
}

#[test]
fn malformed_keyframe_json_is_an_error_not_a_panic() {
    let result = TierTable::from_json_str("{ not json");
    assert!(result.is_err());

    let result = TierTable::from_json_str(r#"{"abc": {"depth_days": 1}}"#);
    assert!(result.is_err());
}
