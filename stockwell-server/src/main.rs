use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::env;
use std::process;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use stockwell_engine::loader::{load_candidates_file, LoaderReport};
use stockwell_engine::types::{
    AllocationLine, AllocationSummary, Recommendation, SkuCandidate, Stage,
};
use stockwell_engine::{decide_batch, GreenfieldAllocator, ReplenishPolicy, SeasonalFactors};
use stockwell_guard::{defer_small_batches, enforce, GuardMode};
use stockwell_policy::config::{load_capital_weights, load_staples, load_tier_table};
use stockwell_policy::departments::normalize;
use stockwell_policy::{CapitalWeights, StapleRegistry, TierTable};

/// Lines shown in the human-readable report before folding the rest.
const TOP_LINES: usize = 15;

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TraceJson {
    stage: String,
    rule: String,
    detail: String,
    qty_before: u32,
    qty_after: u32,
}

#[derive(Serialize)]
struct RecommendationJson {
    product: String,
    department: String,
    supplier: String,
    quantity: u32,
    confidence: String,
    est_cost: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trace: Vec<TraceJson>,
}

#[derive(Serialize)]
struct AllocateJson {
    generated_at: String,
    tier: String,
    budget: f64,
    rows_loaded: usize,
    rows_dropped: usize,
    engine_ms: u128,
    summary: AllocationSummary,
    recommendations: Vec<RecommendationJson>,
}

#[derive(Serialize)]
struct ReplenishJson {
    generated_at: String,
    rows_loaded: usize,
    rows_dropped: usize,
    min_order_value: f64,
    engine_ms: u128,
    lines_ordered: usize,
    order_value: f64,
    deferred_lines: usize,
    recommendations: Vec<RecommendationJson>,
}

fn rec_json(rec: &Recommendation) -> RecommendationJson {
    RecommendationJson {
        product: rec.product_name.clone(),
        department: rec.department.clone(),
        supplier: rec.supplier.clone(),
        quantity: rec.quantity,
        confidence: rec.confidence.to_string(),
        est_cost: rec.est_cost,
        trace: rec
            .trace
            .iter()
            .map(|e| TraceJson {
                stage: e.stage.to_string(),
                rule: e.rule.to_string(),
                detail: e.detail.clone(),
                qty_before: e.qty_before,
                qty_after: e.qty_after,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// Format a number with comma thousands separators.
fn format_dollars(amount: f64) -> String {
    let whole = amount.abs() as u64;
    let sign = if amount < 0.0 { "-" } else { "" };

    if whole < 1_000 {
        return format!("{}{}", sign, whole);
    }

    let s = whole.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    format!("{}{}", sign, result.chars().rev().collect::<String>())
}

/// Distinct rule tags fired on a line, display order, folded past four.
fn rule_chain(rec: &Recommendation) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for e in &rec.trace {
        if !seen.contains(&e.rule) {
            seen.push(e.rule);
        }
    }
    if seen.is_empty() {
        "no adjustments".into()
    } else if seen.len() <= 4 {
        seen.join(", ")
    } else {
        format!("{}, +{} more", seen[..3].join(", "), seen.len() - 3)
    }
}

fn print_allocation(
    tier: &str,
    budget: f64,
    report: &LoaderReport,
    summary: &AllocationSummary,
    recommendations: &[Recommendation],
    load_ms: u128,
    engine_ms: u128,
) {
    println!();
    println!("  \u{2554}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2557}");
    println!("  \u{2551}            STOCKWELL \u{2014} Greenfield Allocation Plan            \u{2551}");
    println!("  \u{255a}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{255d}");
    println!();

    println!(
        "  {} tier  \u{00b7}  ${} budget  \u{00b7}  {} candidates loaded ({} rows dropped)",
        tier,
        format_dollars(budget),
        report.loaded(),
        report.malformed + report.unusable
    );
    println!(
        "  {} lines stocked  \u{00b7}  ${} cash  \u{00b7}  ${} consignment  \u{00b7}  {:.1}% utilized",
        summary.lines_stocked,
        format_dollars(summary.total_cash),
        format_dollars(summary.total_consignment),
        summary.utilization_pct
    );
    println!();

    if !summary.cash_by_stage.is_empty() {
        println!("  Cash committed by pass:");
        for (stage, cash) in &summary.cash_by_stage {
            println!("    {:14} ${:>12}", stage, format_dollars(*cash));
        }
        println!();
    }

    if !summary.department_utilization.is_empty() {
        println!("  Wallet utilization:");
        for (dept, pct) in &summary.department_utilization {
            println!("    {:20} {:>6.1}%", dept, pct);
        }
        println!();
    }

    let mut stocked: Vec<&Recommendation> = recommendations
        .iter()
        .filter(|r| r.quantity > 0)
        .collect();
    stocked.sort_by(|a, b| b.est_cost.partial_cmp(&a.est_cost).unwrap_or(Ordering::Equal));

    if stocked.is_empty() {
        println!("  Nothing stocked. Budget or candidate list too thin.");
    } else {
        println!("  {:\u{2500}<64}", "");
        for (i, r) in stocked.iter().take(TOP_LINES).enumerate() {
            println!(
                "  {:>3}. {:28} {:16} {:>5} units {:>12}  {}",
                i + 1,
                r.product_name,
                r.department,
                r.quantity,
                format!("${}", format_dollars(r.est_cost)),
                r.confidence
            );
        }
        if stocked.len() > TOP_LINES {
            println!("       ... and {} more lines", stocked.len() - TOP_LINES);
        }
        println!("  {:\u{2500}<64}", "");
    }
    println!();

    if !summary.skipped.is_empty() {
        let parts: Vec<String> = summary
            .skipped
            .iter()
            .map(|(reason, count)| format!("{:?} {}", reason, count))
            .collect();
        println!("  Skipped: {}", parts.join("  \u{00b7}  "));
    }
    println!("  Unused budget: ${}", format_dollars(summary.unused_budget));
    println!();
    println!(
        "  \u{23f1}  CSV loaded in {}ms \u{00b7} Engine ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        engine_ms,
        load_ms + engine_ms
    );
    println!();
}

fn print_replenishment(
    report: &LoaderReport,
    min_order_value: f64,
    recommendations: &[Recommendation],
    load_ms: u128,
    engine_ms: u128,
) {
    println!();
    println!("  \u{2554}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2557}");
    println!("  \u{2551}           STOCKWELL \u{2014} Replenishment Order Proposal           \u{2551}");
    println!("  \u{255a}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{255d}");
    println!();

    let ordered: Vec<&Recommendation> = recommendations
        .iter()
        .filter(|r| r.quantity > 0)
        .collect();
    let order_value: f64 = ordered.iter().map(|r| r.est_cost).sum();
    let deferred = recommendations
        .iter()
        .filter(|r| r.fired("mov-deferral"))
        .count();
    let guarded = recommendations
        .iter()
        .filter(|r| {
            r.trace
                .iter()
                .any(|e| e.stage == Stage::Guard && e.rule != "mov-deferral")
        })
        .count();

    println!(
        "  {} SKUs assessed  \u{00b7}  {} rows dropped  \u{00b7}  supplier minimum ${}",
        report.loaded(),
        report.malformed + report.unusable,
        format_dollars(min_order_value)
    );
    println!(
        "  {} order lines  \u{00b7}  ${} total  \u{00b7}  {} deferred under minimum  \u{00b7}  {} guard adjustments",
        ordered.len(),
        format_dollars(order_value),
        deferred,
        guarded
    );
    println!();

    if ordered.is_empty() {
        println!("  Nothing to order. Shelves are covered.");
    } else {
        let mut by_value = ordered.clone();
        by_value.sort_by(|a, b| b.est_cost.partial_cmp(&a.est_cost).unwrap_or(Ordering::Equal));

        println!("  {:\u{2500}<64}", "");
        for (i, r) in by_value.iter().take(TOP_LINES).enumerate() {
            println!(
                "  {:>3}. {:28} {:16} {:>5} units {:>12}  {}",
                i + 1,
                r.product_name,
                r.supplier,
                r.quantity,
                format!("${}", format_dollars(r.est_cost)),
                r.confidence
            );
            println!("       rules: {}", rule_chain(r));
            println!();
        }
        if by_value.len() > TOP_LINES {
            println!("       ... and {} more lines", by_value.len() - TOP_LINES);
        }
        println!("  {:\u{2500}<64}", "");
    }

    println!();
    println!(
        "  \u{23f1}  CSV loaded in {}ms \u{00b7} Engine ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        engine_ms,
        load_ms + engine_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Configuration surfaces
// ---------------------------------------------------------------------------

fn tier_table(path: Option<&str>) -> TierTable {
    match path {
        Some(p) => match load_tier_table(p) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Error loading tier table: {}", e);
                process::exit(1);
            }
        },
        None => TierTable::default(),
    }
}

fn capital_weights(path: Option<&str>) -> CapitalWeights {
    match path {
        Some(p) => match load_capital_weights(p) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("Error loading capital weights: {}", e);
                process::exit(1);
            }
        },
        None => CapitalWeights::default(),
    }
}

fn staple_registry(path: Option<&str>) -> StapleRegistry {
    match path {
        Some(p) => match load_staples(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading staple list: {}", e);
                process::exit(1);
            }
        },
        None => StapleRegistry::default(),
    }
}

/// Seasonal surface: `{ "<DEPARTMENT>": factor }`. Keys are normalized to
/// match the loader's department keys.
fn seasonal_factors(path: Option<&str>) -> SeasonalFactors {
    let p = match path {
        Some(p) => p,
        None => return SeasonalFactors::new(),
    };
    let raw = match std::fs::read_to_string(p) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading seasonal factors: {}", e);
            process::exit(1);
        }
    };
    let map: BTreeMap<String, f64> = match serde_json::from_str(&raw) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error parsing seasonal factors: {}", e);
            process::exit(1);
        }
    };
    map.into_iter().map(|(k, v)| (normalize(&k), v)).collect()
}

fn load_candidates_or_exit(path: &str) -> (Vec<SkuCandidate>, LoaderReport) {
    match load_candidates_file(path) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("Error loading candidates: {}", e);
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

fn take_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("Error: {} requires a value", flag);
            process::exit(1);
        }
    }
}

fn parse_number(raw: &str, flag: &str) -> f64 {
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: {} requires a number, got '{}'", flag, raw);
        process::exit(1);
    })
}

fn usage() {
    eprintln!("Usage: stockwell <allocate|replenish> [options]");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  allocate   --input FILE --budget N [--tiers FILE] [--weights FILE]");
    eprintln!("             [--staples FILE] [--seasonal FILE] [--json]");
    eprintln!("  replenish  --input FILE [--budget N] [--tiers FILE] [--mov N] [--json]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --input     Candidate CSV export");
    eprintln!("  --budget    Total shelf-capital budget; selects the tier profile");
    eprintln!("  --tiers     Tier keyframe JSON overriding the built-in table");
    eprintln!("  --weights   Department capital-weight JSON");
    eprintln!("  --staples   Curated staple list JSON");
    eprintln!("  --seasonal  Department seasonal-factor JSON");
    eprintln!("  --mov       Minimum order value for supplier batch deferral");
    eprintln!("  --json      Output as JSON instead of formatted text");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  stockwell allocate --input fixtures/candidates.csv --budget 500000");
    eprintln!("  stockwell replenish --input fixtures/candidates.csv --budget 500000 --json");
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

fn run_allocate(args: &[String]) {
    let mut input: Option<&str> = None;
    let mut budget: Option<f64> = None;
    let mut tiers_path: Option<&str> = None;
    let mut weights_path: Option<&str> = None;
    let mut staples_path: Option<&str> = None;
    let mut seasonal_path: Option<&str> = None;
    let mut json_output = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                input = Some(take_value(args, i, "--input"));
                i += 2;
            }
            "--budget" => {
                budget = Some(parse_number(take_value(args, i, "--budget"), "--budget"));
                i += 2;
            }
            "--tiers" => {
                tiers_path = Some(take_value(args, i, "--tiers"));
                i += 2;
            }
            "--weights" => {
                weights_path = Some(take_value(args, i, "--weights"));
                i += 2;
            }
            "--staples" => {
                staples_path = Some(take_value(args, i, "--staples"));
                i += 2;
            }
            "--seasonal" => {
                seasonal_path = Some(take_value(args, i, "--seasonal"));
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let (input, budget) = match (input, budget) {
        (Some(p), Some(b)) => (p, b),
        _ => {
            eprintln!("Error: allocate requires --input FILE and --budget N");
            process::exit(1);
        }
    };
    if !(budget >= 0.0) {
        eprintln!("Error: --budget must be a non-negative number");
        process::exit(1);
    }

    let tiers = tier_table(tiers_path);
    let weights = capital_weights(weights_path);
    let staples = staple_registry(staples_path);
    let seasonal = seasonal_factors(seasonal_path);
    let tier_name = tiers.profile_for(budget).tier_name;

    let load_start = Instant::now();
    let (candidates, report) = load_candidates_or_exit(input);
    let load_ms = load_start.elapsed().as_millis();

    let engine_start = Instant::now();
    let skus = candidates.clone();
    let allocator = GreenfieldAllocator::new(tiers, weights, staples);
    let (lines, summary) = allocator.allocate(candidates, budget, &seasonal);
    let recommendations: Vec<Recommendation> = lines
        .into_iter()
        .map(AllocationLine::into_recommendation)
        .collect();
    let recommendations = enforce(recommendations, &skus, GuardMode::Greenfield);
    let engine_ms = engine_start.elapsed().as_millis();

    if json_output {
        let doc = AllocateJson {
            generated_at: Utc::now().to_rfc3339(),
            tier: tier_name,
            budget,
            rows_loaded: report.loaded(),
            rows_dropped: report.malformed + report.unusable,
            engine_ms,
            summary,
            recommendations: recommendations.iter().map(rec_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&doc).unwrap());
    } else {
        print_allocation(
            &tier_name,
            budget,
            &report,
            &summary,
            &recommendations,
            load_ms,
            engine_ms,
        );
    }
}

fn run_replenish(args: &[String]) {
    let mut input: Option<&str> = None;
    let mut budget: Option<f64> = None;
    let mut tiers_path: Option<&str> = None;
    let mut mov_flag: Option<f64> = None;
    let mut json_output = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                input = Some(take_value(args, i, "--input"));
                i += 2;
            }
            "--budget" => {
                budget = Some(parse_number(take_value(args, i, "--budget"), "--budget"));
                i += 2;
            }
            "--tiers" => {
                tiers_path = Some(take_value(args, i, "--tiers"));
                i += 2;
            }
            "--mov" => {
                mov_flag = Some(parse_number(take_value(args, i, "--mov"), "--mov"));
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let input = match input {
        Some(p) => p,
        None => {
            eprintln!("Error: replenish requires --input FILE");
            process::exit(1);
        }
    };

    // Without a budget there is no tier profile: the presentation floor
    // stays off and the MOV screen only runs when --mov is given.
    let tiers = tier_table(tiers_path);
    let (policy, profile_mov) = match budget {
        Some(b) => {
            let profile = tiers.profile_for(b);
            let mov = profile.min_order_value;
            (ReplenishPolicy::from_profile(&profile), mov)
        }
        None => (ReplenishPolicy::default(), 0.0),
    };
    let min_order_value = mov_flag.unwrap_or(profile_mov);

    let load_start = Instant::now();
    let (skus, report) = load_candidates_or_exit(input);
    let load_ms = load_start.elapsed().as_millis();

    let engine_start = Instant::now();
    let recommendations = decide_batch(&skus, &policy);
    let recommendations = enforce(recommendations, &skus, GuardMode::Replenishment);
    let recommendations = defer_small_batches(recommendations, &skus, min_order_value);
    let engine_ms = engine_start.elapsed().as_millis();

    if json_output {
        let ordered = recommendations.iter().filter(|r| r.quantity > 0);
        let doc = ReplenishJson {
            generated_at: Utc::now().to_rfc3339(),
            rows_loaded: report.loaded(),
            rows_dropped: report.malformed + report.unusable,
            min_order_value,
            engine_ms,
            lines_ordered: ordered.clone().count(),
            order_value: ordered.map(|r| r.est_cost).sum(),
            deferred_lines: recommendations
                .iter()
                .filter(|r| r.fired("mov-deferral"))
                .count(),
            recommendations: recommendations.iter().map(rec_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&doc).unwrap());
    } else {
        print_replenishment(&report, min_order_value, &recommendations, load_ms, engine_ms);
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "allocate" => run_allocate(&args[2..]),
        "replenish" => run_replenish(&args[2..]),
        "--help" | "-h" | "help" => usage(),
        other => {
            eprintln!("Unknown mode: {}", other);
            usage();
            process::exit(1);
        }
    }
}
