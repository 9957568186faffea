//! CSV candidate data loader.
//!
//! Parses master-data exports into `SkuCandidate` values. Expected CSV
//! columns:
//!   name, department, supplier, unit_price, historical_cost, margin_pct,
//!   daily_demand_90d, daily_demand_30d, demand_cv, lead_time_days,
//!   order_frequency_days, pack_size, is_fresh, shelf_life_days,
//!   is_consignment, abc_class, xyz_class, is_key_sku, is_top_seller,
//!   on_promotion, is_sunset, purchase_blocked, moq, supplier_reliability,
//!   expiry_return_value, days_since_delivery, units_sold_90d,
//!   stock_on_hand, on_order, lookalike_daily_demand, avg_order_qty,
//!   sales_trend, sales_trend_pct
//!
//! Ingestion is tolerant: a malformed or unusable row is logged and
//! skipped, never fatal. Only a file with zero usable rows errors.

use std::io::Read;

use serde::Deserialize;

use stockwell_policy::departments::normalize;
use stockwell_policy::thresholds::{
    DEFAULT_DEMAND_CV, DEFAULT_LEAD_TIME_DAYS, DEFAULT_ORDER_FREQUENCY_DAYS, DEFAULT_RELIABILITY,
};

use crate::error::{EngineError, EngineResult};
use crate::types::{AbcClass, SalesTrend, SkuCandidate, XyzClass};

/// A raw CSV record. Numeric reference data is optional; conversion to
/// `SkuCandidate` fills the documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub supplier: String,
    pub unit_price: Option<f64>,
    pub historical_cost: Option<f64>,
    pub margin_pct: Option<f64>,
    pub daily_demand_90d: Option<f64>,
    pub daily_demand_30d: Option<f64>,
    pub demand_cv: Option<f64>,
    pub lead_time_days: Option<f64>,
    pub order_frequency_days: Option<f64>,
    pub pack_size: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_fresh: bool,
    pub shelf_life_days: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_consignment: bool,
    #[serde(default)]
    pub abc_class: String,
    #[serde(default)]
    pub xyz_class: String,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_key_sku: bool,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_top_seller: bool,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub on_promotion: bool,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_sunset: bool,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub purchase_blocked: bool,
    pub moq: Option<u32>,
    pub supplier_reliability: Option<f64>,
    pub expiry_return_value: Option<f64>,
    pub days_since_delivery: Option<f64>,
    pub units_sold_90d: Option<f64>,
    pub stock_on_hand: Option<f64>,
    pub on_order: Option<f64>,
    pub lookalike_daily_demand: Option<f64>,
    pub avg_order_qty: Option<f64>,
    #[serde(default)]
    pub sales_trend: String,
    pub sales_trend_pct: Option<f64>,
}

impl CandidateRow {
    /// Resolve defaults and produce a candidate. Returns `None` for rows
    /// the engines cannot price: blank name or non-positive price.
    pub fn into_candidate(self) -> Option<SkuCandidate> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let unit_price = self.unit_price.unwrap_or(0.0);
        if unit_price <= 0.0 {
            return None;
        }

        let supplier = {
            let s = self.supplier.trim();
            if s.is_empty() {
                "UNKNOWN".to_string()
            } else {
                s.to_uppercase()
            }
        };

        Some(SkuCandidate {
            name,
            department: normalize(&self.department),
            supplier,
            unit_price,
            historical_cost: self.historical_cost.filter(|c| *c > 0.0),
            margin_pct: self.margin_pct.filter(|m| *m > 0.0),
            daily_demand_90d: self.daily_demand_90d.unwrap_or(0.0).max(0.0),
            daily_demand_30d: self.daily_demand_30d.unwrap_or(0.0).max(0.0),
            demand_cv: match self.demand_cv {
                Some(cv) if cv >= 0.0 => cv,
                _ => DEFAULT_DEMAND_CV,
            },
            lead_time_days: match self.lead_time_days {
                Some(d) if d > 0.0 => d,
                _ => DEFAULT_LEAD_TIME_DAYS,
            },
            order_frequency_days: match self.order_frequency_days {
                Some(d) if d > 0.0 => d,
                _ => DEFAULT_ORDER_FREQUENCY_DAYS,
            },
            pack_size: self.pack_size.unwrap_or(1).max(1),
            is_fresh: self.is_fresh,
            shelf_life_days: self.shelf_life_days.filter(|d| *d > 0.0),
            is_consignment: self.is_consignment,
            abc_class: AbcClass::from_code(&self.abc_class),
            xyz_class: XyzClass::from_code(&self.xyz_class),
            is_key_sku: self.is_key_sku,
            is_top_seller: self.is_top_seller,
            on_promotion: self.on_promotion,
            is_sunset: self.is_sunset,
            purchase_blocked: self.purchase_blocked,
            moq: self.moq.unwrap_or(0),
            supplier_reliability: normalize_reliability(self.supplier_reliability),
            expiry_return_value: self.expiry_return_value.unwrap_or(0.0).max(0.0),
            days_since_delivery: self.days_since_delivery.unwrap_or(0.0).max(0.0),
            units_sold_90d: self.units_sold_90d.unwrap_or(0.0).max(0.0),
            stock_on_hand: self.stock_on_hand.unwrap_or(0.0),
            on_order: self.on_order.unwrap_or(0.0).max(0.0),
            lookalike_daily_demand: self.lookalike_daily_demand.filter(|d| *d > 0.0),
            avg_order_qty: self.avg_order_qty.unwrap_or(0.0).max(0.0),
            sales_trend: SalesTrend::from_code(&self.sales_trend),
            sales_trend_pct: self.sales_trend_pct.unwrap_or(0.0),
        })
    }
}

/// Accounting for one load: how many rows arrived and why some were
/// dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoaderReport {
    pub rows_read: usize,
    /// Rows the CSV layer could not parse.
    pub malformed: usize,
    /// Rows parsed but rejected (blank name or unpriceable).
    pub unusable: usize,
}

impl LoaderReport {
    pub fn loaded(&self) -> usize {
        self.rows_read - self.malformed - self.unusable
    }
}

/// Reliability feeds appear on both a 0..1 and a 0..100 scale; fold the
/// percentage form down and clamp.
fn normalize_reliability(raw: Option<f64>) -> f64 {
    let r = match raw {
        Some(r) if r > 0.0 => r,
        _ => return DEFAULT_RELIABILITY,
    };
    if r > 1.5 {
        (r / 100.0).clamp(0.0, 1.0)
    } else {
        r.clamp(0.0, 1.0)
    }
}

/// Load candidates from a CSV reader, skipping bad rows.
pub fn load_candidates<R: Read>(reader: R) -> EngineResult<(Vec<SkuCandidate>, LoaderReport)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut candidates = Vec::new();
    let mut report = LoaderReport::default();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        report.rows_read += 1;
        let row: CandidateRow = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("skipping CSV line {}: {}", line_num + 2, e);
                report.malformed += 1;
                continue;
            }
        };
        match row.into_candidate() {
            Some(candidate) => candidates.push(candidate),
            None => {
                log::warn!("skipping CSV line {}: blank name or unpriceable", line_num + 2);
                report.unusable += 1;
            }
        }
    }

    Ok((candidates, report))
}

/// Load candidates from a CSV file path. Errors when the file cannot be
/// read or yields no usable candidates at all.
pub fn load_candidates_file(path: &str) -> EngineResult<(Vec<SkuCandidate>, LoaderReport)> {
    let file = std::fs::File::open(path)?;
    let (candidates, report) = load_candidates(file)?;
    if candidates.is_empty() {
        return Err(EngineError::EmptyInput(path.to_string()));
    }
    Ok((candidates, report))
}

/// Flexible bool deserializer: handles "true"/"false", "1"/"0", "yes"/"no",
/// and treats blank cells as false.
fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.to_lowercase().trim() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected bool value, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,department,supplier,unit_price,historical_cost,margin_pct,daily_demand_90d,daily_demand_30d,demand_cv,lead_time_days,order_frequency_days,pack_size,is_fresh,shelf_life_days,is_consignment,abc_class,xyz_class,is_key_sku,is_top_seller,on_promotion,is_sunset,purchase_blocked,moq,supplier_reliability,expiry_return_value,days_since_delivery,units_sold_90d,stock_on_hand,on_order,lookalike_daily_demand,avg_order_qty,sales_trend,sales_trend_pct";

    fn sample_csv() -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n",
            HEADER,
            "FRESH MILK 1L,fresh milk,DAIRYCO,28.5,21.0,,8.2,9.1,0.3,2,3,12,yes,5,,A,X,1,1,,,,0,0.95,0,1,738,24,12,,60,growing,14.0",
            "TIN TOMATOES 410G,CANNED GOODS,CANCO,18.0,,35.0,1.4,1.2,0.6,7,14,24,,,,B,Y,,,,,,24,92,0,9,126,40,0,,48,stable,0.0",
            "MYSTERY GADGET,TOYS,,450.0,,,0.0,0.0,,,,6,,,,,,,,,,,0,,0,,0,0,0,1.6,0,,0.0",
            ",BREAD,BAKERCO,12.0,,,3.0,3.0,0.4,2,7,10,,,,B,Y,,,,,,0,0.9,0,2,270,5,0,,30,stable,0.0",
        )
    }

    #[test]
    fn load_sample_csv() {
        let (candidates, report) = load_candidates(sample_csv().as_bytes()).unwrap();
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.unusable, 1, "blank-name row dropped");
        assert_eq!(candidates.len(), 3);

        let milk = &candidates[0];
        assert_eq!(milk.name, "FRESH MILK 1L");
        assert_eq!(milk.department, "FRESH MILK", "department uppercased");
        assert!(milk.is_fresh);
        assert_eq!(milk.abc_class, AbcClass::A);
        assert_eq!(milk.sales_trend, SalesTrend::Growing);
        assert!((milk.unit_cost() - 21.0).abs() < 0.01, "historical cost");

        let tins = &candidates[1];
        assert!(
            (tins.supplier_reliability - 0.92).abs() < 0.001,
            "percent-scale reliability folded to 0..1"
        );
        assert!((tins.unit_cost() - 11.7).abs() < 0.01, "margin-derived cost");
    }

    #[test]
    fn missing_reference_data_takes_defaults() {
        let (candidates, _) = load_candidates(sample_csv().as_bytes()).unwrap();
        let gadget = &candidates[2];
        assert_eq!(gadget.supplier, "UNKNOWN");
        assert!(
            (gadget.days_since_delivery - 0.0).abs() < 1e-9,
            "unknown delivery date never counts as idle"
        );
        assert!((gadget.lead_time_days - 7.0).abs() < 1e-9);
        assert!((gadget.order_frequency_days - 7.0).abs() < 1e-9);
        assert!((gadget.supplier_reliability - 0.9).abs() < 1e-9);
        assert!((gadget.demand_cv - 0.5).abs() < 1e-9);
        assert_eq!(gadget.abc_class, AbcClass::B);
        assert_eq!(gadget.xyz_class, XyzClass::Z);
        assert!(gadget.is_new_product());
        assert!(
            (gadget.planning_daily_demand() - 0.8).abs() < 1e-9,
            "lookalike at half weight"
        );
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let data = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "GOOD ITEM,BREAD,BAKERCO,12.0,,,3.0,3.0,0.4,2,7,10,,,,B,Y,,,,,,0,0.9,0,2,270,5,0,,30,stable,0.0",
            "BAD ITEM,BREAD,BAKERCO,not-a-number,,,3.0,3.0,0.4,2,7,10,,,,B,Y,,,,,,0,0.9,0,2,270,5,0,,30,stable,0.0",
        );
        let (candidates, report) = load_candidates(data.as_bytes()).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.loaded(), 1);
    }

    #[test]
    fn empty_file_errors_at_the_file_edge() {
        let path = std::env::temp_dir().join("stockwell_empty_candidates.csv");
        std::fs::write(&path, format!("{}\n", HEADER)).unwrap();
        let err = load_candidates_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyInput(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn bool_parsing_handles_variants() {
        let data = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "A,BREAD,S,10,,,1,1,0.4,2,7,1,1,,yes,B,Y,y,TRUE,0,no,,0,0.9,0,2,90,0,0,,0,stable,0",
            "B,BREAD,S,10,,,1,1,0.4,2,7,1,false,,0,B,Y,n,,1,YES,true,0,0.9,0,2,90,0,0,,0,stable,0",
        );
        let (candidates, _) = load_candidates(data.as_bytes()).unwrap();
        let a = &candidates[0];
        assert!(a.is_fresh && a.is_consignment && a.is_key_sku && a.is_top_seller);
        assert!(!a.on_promotion && !a.is_sunset);
        let b = &candidates[1];
        assert!(!b.is_fresh && !b.is_consignment && !b.is_key_sku && !b.is_top_seller);
        assert!(b.on_promotion && b.is_sunset && b.purchase_blocked);
    }
}
