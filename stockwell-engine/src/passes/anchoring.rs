use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use stockwell_policy::thresholds::ANCHOR_SUPPLIER_COUNT;

use crate::context::AllocationRun;
use crate::pass::AllocationPass;
use crate::passes::depth::{depth_target_units, round_robin_fill, FillCaps, FillItem};
use crate::types::{SkipReason, Stage};

/// Pass 4: supplier anchoring. A small store cannot place a dozen
/// sub-minimum orders, so any supplier whose cash batch lands under the
/// tier's minimum order value has those lines released, and the freed
/// cash deepens the store's biggest surviving suppliers instead,
/// heaviest department weight first. Suppliers shipping only fresh lines
/// are exempt; a dawn bread run is worth any batch size. Consignment
/// lines neither count toward a batch nor get released.
pub struct SupplierAnchoring;

impl AllocationPass for SupplierAnchoring {
    fn enable(&self, run: &AllocationRun) -> bool {
        run.is_small()
    }

    fn run(&self, run: &mut AllocationRun) {
        let mov = run.profile.min_order_value;

        let mut below: Vec<String> = {
            let mut cash: HashMap<&str, f64> = HashMap::new();
            let mut any_dry: HashSet<&str> = HashSet::new();
            for line in &run.lines {
                if line.quantity > 0 && !line.sku.is_consignment {
                    *cash.entry(line.sku.supplier.as_str()).or_insert(0.0) += line.cash_cost;
                    if !line.sku.is_fresh {
                        any_dry.insert(line.sku.supplier.as_str());
                    }
                }
            }
            cash.iter()
                .filter(|(s, total)| **total > 0.0 && **total < mov && any_dry.contains(*s))
                .map(|(s, _)| (*s).to_string())
                .collect()
        };
        if below.is_empty() {
            return;
        }
        below.sort();

        let mut freed = 0.0;
        for supplier in &below {
            let batch: f64 = run
                .lines
                .iter()
                .filter(|l| {
                    l.quantity > 0 && !l.sku.is_consignment && l.sku.supplier == *supplier
                })
                .map(|l| l.cash_cost)
                .sum();
            for idx in 0..run.lines.len() {
                let release = {
                    let l = &run.lines[idx];
                    l.quantity > 0 && !l.sku.is_consignment && l.sku.supplier == *supplier
                };
                if release {
                    freed += run.lines[idx].cash_cost;
                    run.release_line(
                        idx,
                        Stage::Anchoring,
                        "below-mov",
                        format!("{} batch {:.0} under {:.0} minimum", supplier, batch, mov),
                        SkipReason::BelowMov,
                    );
                }
            }
        }
        if freed <= 0.0 {
            return;
        }
        log::info!(
            "Anchoring freed {:.0} from {} sub-minimum suppliers",
            freed,
            below.len()
        );

        // Rank the surviving suppliers by committed cash and keep the
        // anchors.
        let mut survivors: Vec<(String, f64)> = {
            let mut cash: HashMap<&str, f64> = HashMap::new();
            for line in &run.lines {
                if line.quantity > 0 && !line.sku.is_consignment {
                    *cash.entry(line.sku.supplier.as_str()).or_insert(0.0) += line.cash_cost;
                }
            }
            cash.into_iter().map(|(s, v)| (s.to_string(), v)).collect()
        };
        survivors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        survivors.truncate(ANCHOR_SUPPLIER_COUNT);
        let anchors: HashSet<String> = survivors.into_iter().map(|(s, _)| s).collect();

        // Reinvest the freed cash into the anchors' cash lines, heaviest
        // department weight first, velocity breaking ties.
        let mut entries: Vec<(usize, f64, f64, u32)> = run
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                l.quantity > 0 && !l.sku.is_consignment && anchors.contains(&l.sku.supplier)
            })
            .filter_map(|(idx, l)| {
                let target = depth_target_units(run, l);
                if target > l.quantity {
                    let weight = run.weights.get(&l.sku.department).unwrap_or(0.0);
                    Some((idx, weight, l.sku.velocity(), target))
                } else {
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal))
        });

        let queue: Vec<FillItem> = entries
            .iter()
            .map(|(idx, _, _, target)| FillItem::new(*idx, *target))
            .collect();
        let reinvested = round_robin_fill(
            run,
            queue,
            freed,
            Stage::Anchoring,
            "anchor-reinvest",
            FillCaps::wallet_only(),
        );
        log::info!(
            "Anchoring reinvested {:.0} into {} suppliers",
            reinvested,
            anchors.len()
        );
    }
}
