//! Department wallets: ring-fenced slices of the total budget.
//!
//! The wallet book is an explicit context object owned by one allocation
//! run: created from the tier profile and the capital-weight table, mutated
//! by every successful purchase, discarded at run end. It deliberately does
//! NOT prevent overspend; the allocation engine owns the check-then-spend
//! discipline, and the depth pass's anchor bypass may drive a wallet
//! negative.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::departments::normalize;
use crate::error::{PolicyError, PolicyResult};
use crate::thresholds::{
    GENERAL_WALLET_ALLOC_PCT, GENERAL_WALLET_MAX_PCT, ZERO_WEIGHT_POOL_PCT,
};

/// Catch-all wallet for departments without a capital weight.
pub const GENERAL_WALLET: &str = "GENERAL";

/// One department's budget slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    /// Budget share before the overspend buffer.
    pub allocated: f64,
    /// Hard ceiling: allocated * (1 + buffer).
    pub max_budget: f64,
    pub spent: f64,
    /// max_budget - spent. Starts at max_budget.
    pub remaining: f64,
}

impl Wallet {
    fn with_allocation(allocated: f64, buffer_pct: f64) -> Self {
        let max_budget = allocated * (1.0 + buffer_pct);
        Wallet {
            allocated,
            max_budget,
            spent: 0.0,
            remaining: max_budget,
        }
    }
}

/// Department capital weights, usually revenue-share derived.
#[derive(Debug, Clone, Default)]
pub struct CapitalWeights {
    weights: HashMap<String, f64>,
}

impl CapitalWeights {
    pub fn new<I, S>(weights: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let weights: HashMap<String, f64> = weights
            .into_iter()
            .map(|(k, v)| (normalize(k.as_ref()), v))
            .collect();
        let table = CapitalWeights { weights };
        table.validate()?;
        Ok(table)
    }

    /// Parse the external JSON surface: `{ "<DEPARTMENT>": weight }`.
    pub fn from_json_str(raw: &str) -> PolicyResult<Self> {
        let parsed: HashMap<String, f64> = serde_json::from_str(raw)?;
        Self::new(parsed)
    }

    /// Fail fast on broken weights: negative/non-finite values, or a sum
    /// that could not describe one store's budget split.
    pub fn validate(&self) -> PolicyResult<()> {
        let mut sum = 0.0;
        for (department, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    department: department.clone(),
                    weight: *weight,
                });
            }
            sum += weight;
        }
        if !self.weights.is_empty() && (sum <= 0.0 || sum > 1.5) {
            return Err(PolicyError::WeightSumOutOfRange(sum));
        }
        Ok(())
    }

    pub fn get(&self, department: &str) -> Option<f64> {
        self.weights.get(&normalize(department)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.weights.iter()
    }
}

/// All wallets for one allocation run.
#[derive(Debug, Clone)]
pub struct WalletBook {
    wallets: HashMap<String, Wallet>,
}

impl WalletBook {
    /// Partition the budget. Weighted departments get budget * weight;
    /// zero-weight departments split a small reserved pool evenly; the
    /// GENERAL wallet (5% allocated, 10% max) absorbs unmapped departments.
    pub fn initialize(total_budget: f64, buffer_pct: f64, weights: &CapitalWeights) -> Self {
        let mut wallets = HashMap::new();

        let zero_weight: Vec<&String> = weights
            .iter()
            .filter(|(_, w)| **w == 0.0)
            .map(|(d, _)| d)
            .collect();
        let zero_pool_each = if zero_weight.is_empty() {
            0.0
        } else {
            total_budget * ZERO_WEIGHT_POOL_PCT / zero_weight.len() as f64
        };

        for (department, weight) in weights.iter() {
            let allocated = if *weight > 0.0 {
                total_budget * weight
            } else {
                zero_pool_each
            };
            wallets.insert(
                department.clone(),
                Wallet::with_allocation(allocated, buffer_pct),
            );
        }

        wallets.insert(
            GENERAL_WALLET.to_string(),
            Wallet {
                allocated: total_budget * GENERAL_WALLET_ALLOC_PCT,
                max_budget: total_budget * GENERAL_WALLET_MAX_PCT,
                spent: 0.0,
                remaining: total_budget * GENERAL_WALLET_MAX_PCT,
            },
        );

        log::debug!(
            "Initialized {} wallets for budget {:.0} (buffer {:.0}%)",
            wallets.len(),
            total_budget,
            buffer_pct * 100.0
        );
        WalletBook { wallets }
    }

    fn resolve(&self, department: &str) -> String {
        let key = normalize(department);
        if self.wallets.contains_key(&key) {
            key
        } else {
            GENERAL_WALLET.to_string()
        }
    }

    /// True when the resolved wallet can absorb the cost.
    pub fn check(&self, department: &str, cost: f64) -> bool {
        let key = self.resolve(department);
        self.wallets[&key].remaining >= cost
    }

    /// Deduct. The caller must have checked availability unless it is
    /// deliberately overdrawing (anchor bypass).
    pub fn spend(&mut self, department: &str, cost: f64) {
        let key = self.resolve(department);
        if let Some(wallet) = self.wallets.get_mut(&key) {
            wallet.spent += cost;
            wallet.remaining -= cost;
        }
    }

    /// Reverse a prior spend (pruning, supplier anchoring).
    pub fn refund(&mut self, department: &str, cost: f64) {
        let key = self.resolve(department);
        if let Some(wallet) = self.wallets.get_mut(&key) {
            wallet.spent -= cost;
            wallet.remaining += cost;
        }
    }

    pub fn remaining(&self, department: &str) -> f64 {
        let key = self.resolve(department);
        self.wallets[&key].remaining
    }

    /// Allocated budget of the department's own wallet, or the GENERAL
    /// fallback for unmapped departments.
    pub fn allocated(&self, department: &str) -> f64 {
        let key = self.resolve(department);
        self.wallets[&key].allocated
    }

    pub fn total_spent(&self) -> f64 {
        self.wallets.values().map(|w| w.spent).sum()
    }

    pub fn get(&self, department: &str) -> Option<&Wallet> {
        self.wallets.get(&normalize(department))
    }

    /// Spend as a percentage of each wallet's ceiling, sorted by name.
    pub fn utilization(&self) -> BTreeMap<String, f64> {
        self.wallets
            .iter()
            .filter(|(_, w)| w.max_budget > 0.0)
            .map(|(d, w)| {
                let pct = (w.spent / w.max_budget * 1000.0).round() / 10.0;
                (d.clone(), pct)
            })
            .collect()
    }
}
