use std::collections::BTreeMap;

use serde::Serialize;

/// Typology → discount fraction lookup, fixed at process start.
///
/// Keys are stored trimmed and upper-cased; `resolve` normalizes its
/// input the same way. A typology that is not in the table pays in full
/// (fraction 0) — unknown typologies are a policy default, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct DiscountTable(BTreeMap<String, f64>);

impl DiscountTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        DiscountTable(
            entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_uppercase(), v))
                .collect(),
        )
    }

    pub fn resolve(&self, typology: &str) -> f64 {
        let key = typology.trim().to_uppercase();
        self.0.get(&key).copied().unwrap_or(0.0)
    }

    pub fn fractions(&self) -> &BTreeMap<String, f64> {
        &self.0
    }
}

/// One contiguous range of excess-above-goal with its bonus rate.
/// Ranges are half-open on the upper bound; the ladder covers [0, +inf).
#[derive(Debug, Clone)]
pub struct CommissionTier {
    pub lower: f64,
    pub upper: f64,
    pub rate: f64,
    pub label: String,
}

impl CommissionTier {
    pub fn new(lower: f64, upper: f64, rate: f64, label: &str) -> Self {
        CommissionTier {
            lower,
            upper,
            rate,
            label: label.to_string(),
        }
    }
}

/// Immutable run configuration: discount table, monthly goal and the
/// ordered commission ladder. Built once at startup and passed explicitly
/// into the resolver, calculator and aggregator.
#[derive(Debug, Clone)]
pub struct Config {
    pub discounts: DiscountTable,
    pub monthly_goal: f64,
    pub tiers: Vec<CommissionTier>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            discounts: DiscountTable::new([
                ("TIPO I", 0.20),
                ("TIPO II", 0.30),
                ("TIPO III", 0.50),
                ("TIPO IV", 0.50),
                ("TIPO V", 0.60),
                ("PRINCIPAL", 0.20),
                ("INTERMEDIA", 0.30),
                ("LEJANA", 0.50),
            ]),
            monthly_goal: 4_500_000.0,
            tiers: vec![
                CommissionTier::new(0.0, 1_000_000.0, 0.15, "Nivel 1"),
                CommissionTier::new(1_000_000.0, 2_000_000.0, 0.08, "Nivel 2"),
                CommissionTier::new(2_000_000.0, 3_000_000.0, 0.05, "Nivel 3"),
                CommissionTier::new(3_000_000.0, f64::INFINITY, 0.03, "Nivel 4"),
            ],
        }
    }
}
