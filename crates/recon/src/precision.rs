//! Locate the amount carrying the most decimal places.

use serde::Serialize;

use crate::model::SalesFact;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountPrecision {
    /// Position of the fact in the reconciled table.
    pub row: usize,
    pub amount: f64,
    pub decimals: usize,
}

/// Decimal places in the shortest round-trip rendering of `value`.
pub fn decimal_places(value: f64) -> usize {
    if !value.is_finite() {
        return 0;
    }
    let text = value.to_string();
    match text.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 0,
    }
}

/// First fact whose amount has the most decimal places.
pub fn most_precise_amount(facts: &[SalesFact]) -> Option<AmountPrecision> {
    let mut best: Option<AmountPrecision> = None;
    for (row, fact) in facts.iter().enumerate() {
        let decimals = decimal_places(fact.amount);
        if best.as_ref().map_or(true, |b| decimals > b.decimals) {
            best = Some(AmountPrecision {
                row,
                amount: fact.amount,
                decimals,
            });
        }
    }
    best
}
