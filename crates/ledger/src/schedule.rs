//! Tiered commission-rate lookup.
//!
//! The applicable tier for a referrer is the highest-threshold tier
//! whose `min_sales` is at or below the referrer's cumulative sale count
//! at computation time. Crossing a threshold later never re-prices past
//! commissions.

use crate::error::LedgerError;
use crate::types::Tier;

/// Commission schedule over an ordered tier table.
///
/// Built per-computation from the document's tier table so admin updates
/// take effect on the next sale without coordination.
#[derive(Debug, Clone)]
pub struct CommissionSchedule {
    tiers: Vec<Tier>,
}

impl CommissionSchedule {
    pub fn new(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by_key(|t| t.min_sales);
        Self { tiers }
    }

    /// Percentage for a referrer with `sale_count` cumulative sales.
    /// An empty table yields 0%.
    pub fn percent_for(&self, sale_count: u64) -> u8 {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_sales <= sale_count)
            .map(|t| t.percent)
            .unwrap_or(0)
    }

    /// `floor(amount * percent / 100)`, widened so the multiply cannot
    /// overflow.
    pub fn commission_for(&self, amount: u64, sale_count: u64) -> u64 {
        let percent = self.percent_for(sale_count) as u128;
        ((amount as u128 * percent) / 100) as u64
    }
}

/// Admin tier tables must be strictly ascending in threshold with sane
/// percentages; the first tier anchoring at 0 keeps every sale count
/// covered.
pub fn validate_tiers(tiers: &[Tier]) -> Result<(), LedgerError> {
    if tiers.is_empty() {
        return Err(LedgerError::InvalidTiers("tier table is empty".to_string()));
    }
    if tiers[0].min_sales != 0 {
        return Err(LedgerError::InvalidTiers(
            "first tier must start at 0 sales".to_string(),
        ));
    }
    for pair in tiers.windows(2) {
        if pair[1].min_sales <= pair[0].min_sales {
            return Err(LedgerError::InvalidTiers(format!(
                "tier thresholds must be strictly ascending, got {} after {}",
                pair[1].min_sales, pair[0].min_sales
            )));
        }
    }
    if let Some(bad) = tiers.iter().find(|t| t.percent > 100) {
        return Err(LedgerError::InvalidTiers(format!(
            "tier percent {} exceeds 100",
            bad.percent
        )));
    }
    Ok(())
}
