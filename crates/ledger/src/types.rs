//! Persisted entity types and the on-disk document.
//!
//! All monetary values are integer minor currency units, all timestamps
//! Unix milliseconds. Records are immutable after creation except the
//! flags called out per type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use gridplot_common::geometry::Region;

/// Typed sale metadata. Required fields are checked at the boundary so
/// untyped blobs never reach the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleMetadata {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub logo_ref: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SaleMetadata {
    pub const MAX_NAME_LEN: usize = 128;
    pub const MAX_URL_LEN: usize = 512;
    pub const MAX_DESCRIPTION_LEN: usize = 2048;

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("metadata name must not be empty".to_string());
        }
        if self.name.len() > Self::MAX_NAME_LEN {
            return Err(format!("metadata name exceeds {} bytes", Self::MAX_NAME_LEN));
        }
        if self.url.trim().is_empty() {
            return Err("metadata url must not be empty".to_string());
        }
        if self.url.len() > Self::MAX_URL_LEN {
            return Err(format!("metadata url exceeds {} bytes", Self::MAX_URL_LEN));
        }
        if let Some(desc) = &self.description {
            if desc.len() > Self::MAX_DESCRIPTION_LEN {
                return Err(format!(
                    "metadata description exceeds {} bytes",
                    Self::MAX_DESCRIPTION_LEN
                ));
            }
        }
        Ok(())
    }
}

/// One confirmed sale of a grid region.
///
/// Keyed by `payment_ref`; created exactly once per reference and
/// immutable afterwards except `converted`, which downstream processes
/// may set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub payment_ref: String,
    /// Buyer wallet identity.
    pub buyer: String,
    pub region: Region,
    pub meta: SaleMetadata,
    /// Minor currency units.
    pub amount: u64,
    pub recorded_at: u64,
    pub verified: bool,
    #[serde(default)]
    pub referrer_code: Option<String>,
    #[serde(default)]
    pub converted: bool,
}

/// A registered referrer. One per wallet; counters only move through
/// `ReferralLedger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referrer {
    pub code: String,
    #[serde(default)]
    pub wallet: Option<String>,
    pub name: String,
    /// Creation sequence number, used for stable leaderboard tie-breaks.
    pub index: u64,
    pub sale_count: u64,
    pub total_earned: u64,
    pub pending_balance: u64,
    pub created_at: u64,
}

/// Link between one sale and one referrer. At most one per payment
/// reference; `paid` is the only mutable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralSale {
    pub payment_ref: String,
    pub referrer_code: String,
    pub amount: u64,
    /// Percentage applied, fixed at computation time.
    pub percent: u8,
    pub commission: u64,
    pub paid: bool,
    pub recorded_at: u64,
}

/// Advisory click telemetry. Never consistency-critical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub code: String,
    pub ip: String,
    pub user_agent: String,
    pub at: u64,
}

/// One commission tier; applies from `min_sales` cumulative sales up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub min_sales: u64,
    pub percent: u8,
}

impl From<gridplot_common::config::TierConfig> for Tier {
    fn from(t: gridplot_common::config::TierConfig) -> Self {
        Self {
            min_sales: t.min_sales,
            percent: t.percent,
        }
    }
}

/// A single-use gift credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCode {
    pub code: String,
    #[serde(default)]
    pub wallet: Option<String>,
    /// Minor currency units.
    pub value: u64,
    pub created_at: u64,
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub redeemed: bool,
    #[serde(default)]
    pub redeemed_at: Option<u64>,
}

impl GiftCode {
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(exp) if now > exp)
    }
}

/// The whole persisted document. One JSON file, written atomically as a
/// unit; collections default individually so a document written by an
/// older build still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default)]
    pub sales: Vec<SaleRecord>,
    #[serde(default)]
    pub referrers: BTreeMap<String, Referrer>,
    /// Keyed by payment reference.
    #[serde(default)]
    pub referral_sales: BTreeMap<String, ReferralSale>,
    #[serde(default)]
    pub clicks: Vec<ClickEvent>,
    #[serde(default)]
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub gifts: Vec<GiftCode>,
}
