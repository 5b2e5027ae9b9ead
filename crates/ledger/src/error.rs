//! Typed error taxonomy for ledger operations.
//!
//! Validation rejections (`InvalidSelection`, `RegionUnavailable`,
//! `ReferrerNotFound`, `NotFound`) go back to the caller for a
//! user-facing decision; `Busy` and `Storage` mean the operation itself
//! failed and may be retried, with the ledger staying usable for
//! subsequent calls. An already-recorded payment reference is NOT an
//! error: `SaleLedger::record_sale` reports it as
//! [`crate::sales::SaleOutcome::Existing`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-bounds region, or invalid sale metadata.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The requested region overlaps an already sold region. Hard
    /// rejection; the caller must pick a different region.
    #[error("requested region overlaps an existing sale")]
    RegionUnavailable,

    /// Referral recording was attempted with an unregistered code.
    #[error("unknown referrer code: {0}")]
    ReferrerNotFound(String),

    /// Lookup miss for mark-paid or gift redemption.
    #[error("not found: {0}")]
    NotFound(String),

    /// The gift code was already spent. Idempotent: state is unchanged
    /// and callers may treat this as success.
    #[error("gift code already redeemed: {0}")]
    AlreadyRedeemed(String),

    /// The gift code passed its expiry before redemption.
    #[error("gift code expired: {0}")]
    GiftExpired(String),

    /// Rejected tier table on admin update.
    #[error("invalid tier table: {0}")]
    InvalidTiers(String),

    /// The exclusive write lock could not be acquired within the
    /// configured timeout.
    #[error("ledger busy: write lock not acquired within {0}ms")]
    Busy(u64),

    /// The persistence layer could not be read or written, after bounded
    /// retries. The operation failed atomically; no partial state.
    #[error("storage unavailable: {0}")]
    Storage(String),
}
