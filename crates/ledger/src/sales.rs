//! # Sale Ledger
//!
//! Overlap-checked, idempotent recording of region sales.
//!
//! ## Invariants
//!
//! - No two recorded sales' regions intersect (checked inside the same
//!   critical section as the append, never only by a pre-check).
//! - At most one record per payment reference; replays return the stored
//!   record unchanged.
//! - Records are append-ordered and immutable except the `converted`
//!   flag.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use gridplot_common::clock::now_millis;
use gridplot_common::geometry::{GridBounds, Region, Zone, ZoneBands};
use gridplot_common::Config;

use crate::error::LedgerError;
use crate::store::{LedgerStore, WriteOutcome};
use crate::types::{SaleMetadata, SaleRecord};

/// Input for one sale. The payment is assumed verified by the caller
/// (the orchestration layer runs the verifier first).
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub payment_ref: String,
    pub buyer: String,
    pub region: Region,
    pub meta: SaleMetadata,
    pub amount: u64,
    pub verified: bool,
    pub referrer_code: Option<String>,
}

/// Result of `record_sale`. An already-recorded payment reference is an
/// idempotent success, not an error: `Existing` carries the stored
/// record, which may differ from what the replayed request asked for.
#[derive(Debug, Clone)]
pub enum SaleOutcome {
    New(SaleRecord),
    Existing(SaleRecord),
}

impl SaleOutcome {
    pub fn record(&self) -> &SaleRecord {
        match self {
            SaleOutcome::New(r) | SaleOutcome::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> SaleRecord {
        match self {
            SaleOutcome::New(r) | SaleOutcome::Existing(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SaleOutcome::New(_))
    }
}

/// Aggregate view, recomputed from the full record set on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub sale_count: usize,
    pub total_amount: u64,
    pub blocks_by_zone: BTreeMap<Zone, u64>,
}

pub struct SaleLedger {
    store: Arc<LedgerStore>,
    grid: GridBounds,
    zones: ZoneBands,
}

impl SaleLedger {
    pub fn new(store: Arc<LedgerStore>, cfg: &Config) -> Self {
        Self {
            store,
            grid: cfg.grid.bounds(),
            zones: cfg.grid.zones,
        }
    }

    /// Read-only availability probe. No side effects; the commit path
    /// re-checks under its own lock, so a `true` here is advisory.
    pub fn is_region_available(&self, region: &Region) -> bool {
        let doc = self.store.read();
        !doc.sales.iter().any(|s| s.region.overlaps(region))
    }

    /// Record one sale.
    ///
    /// Idempotency check, defensive validation and the overlap re-check
    /// all run inside the same atomic section as the append; on success
    /// the new record is durable before this returns, and a replication
    /// sync has been scheduled (non-blocking).
    pub fn record_sale(&self, req: SaleRequest) -> Result<SaleOutcome, LedgerError> {
        let grid = self.grid;
        self.store.with_write(move |doc| {
            if let Some(existing) = doc.sales.iter().find(|s| s.payment_ref == req.payment_ref) {
                debug!(payment_ref = %req.payment_ref, "replayed payment reference, returning stored record");
                return Ok(WriteOutcome::Unchanged(SaleOutcome::Existing(
                    existing.clone(),
                )));
            }

            req.region
                .validate(&grid)
                .map_err(LedgerError::InvalidSelection)?;
            req.meta.validate().map_err(LedgerError::InvalidSelection)?;

            if doc.sales.iter().any(|s| s.region.overlaps(&req.region)) {
                return Err(LedgerError::RegionUnavailable);
            }

            let record = SaleRecord {
                payment_ref: req.payment_ref,
                buyer: req.buyer,
                region: req.region,
                meta: req.meta,
                amount: req.amount,
                recorded_at: now_millis(),
                verified: req.verified,
                referrer_code: req.referrer_code,
                converted: false,
            };
            doc.sales.push(record.clone());
            info!(
                payment_ref = %record.payment_ref,
                region = %record.region,
                amount = record.amount,
                "sale recorded"
            );
            Ok(WriteOutcome::Commit(SaleOutcome::New(record)))
        })
    }

    pub fn get_sale(&self, payment_ref: &str) -> Option<SaleRecord> {
        self.store
            .read()
            .sales
            .iter()
            .find(|s| s.payment_ref == payment_ref)
            .cloned()
    }

    /// All sales in insertion order.
    pub fn list_sales(&self) -> Vec<SaleRecord> {
        self.store.read().sales.clone()
    }

    /// Flip the one post-hoc mutable flag on a record.
    pub fn set_converted(&self, payment_ref: &str, converted: bool) -> Result<(), LedgerError> {
        let payment_ref = payment_ref.to_string();
        self.store.with_write(move |doc| {
            let record = doc
                .sales
                .iter_mut()
                .find(|s| s.payment_ref == payment_ref)
                .ok_or_else(|| LedgerError::NotFound(format!("sale {}", payment_ref)))?;
            if record.converted == converted {
                return Ok(WriteOutcome::Unchanged(()));
            }
            record.converted = converted;
            Ok(WriteOutcome::Commit(()))
        })
    }

    /// Aggregates are recomputed from the record set so no counter can
    /// drift from the data.
    pub fn stats(&self) -> LedgerStats {
        let doc = self.store.read();
        let mut blocks_by_zone: BTreeMap<Zone, u64> = BTreeMap::new();
        let mut total_amount: u64 = 0;
        for sale in &doc.sales {
            total_amount = total_amount.saturating_add(sale.amount);
            let zone = self.zones.zone_of_region(&sale.region);
            *blocks_by_zone.entry(zone).or_insert(0) += sale.region.block_count();
        }
        LedgerStats {
            sale_count: doc.sales.len(),
            total_amount,
            blocks_by_zone,
        }
    }
}
