//! # Referral Ledger
//!
//! Referrer registry, click telemetry, commission recording and the
//! leaderboard.
//!
//! Commission recording is the consistency-critical path: one referral
//! sale per payment reference, tier fixed from the referrer's cumulative
//! count at computation time, and the counter updates land in the same
//! atomic write as the referral sale itself. Click tracking is advisory
//! and never fails the caller.

use std::sync::Arc;
use tracing::{debug, info, warn};

use gridplot_common::clock::now_millis;
use gridplot_common::codes;

use crate::error::LedgerError;
use crate::schedule::{validate_tiers, CommissionSchedule};
use crate::store::{LedgerStore, WriteOutcome};
use crate::types::{ClickEvent, Referrer, ReferralSale, Tier};

/// Cap on the stored click log; oldest entries are dropped past this.
pub const MAX_CLICK_EVENTS: usize = 50_000;

/// Result of `record_sale`: `Existing` is the idempotent replay path and
/// means no counter moved.
#[derive(Debug, Clone)]
pub enum ReferralOutcome {
    New(ReferralSale),
    Existing(ReferralSale),
}

impl ReferralOutcome {
    pub fn sale(&self) -> &ReferralSale {
        match self {
            ReferralOutcome::New(s) | ReferralOutcome::Existing(s) => s,
        }
    }

    pub fn into_sale(self) -> ReferralSale {
        match self {
            ReferralOutcome::New(s) | ReferralOutcome::Existing(s) => s,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ReferralOutcome::New(_))
    }
}

/// Read-model summary for stats and the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerSummary {
    pub code: String,
    pub name: String,
    pub wallet: Option<String>,
    pub sale_count: u64,
    pub total_earned: u64,
    pub pending_balance: u64,
    /// Derived from the click log on read.
    pub clicks: u64,
    pub created_at: u64,
}

pub struct ReferralLedger {
    store: Arc<LedgerStore>,
}

impl ReferralLedger {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Idempotent per wallet: a second request for the same wallet
    /// returns the existing referrer unchanged.
    pub fn create_or_get_code(&self, wallet: &str, name: &str) -> Result<Referrer, LedgerError> {
        let wallet = wallet.to_string();
        let name = name.to_string();
        self.store.with_write(move |doc| {
            if let Some(existing) = doc
                .referrers
                .values()
                .find(|r| r.wallet.as_deref() == Some(wallet.as_str()))
            {
                return Ok(WriteOutcome::Unchanged(existing.clone()));
            }

            let code = codes::unique_code(
                &[wallet.as_str(), name.as_str()],
                codes::REFERRAL_CODE_LEN,
                |c| doc.referrers.contains_key(c),
            )
            .ok_or_else(|| {
                LedgerError::Storage("could not generate a unique referral code".to_string())
            })?;

            let referrer = Referrer {
                code: code.clone(),
                wallet: Some(wallet),
                name,
                index: doc.referrers.len() as u64,
                sale_count: 0,
                total_earned: 0,
                pending_balance: 0,
                created_at: now_millis(),
            };
            doc.referrers.insert(code, referrer.clone());
            info!(code = %referrer.code, "referrer registered");
            Ok(WriteOutcome::Commit(referrer))
        })
    }

    /// Advisory telemetry. Unknown codes are ignored and storage
    /// failures are swallowed: click tracking must never fail a caller.
    pub fn record_click(&self, code: &str, ip: &str, user_agent: &str) {
        let event = ClickEvent {
            code: code.to_string(),
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            at: now_millis(),
        };
        let result = self.store.with_write(move |doc| {
            if !doc.referrers.contains_key(&event.code) {
                debug!(code = %event.code, "click for unknown referrer code ignored");
                return Ok(WriteOutcome::Unchanged(()));
            }
            doc.clicks.push(event);
            if doc.clicks.len() > MAX_CLICK_EVENTS {
                let excess = doc.clicks.len() - MAX_CLICK_EVENTS;
                doc.clicks.drain(0..excess);
            }
            Ok(WriteOutcome::Commit(()))
        });
        if let Err(e) = result {
            warn!(error = %e, "click tracking dropped");
        }
    }

    /// Record the commission for one sale.
    ///
    /// The tier is fixed from the referrer's cumulative sale count at
    /// this moment; the referral sale, sale count, total earned and
    /// pending balance all move in one atomic write.
    pub fn record_sale(
        &self,
        referrer_code: &str,
        payment_ref: &str,
        amount: u64,
    ) -> Result<ReferralOutcome, LedgerError> {
        let referrer_code = referrer_code.to_string();
        let payment_ref = payment_ref.to_string();
        self.store.with_write(move |doc| {
            if let Some(existing) = doc.referral_sales.get(&payment_ref) {
                debug!(payment_ref = %payment_ref, "replayed referral sale, counters untouched");
                return Ok(WriteOutcome::Unchanged(ReferralOutcome::Existing(
                    existing.clone(),
                )));
            }

            let schedule = CommissionSchedule::new(doc.tiers.clone());
            let referrer = doc
                .referrers
                .get_mut(&referrer_code)
                .ok_or_else(|| LedgerError::ReferrerNotFound(referrer_code.clone()))?;

            let percent = schedule.percent_for(referrer.sale_count);
            let commission = schedule.commission_for(amount, referrer.sale_count);

            referrer.sale_count = referrer.sale_count.saturating_add(1);
            referrer.total_earned = referrer.total_earned.saturating_add(commission);
            referrer.pending_balance = referrer.pending_balance.saturating_add(commission);

            let sale = ReferralSale {
                payment_ref: payment_ref.clone(),
                referrer_code,
                amount,
                percent,
                commission,
                paid: false,
                recorded_at: now_millis(),
            };
            doc.referral_sales.insert(payment_ref, sale.clone());
            info!(
                payment_ref = %sale.payment_ref,
                code = %sale.referrer_code,
                commission = sale.commission,
                percent = sale.percent,
                "referral commission recorded"
            );
            Ok(WriteOutcome::Commit(ReferralOutcome::New(sale)))
        })
    }

    /// Mark a commission as paid out and release it from the referrer's
    /// pending balance. Re-marking an already paid sale is a no-op.
    pub fn mark_paid(&self, payment_ref: &str) -> Result<(), LedgerError> {
        let payment_ref = payment_ref.to_string();
        self.store.with_write(move |doc| {
            let sale = doc
                .referral_sales
                .get_mut(&payment_ref)
                .ok_or_else(|| LedgerError::NotFound(format!("referral sale {}", payment_ref)))?;
            if sale.paid {
                return Ok(WriteOutcome::Unchanged(()));
            }
            sale.paid = true;
            let commission = sale.commission;
            let code = sale.referrer_code.clone();
            if let Some(referrer) = doc.referrers.get_mut(&code) {
                referrer.pending_balance = referrer.pending_balance.saturating_sub(commission);
            }
            Ok(WriteOutcome::Commit(()))
        })
    }

    /// Top referrers by total earned, ties broken by creation order.
    pub fn leaderboard(&self, limit: usize) -> Vec<ReferrerSummary> {
        let doc = self.store.read();
        let mut referrers: Vec<&Referrer> = doc.referrers.values().collect();
        referrers.sort_by(|a, b| {
            b.total_earned
                .cmp(&a.total_earned)
                .then(a.index.cmp(&b.index))
        });
        referrers
            .into_iter()
            .take(limit)
            .map(|r| summarize(&doc.clicks, r))
            .collect()
    }

    pub fn referrer_stats(&self, code: &str) -> Option<ReferrerSummary> {
        let doc = self.store.read();
        doc.referrers.get(code).map(|r| summarize(&doc.clicks, r))
    }

    pub fn list_tiers(&self) -> Vec<Tier> {
        let mut tiers = self.store.read().tiers.clone();
        tiers.sort_by_key(|t| t.min_sales);
        tiers
    }

    /// Replace the tier table. Takes effect for future commissions only;
    /// recorded referral sales keep the percentage they were priced at.
    pub fn replace_tiers(&self, tiers: Vec<Tier>) -> Result<(), LedgerError> {
        let mut tiers = tiers;
        tiers.sort_by_key(|t| t.min_sales);
        validate_tiers(&tiers)?;
        self.store.with_write(move |doc| {
            doc.tiers = tiers;
            Ok(WriteOutcome::Commit(()))
        })
    }
}

fn summarize(clicks: &[ClickEvent], r: &Referrer) -> ReferrerSummary {
    ReferrerSummary {
        code: r.code.clone(),
        name: r.name.clone(),
        wallet: r.wallet.clone(),
        sale_count: r.sale_count,
        total_earned: r.total_earned,
        pending_balance: r.pending_balance,
        clicks: clicks.iter().filter(|c| c.code == r.code).count() as u64,
        created_at: r.created_at,
    }
}
