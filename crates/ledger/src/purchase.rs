//! The orchestrated purchase sequence.
//!
//! Transport layers call this instead of stitching the primitives
//! together themselves: verify the payment, record the sale, then run
//! the follow-on steps. The sale is durable as soon as `record_sale`
//! commits; everything after it (commission, gift, notification) is
//! applied best-effort and can never roll the sale back.

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::collab::{BlobStore, NotificationSink, PaymentVerifier, VerifyError};
use crate::error::LedgerError;
use crate::gifts::GiftIssuer;
use crate::referrals::ReferralLedger;
use crate::sales::{SaleLedger, SaleRequest};
use crate::types::{GiftCode, ReferralSale, SaleMetadata, SaleRecord};

use gridplot_common::geometry::Region;

/// What a buyer submits after paying.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub payment_ref: String,
    pub region: Region,
    pub meta: SaleMetadata,
    pub referrer_code: Option<String>,
}

/// Distinct failure classes so a client can tell "pick another region"
/// apart from "retry the payment check".
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("payment verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub sale: SaleRecord,
    /// True when the payment reference had already been recorded; the
    /// receipt then carries the stored record and nothing else ran.
    pub replayed: bool,
    pub commission: Option<ReferralSale>,
    pub gift: Option<GiftCode>,
}

pub struct PurchaseService {
    sales: Arc<SaleLedger>,
    referrals: Arc<ReferralLedger>,
    gifts: Arc<GiftIssuer>,
    verifier: Arc<dyn PaymentVerifier>,
    sink: Arc<dyn NotificationSink>,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl PurchaseService {
    pub fn new(
        sales: Arc<SaleLedger>,
        referrals: Arc<ReferralLedger>,
        gifts: Arc<GiftIssuer>,
        verifier: Arc<dyn PaymentVerifier>,
        sink: Arc<dyn NotificationSink>,
        blobs: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        Self {
            sales,
            referrals,
            gifts,
            verifier,
            sink,
            blobs,
        }
    }

    pub async fn purchase(&self, req: PurchaseRequest) -> Result<PurchaseReceipt, PurchaseError> {
        let payment = self.verifier.verify(&req.payment_ref).await?;

        let mut meta = req.meta;
        if let (Some(blobs), Some(logo_ref)) = (&self.blobs, meta.logo_ref.as_deref()) {
            meta.logo_ref = Some(blobs.url_for(logo_ref));
        }

        let outcome = self.sales.record_sale(SaleRequest {
            payment_ref: payment.payment_ref.clone(),
            buyer: payment.payer.clone(),
            region: req.region,
            meta,
            amount: payment.amount,
            verified: true,
            referrer_code: req.referrer_code.clone(),
        })?;

        if !outcome.is_new() {
            return Ok(PurchaseReceipt {
                sale: outcome.into_record(),
                replayed: true,
                commission: None,
                gift: None,
            });
        }
        let sale = outcome.into_record();

        // The sale is durable from here on; follow-on steps log and
        // continue on failure.
        let commission = match req.referrer_code.as_deref() {
            Some(code) => match self.referrals.record_sale(code, &sale.payment_ref, sale.amount) {
                Ok(outcome) => Some(outcome.into_sale()),
                Err(LedgerError::ReferrerNotFound(code)) => {
                    warn!(code = %code, payment_ref = %sale.payment_ref, "sale recorded without commission: unknown referrer code");
                    None
                }
                Err(e) => {
                    warn!(error = %e, payment_ref = %sale.payment_ref, "commission recording failed, sale stands");
                    None
                }
            },
            None => None,
        };

        let gift = match self.gifts.issue_for_sale(&sale.buyer, &sale.region) {
            Ok(gift) => gift,
            Err(e) => {
                warn!(error = %e, payment_ref = %sale.payment_ref, "gift issuance failed, sale stands");
                None
            }
        };

        self.sink.notify(&sale);

        Ok(PurchaseReceipt {
            sale,
            replayed: false,
            commission,
            gift,
        })
    }
}
