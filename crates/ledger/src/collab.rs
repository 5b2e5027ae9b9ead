//! External collaborator seams.
//!
//! The ledger core trusts these as-is: payment verification happens
//! against an external network, notification delivery is fire-and-forget
//! and blob storage only resolves logo references to URLs. Each trait
//! ships an in-memory implementation so tests and local tooling run
//! without any external service, the same way the storage layer ships a
//! mock backend.

use async_trait::async_trait;
use std::collections::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use gridplot_common::clock::now_millis;

use crate::types::SaleRecord;

/// A confirmed payment as reported by the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub payment_ref: String,
    /// Minor currency units.
    pub amount: u64,
    /// Paying wallet identity.
    pub payer: String,
    pub verified_at: u64,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The reference exists but the payment is not (yet) confirmed.
    #[error("payment not confirmed: {0}")]
    NotConfirmed(String),

    /// The payment network does not know this reference.
    #[error("unknown payment reference: {0}")]
    UnknownReference(String),

    /// The verifier itself could not be reached.
    #[error("payment verifier unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a payment reference against the external payment network.
/// Callers invoke this with bounded timeouts and limited retries; the
/// ledger trusts the returned amount and payer as-is.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, payment_ref: &str) -> Result<VerifiedPayment, VerifyError>;
}

/// Best-effort outbound notification. Implementations must not block
/// the caller and must swallow their own failures; nothing here may
/// fail a sale.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, sale: &SaleRecord);
}

/// Resolves a stored logo reference to a serveable URL. Metadata
/// population only; never validated by the core.
pub trait BlobStore: Send + Sync {
    fn url_for(&self, logo_ref: &str) -> String;
}

// ─── Shipped implementations ─────────────────────────────────────────────────

/// In-memory verifier with injectable payments and a failure toggle.
#[derive(Default)]
pub struct MockVerifier {
    payments: Mutex<HashMap<String, (u64, String)>>,
    unavailable: AtomicBool,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a confirmed payment the verifier will vouch for.
    pub fn inject(&self, payment_ref: &str, amount: u64, payer: &str) {
        self.payments
            .lock()
            .insert(payment_ref.to_string(), (amount, payer.to_string()));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentVerifier for MockVerifier {
    async fn verify(&self, payment_ref: &str) -> Result<VerifiedPayment, VerifyError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VerifyError::Unavailable("mock verifier offline".to_string()));
        }
        let payments = self.payments.lock();
        match payments.get(payment_ref) {
            Some((amount, payer)) => Ok(VerifiedPayment {
                payment_ref: payment_ref.to_string(),
                amount: *amount,
                payer: payer.clone(),
                verified_at: now_millis(),
            }),
            None => Err(VerifyError::UnknownReference(payment_ref.to_string())),
        }
    }
}

/// Discards every notification.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _sale: &SaleRecord) {}
}

/// Records notified payment references for assertions in tests.
#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, sale: &SaleRecord) {
        self.seen
            .lock()
            .push(sale.payment_ref.clone());
    }
}

/// Prefixes logo references with a fixed base URL.
pub struct StaticBlobStore {
    base_url: String,
}

impl StaticBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl BlobStore for StaticBlobStore {
    fn url_for(&self, logo_ref: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            logo_ref.trim_start_matches('/')
        )
    }
}
