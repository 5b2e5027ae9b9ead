//! # Gridplot Ledger Crate
//!
//! The sale ledger and allocation engine: the single owner of all
//! persisted gridplot state.
//!
//! ## Modules
//! - `store`: shared document store, atomic persistence, write serialization
//! - `sales`: overlap-checked, idempotent sale recording
//! - `schedule`: tiered commission-rate lookup
//! - `referrals`: referrer registry, clicks, commissions, leaderboard
//! - `gifts`: gift code issuance and single-use redemption
//! - `collab`: external collaborator traits and shipped mocks
//! - `purchase`: the orchestrated purchase sequence
//!
//! ## Ownership
//!
//! All mutation flows through [`store::LedgerStore`]; no component
//! touches the persisted file directly. Components are handles over an
//! `Arc<LedgerStore>`, so a process holds exactly one store per data
//! directory and injects it where needed.

pub mod collab;
pub mod error;
pub mod gifts;
pub mod purchase;
pub mod referrals;
pub mod sales;
pub mod schedule;
pub mod store;
pub mod types;

pub use error::LedgerError;
pub use gifts::GiftIssuer;
pub use purchase::{PurchaseError, PurchaseReceipt, PurchaseRequest, PurchaseService};
pub use referrals::{ReferralLedger, ReferralOutcome, ReferrerSummary};
pub use sales::{LedgerStats, SaleLedger, SaleOutcome, SaleRequest};
pub use schedule::CommissionSchedule;
pub use store::{ChangeNotifier, LedgerStore};
pub use types::{GiftCode, LedgerFile, Referrer, ReferralSale, SaleMetadata, SaleRecord, Tier};
