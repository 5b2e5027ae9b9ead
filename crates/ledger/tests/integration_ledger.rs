//! # Gridplot Integration Tests: Ledger Components
//!
//! Exercises the boundaries where bugs hide: the shared store under
//! concurrent writers, cross-component composition through the purchase
//! flow, and reload-after-restart consistency.
//!
//! ## Test Categories
//!
//! | Category | What It Tests |
//! |----------|---------------|
//! | A. Concurrent Allocation | Overlapping writers race, exactly one wins |
//! | B. Restart Consistency | Full state survives a reopen |
//! | C. Composed Purchase Flow | Verifier -> sale -> commission -> gift -> notify |
//! | D. Cross-Component State | Referral and gift state share one document |

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use gridplot_common::geometry::Region;
use gridplot_common::Config;
use gridplot_ledger::collab::{MockVerifier, RecordingSink};
use gridplot_ledger::purchase::{PurchaseRequest, PurchaseService};
use gridplot_ledger::store::LedgerStore;
use gridplot_ledger::types::SaleMetadata;
use gridplot_ledger::{
    GiftIssuer, LedgerError, ReferralLedger, SaleLedger, SaleRequest,
};

fn meta(name: &str) -> SaleMetadata {
    SaleMetadata {
        name: name.to_string(),
        url: format!("https://{}.example", name),
        logo_ref: None,
        description: None,
    }
}

fn sale_request(payment_ref: &str, region: Region) -> SaleRequest {
    SaleRequest {
        payment_ref: payment_ref.to_string(),
        buyer: "wallet-buyer".to_string(),
        region,
        meta: meta("acme"),
        amount: 1_000,
        verified: true,
        referrer_code: None,
    }
}

fn open_ledger(dir: &TempDir, cfg: &Config) -> (Arc<LedgerStore>, SaleLedger) {
    let store = Arc::new(LedgerStore::open(dir.path().join("ledger.json"), cfg).expect("open"));
    (store.clone(), SaleLedger::new(store, cfg))
}

// ═══════════════════════════════════════════════════════════════════════
// A. CONCURRENT ALLOCATION
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn concurrent_overlapping_writers_exactly_one_wins() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let (store, _) = open_ledger(&tmp, &cfg);

    // Eight threads all fight over regions that pairwise share cell (5,5).
    let mut handles = Vec::new();
    for i in 0..8u32 {
        let ledger = SaleLedger::new(store.clone(), &cfg);
        handles.push(thread::spawn(move || {
            ledger.record_sale(sale_request(
                &format!("SIG{}", i),
                Region::new(5 - (i % 3), 5 - (i % 2), 3, 3),
            ))
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::RegionUnavailable)))
        .count();
    assert_eq!(wins, 1, "exactly one overlapping writer may win");
    assert_eq!(rejections, 7);

    let ledger = SaleLedger::new(store, &cfg);
    assert_eq!(ledger.list_sales().len(), 1);
}

#[test]
fn concurrent_disjoint_writers_all_win() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let (store, _) = open_ledger(&tmp, &cfg);

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let ledger = SaleLedger::new(store.clone(), &cfg);
        handles.push(thread::spawn(move || {
            ledger.record_sale(sale_request(
                &format!("SIG{}", i),
                Region::new(i * 10, 0, 5, 5),
            ))
        }));
    }

    for handle in handles {
        handle.join().expect("join").expect("disjoint region records");
    }

    let ledger = SaleLedger::new(store, &cfg);
    let sales = ledger.list_sales();
    assert_eq!(sales.len(), 8);
    // The no-overlap invariant holds over the final set.
    for (i, a) in sales.iter().enumerate() {
        for b in &sales[i + 1..] {
            assert!(!a.region.overlaps(&b.region));
        }
    }
}

#[test]
fn concurrent_same_payment_ref_single_record() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let (store, _) = open_ledger(&tmp, &cfg);

    let mut handles = Vec::new();
    for i in 0..6u32 {
        let ledger = SaleLedger::new(store.clone(), &cfg);
        handles.push(thread::spawn(move || {
            // Same reference, different (disjoint) regions: whoever wins
            // defines the record, everyone else replays it.
            ledger.record_sale(sale_request("SIG-DUP", Region::new(i * 10, 0, 4, 4)))
        }));
    }

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join").expect("idempotent success"))
        .collect();
    let fresh = outcomes.iter().filter(|o| o.is_new()).count();
    assert_eq!(fresh, 1);

    let stored: Vec<_> = outcomes.iter().map(|o| o.record().clone()).collect();
    assert!(stored.windows(2).all(|w| w[0] == w[1]), "everyone saw one record");

    let ledger = SaleLedger::new(store, &cfg);
    assert_eq!(ledger.list_sales().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════
// B. RESTART CONSISTENCY
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn full_state_survives_reopen() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let path = tmp.path().join("ledger.json");

    let referrer_code;
    let gift_code;
    {
        let store = Arc::new(LedgerStore::open(&path, &cfg).expect("open"));
        let sales = SaleLedger::new(store.clone(), &cfg);
        let referrals = ReferralLedger::new(store.clone());
        let gifts = GiftIssuer::new(store, &cfg);

        let referrer = referrals.create_or_get_code("wallet-ref", "Ref").expect("referrer");
        referrer_code = referrer.code.clone();

        for i in 0..4u32 {
            let mut req = sale_request(&format!("SIG{}", i), Region::new(i * 5, 0, 3, 3));
            req.referrer_code = Some(referrer.code.clone());
            sales.record_sale(req).expect("sale");
            referrals
                .record_sale(&referrer.code, &format!("SIG{}", i), 1_000)
                .expect("commission");
        }
        referrals.mark_paid("SIG0").expect("payout");

        gift_code = gifts
            .issue_for_sale("wallet-buyer", &Region::new(90, 0, 1, 1))
            .expect("issue")
            .expect("gift")
            .code;
        gifts.redeem(&gift_code).expect("redeem");
    }

    // Reopen and verify everything, order included.
    let store = Arc::new(LedgerStore::open(&path, &cfg).expect("reopen"));
    let sales = SaleLedger::new(store.clone(), &cfg);
    let referrals = ReferralLedger::new(store.clone());
    let gifts = GiftIssuer::new(store, &cfg);

    let listed: Vec<String> = sales
        .list_sales()
        .into_iter()
        .map(|s| s.payment_ref)
        .collect();
    assert_eq!(listed, vec!["SIG0", "SIG1", "SIG2", "SIG3"]);

    let stats = referrals.referrer_stats(&referrer_code).expect("stats");
    assert_eq!(stats.sale_count, 4);
    assert_eq!(stats.total_earned, 200);
    assert_eq!(stats.pending_balance, 150);

    let replay = gifts.redeem(&gift_code);
    assert!(matches!(replay, Err(LedgerError::AlreadyRedeemed(_))));
}

// ═══════════════════════════════════════════════════════════════════════
// C. COMPOSED PURCHASE FLOW
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn purchase_flow_end_to_end() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let store = Arc::new(LedgerStore::open(tmp.path().join("ledger.json"), &cfg).expect("open"));

    let verifier = Arc::new(MockVerifier::new());
    let sink = Arc::new(RecordingSink::new());
    let referrals = Arc::new(ReferralLedger::new(store.clone()));
    let service = PurchaseService::new(
        Arc::new(SaleLedger::new(store.clone(), &cfg)),
        referrals.clone(),
        Arc::new(GiftIssuer::new(store.clone(), &cfg)),
        verifier.clone(),
        sink.clone(),
        None,
    );

    let referrer = referrals.create_or_get_code("wallet-ref", "Ref").expect("referrer");
    verifier.inject("SIG1", 10_000, "wallet-buyer");

    let receipt = service
        .purchase(PurchaseRequest {
            payment_ref: "SIG1".to_string(),
            region: Region::new(0, 0, 2, 2),
            meta: meta("acme"),
            referrer_code: Some(referrer.code.clone()),
        })
        .await
        .expect("purchase");

    assert!(!receipt.replayed);
    assert_eq!(receipt.commission.as_ref().expect("commission").commission, 500);
    assert_eq!(
        receipt.gift.as_ref().expect("gift").value,
        cfg.gifts.gold_value
    );
    assert_eq!(sink.seen(), vec!["SIG1".to_string()]);

    // Everything landed in one shared document.
    let doc = store.read();
    assert_eq!(doc.sales.len(), 1);
    assert_eq!(doc.referral_sales.len(), 1);
    assert_eq!(doc.gifts.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════
// D. CROSS-COMPONENT STATE
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn commission_and_gift_share_sale_document() {
    let tmp = TempDir::new().expect("tmpdir");
    let cfg = Config::default();
    let store = Arc::new(LedgerStore::open(tmp.path().join("ledger.json"), &cfg).expect("open"));
    let sales = SaleLedger::new(store.clone(), &cfg);
    let referrals = ReferralLedger::new(store.clone());
    let gifts = GiftIssuer::new(store.clone(), &cfg);

    sales
        .record_sale(sale_request("SIG1", Region::new(0, 0, 2, 2)))
        .expect("sale");
    let referrer = referrals.create_or_get_code("wallet-ref", "Ref").expect("referrer");
    referrals.record_sale(&referrer.code, "SIG1", 1_000).expect("commission");
    gifts
        .issue_for_sale("wallet-buyer", &Region::new(0, 0, 2, 2))
        .expect("issue")
        .expect("gift");

    // A reader sees a consistent snapshot of all collections at once.
    let doc = store.read();
    assert_eq!(doc.sales.len(), 1);
    assert!(doc.referral_sales.contains_key("SIG1"));
    assert_eq!(doc.gifts.len(), 1);
    assert_eq!(doc.referrers.len(), 1);
}
