//! # Gift Issuer
//!
//! Zone-valued gift codes: Gold purchases earn the configured full
//! value, Silver the reduced one, Bronze none. A code redeems at most
//! once; the redeemed flag never toggles back.

use std::sync::Arc;
use tracing::{debug, info};

use gridplot_common::clock::now_millis;
use gridplot_common::codes;
use gridplot_common::geometry::{Region, Zone, ZoneBands};
use gridplot_common::Config;

use crate::error::LedgerError;
use crate::store::{LedgerStore, WriteOutcome};
use crate::types::GiftCode;

const MILLIS_PER_DAY: u64 = 86_400_000;

pub struct GiftIssuer {
    store: Arc<LedgerStore>,
    zones: ZoneBands,
    gold_value: u64,
    silver_value: u64,
    expiry_ms: Option<u64>,
}

impl GiftIssuer {
    pub fn new(store: Arc<LedgerStore>, cfg: &Config) -> Self {
        Self {
            store,
            zones: cfg.grid.zones,
            gold_value: cfg.gifts.gold_value,
            silver_value: cfg.gifts.silver_value,
            expiry_ms: cfg.gifts.expiry_days.map(|d| d as u64 * MILLIS_PER_DAY),
        }
    }

    /// Gift value for a zone, in minor units. Bronze earns nothing.
    pub fn value_for_zone(&self, zone: Zone) -> u64 {
        match zone {
            Zone::Gold => self.gold_value,
            Zone::Silver => self.silver_value,
            Zone::Bronze => 0,
        }
    }

    /// Issue a gift for a qualifying sale. Returns `None` when the
    /// region's zone earns nothing; otherwise persists and returns a
    /// fresh collision-checked code bound to `wallet`.
    pub fn issue_for_sale(
        &self,
        wallet: &str,
        region: &Region,
    ) -> Result<Option<GiftCode>, LedgerError> {
        let value = self.value_for_zone(self.zones.zone_of_region(region));
        if value == 0 {
            debug!(wallet = %wallet, region = %region, "bronze purchase, no gift");
            return Ok(None);
        }
        let gift = self.mint(Some(wallet.to_string()), value, self.default_expiry())?;
        Ok(Some(gift))
    }

    /// Most recently created code for a wallet, redeemed or not.
    pub fn latest_for(&self, wallet: &str) -> Option<GiftCode> {
        let doc = self.store.read();
        doc.gifts
            .iter()
            .rev()
            .find(|g| g.wallet.as_deref() == Some(wallet))
            .cloned()
    }

    /// Redeem a code.
    ///
    /// First call succeeds and stamps the redemption time; replays get
    /// `AlreadyRedeemed` with nothing mutated, unknown codes `NotFound`,
    /// expired codes `GiftExpired`.
    pub fn redeem(&self, code: &str) -> Result<GiftCode, LedgerError> {
        let code = code.to_string();
        self.store.with_write(move |doc| {
            let now = now_millis();
            let gift = doc
                .gifts
                .iter_mut()
                .find(|g| g.code == code)
                .ok_or_else(|| LedgerError::NotFound(format!("gift code {}", code)))?;
            if gift.redeemed {
                return Err(LedgerError::AlreadyRedeemed(code));
            }
            if gift.is_expired(now) {
                return Err(LedgerError::GiftExpired(code));
            }
            gift.redeemed = true;
            gift.redeemed_at = Some(now);
            let redeemed = gift.clone();
            info!(code = %redeemed.code, value = redeemed.value, "gift code redeemed");
            Ok(WriteOutcome::Commit(redeemed))
        })
    }

    /// Admin creation with an explicit value and expiry.
    pub fn create_code(
        &self,
        wallet: Option<String>,
        value: u64,
        expires_at: Option<u64>,
    ) -> Result<GiftCode, LedgerError> {
        self.mint(wallet, value, expires_at)
    }

    pub fn list_codes(&self) -> Vec<GiftCode> {
        self.store.read().gifts.clone()
    }

    fn default_expiry(&self) -> Option<u64> {
        self.expiry_ms.map(|ms| now_millis() + ms)
    }

    fn mint(
        &self,
        wallet: Option<String>,
        value: u64,
        expires_at: Option<u64>,
    ) -> Result<GiftCode, LedgerError> {
        self.store.with_write(move |doc| {
            let seed = wallet.clone().unwrap_or_default();
            let code = codes::unique_gift_code(&[seed.as_str()], |c| {
                doc.gifts.iter().any(|g| g.code == c)
            })
            .ok_or_else(|| {
                LedgerError::Storage("could not generate a unique gift code".to_string())
            })?;

            let gift = GiftCode {
                code,
                wallet,
                value,
                created_at: now_millis(),
                expires_at,
                redeemed: false,
                redeemed_at: None,
            };
            doc.gifts.push(gift.clone());
            info!(code = %gift.code, value = gift.value, "gift code issued");
            Ok(WriteOutcome::Commit(gift))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_with(cfg: Config) -> (TempDir, GiftIssuer) {
        let tmp = TempDir::new().expect("tmpdir");
        let store =
            Arc::new(LedgerStore::open(tmp.path().join("ledger.json"), &cfg).expect("open"));
        (tmp, GiftIssuer::new(store, &cfg))
    }

    fn setup() -> (TempDir, GiftIssuer) {
        setup_with(Config::default())
    }

    fn region_at_row(row: u32) -> Region {
        Region::new(0, row, 2, 2)
    }

    #[test]
    fn test_issuance_boundaries() {
        let (_tmp, gifts) = setup();
        let cfg = Config::default();
        let gold_end = cfg.grid.zones.gold_end;
        let silver_start = cfg.grid.zones.silver_start;
        let silver_end = cfg.grid.zones.silver_end;

        // row = gold_end: gold value
        let g = gifts
            .issue_for_sale("wallet-a", &region_at_row(gold_end))
            .expect("issue")
            .expect("gift");
        assert_eq!(g.value, cfg.gifts.gold_value);

        // row = silver_start and silver_end: silver value
        for row in [silver_start, silver_end] {
            let s = gifts
                .issue_for_sale("wallet-a", &region_at_row(row))
                .expect("issue")
                .expect("gift");
            assert_eq!(s.value, cfg.gifts.silver_value);
        }

        // row = silver_end + 1: bronze, no gift
        let none = gifts
            .issue_for_sale("wallet-a", &region_at_row(silver_end + 1))
            .expect("issue");
        assert!(none.is_none());
    }

    #[test]
    fn test_latest_for_wallet() {
        let (_tmp, gifts) = setup();
        assert!(gifts.latest_for("wallet-a").is_none());

        let first = gifts
            .issue_for_sale("wallet-a", &region_at_row(0))
            .expect("issue")
            .expect("gift");
        let second = gifts
            .issue_for_sale("wallet-a", &region_at_row(12))
            .expect("issue")
            .expect("gift");
        gifts
            .issue_for_sale("wallet-b", &region_at_row(1))
            .expect("issue")
            .expect("gift");

        let latest = gifts.latest_for("wallet-a").expect("latest");
        assert_eq!(latest.code, second.code);
        assert_ne!(latest.code, first.code);

        // Redemption does not change which code is latest.
        gifts.redeem(&second.code).expect("redeem");
        assert_eq!(gifts.latest_for("wallet-a").expect("latest").code, second.code);
    }

    #[test]
    fn test_redeem_single_use() {
        let (_tmp, gifts) = setup();
        let gift = gifts
            .issue_for_sale("wallet-a", &region_at_row(0))
            .expect("issue")
            .expect("gift");

        let redeemed = gifts.redeem(&gift.code).expect("first redeem");
        assert!(redeemed.redeemed);
        assert!(redeemed.redeemed_at.is_some());

        let replay = gifts.redeem(&gift.code);
        assert!(matches!(replay, Err(LedgerError::AlreadyRedeemed(_))));

        // Used flag never toggles back.
        let listed = gifts
            .list_codes()
            .into_iter()
            .find(|g| g.code == gift.code)
            .expect("listed");
        assert!(listed.redeemed);
    }

    #[test]
    fn test_redeem_unknown() {
        let (_tmp, gifts) = setup();
        assert!(matches!(
            gifts.redeem("GIFT-UNKNOWN"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_redeem_expired() {
        let (_tmp, gifts) = setup();
        let gift = gifts
            .create_code(Some("wallet-a".to_string()), 100, Some(1))
            .expect("create");
        let res = gifts.redeem(&gift.code);
        assert!(matches!(res, Err(LedgerError::GiftExpired(_))));

        // Still unredeemed; expiry rejection mutated nothing.
        let listed = gifts
            .list_codes()
            .into_iter()
            .find(|g| g.code == gift.code)
            .expect("listed");
        assert!(!listed.redeemed);
    }

    #[test]
    fn test_expiry_from_config() {
        let mut cfg = Config::default();
        cfg.gifts.expiry_days = Some(7);
        let (_tmp, gifts) = setup_with(cfg);
        let gift = gifts
            .issue_for_sale("wallet-a", &region_at_row(0))
            .expect("issue")
            .expect("gift");
        let exp = gift.expires_at.expect("expiry set");
        assert!(exp >= gift.created_at + 7 * MILLIS_PER_DAY);
    }

    #[test]
    fn test_admin_create_unbound() {
        let (_tmp, gifts) = setup();
        let gift = gifts.create_code(None, 42, None).expect("create");
        assert_eq!(gift.value, 42);
        assert!(gift.wallet.is_none());
        assert!(gift.expires_at.is_none());
        let redeemed = gifts.redeem(&gift.code).expect("redeem");
        assert_eq!(redeemed.value, 42);
    }
}
