//! # Gridplot CLI Module
//!
//! All CLI command definitions, argument parsing and handler functions.
//! Native argument parsing — no external parser dependency.
//!
//! ## Commands
//!
//! - `info`        : Show ledger stats (count, volume, blocks per zone)
//! - `sales`       : List recorded sales
//! - `check`       : Check whether a region is available
//! - `record`      : Record a sale directly (admin; payment assumed verified)
//! - `referrer`    : Create or fetch the referral code for a wallet
//! - `ref-stats`   : Show one referrer's stats
//! - `leaderboard` : Top referrers by total earned
//! - `mark-paid`   : Mark a referral commission as paid out
//! - `tiers`       : Show the commission tier table
//! - `set-tiers`   : Replace the commission tier table
//! - `gifts`       : List gift codes
//! - `gift-create` : Create a gift code (admin)
//! - `redeem`      : Redeem a gift code
//! - `sync-now`    : Upload the ledger snapshot to a backup directory
//! - `restore`     : Restore the ledger from a backup directory

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use gridplot_common::config::{load_from_file, Config};
use gridplot_common::geometry::Region;
use gridplot_ledger::store::LedgerStore;
use gridplot_ledger::types::{SaleMetadata, Tier};
use gridplot_ledger::{
    GiftIssuer, LedgerError, ReferralLedger, SaleLedger, SaleRequest,
};
use gridplot_sync::{restore as restore_snapshot, DirRemote, RestoreOutcome, SnapshotRemote};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default data directory when neither flag nor config provides one.
const DEFAULT_DATA_DIR: &str = "./data";

/// Ledger document file name inside the data directory.
const LEDGER_FILE: &str = "ledger.json";

/// CLI application name
const APP_NAME: &str = "gridplot";

/// CLI version — synced with crate version
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ─── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for all CLI operations. Handlers never panic;
/// everything maps to an exit code in `run`.
#[derive(Debug)]
pub enum CliError {
    /// Argument parsing error
    InvalidArgs(String),
    /// Configuration loading error
    Config(String),
    /// Ledger operation error
    Ledger(LedgerError),
    /// Remote sync / restore error
    Sync(String),
    /// File I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "invalid arguments: {}", msg),
            CliError::Config(msg) => write!(f, "config error: {}", msg),
            CliError::Ledger(e) => write!(f, "{}", e),
            CliError::Sync(msg) => write!(f, "sync error: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<LedgerError> for CliError {
    fn from(e: LedgerError) -> Self {
        CliError::Ledger(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

// ─── CLI Command Enum ────────────────────────────────────────────────────────

/// All CLI commands, parsed from args. Each variant carries everything
/// its handler needs.
#[derive(Debug)]
pub enum Command {
    Info,
    Sales,
    Check {
        region: Region,
    },
    Record {
        payment_ref: String,
        buyer: String,
        region: Region,
        amount: u64,
        name: Option<String>,
        url: Option<String>,
        referrer: Option<String>,
    },
    Referrer {
        wallet: String,
        name: String,
    },
    RefStats {
        code: String,
    },
    Leaderboard {
        limit: usize,
    },
    MarkPaid {
        payment_ref: String,
    },
    Tiers,
    SetTiers {
        tiers: Vec<Tier>,
    },
    Gifts,
    GiftCreate {
        value: u64,
        wallet: Option<String>,
    },
    Redeem {
        code: String,
    },
    SyncNow {
        remote_dir: PathBuf,
    },
    Restore {
        remote_dir: PathBuf,
    },
    Help,
    Version,
}

/// Global options extracted before the command.
#[derive(Debug, Clone)]
pub struct Globals {
    pub data_dir: Option<String>,
    pub config_path: Option<String>,
}

// ─── Argument Parsing ────────────────────────────────────────────────────────

/// Parse command line arguments into globals plus a `Command`.
pub fn parse_args(args: &[String]) -> Result<(Globals, Command), CliError> {
    let globals = Globals {
        data_dir: extract_flag_value(args, "--data-dir"),
        config_path: extract_flag_value(args, "--config"),
    };

    // Positional args: skip argv[0], global flags and their values.
    let mut positional: Vec<&String> = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--data-dir" || arg == "--config" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--data-dir=") || arg.starts_with("--config=") {
            continue;
        }
        positional.push(arg);
    }

    if positional.is_empty() {
        return Ok((globals, Command::Help));
    }

    let cmd = match positional[0].as_str() {
        "info" | "stats" => Command::Info,

        "sales" | "list" => Command::Sales,

        "check" => Command::Check {
            region: parse_region(&positional, 1)?,
        },

        "record" => {
            let payment_ref = required(&positional, 1, "record requires <payment_ref>")?;
            let buyer = required(&positional, 2, "record requires <buyer>")?;
            let region = parse_region(&positional, 3)?;
            let amount = parse_u64(&positional, 7, "record requires <amount>")?;
            Command::Record {
                payment_ref,
                buyer,
                region,
                amount,
                name: extract_flag_value(args, "--name"),
                url: extract_flag_value(args, "--url"),
                referrer: extract_flag_value(args, "--referrer"),
            }
        }

        "referrer" => {
            let wallet = required(&positional, 1, "referrer requires <wallet>")?;
            let name = positional
                .get(2)
                .map(|s| s.to_string())
                .unwrap_or_else(|| wallet.clone());
            Command::Referrer { wallet, name }
        }

        "ref-stats" => Command::RefStats {
            code: required(&positional, 1, "ref-stats requires <code>")?,
        },

        "leaderboard" | "top" => Command::Leaderboard {
            limit: positional
                .get(1)
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(10),
        },

        "mark-paid" => Command::MarkPaid {
            payment_ref: required(&positional, 1, "mark-paid requires <payment_ref>")?,
        },

        "tiers" => Command::Tiers,

        "set-tiers" => {
            let spec = required(&positional, 1, "set-tiers requires <min:pct,...>")?;
            Command::SetTiers {
                tiers: parse_tiers(&spec)?,
            }
        }

        "gifts" => Command::Gifts,

        "gift-create" => {
            let value = parse_u64(&positional, 1, "gift-create requires <value>")?;
            let wallet = positional.get(2).map(|s| s.to_string());
            Command::GiftCreate { value, wallet }
        }

        "redeem" => Command::Redeem {
            code: required(&positional, 1, "redeem requires <code>")?,
        },

        "sync-now" => Command::SyncNow {
            remote_dir: PathBuf::from(required(&positional, 1, "sync-now requires <remote-dir>")?),
        },

        "restore" => Command::Restore {
            remote_dir: PathBuf::from(required(&positional, 1, "restore requires <remote-dir>")?),
        },

        "--version" | "-V" | "version" => Command::Version,
        "--help" | "-h" | "help" => Command::Help,

        unknown => {
            return Err(CliError::InvalidArgs(format!("unknown command: {}", unknown)));
        }
    };

    Ok((globals, cmd))
}

fn required(positional: &[&String], index: usize, msg: &str) -> Result<String, CliError> {
    positional
        .get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| CliError::InvalidArgs(msg.to_string()))
}

fn parse_u64(positional: &[&String], index: usize, msg: &str) -> Result<u64, CliError> {
    positional
        .get(index)
        .ok_or_else(|| CliError::InvalidArgs(msg.to_string()))?
        .parse::<u64>()
        .map_err(|_| CliError::InvalidArgs(format!("not a number: {}", positional[index])))
}

fn parse_u32_at(positional: &[&String], index: usize, what: &str) -> Result<u32, CliError> {
    positional
        .get(index)
        .ok_or_else(|| CliError::InvalidArgs(format!("missing <{}>", what)))?
        .parse::<u32>()
        .map_err(|_| {
            CliError::InvalidArgs(format!("<{}> must be a number, got {}", what, positional[index]))
        })
}

/// Parse `<x> <y> <w> <h>` starting at `index`.
fn parse_region(positional: &[&String], index: usize) -> Result<Region, CliError> {
    Ok(Region::new(
        parse_u32_at(positional, index, "x")?,
        parse_u32_at(positional, index + 1, "y")?,
        parse_u32_at(positional, index + 2, "w")?,
        parse_u32_at(positional, index + 3, "h")?,
    ))
}

/// Parse a tier spec like `0:5,10:7,30:10`.
fn parse_tiers(spec: &str) -> Result<Vec<Tier>, CliError> {
    let mut tiers = Vec::new();
    for part in spec.split(',') {
        let (min, pct) = part.split_once(':').ok_or_else(|| {
            CliError::InvalidArgs(format!("tier must be <min:pct>, got {}", part))
        })?;
        let min_sales = min
            .trim()
            .parse::<u64>()
            .map_err(|_| CliError::InvalidArgs(format!("tier min not a number: {}", min)))?;
        let percent = pct
            .trim()
            .parse::<u8>()
            .map_err(|_| CliError::InvalidArgs(format!("tier percent not a number: {}", pct)))?;
        tiers.push(Tier { min_sales, percent });
    }
    Ok(tiers)
}

/// Extract `--flag value` or `--flag=value` from args.
fn extract_flag_value(args: &[String], flag: &str) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if arg == flag {
            return args.get(i + 1).cloned();
        }
        if let Some(rest) = arg.strip_prefix(&format!("{}=", flag)) {
            return Some(rest.to_string());
        }
    }
    None
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything a handler needs: loaded config plus the resolved ledger
/// file path.
struct Context {
    cfg: Config,
    ledger_path: PathBuf,
}

impl Context {
    fn build(globals: &Globals) -> Result<Self, CliError> {
        let cfg = match &globals.config_path {
            Some(path) => load_from_file(path).map_err(|e| CliError::Config(e.to_string()))?,
            None => Config::default(),
        };
        let data_dir = globals
            .data_dir
            .clone()
            .unwrap_or_else(|| {
                if cfg.store.data_dir.is_empty() {
                    DEFAULT_DATA_DIR.to_string()
                } else {
                    cfg.store.data_dir.clone()
                }
            });
        Ok(Self {
            ledger_path: PathBuf::from(data_dir).join(LEDGER_FILE),
            cfg,
        })
    }

    fn open_store(&self) -> Result<Arc<LedgerStore>, CliError> {
        Ok(Arc::new(LedgerStore::open(&self.ledger_path, &self.cfg)?))
    }
}

// ─── Entry Point ─────────────────────────────────────────────────────────────

/// Parse args and dispatch. Returns exit code: 0 = success, 1 = error,
/// 2 = usage error.
pub async fn run() -> i32 {
    let args: Vec<String> = env::args().collect();

    match parse_args(&args) {
        Ok((globals, cmd)) => match execute(globals, cmd).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("❌ {}", e);
                1
            }
        },
        Err(CliError::InvalidArgs(msg)) => {
            eprintln!("❌ {}", msg);
            print_usage();
            2
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            1
        }
    }
}

async fn execute(globals: Globals, cmd: Command) -> Result<(), CliError> {
    match cmd {
        Command::Help => {
            print_usage();
            return Ok(());
        }
        Command::Version => {
            println!("{} {}", APP_NAME, APP_VERSION);
            return Ok(());
        }
        _ => {}
    }

    let ctx = Context::build(&globals)?;
    match cmd {
        Command::Info => handle_info(&ctx),
        Command::Sales => handle_sales(&ctx),
        Command::Check { region } => handle_check(&ctx, region),
        Command::Record {
            payment_ref,
            buyer,
            region,
            amount,
            name,
            url,
            referrer,
        } => handle_record(&ctx, payment_ref, buyer, region, amount, name, url, referrer),
        Command::Referrer { wallet, name } => handle_referrer(&ctx, &wallet, &name),
        Command::RefStats { code } => handle_ref_stats(&ctx, &code),
        Command::Leaderboard { limit } => handle_leaderboard(&ctx, limit),
        Command::MarkPaid { payment_ref } => handle_mark_paid(&ctx, &payment_ref),
        Command::Tiers => handle_tiers(&ctx),
        Command::SetTiers { tiers } => handle_set_tiers(&ctx, tiers),
        Command::Gifts => handle_gifts(&ctx),
        Command::GiftCreate { value, wallet } => handle_gift_create(&ctx, value, wallet),
        Command::Redeem { code } => handle_redeem(&ctx, &code),
        Command::SyncNow { remote_dir } => handle_sync_now(&ctx, &remote_dir).await,
        Command::Restore { remote_dir } => handle_restore(&ctx, &remote_dir).await,
        Command::Help | Command::Version => Ok(()),
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

fn handle_info(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let sales = SaleLedger::new(store, &ctx.cfg);
    let stats = sales.stats();

    println!("📊 Gridplot Ledger Info");
    println!("   file    : {}", ctx.ledger_path.display());
    println!("   sales   : {}", stats.sale_count);
    println!("   volume  : {} minor units", stats.total_amount);
    if stats.blocks_by_zone.is_empty() {
        println!("   blocks  : (none sold)");
    } else {
        for (zone, blocks) in &stats.blocks_by_zone {
            println!("   blocks  : {:<7} {}", zone.to_string(), blocks);
        }
    }
    Ok(())
}

fn handle_sales(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let sales = SaleLedger::new(store, &ctx.cfg).list_sales();

    println!("📋 Sales ({})", sales.len());
    for sale in &sales {
        println!(
            "  {} {} {} {} units{}",
            sale.payment_ref,
            sale.region,
            sale.buyer,
            sale.amount,
            if sale.converted { " [converted]" } else { "" }
        );
    }
    if sales.is_empty() {
        println!("  (empty)");
    }
    Ok(())
}

fn handle_check(ctx: &Context, region: Region) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let sales = SaleLedger::new(store, &ctx.cfg);
    if sales.is_region_available(&region) {
        println!("✅ Region {} is available", region);
        Ok(())
    } else {
        println!("⛔ Region {} overlaps an existing sale", region);
        Err(CliError::Ledger(LedgerError::RegionUnavailable))
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_record(
    ctx: &Context,
    payment_ref: String,
    buyer: String,
    region: Region,
    amount: u64,
    name: Option<String>,
    url: Option<String>,
    referrer: Option<String>,
) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let sales = SaleLedger::new(store, &ctx.cfg);

    let meta = SaleMetadata {
        name: name.unwrap_or_else(|| buyer.clone()),
        url: url.unwrap_or_else(|| format!("https://gridplot.example/plot/{}", payment_ref)),
        logo_ref: None,
        description: None,
    };

    let outcome = sales.record_sale(SaleRequest {
        payment_ref,
        buyer,
        region,
        meta,
        amount,
        verified: true,
        referrer_code: referrer,
    })?;

    let record = outcome.record();
    if outcome.is_new() {
        println!("✅ Sale recorded: {} {} ({} units)", record.payment_ref, record.region, record.amount);
    } else {
        println!("ℹ️  Already recorded: {} {} ({} units)", record.payment_ref, record.region, record.amount);
    }
    Ok(())
}

fn handle_referrer(ctx: &Context, wallet: &str, name: &str) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let referrals = ReferralLedger::new(store);
    let referrer = referrals.create_or_get_code(wallet, name)?;
    println!("✅ Referral code for {}: {}", wallet, referrer.code);
    Ok(())
}

fn handle_ref_stats(ctx: &Context, code: &str) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let referrals = ReferralLedger::new(store);
    let stats = referrals
        .referrer_stats(code)
        .ok_or_else(|| CliError::Ledger(LedgerError::ReferrerNotFound(code.to_string())))?;

    println!("📊 Referrer {}", stats.code);
    println!("   name    : {}", stats.name);
    println!("   wallet  : {}", stats.wallet.as_deref().unwrap_or("-"));
    println!("   sales   : {}", stats.sale_count);
    println!("   earned  : {} minor units", stats.total_earned);
    println!("   pending : {} minor units", stats.pending_balance);
    println!("   clicks  : {}", stats.clicks);
    Ok(())
}

fn handle_leaderboard(ctx: &Context, limit: usize) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let board = ReferralLedger::new(store).leaderboard(limit);

    println!("🏆 Leaderboard (top {})", limit);
    for (i, entry) in board.iter().enumerate() {
        println!(
            "  {:>3}. {} {} — {} units earned, {} sales",
            i + 1,
            entry.code,
            entry.name,
            entry.total_earned,
            entry.sale_count
        );
    }
    if board.is_empty() {
        println!("  (no referrers)");
    }
    Ok(())
}

fn handle_mark_paid(ctx: &Context, payment_ref: &str) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    ReferralLedger::new(store).mark_paid(payment_ref)?;
    println!("✅ Commission for {} marked paid", payment_ref);
    Ok(())
}

fn handle_tiers(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let tiers = ReferralLedger::new(store).list_tiers();
    println!("📋 Commission tiers");
    for tier in &tiers {
        println!("  from {:>6} sales : {:>3}%", tier.min_sales, tier.percent);
    }
    Ok(())
}

fn handle_set_tiers(ctx: &Context, tiers: Vec<Tier>) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let count = tiers.len();
    ReferralLedger::new(store).replace_tiers(tiers)?;
    println!("✅ Tier table replaced ({} tiers)", count);
    Ok(())
}

fn handle_gifts(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let gifts = GiftIssuer::new(store, &ctx.cfg).list_codes();

    println!("🎁 Gift codes ({})", gifts.len());
    for gift in &gifts {
        let state = if gift.redeemed { "redeemed" } else { "open" };
        println!(
            "  {} {} units [{}] {}",
            gift.code,
            gift.value,
            state,
            gift.wallet.as_deref().unwrap_or("-")
        );
    }
    if gifts.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

fn handle_gift_create(ctx: &Context, value: u64, wallet: Option<String>) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let gift = GiftIssuer::new(store, &ctx.cfg).create_code(wallet, value, None)?;
    println!("✅ Gift code created: {} ({} units)", gift.code, gift.value);
    Ok(())
}

fn handle_redeem(ctx: &Context, code: &str) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let gift = GiftIssuer::new(store, &ctx.cfg).redeem(code)?;
    println!("✅ Redeemed {} for {} units", gift.code, gift.value);
    Ok(())
}

async fn handle_sync_now(ctx: &Context, remote_dir: &std::path::Path) -> Result<(), CliError> {
    let snapshot = std::fs::read(&ctx.ledger_path)?;
    let remote = DirRemote::new(remote_dir);
    remote
        .upload(&snapshot)
        .await
        .map_err(|e| CliError::Sync(e.to_string()))?;
    println!(
        "✅ Snapshot uploaded: {} bytes → {}",
        snapshot.len(),
        remote_dir.display()
    );
    Ok(())
}

async fn handle_restore(ctx: &Context, remote_dir: &std::path::Path) -> Result<(), CliError> {
    let remote = DirRemote::new(remote_dir);
    match restore_snapshot(&ctx.ledger_path, &remote).await {
        RestoreOutcome::LocalKept => {
            println!("ℹ️  Local ledger present and non-empty; nothing restored");
        }
        RestoreOutcome::RestoredFromRemote => {
            println!("✅ Ledger restored from {}", remote_dir.display());
        }
        RestoreOutcome::StartedEmpty => {
            println!("ℹ️  No snapshot available; ledger will start empty");
        }
    }
    Ok(())
}

// ─── Usage / Help ────────────────────────────────────────────────────────────

pub fn print_usage() {
    println!("{} {} — Gridplot Sale Ledger CLI", APP_NAME, APP_VERSION);
    println!();
    println!("USAGE:");
    println!("  {} [--data-dir <path>] [--config <file>] <command> [args...]", APP_NAME);
    println!();
    println!("COMMANDS:");
    println!("  info                                    Show ledger stats");
    println!("  sales                                   List recorded sales");
    println!("  check <x> <y> <w> <h>                   Check region availability");
    println!("  record <ref> <buyer> <x> <y> <w> <h> <amount>");
    println!("         [--name <n>] [--url <u>] [--referrer <code>]");
    println!("                                          Record a sale (admin)");
    println!("  referrer <wallet> [name]                Create/fetch referral code");
    println!("  ref-stats <code>                        Show referrer stats");
    println!("  leaderboard [n]                         Top referrers (default 10)");
    println!("  mark-paid <ref>                         Mark commission paid out");
    println!("  tiers                                   Show commission tiers");
    println!("  set-tiers <min:pct,...>                 Replace commission tiers");
    println!("  gifts                                   List gift codes");
    println!("  gift-create <value> [wallet]            Create a gift code (admin)");
    println!("  redeem <code>                           Redeem a gift code");
    println!("  sync-now <remote-dir>                   Upload snapshot to backup dir");
    println!("  restore <remote-dir>                    Restore ledger from backup dir");
    println!("  version                                 Show version");
    println!("  help                                    Show this help");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("  --data-dir <path>    Ledger data directory (default: ./data)");
    println!("  --config <file>      TOML config file (default: built-in defaults)");
    println!();
    println!("EXAMPLES:");
    println!("  {} check 10 10 4 4", APP_NAME);
    println!("  {} record 5Kd3...sig wallet-abc 10 10 4 4 1000000000 --name Acme", APP_NAME);
    println!("  {} referrer wallet-abc \"Acme Referrals\"", APP_NAME);
    println!("  {} set-tiers 0:5,10:7,30:10", APP_NAME);
    println!("  {} sync-now /mnt/backup/gridplot", APP_NAME);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_help_and_version() {
        let (_, cmd) = parse_args(&args(&["gridplot"])).unwrap();
        assert!(matches!(cmd, Command::Help));

        let (_, cmd) = parse_args(&args(&["gridplot", "help"])).unwrap();
        assert!(matches!(cmd, Command::Help));

        let (_, cmd) = parse_args(&args(&["gridplot", "version"])).unwrap();
        assert!(matches!(cmd, Command::Version));
    }

    #[test]
    fn test_parse_check() {
        let (_, cmd) = parse_args(&args(&["gridplot", "check", "1", "2", "3", "4"])).unwrap();
        match cmd {
            Command::Check { region } => {
                assert_eq!(region, Region::new(1, 2, 3, 4));
            }
            _ => panic!("expected Check command"),
        }

        assert!(parse_args(&args(&["gridplot", "check", "1", "2"])).is_err());
        assert!(parse_args(&args(&["gridplot", "check", "a", "2", "3", "4"])).is_err());
    }

    #[test]
    fn test_parse_record_with_flags() {
        let (_, cmd) = parse_args(&args(&[
            "gridplot", "record", "SIG1", "wallet-a", "0", "0", "2", "2", "1000",
            "--name", "Acme", "--referrer", "ABC123",
        ]))
        .unwrap();
        match cmd {
            Command::Record {
                payment_ref,
                buyer,
                region,
                amount,
                name,
                referrer,
                ..
            } => {
                assert_eq!(payment_ref, "SIG1");
                assert_eq!(buyer, "wallet-a");
                assert_eq!(region, Region::new(0, 0, 2, 2));
                assert_eq!(amount, 1000);
                assert_eq!(name.as_deref(), Some("Acme"));
                assert_eq!(referrer.as_deref(), Some("ABC123"));
            }
            _ => panic!("expected Record command"),
        }
    }

    #[test]
    fn test_parse_with_data_dir() {
        let (globals, cmd) =
            parse_args(&args(&["gridplot", "--data-dir", "/var/gridplot", "sales"])).unwrap();
        assert_eq!(globals.data_dir.as_deref(), Some("/var/gridplot"));
        assert!(matches!(cmd, Command::Sales));

        let (globals, _) =
            parse_args(&args(&["gridplot", "--data-dir=/tmp/x", "info"])).unwrap();
        assert_eq!(globals.data_dir.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn test_parse_tiers_spec() {
        let tiers = parse_tiers("0:5,10:7,30:10").unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[1], Tier { min_sales: 10, percent: 7 });

        assert!(parse_tiers("0-5").is_err());
        assert!(parse_tiers("0:x").is_err());
    }

    #[test]
    fn test_parse_leaderboard_default_limit() {
        let (_, cmd) = parse_args(&args(&["gridplot", "leaderboard"])).unwrap();
        match cmd {
            Command::Leaderboard { limit } => assert_eq!(limit, 10),
            _ => panic!("expected Leaderboard command"),
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_args(&args(&["gridplot", "frobnicate"])).is_err());
    }
}
