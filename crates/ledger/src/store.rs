//! # Ledger Document Store
//!
//! The single serialization point for all ledger mutations and the only
//! code that touches the persisted file.
//!
//! ## Write discipline
//!
//! Every mutation runs as one read-validate-persist sequence under the
//! exclusive lock: the caller's closure sees a working copy of the
//! document, validation failures abort with nothing persisted, and the
//! in-memory state only advances after the new document is durably on
//! disk. A pre-check done outside the lock (for example an availability
//! probe) is never trusted by the commit path.
//!
//! ## Persistence discipline
//!
//! Writes go to a temp file in the same directory, are fsynced, then
//! renamed over the live file, so a crash mid-write cannot leave a
//! truncated or mixed document. A failed write is retried a bounded
//! number of times and then surfaces as `Storage` for that operation
//! only; the ledger stays usable.
//!
//! ## Invariants
//!
//! - One logical writer at a time; readers run concurrently.
//! - Lock hold time is bounded by local disk I/O only — replication is
//!   scheduled through [`ChangeNotifier`], never awaited here.
//! - A writer that cannot acquire the lock within the configured
//!   timeout gets `Busy` instead of queueing forever.

use parking_lot::{RwLock, RwLockReadGuard};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use gridplot_common::clock::now_millis;
use gridplot_common::Config;

use crate::error::LedgerError;
use crate::types::{LedgerFile, Tier};

/// Pause between persist attempts.
const PERSIST_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Seam for scheduling replication after a committed mutation.
///
/// Implementations must be wait-free: no blocking, no fallible work.
/// Mark-dirty-and-wake is the expected shape.
pub trait ChangeNotifier: Send + Sync {
    fn notify_changed(&self);
}

/// What a write closure decided about the working document.
///
/// `Unchanged` short-circuits persistence and notification, which is how
/// idempotent replays avoid rewriting an identical file.
pub enum WriteOutcome<T> {
    Commit(T),
    Unchanged(T),
}

/// Owned, versioned in-memory representation of the ledger document
/// behind an exclusive-write discipline. Passed around as
/// `Arc<LedgerStore>`; there is no ambient global.
pub struct LedgerStore {
    path: PathBuf,
    state: RwLock<LedgerFile>,
    lock_timeout: Duration,
    persist_retries: u32,
    notifier: RwLock<Option<Arc<dyn ChangeNotifier>>>,
}

impl LedgerStore {
    /// Open the store at `path`.
    ///
    /// An absent or empty file yields a fresh document seeded with the
    /// configured tier table. A present-but-unparsable file is a
    /// `Storage` error: the store never silently reinitializes over
    /// data it cannot read.
    pub fn open(path: impl AsRef<Path>, cfg: &Config) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LedgerError::Storage(format!("create data dir: {}", e)))?;
        }

        let doc = match load_document(&path)? {
            Some(doc) => doc,
            None => {
                debug!(path = %path.display(), "no ledger document, starting fresh");
                LedgerFile {
                    tiers: cfg.tiers.iter().map(|t| Tier::from(*t)).collect(),
                    ..LedgerFile::default()
                }
            }
        };

        Ok(Self {
            path,
            state: RwLock::new(doc),
            lock_timeout: Duration::from_millis(cfg.store.lock_timeout_ms),
            persist_retries: cfg.store.persist_retries.max(1),
            notifier: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register the replication seam. At most one notifier; a later call
    /// replaces the earlier one.
    pub fn set_notifier(&self, notifier: Arc<dyn ChangeNotifier>) {
        *self.notifier.write() = Some(notifier);
    }

    /// Shared snapshot for readers. Concurrent with other readers;
    /// excludes writers for the duration of the guard.
    pub fn read(&self) -> RwLockReadGuard<'_, LedgerFile> {
        self.state.read()
    }

    /// Run one atomic read-validate-persist sequence.
    ///
    /// The closure gets a working copy; returning `Err` or
    /// `Ok(Unchanged(_))` leaves both memory and disk untouched.
    /// `Ok(Commit(_))` persists first and only then publishes the new
    /// document to readers, firing the change notifier afterwards.
    pub fn with_write<T>(
        &self,
        f: impl FnOnce(&mut LedgerFile) -> Result<WriteOutcome<T>, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut guard = self
            .state
            .try_write_for(self.lock_timeout)
            .ok_or(LedgerError::Busy(self.lock_timeout.as_millis() as u64))?;

        let mut working = guard.clone();
        match f(&mut working)? {
            WriteOutcome::Unchanged(value) => Ok(value),
            WriteOutcome::Commit(value) => {
                self.persist(&working)?;
                *guard = working;
                drop(guard);
                self.fire_changed();
                Ok(value)
            }
        }
    }

    fn persist(&self, doc: &LedgerFile) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| LedgerError::Storage(format!("encode ledger document: {}", e)))?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match atomic_write(&self.path, &bytes) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.persist_retries => {
                    warn!(
                        attempt,
                        error = %e,
                        path = %self.path.display(),
                        "ledger persist failed, retrying"
                    );
                    std::thread::sleep(PERSIST_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(LedgerError::Storage(format!(
                        "persist ledger document after {} attempts: {}",
                        attempt, e
                    )));
                }
            }
        }
    }

    fn fire_changed(&self) {
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify_changed();
        }
    }
}

fn load_document(path: &Path) -> Result<Option<LedgerFile>, LedgerError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut f =
        File::open(path).map_err(|e| LedgerError::Storage(format!("open ledger file: {}", e)))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)
        .map_err(|e| LedgerError::Storage(format!("read ledger file: {}", e)))?;
    if buf.is_empty() {
        return Ok(None);
    }
    let doc = serde_json::from_slice(&buf)
        .map_err(|e| LedgerError::Storage(format!("parse ledger file: {}", e)))?;
    Ok(Some(doc))
}

/// Atomic write: temp file in the destination directory, fsync, rename.
fn atomic_write(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = dest.with_extension(format!("tmp.{}", now_millis()));
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, dest)
}
