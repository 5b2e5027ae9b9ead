//! # Sync Agent
//!
//! Debounced, best-effort replication of the ledger file to a
//! [`SnapshotRemote`], plus restore-on-startup.
//!
//! ## Guarantees
//!
//! - **Never blocks a write**: the ledger marks the agent dirty through
//!   [`ChangeNotifier`], which is store-and-wake only. Uploads happen
//!   out-of-band on the agent task.
//! - **Coalesced**: a burst of mutations inside the debounce window
//!   produces one upload of the latest snapshot.
//! - **Bounded retries**: failed uploads back off exponentially up to
//!   the configured attempt count, then are dropped with a warning; the
//!   next mutation schedules a fresh upload.
//! - **Local first**: a replication failure never rolls back or fails
//!   the mutation that scheduled it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use gridplot_common::clock::now_millis;
use gridplot_common::config::SyncConfig;
use gridplot_ledger::store::ChangeNotifier;

use crate::remote::SnapshotRemote;

/// What startup restore decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A non-empty local file exists; it is authoritative.
    LocalKept,
    /// No usable local file; the remote snapshot was written locally.
    RestoredFromRemote,
    /// Neither side had data; the ledger starts empty.
    StartedEmpty,
}

/// Run before the ledger opens. Best effort: remote errors are logged,
/// never fatal — worst case the ledger starts empty.
pub async fn restore(path: impl AsRef<Path>, remote: &dyn SnapshotRemote) -> RestoreOutcome {
    let path = path.as_ref();
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => {
            debug!(path = %path.display(), "local ledger present, keeping it");
            return RestoreOutcome::LocalKept;
        }
        _ => {}
    }

    match remote.download().await {
        Ok(Some(snapshot)) => match write_local(path, &snapshot).await {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    bytes = snapshot.len(),
                    "ledger restored from remote snapshot"
                );
                RestoreOutcome::RestoredFromRemote
            }
            Err(e) => {
                warn!(error = %e, "could not write restored snapshot, starting empty");
                RestoreOutcome::StartedEmpty
            }
        },
        Ok(None) => {
            debug!("remote has no snapshot, starting empty");
            RestoreOutcome::StartedEmpty
        }
        Err(e) => {
            warn!(error = %e, "remote unavailable during restore, starting empty");
            RestoreOutcome::StartedEmpty
        }
    }
}

async fn write_local(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!("tmp.{}", now_millis()));
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await
}

struct Shared {
    dirty: AtomicBool,
    stopping: AtomicBool,
    wake: Notify,
    uploads_ok: AtomicU64,
    uploads_failed: AtomicU64,
}

/// Handle to a running agent. Clone freely; register a clone as the
/// store's change notifier.
#[derive(Clone)]
pub struct SyncHandle {
    shared: Arc<Shared>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncHandle {
    /// Successful snapshot uploads so far.
    pub fn uploads_ok(&self) -> u64 {
        self.shared.uploads_ok.load(Ordering::SeqCst)
    }

    /// Uploads dropped after exhausting their retries.
    pub fn uploads_failed(&self) -> u64 {
        self.shared.uploads_failed.load(Ordering::SeqCst)
    }

    /// Stop the agent, flushing a pending dirty mark best-effort first.
    pub async fn shutdown(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl ChangeNotifier for SyncHandle {
    fn notify_changed(&self) {
        self.shared.dirty.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }
}

pub struct SyncAgent;

impl SyncAgent {
    /// Spawn the background replicator watching the ledger file at
    /// `path`. Must be called from within a tokio runtime.
    pub fn spawn(
        path: impl Into<PathBuf>,
        remote: Arc<dyn SnapshotRemote>,
        cfg: SyncConfig,
    ) -> SyncHandle {
        let path = path.into();
        let shared = Arc::new(Shared {
            dirty: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            wake: Notify::new(),
            uploads_ok: AtomicU64::new(0),
            uploads_failed: AtomicU64::new(0),
        });

        let task_shared = shared.clone();
        let task = tokio::spawn(async move {
            run_loop(path, remote, cfg, task_shared).await;
        });

        SyncHandle {
            shared,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run_loop(path: PathBuf, remote: Arc<dyn SnapshotRemote>, cfg: SyncConfig, shared: Arc<Shared>) {
    loop {
        let stopping = shared.stopping.load(Ordering::SeqCst);
        let dirty = shared.dirty.load(Ordering::SeqCst);

        if stopping && !dirty {
            break;
        }
        if !dirty {
            shared.wake.notified().await;
            continue;
        }

        // Coalesce a burst of mutations into one upload. Skipped on
        // shutdown so the final flush is prompt; a shutdown arriving
        // mid-window cuts the wait short instead of holding it open.
        if !stopping {
            let deadline = tokio::time::Instant::now() + Duration::from_millis(cfg.debounce_ms);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    _ = shared.wake.notified() => {
                        if shared.stopping.load(Ordering::SeqCst) {
                            break;
                        }
                        // More mutations inside the window: keep coalescing.
                    }
                }
            }
        }
        shared.dirty.store(false, Ordering::SeqCst);

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read ledger for replication");
                continue;
            }
        };

        upload_with_retry(remote.as_ref(), &snapshot, &cfg, &shared).await;
    }
    debug!("sync agent stopped");
}

async fn upload_with_retry(
    remote: &dyn SnapshotRemote,
    snapshot: &[u8],
    cfg: &SyncConfig,
    shared: &Shared,
) {
    let max_attempts = cfg.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match remote.upload(snapshot).await {
            Ok(()) => {
                shared.uploads_ok.fetch_add(1, Ordering::SeqCst);
                debug!(bytes = snapshot.len(), attempt, "ledger snapshot replicated");
                return;
            }
            Err(e) if attempt < max_attempts => {
                let delay = cfg.retry_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                warn!(attempt, error = %e, delay_ms = delay, "snapshot upload failed, retrying");
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                shared.uploads_failed.fetch_add(1, Ordering::SeqCst);
                warn!(
                    attempts = attempt,
                    error = %e,
                    "snapshot upload dropped after exhausting retries; next mutation will reschedule"
                );
                return;
            }
        }
    }
}
