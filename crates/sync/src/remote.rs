//! Remote snapshot store abstraction.
//!
//! The agent only needs two operations: push the current snapshot bytes
//! and pull the last known-good one. `DirRemote` covers the common
//! deployment (a mounted backup volume or synced directory);
//! `MemoryRemote` is the test double with injectable failures.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use gridplot_common::clock::now_millis;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote upload failed: {0}")]
    Upload(String),

    #[error("remote download failed: {0}")]
    Download(String),
}

/// Stores exactly one snapshot: the latest upload wins.
#[async_trait]
pub trait SnapshotRemote: Send + Sync {
    async fn upload(&self, snapshot: &[u8]) -> Result<(), RemoteError>;

    /// The last uploaded snapshot, or `None` if nothing was ever
    /// uploaded.
    async fn download(&self) -> Result<Option<Vec<u8>>, RemoteError>;
}

/// Filesystem-backed remote: a directory standing in for off-box
/// storage. Uploads are atomic (temp file then rename) so a crashed
/// upload never corrupts the last good snapshot.
pub struct DirRemote {
    snapshot_path: PathBuf,
}

impl DirRemote {
    pub const SNAPSHOT_FILE: &'static str = "ledger.snapshot.json";

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            snapshot_path: dir.as_ref().join(Self::SNAPSHOT_FILE),
        }
    }
}

#[async_trait]
impl SnapshotRemote for DirRemote {
    async fn upload(&self, snapshot: &[u8]) -> Result<(), RemoteError> {
        if let Some(parent) = self.snapshot_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Upload(format!("create remote dir: {}", e)))?;
        }
        let tmp = self
            .snapshot_path
            .with_extension(format!("tmp.{}", now_millis()));
        tokio::fs::write(&tmp, snapshot)
            .await
            .map_err(|e| RemoteError::Upload(format!("write snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, &self.snapshot_path)
            .await
            .map_err(|e| RemoteError::Upload(format!("publish snapshot: {}", e)))?;
        Ok(())
    }

    async fn download(&self) -> Result<Option<Vec<u8>>, RemoteError> {
        match tokio::fs::read(&self.snapshot_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RemoteError::Download(format!("read snapshot: {}", e))),
        }
    }
}

/// In-memory remote for tests: holds the latest snapshot and can be told
/// to fail the next N uploads.
#[derive(Default)]
pub struct MemoryRemote {
    snapshot: Mutex<Option<Vec<u8>>>,
    fail_uploads: AtomicU32,
    upload_count: AtomicU64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote as if a snapshot had been uploaded earlier.
    pub fn seed(&self, snapshot: Vec<u8>) {
        *self.snapshot.lock().expect("memory remote lock") = Some(snapshot);
    }

    /// Make the next `n` uploads fail before succeeding again.
    pub fn fail_next_uploads(&self, n: u32) {
        self.fail_uploads.store(n, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Vec<u8>> {
        self.snapshot.lock().expect("memory remote lock").clone()
    }
}

#[async_trait]
impl SnapshotRemote for MemoryRemote {
    async fn upload(&self, snapshot: &[u8]) -> Result<(), RemoteError> {
        let remaining = self.fail_uploads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_uploads.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Upload("injected failure".to_string()));
        }
        self.upload_count.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.lock().expect("memory remote lock") = Some(snapshot.to_vec());
        Ok(())
    }

    async fn download(&self) -> Result<Option<Vec<u8>>, RemoteError> {
        Ok(self.snapshot.lock().expect("memory remote lock").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dir_remote_roundtrip() {
        let tmp = TempDir::new().expect("tmpdir");
        let remote = DirRemote::new(tmp.path().join("backup"));

        assert!(remote.download().await.expect("empty").is_none());

        remote.upload(b"snapshot-v1").await.expect("upload");
        assert_eq!(
            remote.download().await.expect("download").expect("bytes"),
            b"snapshot-v1"
        );

        // Latest upload wins.
        remote.upload(b"snapshot-v2").await.expect("upload");
        assert_eq!(
            remote.download().await.expect("download").expect("bytes"),
            b"snapshot-v2"
        );
    }

    #[tokio::test]
    async fn test_memory_remote_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_next_uploads(2);

        assert!(remote.upload(b"a").await.is_err());
        assert!(remote.upload(b"a").await.is_err());
        remote.upload(b"a").await.expect("third succeeds");
        assert_eq!(remote.upload_count(), 1);
        assert_eq!(remote.current().expect("stored"), b"a");
    }
}
