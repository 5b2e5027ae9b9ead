//! # Gridplot Sync Crate
//!
//! Best-effort replication of the ledger document to a remote snapshot
//! store, and restore-on-startup.
//!
//! ## Modules
//! - `remote`: the `SnapshotRemote` trait plus the directory and
//!   in-memory implementations
//! - `agent`: the debounced background replicator and startup restore
//!
//! Local durability is primary; the remote copy is advisory backup. A
//! replication failure is logged and retried, and never rolls back or
//! blocks the mutation that scheduled it.

pub mod agent;
pub mod remote;

pub use agent::{restore, RestoreOutcome, SyncAgent, SyncHandle};
pub use remote::{DirRemote, MemoryRemote, RemoteError, SnapshotRemote};
