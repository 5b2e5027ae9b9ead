//! # Gridplot Common Crate
//!
//! Shared leaf utilities for the gridplot workspace.
//!
//! ## Modules
//! - `geometry`: block regions, overlap tests, pricing zones
//! - `config`: typed TOML configuration
//! - `codes`: referral / gift code generation
//! - `clock`: wall-clock helper
//!
//! Everything here is pure and side-effect free except `clock`, so the
//! ledger and sync crates can depend on it without dragging in I/O.

pub mod clock;
pub mod codes;
pub mod config;
pub mod geometry;

pub use config::Config;
pub use geometry::{GridBounds, Region, Zone, ZoneBands};
