//! snapkeep-core library.
//!
//! Given snapshot timestamps and a retention [`Policy`], [`prune`] decides
//! which snapshots to keep and how many more each rule still needs. Nothing
//! here touches storage.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use snapkeep_core::{Policy, prune};
//!
//! let policy: Policy = "1@last 7@daily yearly".parse()?;
//! let snapshots = [
//!     Utc.with_ymd_and_hms(2023, 12, 31, 22, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
//! ];
//! let pruned = prune(&snapshots, &policy);
//! assert!(pruned.keep[1].is_empty());
//! assert_eq!(pruned.keep[2].len(), 3);
//! # Ok::<(), snapkeep_core::PolicyError>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for library errors, `anyhow::Result` for config loading.
//! - **Logging**: `tracing` macros (`debug!`, `trace!`); no output is written directly.

pub mod config;
pub mod duration;
pub mod error;
pub mod period;
pub mod policy;
pub mod prune;

pub use period::{Period, Unit};
pub use policy::{INFINITE, Policy, PolicyError};
pub use prune::{Need, Pruned, prune};
