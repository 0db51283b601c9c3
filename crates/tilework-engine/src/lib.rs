//! Tick driver for tilework sessions.
//!
//! A [`Session`] owns one peer's slot table and drives it tick by tick:
//! pending structural changes, dead-checks, per-instance and per-type
//! updates. It also loads and unloads worlds, saves and restores
//! instances, runs the draw pass, and records [`SyncEvent`]s for the
//! network layer.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod draw;
pub mod metrics;
pub mod pending;
pub mod persistence;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use metrics::TickMetrics;
pub use pending::{PendingError, PendingQueue, StructuralChange};
pub use persistence::{PersistError, SaveFile, SavedProcessor};
pub use session::{Session, SyncEvent};
