//! Slot table and position index for live tile processor instances.
//!
//! [`SlotTable`] is the single owner of every processor instance on a
//! peer. It places and kills instances, keeps the position index and
//! per-type live counts consistent, and applies clone payloads
//! replicated from the authoritative peer.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod slot;
pub mod table;

pub use config::SlotConfig;
pub use error::ApplyError;
pub use slot::{Placement, ReplicaOutcome, Slot};
pub use table::{RequestBuffer, SlotTable};
