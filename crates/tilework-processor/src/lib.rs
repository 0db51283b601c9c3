//! Tile processor trait, per-instance state, and the type registry.
//!
//! A processor type implements [`TileProcessor`] and is registered once
//! on a [`RegistryBuilder`]. The sealed [`TypeRegistry`] assigns dense
//! [`ProcessorTypeId`](tilework_core::ProcessorTypeId)s and constructs
//! new behavior objects for the slot table.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod guard;
pub mod hook;
pub mod processor;
pub mod registry;
pub mod state;

pub use context::{ProcessorContext, Requests, TypeContext, WorldEnv};
pub use guard::guard_hook;
pub use hook::{GlobalHook, GlobalHooks};
pub use processor::{default_is_dead, TileProcessor};
pub use registry::{RegistryBuilder, TypeEntry, TypeRegistry};
pub use state::{
    CloneHeader, ProcessorState, CLONE_HEADER_LEN, DEFAULT_DRAW_EXTEND, DEFAULT_IDLE_DISTANCE,
};
