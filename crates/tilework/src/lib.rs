//! Tilework: per-tile processors for large mutable tile worlds.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all tilework sub-crates. For most users, adding `tilework` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use tilework::prelude::*;
//!
//! // A processor attached to tile type 5 that counts its updates.
//! #[derive(Default)]
//! struct Lamp {
//!     ticks: u32,
//! }
//!
//! impl TileProcessor for Lamp {
//!     fn target_tile(&self) -> Option<TileTypeId> {
//!         Some(TileTypeId(5))
//!     }
//!
//!     fn update(&mut self, _ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
//!         self.ticks += 1;
//!         Ok(())
//!     }
//! }
//!
//! // A world where every tile is a lamp tile.
//! struct Lamps;
//!
//! impl TileQuery for Lamps {
//!     fn tile_at(&self, _pos: TilePos) -> Option<TileInfo> {
//!         Some(TileInfo::solid(TileTypeId(5)))
//!     }
//! }
//!
//! let mut builder = RegistryBuilder::new();
//! let lamp = builder.register::<Lamp>("demo").unwrap();
//! let registry = Arc::new(builder.build());
//!
//! let mut session = Session::new(registry, SessionConfig::default()).unwrap();
//! session.place(&Lamps, lamp, TilePos::new(3, 4), None).unwrap();
//! session.step(&Lamps);
//!
//! let placed = session.find(TilePos::new(3, 4)).unwrap();
//! assert_eq!(placed.behavior.downcast_ref::<Lamp>().unwrap().ticks, 1);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tilework-core` | IDs, geometry, wire primitives, tags, host traits |
//! | [`processor`] | `tilework-processor` | The processor trait, state, hooks, and type registry |
//! | [`slots`] | `tilework-slots` | Slot table and position index |
//! | [`engine`] | `tilework-engine` | Sessions: tick driver, persistence, draw pass |
//! | [`net`] | `tilework-net` | Clone-sync replication and the join handshake |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// IDs, geometry, wire primitives, tags, and host traits (`tilework-core`).
pub use tilework_core as types;

/// The [`processor::TileProcessor`] trait and the type registry
/// (`tilework-processor`).
pub use tilework_processor as processor;

/// Slot table and position index (`tilework-slots`).
pub use tilework_slots as slots;

/// Sessions (`tilework-engine`).
///
/// [`engine::Session`] drives one peer's instances tick by tick.
pub use tilework_engine as engine;

/// Replication over a [`net::Transport`] (`tilework-net`).
pub use tilework_net as net;

/// Common imports for typical tilework usage.
///
/// ```rust
/// use tilework::prelude::*;
/// ```
pub mod prelude {
    // Core types and host traits
    pub use tilework_core::{
        Authority, DrawLayer, DrawTarget, PacketReader, PacketWriter, PeerId, PixelPos,
        PixelRect, ProcessorTypeId, SlotId, SourceItem, TagStore, TagValue, TickId, TileInfo,
        TilePos, TileQuery, TileTypeId,
    };

    // Errors
    pub use tilework_core::{PlaceError, ProcessorError, RegistryError, WireError};

    // Processor contract
    pub use tilework_processor::{
        GlobalHook, ProcessorContext, ProcessorState, RegistryBuilder, TileProcessor,
        TypeContext, TypeRegistry,
    };

    // Slots
    pub use tilework_slots::{Placement, Slot};

    // Engine
    pub use tilework_engine::{
        SaveFile, Session, SessionConfig, StructuralChange, SyncEvent, TickMetrics,
    };

    // Network
    pub use tilework_net::{loopback_pair, NetMessage, Synchronizer, Transport};
}
