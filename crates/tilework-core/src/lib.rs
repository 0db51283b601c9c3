//! Core types and traits for the tilework processor framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the tilework workspace:
//! identifiers, the peer authority role, error types, the little-endian
//! wire primitives used by the clone protocol, the [`TagStore`] used for
//! persistence, and the traits through which the core talks to the host
//! game (tile queries and draw targets).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;
pub mod tag;
pub mod traits;
pub mod wire;

pub use error::{PlaceError, ProcessorError, RegistryError, WireError};
pub use geometry::{PixelPos, PixelRect, TILE_SIZE};
pub use id::{Authority, PeerId, ProcessorTypeId, SlotId, SourceItem, TickId, TilePos, TileTypeId};
pub use tag::{TagStore, TagValue};
pub use traits::{DrawLayer, DrawTarget, TileInfo, TileQuery};
pub use wire::{PacketReader, PacketWriter};
