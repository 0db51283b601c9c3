//! Network synchronizer for tilework sessions.
//!
//! Replication uses a clone+patch model: the authoritative peer sends each
//! changed instance's clone payload, and receiving peers patch the
//! instance in the same slot (creating a placeholder if the slot is
//! unknown). Deaths travel as clone payloads with `active=false`.
//!
//! - [`message`]: message kinds and the frame codec.
//! - [`transport`]: the [`Transport`] seam and an in-process loopback.
//! - [`sync`]: the per-connection [`Synchronizer`], including the join
//!   handshake.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod message;
pub mod sync;
pub mod transport;

pub use error::NetError;
pub use message::{DecodedPacket, NetMessage, FRAME_HEADER_LEN};
pub use sync::{JoinState, ReceiveReport, Synchronizer};
pub use transport::{loopback_pair, LoopbackTransport, Transport};
