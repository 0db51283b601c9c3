//! Error types for the network synchronizer.

use std::error::Error;
use std::fmt;

use tilework_core::WireError;

/// Errors from framing, transport, or the join handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetError {
    /// A frame body could not be decoded.
    Wire(WireError),
    /// A frame carried an unrecognized message kind.
    UnknownKind {
        /// The unrecognized kind byte.
        kind: u8,
    },
    /// The peers registered different processor types.
    RegistryMismatch {
        /// This peer's registry fingerprint.
        local: u64,
        /// The other peer's registry fingerprint.
        remote: u64,
    },
    /// A frame was structurally invalid.
    Malformed {
        /// What went wrong.
        detail: String,
    },
    /// The other end of the transport is gone.
    ChannelClosed,
    /// A structural change could not be queued.
    Pending(tilework_engine::PendingError),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::UnknownKind { kind } => write!(f, "unknown message kind {kind}"),
            Self::RegistryMismatch { local, remote } => write!(
                f,
                "registry mismatch: local={local:#018x}, remote={remote:#018x}"
            ),
            Self::Malformed { detail } => write!(f, "malformed frame: {detail}"),
            Self::ChannelClosed => write!(f, "transport channel closed"),
            Self::Pending(e) => write!(f, "inbound change dropped: {e}"),
        }
    }
}

impl Error for NetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::Pending(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WireError> for NetError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

impl From<tilework_engine::PendingError> for NetError {
    fn from(e: tilework_engine::PendingError) -> Self {
        Self::Pending(e)
    }
}
