//! Session configuration, validation, and error types.
//!
//! [`SessionConfig`] is the builder-input for a [`Session`](crate::Session).
//! [`validate()`](SessionConfig::validate) checks it before the session
//! allocates anything.

use std::error::Error;
use std::fmt;

use tilework_core::Authority;
use tilework_slots::SlotConfig;

/// Configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// This peer's role. Decides who may kill instances and who
    /// replicates. Default: [`Authority::Standalone`].
    pub authority: Authority,
    /// Maximum slot count. Default: 1000.
    pub max_slots: u32,
    /// Capacity of the pending structural-change queue. Default: 4096.
    /// Must be at least `max_slots`, so a full join snapshot fits.
    pub max_pending: usize,
}

impl SessionConfig {
    /// Default slot capacity.
    pub const DEFAULT_MAX_SLOTS: u32 = SlotConfig::DEFAULT_MAX_SLOTS;

    /// Default pending-queue capacity.
    pub const DEFAULT_MAX_PENDING: usize = 4096;

    /// Defaults for the given role.
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            max_slots: Self::DEFAULT_MAX_SLOTS,
            max_pending: Self::DEFAULT_MAX_PENDING,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slots == 0 {
            return Err(ConfigError::SlotCapacityZero);
        }
        if self.max_pending == 0 {
            return Err(ConfigError::PendingQueueZero);
        }
        if self.max_pending < self.max_slots as usize {
            return Err(ConfigError::PendingBelowSlots {
                max_pending: self.max_pending,
                max_slots: self.max_slots,
            });
        }
        Ok(())
    }

    /// The slot-table part of the configuration.
    pub fn slot_config(&self) -> SlotConfig {
        SlotConfig::new(self.max_slots)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Authority::Standalone)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_slots` is zero.
    SlotCapacityZero,
    /// `max_pending` is zero.
    PendingQueueZero,
    /// `max_pending` cannot hold one clone-sync per slot.
    PendingBelowSlots {
        /// Configured queue capacity.
        max_pending: usize,
        /// Configured slot capacity.
        max_slots: u32,
    },
    /// The registry has no processor types.
    NoProcessorTypes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotCapacityZero => write!(f, "max_slots must be at least 1"),
            Self::PendingQueueZero => write!(f, "max_pending must be at least 1"),
            Self::PendingBelowSlots {
                max_pending,
                max_slots,
            } => write!(
                f,
                "max_pending ({max_pending}) must be at least max_slots ({max_slots})"
            ),
            Self::NoProcessorTypes => write!(f, "no processor types registered"),
        }
    }
}

impl Error for ConfigError {}
