//! Stamp placement rules.
//!
//! A slot moves through three states:
//!
//! ```text
//! Locked ──(progress)──► UnlockedEmpty ──(place)──► Placed ──(place)──► Placed
//! ```
//!
//! Nothing may be placed while a slot is locked. Placing onto a placed slot
//! overwrites its artifact.

use crate::error::{CoreError, Result};
use std::fmt;

/// Opaque reference to a hosted stamp image (usually a URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Wrap a reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The raw reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw reference.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stamp sitting in one slot of a board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StampPlacement {
    pub slot: u64,
    #[cfg_attr(feature = "serde", serde(rename = "imageUri"))]
    pub artifact: ArtifactRef,
}

impl StampPlacement {
    pub fn new(slot: u64, artifact: ArtifactRef) -> Self {
        Self { slot, artifact }
    }
}

/// Placement state of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Locked,
    UnlockedEmpty,
    Placed,
}

/// Classify a slot for the placement state machine.
///
/// A slot that already holds a stamp is `Placed` even when it sits beyond
/// the unlocked count.
pub fn slot_status(slot: u64, unlocked: u64, placed: bool) -> SlotStatus {
    if placed {
        SlotStatus::Placed
    } else if slot >= unlocked {
        SlotStatus::Locked
    } else {
        SlotStatus::UnlockedEmpty
    }
}

/// Check that `slot` may receive a stamp on a board with `unlocked` slots.
///
/// This applies to overwrites too: a placed slot that fell outside the
/// unlocked range keeps its stamp but cannot be stamped again.
pub fn ensure_unlocked(slot: u64, unlocked: u64) -> Result<()> {
    if slot >= unlocked {
        return Err(CoreError::SlotLocked { slot, unlocked });
    }
    Ok(())
}
