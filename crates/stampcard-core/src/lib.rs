//! Stamp Card Core
//!
//! Study sessions earn stamp slots. Each user owns a list of unlock
//! conditions, and every condition converts one metric of their accumulated
//! progress into a number of unlocked slots.
//!
//! # Pipeline
//!
//! ```text
//! records ──► ProgressSummary ──► unlocked_count ──► Board
//!                (aggregator)       (evaluator)      (reconciler)
//! ```
//!
//! 1. Each study record contributes a signed [`Delta`] to its owner's
//!    [`ProgressSummary`] (positive on create, negative on delete)
//! 2. [`unlocked_count`] sums `floor(total / threshold)` over the conditions
//! 3. [`Board::reconcile`] lays the unlocked count and the placed stamps onto
//!    pages of slots
//!
//! Placement flows the other way: [`ensure_unlocked`] rejects a locked slot
//! before anything is written.
//!
//! # Additive Conditions
//!
//! Conditions never interact. Two `hours` conditions with thresholds 1 and 5
//! both count, so 10 hours unlock 10 + 2 = 12 slots.
//!
//! Everything in this crate is pure and synchronous. Callers recompute from
//! the latest snapshot on every update.

mod board;
mod error;
mod metric;
mod placement;
mod progress;
mod unlock;

pub use board::{page_count, slot_position, Board, Slot, SlotState, DEFAULT_PAGE_SIZE};
pub use error::{CoreError, Result};
pub use metric::MetricKind;
pub use placement::{ensure_unlocked, slot_status, ArtifactRef, SlotStatus, StampPlacement};
pub use progress::{Delta, ProgressSummary};
pub use unlock::{
    default_conditions, unlocked_count, unstamped_count, validate_conditions, UnlockCondition,
};
