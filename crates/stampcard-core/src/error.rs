//! Error types for stampcard-core.

use thiserror::Error;

/// Result type for stampcard-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the pure stamp card logic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The slot is not unlocked on the target board.
    #[error("slot {slot} is locked: only {unlocked} slots are unlocked")]
    SlotLocked { slot: u64, unlocked: u64 },

    /// Boards need at least one slot per page.
    #[error("page size must be at least 1")]
    InvalidPageSize,

    /// Metric name not one of hours, pages, questions.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Unlock thresholds must be positive and finite.
    #[error("invalid threshold {threshold} for {metric} condition")]
    InvalidThreshold { metric: &'static str, threshold: f64 },

    /// Study amounts must be positive and finite.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
}
