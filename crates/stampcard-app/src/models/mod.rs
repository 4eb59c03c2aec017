//! Typed documents.
//!
//! Every document read from the store passes through one of these types
//! before reaching the stamp card logic. Missing or `null` fields fall back
//! to documented defaults instead of leaking `None` checks into the core.
//!
//! # Documents
//!
//! - [`UserProfile`] - display name, icon, goal and unlock conditions
//! - [`StudyRecord`] - one logged study session (stored as [`RecordDocument`])
//! - [`NotificationEvent`] - "someone stamped your card"
//! - [`StampSettings`] - selected stamp and board background
//! - [`MaterialList`] - a user's study materials
//!
//! # Views
//!
//! - [`StampTarget`] - a user together with their unstamped-slot count

mod materials;
mod notification;
mod profile;
mod record;
mod settings;

pub use materials::MaterialList;
pub use notification::NotificationEvent;
pub use profile::{ProfileUpdate, StampTarget, UserProfile};
pub use record::{reversals, NewRecord, RecordDocument, StudyRecord};
pub use settings::StampSettings;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Name shown for users who never set one.
pub const ANONYMOUS: &str = "Anonymous";

/// Deserialize `null` as the type's default.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamp given to documents that lack one; sorts after everything in
/// newest-first listings.
pub(crate) fn missing_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}
