//! Where each document lives in the store.
//!
//! | Document | Path |
//! |---|---|
//! | user profile | `users/{uid}` |
//! | study record | `records/{recordId}` |
//! | progress summary | `recordSummary/{uid}/summary/summary` |
//! | stamp placement | `stampBoards/{uid}/stamps/{slot}` |
//! | notification | `notifications/{uid}/logs/{id}` |
//! | stamp settings | `stampSettings/{uid}` |
//! | material list | `materials/{uid}` |

use crate::error::{Error, Result};
use crate::store::CollectionPath;

/// Id of the single summary document under each user.
pub const SUMMARY_DOC: &str = "summary";

pub fn users() -> CollectionPath {
    CollectionPath::new("users")
}

pub fn records() -> CollectionPath {
    CollectionPath::new("records")
}

pub fn summary(uid: &str) -> CollectionPath {
    CollectionPath::nested("recordSummary", uid, "summary")
}

pub fn stamps(uid: &str) -> CollectionPath {
    CollectionPath::nested("stampBoards", uid, "stamps")
}

pub fn notifications(uid: &str) -> CollectionPath {
    CollectionPath::nested("notifications", uid, "logs")
}

pub fn stamp_settings() -> CollectionPath {
    CollectionPath::new("stampSettings")
}

pub fn materials() -> CollectionPath {
    CollectionPath::new("materials")
}

/// Reject ids that would escape their collection.
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("id must not be empty".into()));
    }
    if id.contains('/') {
        return Err(Error::InvalidInput(format!("id must not contain '/': {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_user_collections() {
        assert_eq!(summary("u1").doc_path(SUMMARY_DOC), "recordSummary/u1/summary/summary");
        assert_eq!(stamps("u1").doc_path("4"), "stampBoards/u1/stamps/4");
        assert_eq!(notifications("u1").as_str(), "notifications/u1/logs");
    }

    #[test]
    fn ids_validated() {
        assert!(validate_id("u1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("  ").is_err());
        assert!(validate_id("u1/summary").is_err());
    }
}
