//! Live board updates.
//!
//! A board depends on three documents: the owner's placements, their
//! profile (for unlock conditions) and their progress summary. [`LiveBoard`]
//! subscribes to all three and re-derives the whole board from the latest
//! [`BoardSnapshot`] whenever any of them changes.

use crate::error::Result;
use crate::models::UserProfile;
use crate::paths;
use crate::store::{Document, DocumentStore, Query, Subscription};
use stampcard_core::{
    default_conditions, unlocked_count, Board, MetricKind, ProgressSummary, StampPlacement,
    UnlockCondition,
};
use tracing::{debug, warn};

/// Latest known inputs of one user's board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub summary: ProgressSummary,
    pub conditions: Vec<UnlockCondition>,
    pub placements: Vec<StampPlacement>,
}

impl BoardSnapshot {
    /// Build a snapshot from raw documents.
    ///
    /// Fails only when the profile exists but cannot be decoded.
    pub fn from_documents(
        summary: Option<&Document>,
        profile: Option<&Document>,
        stamps: &[Document],
    ) -> Result<Self> {
        Ok(Self {
            summary: summary_from_document(summary),
            conditions: conditions_from_document(profile)?,
            placements: placements_from_documents(stamps),
        })
    }

    pub fn unlocked(&self) -> u64 {
        unlocked_count(&self.summary, &self.conditions)
    }

    /// Reconcile the board for this snapshot.
    pub fn derive(&self, page_size: usize) -> Result<Board> {
        Ok(Board::reconcile(self.unlocked(), &self.placements, page_size)?)
    }
}

/// Read a summary document, treating missing, negative or garbage totals as 0.
pub fn summary_from_document(doc: Option<&Document>) -> ProgressSummary {
    let Some(doc) = doc else {
        return ProgressSummary::zero();
    };
    let total = |metric: MetricKind| doc.get_f64(metric.total_field()).unwrap_or(0.0);
    ProgressSummary {
        total_hours: total(MetricKind::Hours),
        total_pages: total(MetricKind::Pages),
        total_questions: total(MetricKind::Questions),
    }
    .sanitized()
}

/// Unlock conditions from a profile document.
///
/// No profile, or an empty list, means the default conditions.
pub fn conditions_from_document(doc: Option<&Document>) -> Result<Vec<UnlockCondition>> {
    let conditions = match doc {
        Some(doc) => doc.decode::<UserProfile>()?.stamp_conditions,
        None => Vec::new(),
    };
    if conditions.is_empty() {
        Ok(default_conditions())
    } else {
        Ok(conditions)
    }
}

/// Typed placements, skipping documents that do not decode.
pub fn placements_from_documents(docs: &[Document]) -> Vec<StampPlacement> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<StampPlacement>() {
            Ok(placement) => Some(placement),
            Err(e) => {
                warn!("Skipping stamp: {}", e);
                None
            }
        })
        .collect()
}

enum Change {
    Stamps(Vec<Document>),
    Profile(Vec<Document>),
    Summary(Vec<Document>),
    Closed,
}

/// A board that follows its owner's documents.
///
/// Dropping it releases the underlying subscriptions.
pub struct LiveBoard {
    owner_id: String,
    page_size: usize,
    stamps: Subscription,
    profile: Subscription,
    summary: Subscription,
    stamp_docs: Vec<Document>,
    profile_doc: Option<Document>,
    summary_doc: Option<Document>,
}

impl LiveBoard {
    /// Subscribe to `owner_id`'s board documents.
    pub async fn start<S>(store: &S, owner_id: &str, page_size: usize) -> Result<Self>
    where
        S: DocumentStore + ?Sized,
    {
        paths::validate_id(owner_id)?;
        let mut stamps = store.subscribe(Query::collection(paths::stamps(owner_id))).await?;
        let mut profile = store
            .subscribe(Query::document(paths::users(), owner_id))
            .await?;
        let mut summary = store
            .subscribe(Query::document(paths::summary(owner_id), paths::SUMMARY_DOC))
            .await?;

        let stamp_docs = stamps.latest().unwrap_or_default();
        let profile_doc = profile.latest().and_then(|docs| docs.into_iter().next());
        let summary_doc = summary.latest().and_then(|docs| docs.into_iter().next());
        debug!("Watching board of {}", owner_id);

        Ok(Self {
            owner_id: owner_id.to_string(),
            page_size,
            stamps,
            profile,
            summary,
            stamp_docs,
            profile_doc,
            summary_doc,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Inputs of the board as last seen.
    pub fn snapshot(&self) -> Result<BoardSnapshot> {
        BoardSnapshot::from_documents(
            self.summary_doc.as_ref(),
            self.profile_doc.as_ref(),
            &self.stamp_docs,
        )
    }

    /// Board as last seen.
    pub fn current(&self) -> Result<Board> {
        self.snapshot()?.derive(self.page_size)
    }

    /// Wait for a change and return the re-derived board.
    ///
    /// `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Result<Board>> {
        let change = tokio::select! {
            snap = self.stamps.next() => snap.map_or(Change::Closed, Change::Stamps),
            snap = self.profile.next() => snap.map_or(Change::Closed, Change::Profile),
            snap = self.summary.next() => snap.map_or(Change::Closed, Change::Summary),
        };
        match change {
            Change::Stamps(docs) => self.stamp_docs = docs,
            Change::Profile(docs) => self.profile_doc = docs.into_iter().next(),
            Change::Summary(docs) => self.summary_doc = docs.into_iter().next(),
            Change::Closed => return None,
        }

        // Coalesce anything else that arrived meanwhile.
        if let Some(docs) = self.stamps.latest() {
            self.stamp_docs = docs;
        }
        if let Some(docs) = self.profile.latest() {
            self.profile_doc = docs.into_iter().next();
        }
        if let Some(docs) = self.summary.latest() {
            self.summary_doc = docs.into_iter().next();
        }

        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CollectionPath;
    use serde_json::{json, Value};
    use stampcard_core::SlotState;

    fn doc(collection: CollectionPath, id: &str, fields: Value) -> Document {
        let Value::Object(map) = fields else {
            panic!("fields must be an object");
        };
        Document::new(collection, id, map)
    }

    #[test]
    fn summary_defaults_and_clamps() {
        let summary = doc(
            paths::summary("u1"),
            paths::SUMMARY_DOC,
            json!({"totalHours": 2.5, "totalPages": -4, "totalQuestions": "many"}),
        );
        let read = summary_from_document(Some(&summary));
        assert_eq!(read.total_hours, 2.5);
        assert_eq!(read.total_pages, 0.0);
        assert_eq!(read.total_questions, 0.0);
        assert_eq!(summary_from_document(None), ProgressSummary::zero());
    }

    #[test]
    fn conditions_fall_back_to_defaults() {
        assert_eq!(conditions_from_document(None).unwrap(), default_conditions());

        let empty = doc(paths::users(), "u1", json!({"uid": "u1", "stampConditions": []}));
        assert_eq!(conditions_from_document(Some(&empty)).unwrap(), default_conditions());

        let custom = doc(
            paths::users(),
            "u1",
            json!({"stampConditions": [{"type": "questions", "value": 5}]}),
        );
        assert_eq!(
            conditions_from_document(Some(&custom)).unwrap(),
            vec![UnlockCondition::new(MetricKind::Questions, 5.0)]
        );
    }

    #[test]
    fn snapshot_derives_board() {
        let stamps = paths::stamps("u1");
        let placements = vec![
            doc(stamps.clone(), "0", json!({"slot": 0, "imageUri": "a.png"})),
            doc(stamps.clone(), "2", json!({"slot": 2, "imageUri": "b.png"})),
            doc(stamps, "x", json!({"imageUri": "lost.png"})),
        ];
        let summary = doc(
            paths::summary("u1"),
            paths::SUMMARY_DOC,
            json!({"totalHours": 3.5, "totalPages": 25}),
        );

        let snapshot = BoardSnapshot::from_documents(Some(&summary), None, &placements).unwrap();
        assert_eq!(snapshot.placements.len(), 2);
        assert_eq!(snapshot.unlocked(), 5);

        let board = snapshot.derive(10).unwrap();
        assert_eq!(board.page_count(), 1);
        assert_eq!(board.state(2), Some(SlotState::Stamped));
        assert_eq!(board.state(4), Some(SlotState::UnlockedEmpty));
        assert_eq!(board.state(5), Some(SlotState::Locked));
        assert_eq!(snapshot.derive(10).unwrap(), board);
    }

    #[test]
    fn invalid_profile_is_an_error() {
        let profile = doc(
            paths::users(),
            "u1",
            json!({"stampConditions": [{"type": "minutes", "value": 30}]}),
        );
        assert!(BoardSnapshot::from_documents(None, Some(&profile), &[]).is_err());
    }
}
