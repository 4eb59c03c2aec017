//! Stamp card service.
//!
//! [`StampCard`] ties the pure stamp card rules to a [`DocumentStore`]:
//! logging and deleting study records, evaluating unlocks, placing stamps on
//! other users' boards and listing notifications.
//!
//! Every mutating operation takes the acting [`Caller`] and only ever writes
//! that caller's own documents, with one exception: stamping writes a
//! placement and a notification under the board owner.

use crate::auth::Caller;
use crate::config::StampCardConfig;
use crate::error::{Error, Result};
use crate::live::{conditions_from_document, summary_from_document, BoardSnapshot, LiveBoard};
use crate::models::{
    reversals, MaterialList, NewRecord, NotificationEvent, ProfileUpdate, RecordDocument,
    StampSettings, StampTarget, StudyRecord, UserProfile,
};
use crate::paths;
use crate::store::{encode, Document, DocumentStore, FieldUpdate, Fields, Query, Write};
use chrono::Utc;
use serde_json::Value;
use stampcard_core::{
    default_conditions, ensure_unlocked, slot_status, unstamped_count, validate_conditions,
    ArtifactRef, Board, Delta, ProgressSummary, SlotStatus, StampPlacement, UnlockCondition,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a stamp placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    pub owner_id: String,
    pub placement: StampPlacement,
    /// The slot already held a stamp, which was replaced
    pub overwrote: bool,
    /// Whether the owner's notification was written
    pub notified: bool,
}

/// The stamp card service.
pub struct StampCard<S: DocumentStore> {
    store: Arc<S>,
    config: StampCardConfig,
}

impl<S: DocumentStore> Clone for StampCard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: DocumentStore> StampCard<S> {
    pub fn new(store: Arc<S>, config: StampCardConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &StampCardConfig {
        &self.config
    }

    // ==================== Profiles ====================

    /// Create the caller's profile if missing, and give it the default
    /// conditions if its list is empty.
    pub async fn ensure_profile(&self, caller: &Caller) -> Result<UserProfile> {
        paths::validate_id(&caller.user_id)?;
        match self.profile(&caller.user_id).await? {
            None => {
                let profile = UserProfile::new(
                    &caller.user_id,
                    caller.display_name.clone(),
                    default_conditions(),
                );
                self.store
                    .set(&paths::users(), &caller.user_id, encode(&profile)?, false)
                    .await?;
                info!("Created profile for {}", caller.user_id);
                Ok(profile)
            }
            Some(mut profile) if profile.stamp_conditions.is_empty() => {
                profile.stamp_conditions = default_conditions();
                self.write_conditions(&caller.user_id, &profile.stamp_conditions)
                    .await?;
                debug!("Filled default conditions for {}", caller.user_id);
                Ok(profile)
            }
            Some(profile) => Ok(profile),
        }
    }

    /// Prepare the caller's profile for a session.
    ///
    /// Like [`ensure_profile`](Self::ensure_profile), and a non-blank
    /// display name on the caller replaces the stored name.
    pub async fn sign_in(&self, caller: &Caller) -> Result<UserProfile> {
        let profile = self.ensure_profile(caller).await?;
        let name = caller
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        match name {
            Some(name) if profile.name.as_deref() != Some(name) => {
                let update = ProfileUpdate {
                    name: Some(name.to_string()),
                    ..Default::default()
                };
                self.update_profile(caller, &update).await
            }
            _ => Ok(profile),
        }
    }

    /// A user's profile, if they have one.
    pub async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        paths::validate_id(uid)?;
        let Some(doc) = self.store.get(&paths::users(), uid).await? else {
            return Ok(None);
        };
        let mut profile: UserProfile = doc.decode()?;
        if profile.uid.is_empty() {
            profile.uid = doc.id;
        }
        Ok(Some(profile))
    }

    /// Merge edits into the caller's profile.
    pub async fn update_profile(&self, caller: &Caller, update: &ProfileUpdate) -> Result<UserProfile> {
        paths::validate_id(&caller.user_id)?;
        if update.is_empty() {
            return Err(Error::InvalidInput("profile update is empty".into()));
        }
        let mut fields = update.to_fields();
        fields.insert("uid".into(), Value::from(caller.user_id.as_str()));
        self.store
            .commit(vec![Write::merge(paths::users(), &caller.user_id, fields)])
            .await?;
        info!("Updated profile of {}", caller.user_id);

        self.profile(&caller.user_id)
            .await?
            .ok_or_else(|| Error::NotFound(paths::users().doc_path(&caller.user_id)))
    }

    /// A user's unlock conditions; the defaults when they have none.
    pub async fn conditions(&self, uid: &str) -> Result<Vec<UnlockCondition>> {
        paths::validate_id(uid)?;
        let doc = self.store.get(&paths::users(), uid).await?;
        conditions_from_document(doc.as_ref())
    }

    /// Replace the caller's unlock conditions.
    pub async fn set_conditions(&self, caller: &Caller, conditions: Vec<UnlockCondition>) -> Result<()> {
        paths::validate_id(&caller.user_id)?;
        if conditions.is_empty() {
            return Err(Error::InvalidInput("at least one condition is required".into()));
        }
        validate_conditions(&conditions)?;
        self.write_conditions(&caller.user_id, &conditions).await?;
        info!("{} now has {} unlock conditions", caller.user_id, conditions.len());
        Ok(())
    }

    async fn write_conditions(&self, uid: &str, conditions: &[UnlockCondition]) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("uid".into(), Value::from(uid));
        fields.insert("stampConditions".into(), serde_json::to_value(conditions)?);
        self.store.commit(vec![Write::merge(paths::users(), uid, fields)]).await
    }

    // ==================== Records ====================

    /// Log a study session and add it to the caller's totals.
    ///
    /// The record and the summary increment are committed together.
    pub async fn log_record(&self, caller: &Caller, new: NewRecord) -> Result<StudyRecord> {
        paths::validate_id(&caller.user_id)?;
        let material = new.material.trim();
        if material.is_empty() {
            return Err(Error::InvalidInput("material must not be blank".into()));
        }
        let delta = Delta::creation(new.metric, new.amount)?;

        let profile = self.profile(&caller.user_id).await?;
        let author_display = match &profile {
            Some(p) if p.name.as_deref().is_some_and(|n| !n.trim().is_empty()) => {
                p.display_name().to_string()
            }
            _ => caller.display_label(&self.config.anonymous_name),
        };

        let record = StudyRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: caller.user_id.clone(),
            material: material.to_string(),
            metric: delta.metric,
            amount: delta.amount,
            comment: new.comment.trim().to_string(),
            created_at: Utc::now(),
            author_display,
            icon_uri: profile.as_ref().and_then(|p| p.custom_image_uri.clone()),
            selected_icon_index: profile.as_ref().map_or(0, |p| p.selected_icon_index),
        };

        self.store
            .commit(vec![
                Write::set(paths::records(), &record.id, encode(&record.to_document())?),
                summary_write(&caller.user_id, &[delta]),
            ])
            .await?;

        info!(
            "{} logged {} {} of {} ({})",
            caller.user_id, record.amount, record.metric, record.material, record.id
        );
        Ok(record)
    }

    /// Delete one of the caller's records and take it off their totals.
    ///
    /// Each reversal is clamped against the current totals, so a stored
    /// total never drops below zero. Returns the reversals actually applied.
    pub async fn delete_record(&self, caller: &Caller, record_id: &str) -> Result<Vec<Delta>> {
        paths::validate_id(record_id)?;
        let doc = self
            .store
            .get(&paths::records(), record_id)
            .await?
            .ok_or_else(|| Error::NotFound(paths::records().doc_path(record_id)))?;

        if doc.get_str("uid") != Some(caller.user_id.as_str()) {
            return Err(Error::Forbidden(format!(
                "{} does not own record {}",
                caller.user_id, record_id
            )));
        }

        let mut current = self.progress(&caller.user_id).await?;
        let deltas: Vec<Delta> = reversals(&doc.fields)
            .into_iter()
            .filter_map(|reversal| {
                let applied = current.effective(reversal);
                current = current.apply_delta(applied);
                (applied.amount != 0.0).then_some(applied)
            })
            .collect();
        let mut writes = vec![Write::delete(paths::records(), record_id)];
        if !deltas.is_empty() {
            writes.push(summary_write(&caller.user_id, &deltas));
        }
        self.store.commit(writes).await?;

        if deltas.is_empty() {
            warn!("Deleted record {}; summary unchanged", record_id);
        } else {
            info!("{} deleted record {}", caller.user_id, record_id);
        }
        Ok(deltas)
    }

    /// A user's running totals, zero if they have none.
    pub async fn progress(&self, uid: &str) -> Result<ProgressSummary> {
        paths::validate_id(uid)?;
        let doc = self.store.get(&paths::summary(uid), paths::SUMMARY_DOC).await?;
        Ok(summary_from_document(doc.as_ref()))
    }

    /// Rebuild the caller's totals from their records and overwrite the
    /// stored summary.
    pub async fn recompute_progress(&self, caller: &Caller) -> Result<ProgressSummary> {
        paths::validate_id(&caller.user_id)?;
        let docs = self
            .store
            .query(&Query::collection(paths::records()).where_eq("uid", caller.user_id.as_str()))
            .await?;

        let summary = ProgressSummary::from_contributions(
            docs.iter().filter_map(|doc| typed_record(doc).map(|r| r.delta())),
        );
        self.store
            .set(&paths::summary(&caller.user_id), paths::SUMMARY_DOC, encode(&summary)?, false)
            .await?;

        info!(
            "Recomputed totals of {} from {} records: {:?}",
            caller.user_id,
            docs.len(),
            summary
        );
        Ok(summary)
    }

    /// Every valid record, newest first, at most `limit`.
    pub async fn timeline(&self, limit: usize) -> Result<Vec<StudyRecord>> {
        let docs = self.store.query(&Query::collection(paths::records())).await?;
        let mut records: Vec<StudyRecord> = docs.iter().filter_map(typed_record).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    // ==================== Boards ====================

    /// Slots a user has unlocked.
    pub async fn unlocked_count(&self, uid: &str) -> Result<u64> {
        Ok(self.snapshot(uid, false).await?.unlocked())
    }

    /// A user's reconciled board.
    pub async fn board(&self, uid: &str) -> Result<Board> {
        self.snapshot(uid, true).await?.derive(self.config.page_size)
    }

    /// A user's board, re-derived on every change.
    pub async fn watch_board(&self, uid: &str) -> Result<LiveBoard> {
        LiveBoard::start(self.store.as_ref(), uid, self.config.page_size).await
    }

    async fn snapshot(&self, uid: &str, with_stamps: bool) -> Result<BoardSnapshot> {
        paths::validate_id(uid)?;
        let summary = self.store.get(&paths::summary(uid), paths::SUMMARY_DOC).await?;
        let profile = self.store.get(&paths::users(), uid).await?;
        let stamps = if with_stamps {
            self.store.query(&Query::collection(paths::stamps(uid))).await?
        } else {
            Vec::new()
        };
        BoardSnapshot::from_documents(summary.as_ref(), profile.as_ref(), &stamps)
    }

    /// Press `artifact` into slot `slot` of `owner_id`'s board.
    ///
    /// The slot must be unlocked by the owner's progress. On success the
    /// owner gets a notification; if that write fails the placement stands.
    pub async fn place_stamp(
        &self,
        caller: &Caller,
        owner_id: &str,
        slot: u64,
        artifact: ArtifactRef,
    ) -> Result<PlacementOutcome> {
        paths::validate_id(&caller.user_id)?;
        let unlocked = self.unlocked_count(owner_id).await?;
        let stamps = paths::stamps(owner_id);
        let slot_id = slot.to_string();
        let placed = self.store.get(&stamps, &slot_id).await?.is_some();
        let status = slot_status(slot, unlocked, placed);
        debug!("Slot {} of {} is {:?}", slot, owner_id, status);
        ensure_unlocked(slot, unlocked)?;
        let overwrote = status == SlotStatus::Placed;
        let placement = StampPlacement::new(slot, artifact);
        self.store
            .set(&stamps, &slot_id, encode(&placement)?, false)
            .await?;
        info!(
            "{} stamped slot {} of {} with {}",
            caller.user_id, slot, owner_id, placement.artifact
        );

        let sender = caller.display_label(&self.config.anonymous_name);
        let notified = match self.notify(owner_id, &sender, placement.artifact.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Stamp on {} placed but notification failed: {}", owner_id, e);
                false
            }
        };

        Ok(PlacementOutcome {
            owner_id: owner_id.to_string(),
            placement,
            overwrote,
            notified,
        })
    }

    /// Stamp with the caller's selected stamp.
    pub async fn place_selected_stamp(
        &self,
        caller: &Caller,
        owner_id: &str,
        slot: u64,
    ) -> Result<PlacementOutcome> {
        let artifact = self
            .stamp_settings(&caller.user_id)
            .await?
            .selected_stamp
            .ok_or_else(|| Error::InvalidInput("no stamp selected".into()))?;
        self.place_stamp(caller, owner_id, slot, artifact).await
    }

    async fn notify(&self, recipient_id: &str, sender: &str, artifact: ArtifactRef) -> Result<()> {
        let event = NotificationEvent::new(recipient_id, sender, artifact);
        self.store
            .set(
                &paths::notifications(recipient_id),
                &Uuid::new_v4().to_string(),
                encode(&event)?,
                false,
            )
            .await
    }

    /// A user's notifications, newest first.
    pub async fn notifications(&self, uid: &str) -> Result<Vec<NotificationEvent>> {
        paths::validate_id(uid)?;
        let docs = self
            .store
            .query(&Query::collection(paths::notifications(uid)))
            .await?;
        let mut events: Vec<NotificationEvent> = docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<NotificationEvent>() {
                Ok(mut event) => {
                    event.id = doc.id;
                    event.recipient_id = uid.to_string();
                    Some(event)
                }
                Err(e) => {
                    warn!("Skipping notification: {}", e);
                    None
                }
            })
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    /// Every user with the number of unlocked slots still waiting for a stamp.
    pub async fn stamp_targets(&self) -> Result<Vec<StampTarget>> {
        let users = self.store.query(&Query::collection(paths::users())).await?;
        let mut targets = Vec::with_capacity(users.len());
        for doc in users {
            let profile: UserProfile = match doc.decode() {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("Skipping user: {}", e);
                    continue;
                }
            };
            let snapshot = match self.snapshot(&doc.id, true).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Skipping user {}: {}", doc.id, e);
                    continue;
                }
            };
            targets.push(StampTarget {
                user_id: doc.id.clone(),
                name: profile.display_name().to_string(),
                icon_uri: profile.custom_image_uri.clone(),
                unstamped: unstamped_count(snapshot.unlocked(), snapshot.placements.len()),
            });
        }
        Ok(targets)
    }

    // ==================== Materials and settings ====================

    /// A user's study materials.
    pub async fn materials(&self, uid: &str) -> Result<MaterialList> {
        paths::validate_id(uid)?;
        match self.store.get(&paths::materials(), uid).await? {
            Some(doc) => doc.decode(),
            None => Ok(MaterialList::default()),
        }
    }

    /// Add a material to the caller's list.
    pub async fn add_material(&self, caller: &Caller, name: &str) -> Result<MaterialList> {
        let mut list = self.materials(&caller.user_id).await?;
        match list.add(name) {
            Some(added) => {
                self.store
                    .set(&paths::materials(), &caller.user_id, encode(&list)?, false)
                    .await?;
                debug!("{} added material {}", caller.user_id, added);
            }
            None => debug!("Material {:?} not added for {}", name, caller.user_id),
        }
        Ok(list)
    }

    /// Remove a material from the caller's list.
    pub async fn remove_material(&self, caller: &Caller, name: &str) -> Result<MaterialList> {
        let mut list = self.materials(&caller.user_id).await?;
        if list.remove(name) {
            self.store
                .set(&paths::materials(), &caller.user_id, encode(&list)?, false)
                .await?;
            debug!("{} removed material {}", caller.user_id, name.trim());
        }
        Ok(list)
    }

    /// A user's stamp and background selection.
    pub async fn stamp_settings(&self, uid: &str) -> Result<StampSettings> {
        paths::validate_id(uid)?;
        match self.store.get(&paths::stamp_settings(), uid).await? {
            Some(doc) => doc.decode(),
            None => Ok(StampSettings::default()),
        }
    }

    /// Replace the caller's stamp and background selection.
    pub async fn save_stamp_settings(&self, caller: &Caller, settings: &StampSettings) -> Result<()> {
        paths::validate_id(&caller.user_id)?;
        self.store
            .set(&paths::stamp_settings(), &caller.user_id, encode(settings)?, false)
            .await?;
        debug!("Saved stamp settings of {}", caller.user_id);
        Ok(())
    }
}

/// Summary increments for a set of deltas on one user.
fn summary_write(uid: &str, deltas: &[Delta]) -> Write {
    Write::update(
        paths::summary(uid),
        paths::SUMMARY_DOC,
        deltas
            .iter()
            .map(|d| (d.metric.total_field().to_string(), FieldUpdate::Increment(d.amount)))
            .collect(),
    )
}

/// Decode a record document, logging and skipping invalid ones.
fn typed_record(doc: &Document) -> Option<StudyRecord> {
    let decoded = doc
        .decode::<RecordDocument>()
        .map_err(|e| e.to_string())
        .and_then(|raw| StudyRecord::from_document(doc.id.clone(), raw));
    match decoded {
        Ok(record) => Some(record),
        Err(reason) => {
            warn!("Skipping record {}: {}", doc.path(), reason);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampcard_core::MetricKind;

    #[test]
    fn summary_write_uses_total_fields() {
        let write = summary_write(
            "u1",
            &[
                Delta { metric: MetricKind::Pages, amount: -10.0 },
                Delta { metric: MetricKind::Hours, amount: -1.5 },
            ],
        );
        match write {
            Write::Update { collection, id, updates } => {
                assert_eq!(collection.doc_path(&id), "recordSummary/u1/summary/summary");
                assert_eq!(
                    updates,
                    vec![
                        ("totalPages".to_string(), FieldUpdate::Increment(-10.0)),
                        ("totalHours".to_string(), FieldUpdate::Increment(-1.5)),
                    ]
                );
            }
            other => panic!("unexpected write {:?}", other),
        }
    }
}
