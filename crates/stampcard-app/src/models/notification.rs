//! Stamp notifications.

use super::missing_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stampcard_core::ArtifactRef;

/// "`sender_name` stamped your card", stored at `notifications/{uid}/logs/{id}`.
///
/// `id` and `recipient_id` come from the document path, not its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(skip)]
    pub id: String,

    #[serde(skip)]
    pub recipient_id: String,

    #[serde(default)]
    pub sender_name: String,

    #[serde(default = "missing_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Stamp that was placed
    #[serde(rename = "imageUri", default)]
    pub artifact: Option<ArtifactRef>,
}

impl NotificationEvent {
    pub fn new(recipient_id: impl Into<String>, sender_name: impl Into<String>, artifact: ArtifactRef) -> Self {
        Self {
            id: String::new(),
            recipient_id: recipient_id.into(),
            sender_name: sender_name.into(),
            timestamp: Utc::now(),
            artifact: Some(artifact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_fields() {
        let event = NotificationEvent::new("u1", "Mio", ArtifactRef::new("flower.png"));
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["senderName"], json!("Mio"));
        assert_eq!(encoded["imageUri"], json!("flower.png"));
        assert!(encoded.get("recipientId").is_none());
        assert!(encoded.get("id").is_none());
    }

    #[test]
    fn tolerant_decode() {
        let event: NotificationEvent = serde_json::from_value(json!({"senderName": "Mio"})).unwrap();
        assert_eq!(event.artifact, None);
        assert_eq!(event.timestamp, DateTime::<Utc>::MIN_UTC);
    }
}
