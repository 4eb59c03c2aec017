//! Study record documents.
//!
//! A record stores its amount under the metric's own field (`hours`,
//! `pages` or `questions`). The typed [`StudyRecord`] requires exactly one of
//! them to hold a positive amount; deletion reads the raw fields instead, so
//! even a malformed record can be removed without corrupting the summary.

use super::{missing_timestamp, nullable, ANONYMOUS};
use crate::store::Fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stampcard_core::{Delta, MetricKind};

/// Stored shape of `records/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocument {
    /// Owner
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub material: String,

    #[serde(default, deserialize_with = "nullable")]
    pub comment: String,

    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,

    /// Owner's display name when the record was written
    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub icon_uri: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub selected_icon_index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<f64>,
}

impl RecordDocument {
    /// Amount stored for one metric.
    pub fn amount(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Hours => self.hours,
            MetricKind::Pages => self.pages,
            MetricKind::Questions => self.questions,
        }
    }
}

/// Summary reversals for deleting a record, read from its raw fields.
///
/// Every metric field holding a finite number is reversed. Absent or
/// non-numeric fields are skipped.
pub fn reversals(fields: &Fields) -> Vec<Delta> {
    MetricKind::ALL
        .iter()
        .filter_map(|&metric| {
            Delta::reversal(metric, fields.get(metric.as_str()).and_then(Value::as_f64))
        })
        .collect()
}

/// A validated study record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyRecord {
    pub id: String,
    pub owner_id: String,
    pub material: String,
    pub metric: MetricKind,
    pub amount: f64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author_display: String,
    pub icon_uri: Option<String>,
    pub selected_icon_index: u32,
}

impl StudyRecord {
    /// Validate a stored record.
    ///
    /// Fails with a reason when the owner is missing or the record does not
    /// carry exactly one positive amount.
    pub fn from_document(id: impl Into<String>, doc: RecordDocument) -> Result<Self, String> {
        let owner_id = doc
            .uid
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "record has no owner".to_string())?;

        let present: Vec<(MetricKind, f64)> = MetricKind::ALL
            .iter()
            .filter_map(|&m| doc.amount(m).map(|a| (m, a)))
            .collect();
        let (metric, amount) = match present.as_slice() {
            [(m, a)] if a.is_finite() && *a > 0.0 => (*m, *a),
            [(m, a)] => return Err(format!("invalid {} amount {}", m, a)),
            [] => return Err("record has no amount".to_string()),
            _ => return Err("record has more than one amount".to_string()),
        };

        Ok(Self {
            id: id.into(),
            owner_id,
            material: doc.material,
            metric,
            amount,
            comment: doc.comment,
            created_at: doc.recorded_at.unwrap_or_else(missing_timestamp),
            author_display: doc
                .user_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            icon_uri: doc.icon_uri,
            selected_icon_index: doc.selected_icon_index,
        })
    }

    /// Stored shape of this record.
    pub fn to_document(&self) -> RecordDocument {
        let mut doc = RecordDocument {
            uid: Some(self.owner_id.clone()),
            material: self.material.clone(),
            comment: self.comment.clone(),
            recorded_at: Some(self.created_at),
            user_name: Some(self.author_display.clone()),
            icon_uri: self.icon_uri.clone(),
            selected_icon_index: self.selected_icon_index,
            ..Default::default()
        };
        match self.metric {
            MetricKind::Hours => doc.hours = Some(self.amount),
            MetricKind::Pages => doc.pages = Some(self.amount),
            MetricKind::Questions => doc.questions = Some(self.amount),
        }
        doc
    }

    /// Contribution to the owner's summary.
    pub fn delta(&self) -> Delta {
        Delta {
            metric: self.metric,
            amount: self.amount,
        }
    }
}

/// Input for logging a study session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub material: String,
    pub metric: MetricKind,
    pub amount: f64,
    pub comment: String,
}

impl NewRecord {
    pub fn new(material: impl Into<String>, metric: MetricKind, amount: f64) -> Self {
        Self {
            material: material.into(),
            metric,
            amount,
            comment: String::new(),
        }
    }

    /// Builder: attach a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> RecordDocument {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn valid_record() {
        let record = StudyRecord::from_document(
            "r1",
            doc(json!({
                "uid": "u1",
                "material": "Kanji deck",
                "pages": 12,
                "recordedAt": "2024-05-01T10:00:00Z",
                "userName": "Aki",
            })),
        )
        .unwrap();
        assert_eq!(record.metric, MetricKind::Pages);
        assert_eq!(record.amount, 12.0);
        assert_eq!(record.author_display, "Aki");
        assert_eq!(record.delta(), Delta { metric: MetricKind::Pages, amount: 12.0 });
    }

    #[test]
    fn missing_fields_default() {
        let record = StudyRecord::from_document("r1", doc(json!({"uid": "u1", "hours": 1.5}))).unwrap();
        assert_eq!(record.author_display, ANONYMOUS);
        assert_eq!(record.created_at, DateTime::<Utc>::MIN_UTC);
        assert_eq!(record.comment, "");
    }

    #[test]
    fn invalid_records() {
        assert!(StudyRecord::from_document("r", doc(json!({"hours": 1}))).is_err());
        assert!(StudyRecord::from_document("r", doc(json!({"uid": "u1"}))).is_err());
        assert!(StudyRecord::from_document("r", doc(json!({"uid": "u1", "hours": 0}))).is_err());
        assert!(
            StudyRecord::from_document("r", doc(json!({"uid": "u1", "hours": 1, "pages": 2}))).is_err()
        );
    }

    #[test]
    fn document_round_trip_keeps_metric_field() {
        let record = StudyRecord::from_document(
            "r1",
            doc(json!({"uid": "u1", "questions": 30, "recordedAt": "2024-05-01T10:00:00Z"})),
        )
        .unwrap();
        let encoded = serde_json::to_value(record.to_document()).unwrap();
        assert_eq!(encoded["questions"], json!(30.0));
        assert!(encoded.get("hours").is_none());
        assert!(encoded.get("pages").is_none());
    }

    #[test]
    fn reversals_skip_absent_and_garbage() {
        let Value::Object(fields) = json!({"uid": "u1", "pages": 10, "hours": "lots"}) else {
            unreachable!()
        };
        assert_eq!(
            reversals(&fields),
            vec![Delta { metric: MetricKind::Pages, amount: -10.0 }]
        );

        let Value::Object(empty) = json!({"uid": "u1"}) else {
            unreachable!()
        };
        assert!(reversals(&empty).is_empty());
    }
}
