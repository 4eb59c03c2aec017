//! Document store abstraction.
//!
//! The stamp card service never talks to a database directly. It speaks to a
//! [`DocumentStore`]: plain key-value documents grouped in collections, with
//! merge writes, atomic field increments, batched commits and live query
//! subscriptions.
//!
//! # Paths
//!
//! Collections are slash-separated paths (`users`, `stampBoards/u1/stamps`).
//! A document is addressed by its collection plus an id.

mod memory;

pub use memory::MemoryStore;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use tokio::sync::mpsc;

/// Field map of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Slash-separated collection path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Top-level or already-joined collection path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Sub-collection `child` of document `parent/doc_id`.
    pub fn nested(parent: &str, doc_id: &str, child: &str) -> Self {
        Self(format!("{}/{}/{}", parent, doc_id, child))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full path of a document in this collection.
    pub fn doc_path(&self, id: &str) -> String {
        format!("{}/{}", self.0, id)
    }

    /// Whether this collection is `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0 == prefix || self.0.starts_with(&format!("{}/", prefix.trim_end_matches('/')))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: CollectionPath,
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(collection: CollectionPath, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            collection,
            id: id.into(),
            fields,
        }
    }

    /// Full path, for logs and errors.
    pub fn path(&self) -> String {
        self.collection.doc_path(&self.id)
    }

    /// Numeric field, `None` when absent or not a number.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    /// String field, `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Decode into a typed document.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            Error::InvalidDocument {
                path: self.path(),
                reason: e.to_string(),
            }
        })
    }
}

/// Encode a typed document into fields.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "document must encode to an object, got {}",
            other
        ))),
    }
}

/// Change to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field
    Set(Value),
    /// Add to a numeric field; a missing or non-numeric field starts at 0
    Increment(f64),
    /// Remove the field
    Remove,
}

/// One write in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Replace the document, or merge into it when `merge` is set.
    Set {
        collection: CollectionPath,
        id: String,
        fields: Fields,
        merge: bool,
    },
    /// Apply field updates, creating the document if needed.
    Update {
        collection: CollectionPath,
        id: String,
        updates: Vec<(String, FieldUpdate)>,
    },
    /// Delete the document if present.
    Delete { collection: CollectionPath, id: String },
}

impl Write {
    pub fn set(collection: CollectionPath, id: impl Into<String>, fields: Fields) -> Self {
        Write::Set {
            collection,
            id: id.into(),
            fields,
            merge: false,
        }
    }

    pub fn merge(collection: CollectionPath, id: impl Into<String>, fields: Fields) -> Self {
        Write::Set {
            collection,
            id: id.into(),
            fields,
            merge: true,
        }
    }

    pub fn update(
        collection: CollectionPath,
        id: impl Into<String>,
        updates: Vec<(String, FieldUpdate)>,
    ) -> Self {
        Write::Update {
            collection,
            id: id.into(),
            updates,
        }
    }

    pub fn delete(collection: CollectionPath, id: impl Into<String>) -> Self {
        Write::Delete {
            collection,
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &CollectionPath {
        match self {
            Write::Set { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => collection,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    /// Restrict to a single document id
    pub document: Option<String>,
    /// Equality filters, all must match
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every document in a collection.
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            document: None,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// A single document, as a zero- or one-element result.
    pub fn document(collection: CollectionPath, id: impl Into<String>) -> Self {
        Self {
            document: Some(id.into()),
            ..Self::collection(collection)
        }
    }

    /// Builder: keep documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Builder: sort by `field`.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Builder: keep at most `n` documents.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether a document belongs in the result, ignoring ordering and limit.
    pub fn matches(&self, doc: &Document) -> bool {
        if doc.collection != self.collection {
            return false;
        }
        if let Some(id) = &self.document {
            if &doc.id != id {
                return false;
            }
        }
        self.filters
            .iter()
            .all(|(field, value)| doc.fields.get(field) == Some(value))
    }

    /// Filter, order and truncate a set of candidate documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if let Some((field, direction)) = &self.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(field), b.fields.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional field values.
///
/// Missing fields sort first, then null, booleans, numbers, strings.
/// Strings compare bytewise, so RFC 3339 timestamps with differing
/// fractional digits only sort approximately.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.total_cmp(&y)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

/// Live query results.
///
/// The first snapshot arrives right after subscribing, then one per change
/// to the queried collection. Dropping the subscription releases it.
#[derive(Debug)]
pub struct Subscription {
    query: Query,
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    pub fn new(query: Query, rx: mpsc::UnboundedReceiver<Vec<Document>>) -> Self {
        Self { query, rx }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Latest snapshot already delivered, skipping stale ones, without waiting.
    pub fn latest(&mut self) -> Option<Vec<Document>> {
        let mut latest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {}
}

/// External document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>>;

    /// Run a query once.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Apply a batch of writes atomically: all land or none do.
    async fn commit(&self, writes: Vec<Write>) -> Result<()>;

    /// Subscribe to a query.
    async fn subscribe(&self, query: Query) -> Result<Subscription>;

    /// Write a single document.
    async fn set(&self, collection: &CollectionPath, id: &str, fields: Fields, merge: bool) -> Result<()> {
        self.commit(vec![Write::Set {
            collection: collection.clone(),
            id: id.to_string(),
            fields,
            merge,
        }])
        .await
    }

    /// Update fields of a single document.
    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> Result<()> {
        self.commit(vec![Write::update(collection.clone(), id, updates)])
            .await
    }

    /// Delete a single document.
    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<()> {
        self.commit(vec![Write::delete(collection.clone(), id)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        let Value::Object(map) = fields else {
            panic!("fields must be an object");
        };
        Document::new(CollectionPath::new("records"), id, map)
    }

    #[test]
    fn collection_paths() {
        let stamps = CollectionPath::nested("stampBoards", "u1", "stamps");
        assert_eq!(stamps.as_str(), "stampBoards/u1/stamps");
        assert_eq!(stamps.doc_path("3"), "stampBoards/u1/stamps/3");
        assert!(stamps.starts_with("stampBoards"));
        assert!(stamps.starts_with("stampBoards/u1"));
        assert!(!stamps.starts_with("stamp"));
    }

    #[test]
    fn query_filters_and_orders() {
        let docs = vec![
            doc("a", json!({"uid": "u1", "recordedAt": "2024-05-01T10:00:00Z"})),
            doc("b", json!({"uid": "u2", "recordedAt": "2024-05-03T10:00:00Z"})),
            doc("c", json!({"uid": "u1", "recordedAt": "2024-05-02T10:00:00Z"})),
            doc("d", json!({"uid": "u1"})),
        ];

        let q = Query::collection(CollectionPath::new("records"))
            .where_eq("uid", "u1")
            .order_by("recordedAt", Direction::Descending);
        let ids: Vec<String> = q.apply(docs.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "a", "d"]);

        let q = Query::collection(CollectionPath::new("records"))
            .order_by("recordedAt", Direction::Ascending)
            .limit(2);
        let ids: Vec<String> = q.apply(docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d", "a"]);
    }

    #[test]
    fn document_query_matches_one_id() {
        let q = Query::document(CollectionPath::new("records"), "b");
        assert!(q.matches(&doc("b", json!({}))));
        assert!(!q.matches(&doc("a", json!({}))));
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_values(Some(&json!(9)), Some(&json!(10.5))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("x")), Some(&json!(1))), Ordering::Greater);
    }

    #[test]
    fn decode_reports_path() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            slot: u64,
        }
        let d = doc("x", json!({"slot": "seven"}));
        match d.decode::<Strict>() {
            Err(Error::InvalidDocument { path, .. }) => assert_eq!(path, "records/x"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
