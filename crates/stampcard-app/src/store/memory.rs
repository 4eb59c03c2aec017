//! In-process document store.
//!
//! Backs the CLI and the tests. Optionally persisted to a JSON file between
//! runs. Writes to chosen collection prefixes can be made to fail, to
//! exercise partial-failure paths.

use super::{
    CollectionPath, Document, DocumentStore, FieldUpdate, Fields, Query, Subscription, Write,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Fields>>;

struct Subscriber {
    query: Query,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
struct Inner {
    collections: Collections,
    subscribers: Vec<Subscriber>,
    failing: BTreeSet<String>,
    commits: u64,
}

impl Inner {
    fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(collection.clone(), id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn run(&self, query: &Query) -> Vec<Document> {
        query.apply(self.documents(&query.collection))
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::Set {
                collection,
                id,
                fields,
                merge,
            } => {
                let docs = self.collections.entry(collection).or_default();
                match docs.get_mut(&id) {
                    Some(existing) if merge => existing.extend(fields),
                    _ => {
                        docs.insert(id, fields);
                    }
                }
            }
            Write::Update {
                collection,
                id,
                updates,
            } => {
                let doc = self
                    .collections
                    .entry(collection)
                    .or_default()
                    .entry(id)
                    .or_default();
                for (field, update) in updates {
                    apply_field(doc, field, update);
                }
            }
            Write::Delete { collection, id } => {
                if let Some(docs) = self.collections.get_mut(&collection) {
                    docs.remove(&id);
                    if docs.is_empty() {
                        self.collections.remove(&collection);
                    }
                }
            }
        }
    }

    /// Push fresh snapshots to subscribers of the touched collections and
    /// drop subscribers whose receiver is gone.
    fn notify(&mut self, touched: &BTreeSet<CollectionPath>) {
        let subscribers = std::mem::take(&mut self.subscribers);
        let kept: Vec<Subscriber> = subscribers
            .into_iter()
            .filter(|sub| {
                if sub.tx.is_closed() {
                    return false;
                }
                if !touched.contains(&sub.query.collection) {
                    return true;
                }
                sub.tx.send(self.run(&sub.query)).is_ok()
            })
            .collect();
        self.subscribers = kept;
    }
}

fn apply_field(doc: &mut Fields, field: String, update: FieldUpdate) {
    match update {
        FieldUpdate::Set(value) => {
            doc.insert(field, value);
        }
        FieldUpdate::Increment(delta) => {
            if !delta.is_finite() {
                return;
            }
            let current = doc.get(&field).and_then(Value::as_f64).unwrap_or(0.0);
            doc.insert(field, Value::from(current + delta));
        }
        FieldUpdate::Remove => {
            doc.remove(&field);
        }
    }
}

/// Document store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON data file, or start empty if it does not exist.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::new();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let raw: BTreeMap<String, BTreeMap<String, Fields>> = serde_json::from_slice(&bytes)?;
                let mut inner = store.inner.write().await;
                inner.collections = raw
                    .into_iter()
                    .map(|(path, docs)| (CollectionPath::new(path), docs))
                    .collect();
                info!("Loaded {} collections from {:?}", inner.collections.len(), path);
                drop(inner);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No data file at {:?}, starting empty", path);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(store)
    }

    /// Write every collection to a JSON data file.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let inner = self.inner.read().await;
            let raw: BTreeMap<&str, &BTreeMap<String, Fields>> = inner
                .collections
                .iter()
                .map(|(path, docs)| (path.as_str(), docs))
                .collect();
            serde_json::to_vec_pretty(&raw)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        debug!("Saved store to {:?}", path);
        Ok(())
    }

    /// Make every write under `prefix` fail with [`Error::Unavailable`].
    pub async fn fail_writes(&self, prefix: impl Into<String>) {
        self.inner.write().await.failing.insert(prefix.into());
    }

    /// Stop failing writes under `prefix`.
    pub async fn heal(&self, prefix: &str) {
        self.inner.write().await.failing.remove(prefix);
    }

    /// Number of batches committed so far.
    pub async fn commit_count(&self) -> u64 {
        self.inner.read().await.commits
    }

    /// Live subscriptions still registered.
    pub async fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.write().await;
        inner.subscribers.retain(|s| !s.tx.is_closed());
        inner.subscribers.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(collection.clone(), id, fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        Ok(self.inner.read().await.run(query))
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        let mut inner = self.inner.write().await;

        if let Some(write) = writes.iter().find(|w| {
            inner
                .failing
                .iter()
                .any(|prefix| w.collection().starts_with(prefix))
        }) {
            return Err(Error::Unavailable(format!(
                "writes to {} are failing",
                write.collection()
            )));
        }

        let touched: BTreeSet<CollectionPath> =
            writes.iter().map(|w| w.collection().clone()).collect();
        for write in writes {
            inner.apply(write);
        }
        inner.commits += 1;
        inner.notify(&touched);
        Ok(())
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        // receiver is alive, so the initial send cannot fail
        let _ = tx.send(inner.run(&query));
        inner.subscribers.push(Subscriber {
            query: query.clone(),
            tx,
        });
        Ok(Subscription::new(query, rx))
    }
}
