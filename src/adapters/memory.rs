use crate::adapters::SystemTimeProvider;
use crate::ports::{
    Direction, Document, DocumentStore, FieldUpdate, Fields, Patch, Query, Snapshot, StoreError,
    Subscription, TimeProvider,
};

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use tokio::sync::watch;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const GENERATED_ID_LEN: usize = 20;

/// In-process document store with realtime subscriptions.
///
/// Documents live in ordered maps per collection, so unordered collection
/// queries come back sorted by id. Each subscription owns a `watch` channel
/// that receives a freshly built snapshot after every write touching its
/// query; channels whose receivers are gone are pruned on the next write.
#[derive(Debug, Clone)]
pub struct MemoryStore<T = SystemTimeProvider> {
    inner: Arc<Mutex<Inner>>,
    time: T,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    watchers: Vec<Watcher>,
    last_timestamp: i64,
}

#[derive(Debug)]
struct Watcher {
    query: Query,
    sender: watch::Sender<Arc<Snapshot>>,
}

impl MemoryStore<SystemTimeProvider> {
    pub fn new() -> Self {
        Self::with_time(SystemTimeProvider)
    }
}

impl Default for MemoryStore<SystemTimeProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeProvider> MemoryStore<T> {
    pub fn with_time(time: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            time,
        }
    }

    fn now_nanos(&self) -> i64 {
        i64::try_from(self.time.now().unix_timestamp_nanos()).unwrap_or(i64::MAX)
    }

    fn write(
        &self,
        collection: &str,
        id: &str,
        mode: WriteMode,
        patch: Patch,
    ) -> Result<(), StoreError> {
        validate_path(collection, id)?;
        let now = self.now_nanos();
        let mut guard = self.inner.lock().expect("store lock");
        let Inner {
            collections,
            last_timestamp,
            ..
        } = &mut *guard;
        let documents = collections.entry(collection.to_string()).or_default();
        let mut timestamp = || next_timestamp(last_timestamp, now);
        match mode {
            WriteMode::Overwrite => {
                let mut fields = Fields::new();
                apply_patch(&mut fields, patch, &mut timestamp);
                documents.insert(id.to_string(), fields);
            }
            WriteMode::Merge => {
                let Some(fields) = documents.get_mut(id) else {
                    return Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    });
                };
                apply_patch(fields, patch, &mut timestamp);
            }
        }
        notify(&mut guard, collection, id);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        let mut guard = self.inner.lock().expect("store lock");
        guard.watchers.retain(|watcher| !watcher.sender.is_closed());
        guard.watchers.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Overwrite,
    Merge,
}

impl<T: TimeProvider> DocumentStore for MemoryStore<T> {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_path(collection, id)?;
        let guard = self.inner.lock().expect("store lock");
        let document = guard
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            });
        Ok(document)
    }

    async fn set_document(&self, collection: &str, id: &str, record: Patch) -> Result<(), StoreError> {
        self.write(collection, id, WriteMode::Overwrite, record)
    }

    async fn update_fields(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        self.write(collection, id, WriteMode::Merge, patch)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        validate_path(collection, id)?;
        let mut guard = self.inner.lock().expect("store lock");
        let removed = guard
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id));
        if removed.is_some() {
            notify(&mut guard, collection, id);
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, record: Patch) -> Result<String, StoreError> {
        let id = {
            let guard = self.inner.lock().expect("store lock");
            let existing = guard.collections.get(collection);
            loop {
                let candidate = generate_id();
                if existing.is_none_or(|documents| !documents.contains_key(&candidate)) {
                    break candidate;
                }
            }
        };
        self.write(collection, &id, WriteMode::Overwrite, record)?;
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        if query.collection_name().is_empty() {
            return Err(StoreError::InvalidPath {
                collection: String::new(),
                id: String::new(),
            });
        }
        let mut guard = self.inner.lock().expect("store lock");
        let initial = build_snapshot(&guard.collections, &query);
        let (sender, receiver) = watch::channel(Arc::new(initial));
        guard.watchers.push(Watcher { query, sender });
        Ok(Subscription::new(receiver))
    }
}

fn validate_path(collection: &str, id: &str) -> Result<(), StoreError> {
    if collection.is_empty() || id.is_empty() || collection.contains('/') || id.contains('/') {
        return Err(StoreError::InvalidPath {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}

/// Server timestamps are strictly increasing so that ordering by timestamp
/// keeps insertion order even when the clock stalls.
fn next_timestamp(last: &mut i64, now: i64) -> i64 {
    let timestamp = now.max(last.saturating_add(1));
    *last = timestamp;
    timestamp
}

fn apply_patch(fields: &mut Fields, patch: Patch, timestamp: &mut impl FnMut() -> i64) {
    for (field, update) in patch {
        match update {
            FieldUpdate::Set(value) => {
                fields.insert(field, value);
            }
            FieldUpdate::Delete => {
                fields.remove(&field);
            }
            FieldUpdate::ServerTimestamp => {
                fields.insert(field, Value::from(timestamp()));
            }
            FieldUpdate::ArrayUnion(values) => {
                let list = array_field(fields, field);
                for value in values {
                    if !list.contains(&value) {
                        list.push(value);
                    }
                }
            }
            FieldUpdate::ArrayRemove(values) => {
                let list = array_field(fields, field);
                list.retain(|existing| !values.contains(existing));
            }
        }
    }
}

/// Returns the list stored under `field`, replacing any non-list value with
/// an empty list first.
fn array_field(fields: &mut Fields, field: String) -> &mut Vec<Value> {
    let entry = fields.entry(field).or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    match entry {
        Value::Array(list) => list,
        _ => unreachable!("field was just replaced with an array"),
    }
}

fn notify(inner: &mut Inner, collection: &str, id: &str) {
    let Inner {
        collections,
        watchers,
        ..
    } = inner;
    watchers.retain(|watcher| !watcher.sender.is_closed());
    for watcher in watchers.iter() {
        if watcher.query.watches(collection, id) {
            let snapshot = build_snapshot(collections, &watcher.query);
            watcher.sender.send_replace(Arc::new(snapshot));
        }
    }
}

fn build_snapshot(
    collections: &HashMap<String, BTreeMap<String, Fields>>,
    query: &Query,
) -> Snapshot {
    let documents = match query {
        Query::Document { collection, id } => collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .into_iter()
            .collect(),
        Query::Collection {
            collection,
            order_by,
        } => {
            let mut documents: Vec<Document> = collections
                .get(collection)
                .map(|documents| {
                    documents
                        .iter()
                        .map(|(id, fields)| Document {
                            id: id.clone(),
                            fields: fields.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            // Ordered queries only return documents that carry the field.
            if let Some((field, direction)) = order_by {
                documents.retain(|document| document.get(field).is_some());
                documents.sort_by(|a, b| {
                    let ordering = compare_values(a.get(field), b.get(field));
                    match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                });
            }
            documents
        }
    };
    Snapshot { documents }
}

fn value_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}
