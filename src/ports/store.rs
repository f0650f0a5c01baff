use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

use std::collections::BTreeMap;
use std::sync::Arc;

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A single field mutation inside a [`Patch`].
///
/// `ArrayUnion` and `ArrayRemove` apply set semantics to list fields: union
/// appends only values that are not already present, remove drops every
/// occurrence. `ServerTimestamp` is resolved by the store when the write is
/// applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    Delete,
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
    ServerTimestamp,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    updates: BTreeMap<String, FieldUpdate>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a patch that sets every top-level field of `record`.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, StoreError> {
        let Value::Object(fields) = serde_json::to_value(record)? else {
            return Err(StoreError::InvalidRecord);
        };
        let updates = fields
            .into_iter()
            .map(|(field, value)| (field, FieldUpdate::Set(value)))
            .collect();
        Ok(Self { updates })
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldUpdate::Set(value.into()))
    }

    pub fn delete(self, field: impl Into<String>) -> Self {
        self.with(field, FieldUpdate::Delete)
    }

    pub fn array_union(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayUnion(vec![value.into()]))
    }

    pub fn array_remove(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FieldUpdate::ArrayRemove(vec![value.into()]))
    }

    pub fn server_timestamp(self, field: impl Into<String>) -> Self {
        self.with(field, FieldUpdate::ServerTimestamp)
    }

    pub fn with(mut self, field: impl Into<String>, update: FieldUpdate) -> Self {
        self.updates.insert(field.into(), update);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
        self.updates
            .iter()
            .map(|(field, update)| (field.as_str(), update))
    }
}

impl IntoIterator for Patch {
    type Item = (String, FieldUpdate);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Collection {
        collection: String,
        order_by: Option<(String, Direction)>,
    },
    Document {
        collection: String,
        id: String,
    },
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Query::Collection {
            collection: collection.into(),
            order_by: None,
        }
    }

    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Query::Document {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Orders a collection query by one field. Document queries are returned
    /// unchanged.
    pub fn order_by(self, field: impl Into<String>, direction: Direction) -> Self {
        match self {
            Query::Collection { collection, .. } => Query::Collection {
                collection,
                order_by: Some((field.into(), direction)),
            },
            other => other,
        }
    }

    pub fn collection_name(&self) -> &str {
        match self {
            Query::Collection { collection, .. } | Query::Document { collection, .. } => collection,
        }
    }

    /// Whether a write to `collection/id` can change this query's result.
    pub fn watches(&self, collection: &str, id: &str) -> bool {
        match self {
            Query::Collection {
                collection: watched,
                ..
            } => watched == collection,
            Query::Document {
                collection: watched,
                id: watched_id,
            } => watched == collection && watched_id == id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

/// Live handle on a query result. Every change replaces the whole snapshot.
/// Dropping the handle unsubscribes.
#[derive(Debug, Clone)]
pub struct Subscription {
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl Subscription {
    pub fn new(receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Waits for the next pushed snapshot. Returns `None` once the store side
    /// has gone away.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.changed().await.ok()?;
        Some(Arc::clone(&self.receiver.borrow_and_update()))
    }

    pub fn into_receiver(self) -> watch::Receiver<Arc<Snapshot>> {
        self.receiver
    }

    pub fn unsubscribe(self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("invalid document path {collection}/{id}")]
    InvalidPath { collection: String, id: String },
    #[error("record must serialize to a map of fields")]
    InvalidRecord,
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Contract of the hosted document store. Writes are full-overwrite
/// (`set_document`), merge (`update_fields`) or append with a generated id
/// (`add_document`).
pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        record: Patch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Patch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_document(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn add_document(
        &self,
        collection: &str,
        record: Patch,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    fn subscribe(
        &self,
        query: Query,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;
}
