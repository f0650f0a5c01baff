use crate::adapters::{FixedTimeProvider, MemoryStore};
use crate::auth;
use crate::model::{self, FromDocument, Item, Role, User};
use crate::ports::{Document, DocumentStore, Patch, Query, StoreError, Subscription};
use crate::session::CurrentUser;

use std::sync::OnceLock;

pub(crate) const PASSWORD: &str = "secret";

pub(crate) type TestStore = MemoryStore<FixedTimeProvider>;

pub(crate) fn store() -> TestStore {
    MemoryStore::with_time(FixedTimeProvider::at_rfc3339("2025-06-01T18:00:00Z"))
}

/// Argon2 is slow in debug builds, so every fixture user shares one hash.
pub(crate) fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| auth::hash_password(PASSWORD).expect("hash fixture password"))
}

pub(crate) fn actor(username: &str, role: Role) -> CurrentUser {
    CurrentUser {
        username: username.to_string(),
        role,
        coming: true,
    }
}

pub(crate) async fn insert_user<S: DocumentStore>(store: &S, username: &str, role: Role, coming: bool) {
    let user = User {
        username: username.to_string(),
        password_hash: password_hash().to_string(),
        role,
        coming,
    };
    let record = Patch::from_record(&user).expect("user record");
    store
        .set_document(model::USERS, username, record)
        .await
        .expect("insert user");
}

pub(crate) async fn insert_item<S: DocumentStore>(
    store: &S,
    name: &str,
    max: u32,
    claimed_by: &[&str],
) -> String {
    let item = Item {
        id: String::new(),
        name: name.to_string(),
        details: String::new(),
        max,
        claimed_by: claimed_by.iter().map(|name| name.to_string()).collect(),
    };
    let record = Patch::from_record(&item).expect("item record");
    store
        .add_document(model::ITEMS, record)
        .await
        .expect("insert item")
}

pub(crate) async fn user<S: DocumentStore>(store: &S, username: &str) -> User {
    let document = store
        .get_document(model::USERS, username)
        .await
        .expect("get user")
        .expect("user exists");
    User::from_document(&document).expect("decode user")
}

pub(crate) async fn item<S: DocumentStore>(store: &S, id: &str) -> Item {
    let document = store
        .get_document(model::ITEMS, id)
        .await
        .expect("get item")
        .expect("item exists");
    Item::from_document(&document).expect("decode item")
}

/// Store double whose writes to one document id always fail.
#[derive(Clone)]
pub(crate) struct FailingStore<S> {
    inner: S,
    failing_id: String,
}

impl<S> FailingStore<S> {
    pub(crate) fn new(inner: S, failing_id: &str) -> Self {
        Self {
            inner,
            failing_id: failing_id.to_string(),
        }
    }

    fn check(&self, id: &str) -> Result<(), StoreError> {
        if id == self.failing_id {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl<S: DocumentStore> DocumentStore for FailingStore<S> {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(collection, id).await
    }

    async fn set_document(&self, collection: &str, id: &str, record: Patch) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.set_document(collection, id, record).await
    }

    async fn update_fields(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.update_fields(collection, id, patch).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.delete_document(collection, id).await
    }

    async fn add_document(&self, collection: &str, record: Patch) -> Result<String, StoreError> {
        self.inner.add_document(collection, record).await
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        self.inner.subscribe(query).await
    }
}
