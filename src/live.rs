use crate::model::{self, EventConfig, FromDocument, Item, Message, User};
use crate::ports::{Direction, DocumentStore, Query, Snapshot, StoreError, Subscription};

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Typed, continuously updated copy of one query result. Reading decodes
/// the latest pushed snapshot; earlier snapshots are never patched.
///
/// Unreadable documents are skipped. Each one is logged when it first turns
/// up unreadable, not on every read; clones share that record.
pub struct LiveCollection<T> {
    name: &'static str,
    subscription: Subscription,
    reported: Arc<Mutex<HashSet<String>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LiveCollection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            subscription: self.subscription.clone(),
            reported: Arc::clone(&self.reported),
            _marker: PhantomData,
        }
    }
}

impl<T: FromDocument> LiveCollection<T> {
    pub async fn open<S: DocumentStore>(
        store: &S,
        name: &'static str,
        query: Query,
    ) -> Result<Self, StoreError> {
        let subscription = store.subscribe(query).await?;
        Ok(Self {
            name,
            subscription,
            reported: Arc::default(),
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn current(&self) -> Vec<T> {
        self.decode(&self.subscription.current())
    }

    pub async fn changed(&mut self) -> Option<Vec<T>> {
        let snapshot = self.subscription.changed().await?;
        Some(self.decode(&snapshot))
    }

    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }
}

impl<T: FromDocument> LiveCollection<T> {
    fn decode(&self, snapshot: &Snapshot) -> Vec<T> {
        let mut values = Vec::with_capacity(snapshot.documents.len());
        let mut unreadable = Vec::new();
        for document in &snapshot.documents {
            match T::from_document(document) {
                Ok(value) => values.push(value),
                Err(err) => unreadable.push((document.id.as_str(), err)),
            }
        }

        let mut reported = self.reported.lock().expect("reported lock");
        let fresh = newly_unreadable(
            &mut reported,
            unreadable.iter().map(|(id, _)| *id),
        );
        for (id, err) in &unreadable {
            if fresh.contains(id) {
                tracing::warn!(collection = self.name, %id, %err, "skipping unreadable document");
            }
        }
        values
    }
}

/// Replaces `reported` with the ids unreadable now and returns the ones that
/// were not unreadable last time. A document that gets fixed and breaks
/// again counts as new.
fn newly_unreadable<'a>(
    reported: &mut HashSet<String>,
    unreadable: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let mut now = HashSet::new();
    let mut fresh = Vec::new();
    for id in unreadable {
        if !reported.contains(id) {
            fresh.push(id);
        }
        now.insert(id.to_string());
    }
    *reported = now;
    fresh
}

/// The four live collections the event pages render from. Each one is
/// subscribed on its own, so a change in one never reloads the others.
/// Dropping the view cancels all four subscriptions.
#[derive(Clone)]
pub struct LiveView {
    users: LiveCollection<User>,
    items: LiveCollection<Item>,
    event: LiveCollection<EventConfig>,
    messages: LiveCollection<Message>,
}

impl LiveView {
    pub async fn open<S: DocumentStore>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            users: LiveCollection::open(store, "users", Query::collection(model::USERS)).await?,
            items: LiveCollection::open(store, "items", Query::collection(model::ITEMS)).await?,
            event: LiveCollection::open(
                store,
                "event",
                Query::document(model::CONFIG, model::EVENT_CONFIG_ID),
            )
            .await?,
            messages: LiveCollection::open(
                store,
                "messages",
                Query::collection(model::MESSAGES).order_by("timestamp", Direction::Ascending),
            )
            .await?,
        })
    }

    pub fn users(&self) -> Vec<User> {
        self.users.current()
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.current()
    }

    pub fn event_details(&self) -> String {
        self.event
            .current()
            .into_iter()
            .next()
            .map(|config| config.details)
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.current()
    }

    pub fn confirmed_guests(&self) -> Vec<Guest> {
        confirmed_guests(&self.users(), &self.items())
    }

    /// Fresh handles on every underlying subscription, labelled by collection.
    pub fn subscriptions(&self) -> Vec<(&'static str, Subscription)> {
        vec![
            (self.users.name(), self.users.subscription()),
            (self.items.name(), self.items.subscription()),
            (self.event.name(), self.event.subscription()),
            (self.messages.name(), self.messages.subscription()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guest {
    pub username: String,
    pub claimed_items: Vec<String>,
}

/// Users who said they are coming, minus the admin account, each with the
/// names of the items they claimed.
pub fn confirmed_guests(users: &[User], items: &[Item]) -> Vec<Guest> {
    users
        .iter()
        .filter(|user| user.coming && user.username != model::ADMIN_USERNAME)
        .map(|user| Guest {
            username: user.username.clone(),
            claimed_items: claimed_items(items, &user.username)
                .into_iter()
                .map(|item| item.name.clone())
                .collect(),
        })
        .collect()
}

pub fn claimed_items<'a>(items: &'a [Item], username: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| item.is_claimed_by(username))
        .collect()
}
