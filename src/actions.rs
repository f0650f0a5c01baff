use crate::auth::{self, AuthError};
use crate::model::{self, FromDocument, Item, Role, User};
use crate::ports::{DocumentStore, Patch, StoreError};
use crate::session::CurrentUser;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

/// Why an action was dropped without touching the store. None of these are
/// reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingField,
    AlreadyClaimed,
    Full,
    NotClaimed,
    NotConfirmed,
    ProtectedAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Dismissed,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Dismissed
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{role} accounts may not {action}")]
    Forbidden {
        role: &'static str,
        action: &'static str,
    },
    #[error("stored item {id} is unreadable: {source}")]
    Corrupt {
        id: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

const MANAGERS: &[Role] = &[Role::Admin, Role::Creator];
const ADMINS: &[Role] = &[Role::Admin];
const GUESTS: &[Role] = &[Role::User];

fn require(actor: &CurrentUser, allowed: &[Role], action: &'static str) -> Result<(), ActionError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(ActionError::Forbidden {
            role: actor.role.as_str(),
            action,
        })
    }
}

/// Creates or overwrites the account `username` as a plain, not-yet-coming
/// guest. Admin accounts are never overwritten.
pub async fn create_user<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    username: &str,
    password: &str,
) -> Result<Outcome, ActionError> {
    require(actor, MANAGERS, "create users")?;
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::MissingField));
    }
    if is_admin_record(store, username).await? {
        return Ok(Outcome::Skipped(SkipReason::ProtectedAccount));
    }

    let user = User {
        username: username.to_string(),
        password_hash: auth::hash_password(password)?,
        role: Role::User,
        coming: false,
    };
    store
        .set_document(model::USERS, username, Patch::from_record(&user)?)
        .await?;
    Ok(Outcome::Applied)
}

/// Removes an account. Items the user claimed keep their claims.
pub async fn delete_user<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    username: &str,
    confirmation: Confirmation,
) -> Result<Outcome, ActionError> {
    require(actor, MANAGERS, "delete users")?;
    if confirmation == Confirmation::Dismissed {
        return Ok(Outcome::Skipped(SkipReason::NotConfirmed));
    }
    if is_admin_record(store, username).await? {
        return Ok(Outcome::Skipped(SkipReason::ProtectedAccount));
    }

    store.delete_document(model::USERS, username).await?;
    Ok(Outcome::Applied)
}

async fn is_admin_record<S: DocumentStore>(store: &S, username: &str) -> Result<bool, StoreError> {
    let document = store.get_document(model::USERS, username).await?;
    Ok(document.is_some_and(|document| {
        document.get("role") == Some(&Value::from(Role::Admin.as_str()))
    }))
}

pub async fn create_item<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    name: &str,
    details: &str,
    max: &str,
) -> Result<Outcome, ActionError> {
    require(actor, MANAGERS, "create items")?;
    if name.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::MissingField));
    }

    let item = Item {
        id: String::new(),
        name: name.to_string(),
        details: details.to_string(),
        max: model::coerce_max(max),
        claimed_by: Vec::new(),
    };
    store
        .add_document(model::ITEMS, Patch::from_record(&item)?)
        .await?;
    Ok(Outcome::Applied)
}

async fn load_item<S: DocumentStore>(store: &S, id: &str) -> Result<Item, ActionError> {
    let document = store
        .get_document(model::ITEMS, id)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            collection: model::ITEMS.to_string(),
            id: id.to_string(),
        })?;
    Item::from_document(&document).map_err(|source| ActionError::Corrupt {
        id: id.to_string(),
        source,
    })
}

/// Takes one slot of an item for the acting user.
///
/// The capacity check runs against a fresh read of the item, but the check
/// and the set-union write are separate store calls: two claims racing for
/// the last slot can both pass the check.
pub async fn claim_item<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    item_id: &str,
) -> Result<Outcome, ActionError> {
    require(actor, GUESTS, "claim items")?;
    let item = load_item(store, item_id).await?;
    if item.is_claimed_by(&actor.username) {
        return Ok(Outcome::Skipped(SkipReason::AlreadyClaimed));
    }
    if item.is_full() {
        return Ok(Outcome::Skipped(SkipReason::Full));
    }

    store
        .update_fields(
            model::ITEMS,
            item_id,
            Patch::new().array_union("claimedBy", actor.username.as_str()),
        )
        .await?;
    Ok(Outcome::Applied)
}

pub async fn return_item<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    item_id: &str,
) -> Result<Outcome, ActionError> {
    require(actor, GUESTS, "return items")?;
    let item = load_item(store, item_id).await?;
    if !item.is_claimed_by(&actor.username) {
        return Ok(Outcome::Skipped(SkipReason::NotClaimed));
    }

    store
        .update_fields(
            model::ITEMS,
            item_id,
            Patch::new().array_remove("claimedBy", actor.username.as_str()),
        )
        .await?;
    Ok(Outcome::Applied)
}

/// Overwrites name, details and capacity of an item. Claims are left alone
/// even when the new capacity is below the current claim count.
pub async fn save_edit<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    item_id: &str,
    name: &str,
    details: &str,
    max: &str,
) -> Result<Outcome, ActionError> {
    require(actor, ADMINS, "edit items")?;
    let patch = Patch::new()
        .set("name", name)
        .set("details", details)
        .set("max", model::coerce_max(max));
    store.update_fields(model::ITEMS, item_id, patch).await?;
    Ok(Outcome::Applied)
}

pub async fn delete_item<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    item_id: &str,
    confirmation: Confirmation,
) -> Result<Outcome, ActionError> {
    require(actor, MANAGERS, "delete items")?;
    if confirmation == Confirmation::Dismissed {
        return Ok(Outcome::Skipped(SkipReason::NotConfirmed));
    }
    store.delete_document(model::ITEMS, item_id).await?;
    Ok(Outcome::Applied)
}

pub async fn save_details<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    text: &str,
) -> Result<Outcome, ActionError> {
    require(actor, ADMINS, "edit event details")?;
    store
        .set_document(
            model::CONFIG,
            model::EVENT_CONFIG_ID,
            Patch::new().set("details", text),
        )
        .await?;
    Ok(Outcome::Applied)
}

pub async fn send_message<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    text: &str,
) -> Result<Outcome, ActionError> {
    if text.trim().is_empty() {
        return Ok(Outcome::Skipped(SkipReason::MissingField));
    }
    let record = Patch::new()
        .set("user", actor.username.as_str())
        .set("text", text)
        .server_timestamp("timestamp");
    store.add_document(model::MESSAGES, record).await?;
    Ok(Outcome::Applied)
}

pub async fn delete_message<S: DocumentStore>(
    store: &S,
    actor: &CurrentUser,
    message_id: &str,
    confirmation: Confirmation,
) -> Result<Outcome, ActionError> {
    require(actor, ADMINS, "delete messages")?;
    if confirmation == Confirmation::Dismissed {
        return Ok(Outcome::Skipped(SkipReason::NotConfirmed));
    }
    store.delete_document(model::MESSAGES, message_id).await?;
    Ok(Outcome::Applied)
}
