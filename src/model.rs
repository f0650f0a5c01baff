use crate::ports::{Document, Fields};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

pub const USERS: &str = "users";
pub const ITEMS: &str = "items";
pub const CONFIG: &str = "config";
pub const MESSAGES: &str = "messages";
pub const EVENT_CONFIG_ID: &str = "event";

/// Account name hidden from guest lists.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Creator,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Creator => "creator",
            Role::User => "user",
        }
    }

    pub fn manages_event(self) -> bool {
        matches!(self, Role::Admin | Role::Creator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub coming: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub claimed_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Available,
    Claimed,
    Full,
}

impl ClaimState {
    pub fn label(self) -> &'static str {
        match self {
            ClaimState::Available => "Claim",
            ClaimState::Claimed => "Claimed",
            ClaimState::Full => "Full",
        }
    }
}

impl Item {
    pub fn is_claimed_by(&self, username: &str) -> bool {
        self.claimed_by.iter().any(|claimer| claimer == username)
    }

    pub fn is_full(&self) -> bool {
        self.max > 0 && self.claimed_by.len() >= self.max as usize
    }

    pub fn claim_state(&self, username: &str) -> ClaimState {
        if self.is_claimed_by(username) {
            ClaimState::Claimed
        } else if self.is_full() {
            ClaimState::Full
        } else {
            ClaimState::Available
        }
    }

    pub fn capacity_label(&self) -> String {
        if self.max > 0 {
            format!("{}/{}", self.claimed_by.len(), self.max)
        } else {
            format!("{}/∞", self.claimed_by.len())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(skip)]
    pub id: String,
    pub user: String,
    pub text: String,
    /// Unix nanoseconds assigned by the store.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Message {
    pub fn posted_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.timestamp?)).ok()
    }

    pub fn posted_at_label(&self) -> String {
        let format = format_description!("[day].[month].[year] [hour]:[minute]");
        self.posted_at()
            .and_then(|at| at.format(&format).ok())
            .unwrap_or_default()
    }

    /// Machine-readable posting time; browsers turn it into local time.
    pub fn posted_at_iso(&self) -> String {
        self.posted_at()
            .and_then(|at| at.format(&Rfc3339).ok())
            .unwrap_or_default()
    }
}

/// Typed view of a stored document; the document id fills the key field.
pub trait FromDocument: Sized {
    fn from_document(document: &Document) -> Result<Self, serde_json::Error>;
}

fn decode<T: DeserializeOwned>(fields: &Fields) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields.clone()))
}

impl FromDocument for User {
    fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        let mut user: User = decode(&document.fields)?;
        user.username = document.id.clone();
        Ok(user)
    }
}

impl FromDocument for Item {
    fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        let mut item: Item = decode(&document.fields)?;
        item.id = document.id.clone();
        Ok(item)
    }
}

impl FromDocument for EventConfig {
    fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        decode(&document.fields)
    }
}

impl FromDocument for Message {
    fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        let mut message: Message = decode(&document.fields)?;
        message.id = document.id.clone();
        Ok(message)
    }
}

/// Coerces free-form capacity input to a non-negative integer. Anything that
/// is not a positive finite number becomes 0 (unlimited).
pub fn coerce_max(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 1.0 => {
            if value >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                value.trunc() as u32
            }
        }
        _ => 0,
    }
}
