//! Initial event data loaded from a TOML file at startup.
//!
//! ```toml
//! [event]
//! details = "Garden party, Saturday from 4pm"
//!
//! [[users]]
//! username = "admin"
//! password = "change-me"
//! role = "admin"
//!
//! [[items]]
//! name = "Cake"
//! max = 2
//! ```
//!
//! Passwords are hashed before they reach the store. Users are upserted by
//! username; items are always added as new documents.

use crate::auth::{self, AuthError};
use crate::model::{self, Item, Role, User};
use crate::ports::{DocumentStore, Patch, StoreError};

use serde::Deserialize;

use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub event: Option<SeedEvent>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEvent {
    pub details: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub coming: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedItem {
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub claimed_by: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid seed entry: {0}")]
    Invalid(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub items: usize,
    pub event: bool,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, SeedError> {
        let seed: SeedFile = toml::from_str(raw)?;
        seed.validate()?;
        Ok(seed)
    }

    fn validate(&self) -> Result<(), SeedError> {
        for user in &self.users {
            if user.username.trim().is_empty() || user.password.is_empty() {
                return Err(SeedError::Invalid(
                    "users need a username and a password".to_string(),
                ));
            }
        }
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(SeedError::Invalid("items need a name".to_string()));
            }
            let unique: HashSet<&str> = item.claimed_by.iter().map(String::as_str).collect();
            if unique.len() != item.claimed_by.len() {
                return Err(SeedError::Invalid(format!(
                    "item '{}' lists a claimer twice",
                    item.name
                )));
            }
            if item.max > 0 && item.claimed_by.len() > item.max as usize {
                return Err(SeedError::Invalid(format!(
                    "item '{}' has more claims than its max of {}",
                    item.name, item.max
                )));
            }
        }
        Ok(())
    }
}

pub async fn apply<S: DocumentStore>(store: &S, seed: &SeedFile) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    if let Some(event) = &seed.event {
        store
            .set_document(
                model::CONFIG,
                model::EVENT_CONFIG_ID,
                Patch::new().set("details", event.details.as_str()),
            )
            .await?;
        summary.event = true;
    }

    for seed_user in &seed.users {
        let username = seed_user.username.trim();
        let user = User {
            username: username.to_string(),
            password_hash: auth::hash_password(&seed_user.password)?,
            role: seed_user.role,
            coming: seed_user.coming,
        };
        store
            .set_document(model::USERS, username, Patch::from_record(&user)?)
            .await?;
        summary.users += 1;
    }

    for seed_item in &seed.items {
        let item = Item {
            id: String::new(),
            name: seed_item.name.clone(),
            details: seed_item.details.clone(),
            max: seed_item.max,
            claimed_by: seed_item.claimed_by.clone(),
        };
        store
            .add_document(model::ITEMS, Patch::from_record(&item)?)
            .await?;
        summary.items += 1;
    }

    Ok(summary)
}
