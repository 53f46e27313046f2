//! User directory backed by the `users` collection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::{DirectoryError, ValidationError};
use crate::services::{Clock, DocumentStore};
use crate::session::{USERS_COLLECTION, fields};
use crate::types::SortDirection;
use crate::validation::validate_email;

pub const MAX_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirectoryEntry {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

pub struct Directory<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> Directory<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Directory { store, clock }
    }

    /// Newest entries first. `limit` is clamped to `[1, MAX_LIST_LIMIT]`.
    pub async fn list(&self, limit: usize) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        let docs = self
            .store
            .query_ordered(USERS_COLLECTION, "createdAt", SortDirection::Desc, limit)
            .await?;

        Ok(docs
            .into_iter()
            .filter_map(|(id, doc)| {
                match serde_json::from_value::<DirectoryEntry>(Value::Object(doc)) {
                    Ok(entry) => Some(DirectoryEntry { id, ..entry }),
                    Err(err) => {
                        tracing::warn!("Skipping malformed directory entry {}: {}", id, err);
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<DirectoryEntry>, DirectoryError> {
        let Some(doc) = self.store.get_document(USERS_COLLECTION, id).await? else {
            return Ok(None);
        };
        let entry = serde_json::from_value::<DirectoryEntry>(Value::Object(doc))
            .map_err(crate::errors::ServiceError::from)?;
        Ok(Some(DirectoryEntry {
            id: id.to_string(),
            ..entry
        }))
    }

    pub async fn add(&self, new: NewDirectoryEntry) -> Result<DirectoryEntry, DirectoryError> {
        validate_email(&new.email)?;

        let entry = DirectoryEntry {
            id: String::new(),
            email: new.email.trim().to_string(),
            display_name: normalize_name(new.display_name),
            created_at: self.clock.now_millis(),
        };
        let doc = fields(json!({
            "email": entry.email,
            "displayName": entry.display_name,
            "createdAt": entry.created_at,
        }));
        let id = self.store.add_document(USERS_COLLECTION, doc).await?;

        tracing::info!("Added directory entry {} for {}", id, entry.email);
        Ok(DirectoryEntry { id, ..entry })
    }

    pub async fn update(&self, id: &str, update: DirectoryUpdate) -> Result<(), DirectoryError> {
        let mut changes = serde_json::Map::new();
        if let Some(email) = update.email {
            validate_email(&email)?;
            changes.insert("email".to_string(), Value::String(email.trim().to_string()));
        }
        if update.display_name.is_some() {
            let name = normalize_name(update.display_name);
            changes.insert("displayName".to_string(), json!(name));
        }
        if changes.is_empty() {
            return Err(ValidationError::MissingField("Email or display name").into());
        }

        self.store
            .update_document(USERS_COLLECTION, id, changes)
            .await?;
        tracing::info!("Updated directory entry {}", id);
        Ok(())
    }
}
