//! Collaborators the mining session and account pipeline depend on.
//!
//! Authentication and persistence are external services; this crate only
//! fixes their request/response contracts. Implementations are injected so
//! tests can substitute fakes.

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::errors::{AuthError, ServiceError};
use crate::types::{SortDirection, User};

/// Field map stored under one document id
pub type Document = Map<String, Value>;

/// Document-database contract.
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when no document exists under `id`
    fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, ServiceError>> + Send;

    /// Creates or replaces the document under `id`
    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Merges `fields` into an existing document; fails if it is absent
    fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Stores `fields` under a generated id and returns that id
    fn add_document(
        &self,
        collection: &str,
        fields: Document,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Up to `limit` `(id, fields)` pairs ordered by `field`
    fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<(String, Document)>, ServiceError>> + Send;
}

/// Authentication-service contract.
pub trait AuthService: Send + Sync {
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn sign_out(&self, uid: &str) -> impl Future<Output = ()> + Send;

    /// Stream of the current user, updated whenever auth status changes
    fn on_auth_state_changed(&self) -> watch::Receiver<Option<User>>;
}

pub trait Clock: Send + Sync {
    /// Milliseconds since the unix epoch
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Non-blocking message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Discards every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Serializes `value` into a document field map.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, ServiceError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::Malformed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}
