//! Registration and login pipeline: validate, authenticate, then persist
//! the profile document.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::errors::{AccountError, ServiceError};
use crate::services::{AuthService, Clock, Document, DocumentStore, to_document};
use crate::session::{USERS_COLLECTION, fields};
use crate::state::SessionSnapshot;
use crate::types::User;
use crate::validation::{LoginForm, RegistrationForm};

pub const REGISTER_SUCCESS: &str = "Registration successful! Welcome to QuantumMine.";
pub const LOGIN_SUCCESS: &str = "Login successful! Redirecting...";

pub struct AccountService<A, S> {
    auth: A,
    store: S,
    clock: Arc<dyn Clock>,
}

impl<A: AuthService, S: DocumentStore> AccountService<A, S> {
    pub fn new(auth: A, store: S, clock: Arc<dyn Clock>) -> Self {
        AccountService { auth, store, clock }
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Registers a new account and writes its profile with default
    /// session fields. A failed profile write does not fail registration.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, AccountError> {
        form.validate()?;
        let user = self.auth.register(&form.email, &form.password).await?;

        let now = self.clock.now_millis();
        let snapshot = SessionSnapshot {
            last_updated: now,
            ..SessionSnapshot::default()
        };
        let mut profile = session_fields(&user.uid, &snapshot);
        profile.extend(fields(json!({
            "email": user.email,
            "createdAt": now,
        })));

        if let Err(err) = self
            .store
            .set_document(USERS_COLLECTION, &user.uid, profile)
            .await
        {
            tracing::warn!("Failed to write profile for {}: {}", user.uid, err);
        }

        tracing::info!("Registered {} as {}", user.email, user.uid);
        Ok(user)
    }

    /// Signs in and stamps `lastLogin` on the profile, recreating the
    /// profile if it went missing.
    pub async fn login(&self, form: &LoginForm) -> Result<User, AccountError> {
        form.validate()?;
        let user = self.auth.login(&form.email, &form.password).await?;

        let now = self.clock.now_millis();
        let result = self
            .store
            .update_document(USERS_COLLECTION, &user.uid, fields(json!({ "lastLogin": now })))
            .await;

        let result = match result {
            Err(ServiceError::NotFound { .. }) => {
                let profile = fields(json!({
                    "email": user.email,
                    "createdAt": now,
                    "lastLogin": now,
                }));
                self.store
                    .set_document(USERS_COLLECTION, &user.uid, profile)
                    .await
            }
            other => other,
        };
        if let Err(err) = result {
            tracing::warn!("Failed to stamp login for {}: {}", user.uid, err);
        }

        tracing::info!("{} logged in", user.email);
        Ok(user)
    }

    pub async fn sign_out(&self, uid: &str) {
        self.auth.sign_out(uid).await;
        tracing::info!("{} signed out", uid);
    }

    /// Most recent value of the auth-state stream
    pub fn current_user(&self) -> Option<User> {
        self.auth.on_auth_state_changed().borrow().clone()
    }
}

// Encoding failures leave the profile without session fields; the session
// fills them in on its first load.
fn session_fields<T: Serialize>(uid: &str, snapshot: &T) -> Document {
    match to_document(snapshot) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!("Failed to encode session fields for {}: {}", uid, err);
            Document::new()
        }
    }
}
