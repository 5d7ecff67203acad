//! Process-local storage.
//!
//! Used with `--dsn memory://` for development and by the test suites. Data
//! is lost on restart.

use crate::auth::{App, AppProvider, StorageError, User, UserProvider, UserSaver};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, User>,
    emails: HashMap<i64, String>,
    apps: HashMap<i32, App>,
    last_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a client application.
    pub async fn insert_app(&self, app: App) {
        let mut inner = self.inner.write().await;
        inner.apps.insert(app.id, app);
    }

    /// Grant or revoke the admin role.
    ///
    /// # Errors
    /// [`StorageError::UserNotFound`] if no user has this id.
    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;

        let email = inner
            .emails
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::UserNotFound)?;

        let user = inner
            .users
            .get_mut(&email)
            .ok_or(StorageError::UserNotFound)?;
        user.is_admin = is_admin;

        Ok(())
    }
}

#[async_trait]
impl UserSaver for MemoryStore {
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64, StorageError> {
        // uniqueness check and insert happen under one write lock
        let mut inner = self.inner.write().await;

        if inner.users.contains_key(email) {
            return Err(StorageError::UserExists);
        }

        inner.last_id += 1;
        let id = inner.last_id;

        inner.users.insert(
            email.to_string(),
            User {
                id,
                email: email.to_string(),
                pass_hash: pass_hash.to_vec(),
                is_admin: false,
            },
        );
        inner.emails.insert(id, email.to_string());

        Ok(id)
    }
}

#[async_trait]
impl UserProvider for MemoryStore {
    async fn user(&self, email: &str) -> Result<User, StorageError> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(email)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }

    async fn is_admin(&self, user_id: i64) -> Result<bool, StorageError> {
        let inner = self.inner.read().await;
        inner
            .emails
            .get(&user_id)
            .and_then(|email| inner.users.get(email))
            .map(|user| user.is_admin)
            .ok_or(StorageError::UserNotFound)
    }
}

#[async_trait]
impl AppProvider for MemoryStore {
    async fn app(&self, app_id: i32) -> Result<App, StorageError> {
        let inner = self.inner.read().await;
        inner
            .apps
            .get(&app_id)
            .cloned()
            .ok_or(StorageError::AppNotFound)
    }
}
