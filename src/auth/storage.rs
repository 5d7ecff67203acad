//! Storage capabilities the auth service depends on.
//!
//! Backends implement whichever traits they can serve; the service only sees
//! the trait objects, so tests can swap in fakes.

use super::error::StorageError;
use async_trait::async_trait;
use secrecy::SecretString;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub pass_hash: Vec<u8>,
    pub is_admin: bool,
}

// keep the password hash out of logs
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("pass_hash", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// A client application tokens are issued for.
#[derive(Debug, Clone)]
pub struct App {
    pub id: i32,
    pub name: String,
    pub secret: SecretString,
}

#[async_trait]
pub trait UserSaver: Send + Sync {
    /// Persist a new user and return its id.
    ///
    /// # Errors
    /// [`StorageError::UserExists`] when the email is taken.
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64, StorageError>;
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    /// # Errors
    /// [`StorageError::UserNotFound`] when no user has this email.
    async fn user(&self, email: &str) -> Result<User, StorageError>;

    /// # Errors
    /// [`StorageError::UserNotFound`] when no user has this id.
    async fn is_admin(&self, user_id: i64) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait AppProvider: Send + Sync {
    /// # Errors
    /// [`StorageError::AppNotFound`] when the app is not registered.
    async fn app(&self, app_id: i32) -> Result<App, StorageError>;
}
