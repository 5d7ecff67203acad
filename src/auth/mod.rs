//! Authentication use cases: register, login and admin lookup.
//!
//! Flow Overview:
//! 1) `register` hashes the password off the async runtime and stores the user.
//! 2) `login` resolves the app, then the user, verifies the password and mints
//!    a token signed with the app secret.
//! 3) `is_admin` reads the admin flag.
//!
//! Storage outcomes are translated into [`Error`]. An unknown user is reported
//! as [`Error::InvalidCredentials`] and still pays for one password verify, so
//! callers cannot tell which emails are registered.
//!
//! Storage, hashing and token signing are all supplied by the caller.

mod error;
mod hasher;
mod storage;
mod token;

#[cfg(test)]
mod tests;

pub use self::error::{Error, ErrorKind, HashError, StorageError, TokenError};
pub use self::hasher::{Argon2Hasher, CredentialHasher};
pub use self::storage::{App, AppProvider, User, UserProvider, UserSaver};
pub use self::token::{JwtIssuer, TokenClaims, TokenHeader, TokenIssuer};

use anyhow::Context;
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

const LOGIN: &str = "auth.login";
const REGISTER: &str = "auth.register";
const IS_ADMIN: &str = "auth.is_admin";

/// Plaintext behind the hash verified for unknown emails.
const DUMMY_PASSWORD: &str = "sso-dummy-password";

pub struct Auth {
    user_saver: Arc<dyn UserSaver>,
    user_provider: Arc<dyn UserProvider>,
    app_provider: Arc<dyn AppProvider>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    token_ttl: Duration,
    dummy_hash: OnceCell<Vec<u8>>,
}

impl Auth {
    #[must_use]
    pub fn new(
        user_saver: Arc<dyn UserSaver>,
        user_provider: Arc<dyn UserProvider>,
        app_provider: Arc<dyn AppProvider>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            user_saver,
            user_provider,
            app_provider,
            hasher,
            tokens,
            token_ttl,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Check the credentials and return a token scoped to `app_id`.
    ///
    /// # Errors
    /// - [`Error::InvalidAppId`] if the app is not registered.
    /// - [`Error::InvalidCredentials`] if the email is unknown or the password is wrong.
    /// - [`Error::Internal`] on storage, hashing or signing failures.
    #[instrument(skip(self, password), fields(op = LOGIN))]
    pub async fn login(&self, email: &str, password: &str, app_id: i32) -> Result<String, Error> {
        info!("attempting to login user");

        let app = match self.app_provider.app(app_id).await {
            Ok(app) => app,
            Err(StorageError::AppNotFound) => {
                warn!("app not found");
                return Err(Error::InvalidAppId { op: LOGIN });
            }
            Err(err) => {
                error!("failed to get app: {err:#}");
                return Err(Error::internal(LOGIN, err));
            }
        };

        let user = match self.user_provider.user(email).await {
            Ok(user) => user,
            Err(StorageError::UserNotFound) => {
                warn!("user not found");
                self.verify_dummy(password).await;
                return Err(Error::InvalidCredentials { op: LOGIN });
            }
            Err(err) => {
                error!("failed to get user: {err:#}");
                return Err(Error::internal(LOGIN, err));
            }
        };

        let hasher = Arc::clone(&self.hasher);
        let pass_hash = user.pass_hash.clone();
        let password = password.to_owned();
        let matched = blocking(move || hasher.verify(&pass_hash, &password))
            .await
            .map_err(|err| {
                error!("failed to verify password: {err:#}");
                Error::internal(LOGIN, err)
            })?;

        if !matched {
            info!("invalid credentials");
            return Err(Error::InvalidCredentials { op: LOGIN });
        }

        let token = self
            .tokens
            .issue(&user, &app, self.token_ttl)
            .map_err(|err| {
                error!("failed to generate token: {err}");
                Error::internal(LOGIN, err)
            })?;

        info!(user_id = user.id, "user logged in successfully");

        Ok(token)
    }

    /// Create a user and return its id.
    ///
    /// # Errors
    /// - [`Error::UserAlreadyExists`] if the email is taken.
    /// - [`Error::Internal`] on hashing or storage failures.
    #[instrument(skip(self, password), fields(op = REGISTER))]
    pub async fn register(&self, email: &str, password: &str) -> Result<i64, Error> {
        info!("registering user");

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let pass_hash = blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| {
                error!("failed to generate password hash: {err:#}");
                Error::internal(REGISTER, err)
            })?;

        let user_id = match self.user_saver.save_user(email, &pass_hash).await {
            Ok(id) => id,
            Err(StorageError::UserExists) => {
                warn!("user already exists");
                return Err(Error::UserAlreadyExists { op: REGISTER });
            }
            Err(err) => {
                error!("failed to save user: {err:#}");
                return Err(Error::internal(REGISTER, err));
            }
        };

        info!(user_id, "user registered");

        Ok(user_id)
    }

    /// Report whether the user holds the admin role.
    ///
    /// # Errors
    /// - [`Error::InvalidCredentials`] if the user does not exist.
    /// - [`Error::Internal`] on storage failures.
    #[instrument(skip(self), fields(op = IS_ADMIN))]
    pub async fn is_admin(&self, user_id: i64) -> Result<bool, Error> {
        info!("checking if user is admin");

        let is_admin = match self.user_provider.is_admin(user_id).await {
            Ok(is_admin) => is_admin,
            Err(StorageError::UserNotFound) => {
                warn!("user not found");
                return Err(Error::InvalidCredentials { op: IS_ADMIN });
            }
            Err(err) => {
                error!("failed to check if user is admin: {err:#}");
                return Err(Error::internal(IS_ADMIN, err));
            }
        };

        info!(is_admin, "checked if user is admin");

        Ok(is_admin)
    }

    /// Spend one verify on a throwaway hash so an unknown email costs as much
    /// as a wrong password. Failures are logged and otherwise ignored.
    async fn verify_dummy(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| {
                let hasher = Arc::clone(&self.hasher);
                blocking(move || hasher.hash(DUMMY_PASSWORD))
            })
            .await;

        let dummy = match dummy {
            Ok(dummy) => dummy.clone(),
            Err(err) => {
                warn!("failed to prepare dummy hash: {err:#}");
                return;
            }
        };

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        if let Err(err) = blocking(move || hasher.verify(&dummy, &password)).await {
            warn!("failed to verify dummy hash: {err:#}");
        }
    }
}

/// Run a hashing job on the blocking pool.
async fn blocking<T, F>(job: F) -> anyhow::Result<T>
where
    F: FnOnce() -> Result<T, HashError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(job)
        .await
        .context("hashing task did not complete")?;

    Ok(result?)
}
