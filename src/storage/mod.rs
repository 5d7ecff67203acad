//! Storage backends for the auth service.
//!
//! The DSN scheme picks the backend:
//! - `postgres://` / `postgresql://` → [`PgStore`]
//! - `memory://` → [`MemoryStore`]

mod memory;
mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

use crate::auth::{App, Auth, CredentialHasher, JwtIssuer};
use anyhow::{anyhow, Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug, Clone)]
pub enum Store {
    Postgres(Arc<PgStore>),
    Memory(Arc<MemoryStore>),
}

impl Store {
    /// Open the backend named by `dsn`.
    ///
    /// # Errors
    /// Returns an error if the DSN is malformed, the scheme is unsupported, or
    /// the database is unreachable.
    pub async fn open(dsn: &str, max_connections: u32) -> Result<Self> {
        let url = Url::parse(dsn).context("invalid DSN")?;

        match url.scheme() {
            "postgres" | "postgresql" => {
                info!("Connecting to {}", redact_dsn(dsn));
                let store = PgStore::connect(dsn, max_connections).await?;
                Ok(Self::Postgres(Arc::new(store)))
            }
            "memory" => {
                info!("Using in-memory storage, data will not survive a restart");
                Ok(Self::Memory(Arc::new(MemoryStore::new())))
            }
            scheme => Err(anyhow!("unsupported DSN scheme: {scheme}")),
        }
    }

    /// Register the given client applications, replacing existing ones with the same id.
    ///
    /// # Errors
    /// Returns an error if the backend rejects an app.
    pub async fn seed_apps(&self, apps: &[App]) -> Result<()> {
        for app in apps {
            match self {
                Self::Postgres(store) => store.upsert_app(app).await?,
                Self::Memory(store) => store.insert_app(app.clone()).await,
            }
            info!(app_id = app.id, app_name = %app.name, "registered app");
        }

        Ok(())
    }

    /// Wire an [`Auth`] service on top of this backend, signing HS256 tokens.
    #[must_use]
    pub fn auth(&self, hasher: Arc<dyn CredentialHasher>, token_ttl: Duration) -> Auth {
        let tokens = Arc::new(JwtIssuer);
        match self {
            Self::Postgres(store) => Auth::new(
                store.clone(),
                store.clone(),
                store.clone(),
                hasher,
                tokens,
                token_ttl,
            ),
            Self::Memory(store) => Auth::new(
                store.clone(),
                store.clone(),
                store.clone(),
                hasher,
                tokens,
                token_ttl,
            ),
        }
    }
}

/// Render a DSN with its password masked.
pub(crate) fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}
