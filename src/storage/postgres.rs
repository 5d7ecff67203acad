//! Postgres storage backed by `sqlx`.
//!
//! Schema lives in `sql/schema.sql`. Email uniqueness is enforced by the
//! `users.email` unique constraint, so concurrent registrations for the same
//! address have a single winner.

use crate::auth::{App, AppProvider, StorageError, User, UserProvider, UserSaver};
use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Insert or update a client application.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    pub async fn upsert_app(&self, app: &App) -> Result<()> {
        let query = r"
            INSERT INTO apps (id, name, secret)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, secret = EXCLUDED.secret
        ";
        sqlx::query(query)
            .bind(app.id)
            .bind(&app.name)
            .bind(app.secret.expose_secret())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .with_context(|| format!("failed to upsert app {}", app.id))?;

        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserSaver for PgStore {
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64, StorageError> {
        let query = "INSERT INTO users (email, pass_hash) VALUES ($1, $2) RETURNING id";
        let row = sqlx::query(query)
            .bind(email)
            .bind(pass_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(row.get("id")),
            Err(err) if is_unique_violation(&err) => Err(StorageError::UserExists),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }
}

#[async_trait]
impl UserProvider for PgStore {
    async fn user(&self, email: &str) -> Result<User, StorageError> {
        let query = "SELECT id, email, pass_hash, is_admin FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user")?
            .ok_or(StorageError::UserNotFound)?;

        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            pass_hash: row.get("pass_hash"),
            is_admin: row.get("is_admin"),
        })
    }

    async fn is_admin(&self, user_id: i64) -> Result<bool, StorageError> {
        let query = "SELECT is_admin FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup admin flag")?
            .ok_or(StorageError::UserNotFound)?;

        Ok(row.get("is_admin"))
    }
}

#[async_trait]
impl AppProvider for PgStore {
    async fn app(&self, app_id: i32) -> Result<App, StorageError> {
        let query = "SELECT id, name, secret FROM apps WHERE id = $1";
        let row = sqlx::query(query)
            .bind(app_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup app")?
            .ok_or(StorageError::AppNotFound)?;

        Ok(App {
            id: row.get("id"),
            name: row.get("name"),
            secret: SecretString::from(row.get::<String, _>("secret")),
        })
    }
}
