//! # SSO (single sign-on authentication service)
//!
//! `sso` exposes three gRPC operations: `Register`, `Login` and `IsAdmin`.
//!
//! ## Authentication
//!
//! Passwords are hashed with **Argon2id** and stored as PHC strings. `Login`
//! issues an HS256 JWT signed with the secret of the requesting application, so
//! a token is only accepted by the app it was minted for. Tokens are stateless
//! and never stored.
//!
//! An unknown email and a wrong password produce the same error at roughly the
//! same cost, and `IsAdmin` on an unknown id fails like a backend error, so
//! callers cannot tell which accounts exist. Emails are trimmed and lowercased.
//!
//! ## Storage
//!
//! The `--dsn` scheme selects the backend: `postgres://` for Postgres (schema in
//! `sql/schema.sql`) or `memory://` for a process-local store.

pub mod auth;
pub mod cli;
pub mod grpc;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
