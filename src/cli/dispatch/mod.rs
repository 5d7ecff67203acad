//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{self, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(44044);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty())
        .context("missing required argument: --dsn")?;
    let request_timeout = matches
        .get_one::<u64>(commands::ARG_REQUEST_TIMEOUT_SECONDS)
        .copied()
        .map_or(Duration::from_secs(10), Duration::from_secs);
    let max_connections = matches
        .get_one::<u32>(commands::ARG_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        request_timeout,
        max_connections,
        token_ttl: auth_opts.token_ttl,
        apps: auth_opts.apps,
        hash: auth_opts.hash,
    }))
}
