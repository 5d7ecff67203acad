use crate::{
    auth::{App, Argon2Hasher},
    cli::{commands::auth::HashOptions, telemetry},
    grpc,
    storage::{redact_dsn, Store},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt::Write, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub request_timeout: Duration,
    pub max_connections: u32,
    pub token_ttl: Duration,
    pub apps: Vec<App>,
    pub hash: HashOptions,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the hashing parameters are invalid, storage cannot be
/// opened, the apps cannot be seeded, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let hasher = Argon2Hasher::new(
        args.hash.memory_kib,
        args.hash.iterations,
        args.hash.parallelism,
    )
    .context("Invalid password hashing parameters")?;

    let store = Store::open(args.dsn.expose_secret(), args.max_connections).await?;
    store
        .seed_apps(&args.apps)
        .await
        .context("Failed to register apps")?;

    let auth = Arc::new(store.auth(Arc::new(hasher), args.token_ttl));

    let listener = TcpListener::bind(format!("::0:{}", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;

    let result = grpc::serve(listener, auth, args.request_timeout, shutdown_signal()).await;

    telemetry::shutdown_tracer();

    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

fn log_startup_args(args: &Args) {
    let apps = if args.apps.is_empty() {
        "none".to_string()
    } else {
        args.apps
            .iter()
            .map(|app| format!("{}:{}", app.id, app.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let entries = [
        ("listen", format!("[::]:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("token_ttl", format!("{}s", args.token_ttl.as_secs())),
        (
            "request_timeout",
            format!("{}s", args.request_timeout.as_secs()),
        ),
        ("max_connections", args.max_connections.to_string()),
        (
            "argon2",
            format!(
                "m={},t={},p={}",
                args.hash.memory_kib, args.hash.iterations, args.hash.parallelism
            ),
        ),
        ("apps", apps),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "sso {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}:{padding} {value}");
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
