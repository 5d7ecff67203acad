use crate::auth::App;
use anyhow::{bail, Context};
use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_APP: &str = "app";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_PARALLELISM: &str = "hash-parallelism";

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashOptions {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub token_ttl: Duration,
    pub apps: Vec<App>,
    pub hash: HashOptions,
}

impl Options {
    /// Parse token, app and hashing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the token TTL is zero or an app id is seeded twice.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let ttl_seconds = matches
            .get_one::<u64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .context("missing required argument: --token-ttl-seconds")?;
        if ttl_seconds == 0 {
            bail!("--{ARG_TOKEN_TTL_SECONDS} must be greater than zero");
        }

        let apps: Vec<App> = matches
            .get_many::<App>(ARG_APP)
            .map(|apps| apps.cloned().collect())
            .unwrap_or_default();
        for (index, app) in apps.iter().enumerate() {
            if apps[..index].iter().any(|other| other.id == app.id) {
                bail!("app id {} is configured more than once", app.id);
            }
        }

        let get_u32 = |id: &str| matches.get_one::<u32>(id).copied().unwrap_or_default();

        Ok(Self {
            token_ttl: Duration::from_secs(ttl_seconds),
            apps,
            hash: HashOptions {
                memory_kib: get_u32(ARG_HASH_MEMORY_KIB),
                iterations: get_u32(ARG_HASH_ITERATIONS),
                parallelism: get_u32(ARG_HASH_PARALLELISM),
            },
        })
    }
}

/// Parse an `ID:NAME:SECRET` app definition. The secret may contain `:`.
#[must_use]
pub fn app_parser() -> ValueParser {
    ValueParser::from(|value: &str| -> Result<App, String> {
        let mut parts = value.trim().splitn(3, ':');
        let (Some(id), Some(name), Some(secret)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err("expected ID:NAME:SECRET".to_string());
        };

        let id = id
            .parse::<i32>()
            .map_err(|e| format!("invalid app id '{id}': {e}"))?;
        if id == 0 {
            return Err("app id must not be zero".to_string());
        }
        if name.is_empty() {
            return Err("app name must not be empty".to_string());
        }
        if secret.is_empty() {
            return Err("app secret must not be empty".to_string());
        }

        Ok(App {
            id,
            name: name.to_string(),
            secret: SecretString::from(secret.to_string()),
        })
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Lifetime of issued tokens in seconds")
                .env("SSO_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_APP)
                .long(ARG_APP)
                .help("Client application to register at startup, as ID:NAME:SECRET")
                .long_help(
                    "Client application to register at startup, as ID:NAME:SECRET.\n\nRepeat the flag for several apps. SSO_APPS takes a comma separated list. Existing apps with the same id are replaced.",
                )
                .env("SSO_APPS")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .value_parser(app_parser()),
        );

    with_hash_args(command)
}

fn with_hash_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long(ARG_HASH_MEMORY_KIB)
                .help("Argon2 memory cost in KiB")
                .env("SSO_HASH_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("Argon2 iterations")
                .env("SSO_HASH_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_PARALLELISM)
                .long(ARG_HASH_PARALLELISM)
                .help("Argon2 lanes")
                .env("SSO_HASH_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
}
