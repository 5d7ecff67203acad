use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept either a `-v` count or a level name from `SSO_LOG_LEVEL`.
#[must_use]
pub fn log_level_parser() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        if let Ok(count) = level.parse::<u8>() {
            if usize::from(count) < LEVELS.len() {
                return Ok(count);
            }
        }

        LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level: {level}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("SSO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(log_level_parser()),
    )
}
