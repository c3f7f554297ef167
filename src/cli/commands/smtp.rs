use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

#[derive(Debug, Clone)]
pub struct Options {
    /// Empty means emails are only logged.
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
}

impl Options {
    /// Parse SMTP arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a host is set without a sender address.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = read(ARG_SMTP_HOST);
        let from = read(ARG_SMTP_FROM).unwrap_or_default();
        if host.is_some() && from.is_empty() {
            return Err(anyhow!("missing required argument: --{ARG_SMTP_FROM}"));
        }

        Ok(Self {
            host,
            port: matches.get_one::<u16>(ARG_SMTP_PORT).copied().unwrap_or(587),
            username: read(ARG_SMTP_USERNAME),
            password: read(ARG_SMTP_PASSWORD).map(SecretString::from),
            from,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host (emails are only logged when unset)")
                .env("SYNTHESIZER_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("SYNTHESIZER_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("SYNTHESIZER_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("SYNTHESIZER_SMTP_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("Sender address, e.g. \"Synthesizer <noreply@synthesizer.dev>\"")
                .env("SYNTHESIZER_SMTP_FROM"),
        )
}
