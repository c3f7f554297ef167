use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GITHUB_CLIENT_ID: &str = "github-client-id";
pub const ARG_GITHUB_CLIENT_SECRET: &str = "github-client-secret";
pub const ARG_GITHUB_REDIRECT_URL: &str = "github-redirect-url";

#[derive(Debug, Clone)]
pub struct GithubOptions {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// `None` unless both the client id and secret are set.
    pub github: Option<GithubOptions>,
}

impl Options {
    /// Parse SSO provider arguments from matches.
    ///
    /// # Errors
    /// Never fails today; kept fallible like the other option groups.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let github = match (read(ARG_GITHUB_CLIENT_ID), read(ARG_GITHUB_CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => Some(GithubOptions {
                client_id,
                client_secret: SecretString::from(client_secret),
                redirect_url: read(ARG_GITHUB_REDIRECT_URL).unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self { github })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_ID)
                .long(ARG_GITHUB_CLIENT_ID)
                .help("GitHub OAuth app client id")
                .env("SYNTHESIZER_GITHUB_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_SECRET)
                .long(ARG_GITHUB_CLIENT_SECRET)
                .help("GitHub OAuth app client secret")
                .env("SYNTHESIZER_GITHUB_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GITHUB_REDIRECT_URL)
                .long(ARG_GITHUB_REDIRECT_URL)
                .help("Redirect URL registered with the GitHub OAuth app")
                .env("SYNTHESIZER_GITHUB_REDIRECT_URL"),
        )
}
