use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_APP_NAME: &str = "app-name";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_TTL_HOURS: &str = "jwt-ttl-hours";
pub const ARG_VERIFICATION_TOKEN_TTL_MINUTES: &str = "verification-token-ttl-minutes";
pub const ARG_EMAIL_VERIFICATION_URL: &str = "email-verification-url";
pub const ARG_PASSWORD_RESET_URL: &str = "password-reset-url";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[derive(Debug, Clone)]
pub struct Options {
    pub app_name: String,
    pub jwt_secret: SecretString,
    pub jwt_ttl_hours: u32,
    pub verification_token_ttl_minutes: u32,
    pub email_verification_url: String,
    pub password_reset_url: String,
    pub cors_origin: Option<String>,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or blank.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read_required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };
        let read_u32 = |id: &str| -> Result<u32> {
            matches
                .get_one::<u32>(id)
                .copied()
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            app_name: read_required(ARG_APP_NAME)?,
            jwt_secret: SecretString::from(read_required(ARG_JWT_SECRET)?),
            jwt_ttl_hours: read_u32(ARG_JWT_TTL_HOURS)?,
            verification_token_ttl_minutes: read_u32(ARG_VERIFICATION_TOKEN_TTL_MINUTES)?,
            email_verification_url: read_required(ARG_EMAIL_VERIFICATION_URL)?,
            password_reset_url: read_required(ARG_PASSWORD_RESET_URL)?,
            cors_origin: matches
                .get_one::<String>(ARG_CORS_ORIGIN)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_NAME)
                .long(ARG_APP_NAME)
                .help("Application name, used as the JWT issuer")
                .env("SYNTHESIZER_APP_NAME")
                .default_value(env!("CARGO_PKG_NAME")),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HMAC secret used to sign bearer tokens")
                .env("SYNTHESIZER_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_TTL_HOURS)
                .long(ARG_JWT_TTL_HOURS)
                .help("Bearer token lifetime in hours")
                .env("SYNTHESIZER_JWT_TTL_HOURS")
                .default_value("24")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TOKEN_TTL_MINUTES)
                .long(ARG_VERIFICATION_TOKEN_TTL_MINUTES)
                .help("Email verification and password reset token lifetime in minutes")
                .env("SYNTHESIZER_VERIFICATION_TOKEN_TTL_MINUTES")
                .default_value("30")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_EMAIL_VERIFICATION_URL)
                .long(ARG_EMAIL_VERIFICATION_URL)
                .help("Verification link prefix; the token is appended")
                .env("SYNTHESIZER_EMAIL_VERIFICATION_URL")
                .default_value("http://localhost:3000/verify-email?token="),
        )
        .arg(
            Arg::new(ARG_PASSWORD_RESET_URL)
                .long(ARG_PASSWORD_RESET_URL)
                .help("Password reset link prefix; the token is appended")
                .env("SYNTHESIZER_PASSWORD_RESET_URL")
                .default_value("http://localhost:3000/reset-password?token="),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed CORS origin (any origin when unset)")
                .env("SYNTHESIZER_CORS_ORIGIN"),
        )
}
