use crate::{
    api::{self, ServerConfig},
    auth::{sso::GithubConfig, AuthConfig, JwtConfig},
    cli::commands::sso::GithubOptions,
    email::SmtpConfig,
};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub app_name: String,
    pub jwt_secret: SecretString,
    pub jwt_ttl_hours: u32,
    pub verification_token_ttl_minutes: u32,
    pub email_verification_url: String,
    pub password_reset_url: String,
    pub cors_origin: Option<String>,
    pub github: Option<GithubOptions>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub smtp_from: String,
}

impl Args {
    fn into_server_config(self) -> ServerConfig {
        let jwt = JwtConfig::new(self.jwt_secret)
            .with_issuer(self.app_name)
            .with_ttl_hours(self.jwt_ttl_hours);

        let auth = AuthConfig::new()
            .with_email_verification_url(self.email_verification_url)
            .with_password_reset_url(self.password_reset_url);

        let github = self.github.map(|github| {
            GithubConfig::new(github.client_id, github.client_secret)
                .with_redirect_url(github.redirect_url)
        });

        let smtp = self.smtp_host.map(|host| {
            let config = SmtpConfig::new(host, self.smtp_from).with_port(self.smtp_port);
            match (self.smtp_username, self.smtp_password) {
                (Some(username), Some(password)) => config.with_credentials(username, password),
                _ => config,
            }
        });

        ServerConfig {
            dsn: self.dsn,
            jwt,
            auth,
            verification_token_ttl_minutes: self.verification_token_ttl_minutes,
            cors_origin: self.cors_origin,
            github,
            smtp,
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let config = args.into_server_config();

    debug!(
        port,
        github = config.github.is_some(),
        smtp = config.smtp.is_some(),
        "Starting server"
    );

    api::new(port, config).await
}
