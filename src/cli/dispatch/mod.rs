//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, smtp, sso};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let sso_opts = sso::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        app_name: auth_opts.app_name,
        jwt_secret: auth_opts.jwt_secret,
        jwt_ttl_hours: auth_opts.jwt_ttl_hours,
        verification_token_ttl_minutes: auth_opts.verification_token_ttl_minutes,
        email_verification_url: auth_opts.email_verification_url,
        password_reset_url: auth_opts.password_reset_url,
        cors_origin: auth_opts.cors_origin,
        github: sso_opts.github,
        smtp_host: smtp_opts.host,
        smtp_port: smtp_opts.port,
        smtp_username: smtp_opts.username,
        smtp_password: smtp_opts.password,
        smtp_from: smtp_opts.from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const DSN: &str = "postgres://user@localhost:5432/synthesizer";

    fn cleared<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> = [
            "SYNTHESIZER_JWT_SECRET",
            "SYNTHESIZER_GITHUB_CLIENT_ID",
            "SYNTHESIZER_GITHUB_CLIENT_SECRET",
            "SYNTHESIZER_GITHUB_REDIRECT_URL",
            "SYNTHESIZER_SMTP_HOST",
            "SYNTHESIZER_SMTP_FROM",
            "SYNTHESIZER_CORS_ORIGIN",
        ]
        .into_iter()
        .map(|name| (name, None))
        .collect();
        all.retain(|(name, _)| !vars.iter().any(|(set, _)| set == name));
        all.extend_from_slice(vars);
        temp_env::with_vars(all, f);
    }

    #[test]
    fn server_action_from_env() {
        cleared(
            &[
                ("SYNTHESIZER_DSN", Some(DSN)),
                ("SYNTHESIZER_JWT_SECRET", Some("s3cret")),
                ("SYNTHESIZER_GITHUB_CLIENT_ID", Some("gh-id")),
                ("SYNTHESIZER_GITHUB_CLIENT_SECRET", Some("gh-secret")),
                (
                    "SYNTHESIZER_GITHUB_REDIRECT_URL",
                    Some("http://localhost:3000/sso/github"),
                ),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["synthesizer"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.dsn, DSN);
                    assert_eq!(args.app_name, "synthesizer");
                    assert_eq!(args.jwt_secret.expose_secret(), "s3cret");
                    assert_eq!(args.smtp_host, None);
                    let github = args.github.map(|github| github.client_id);
                    assert_eq!(github.as_deref(), Some("gh-id"));
                }
            },
        );
    }

    #[test]
    fn github_needs_id_and_secret() {
        cleared(
            &[
                ("SYNTHESIZER_DSN", Some(DSN)),
                ("SYNTHESIZER_JWT_SECRET", Some("s3cret")),
                ("SYNTHESIZER_GITHUB_CLIENT_ID", Some("gh-id")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["synthesizer"]);
                let result = handler(&matches);
                assert!(matches!(result, Ok(Action::Server(Args { github: None, .. }))));
            },
        );
    }

    #[test]
    fn smtp_host_requires_from() {
        cleared(
            &[
                ("SYNTHESIZER_DSN", Some(DSN)),
                ("SYNTHESIZER_JWT_SECRET", Some("s3cret")),
                ("SYNTHESIZER_SMTP_HOST", Some("smtp.synthesizer.dev")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["synthesizer"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --smtp-from"));
                }
            },
        );
    }
}
