//! GitHub OAuth app provider.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};
use url::Url;

use super::{ProviderToken, SsoProfile, SsoProvider};
use crate::{
    error::{Error, Result},
    APP_USER_AGENT,
};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_URL: &str = "https://api.github.com";
const SCOPE: &str = "user:email";

#[derive(Clone, Debug)]
pub struct GithubConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    authorize_url: String,
    token_url: String,
    api_url: String,
}

impl GithubConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_url: String::new(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_url: API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    /// Point the provider at another GitHub deployment (or a test server).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct GithubEmail {
    pub(crate) email: String,
    pub(crate) primary: bool,
    pub(crate) verified: bool,
}

/// First address that is both primary and verified.
pub(crate) fn select_primary_email(emails: &[GithubEmail]) -> Option<&str> {
    emails
        .iter()
        .find(|entry| entry.primary && entry.verified)
        .map(|entry| entry.email.as_str())
}

pub struct GithubProvider {
    config: GithubConfig,
    authorize_url: Url,
    client: Client,
}

impl GithubProvider {
    /// # Errors
    /// Returns an error if the authorize URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: GithubConfig) -> anyhow::Result<Self> {
        let authorize_url = Url::parse(&config.authorize_url)
            .with_context(|| format!("invalid GitHub authorize URL: {}", config.authorize_url))?;
        // GitHub rejects API calls without a User-Agent.
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build GitHub HTTP client")?;
        Ok(Self {
            config,
            authorize_url,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &ProviderToken,
        fetch_failed: &'static str,
        read_failed: &'static str,
    ) -> Result<T> {
        let url = format!("{}{path}", self.config.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token.access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|err| {
                warn!("GitHub request to {path} failed: {err}");
                Error::bad_gateway(fetch_failed)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("GitHub answered {status} for {path}");
            return Err(Error::bad_gateway(fetch_failed));
        }

        response.json::<T>().await.map_err(|err| {
            warn!("Failed to decode GitHub response from {path}: {err}");
            Error::internal(read_failed)
        })
    }
}

#[async_trait]
impl SsoProvider for GithubProvider {
    fn auth_code_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPE)
            .append_pair("state", state);
        url.into()
    }

    async fn exchange(&self, code: &str) -> Result<ProviderToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .client
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|err| {
                warn!("GitHub code exchange failed: {err}");
                Error::bad_gateway("Failed to exchange authorization code")
            })?;

        let status = response.status();
        if status.is_server_error() {
            warn!("GitHub answered {status} to the code exchange");
            return Err(Error::bad_gateway("Failed to exchange authorization code"));
        }

        let body: TokenResponse = response.json().await.map_err(|err| {
            warn!("Failed to decode GitHub token response: {err}");
            Error::internal("Failed to read access token")
        })?;

        match (body.access_token, body.error) {
            (Some(access_token), _) if !access_token.is_empty() => {
                debug!("Exchanged GitHub authorization code");
                Ok(ProviderToken { access_token })
            }
            (_, Some(error)) => {
                warn!("GitHub rejected the authorization code: {error}");
                Err(Error::bad_request("Invalid authorization code"))
            }
            _ => Err(Error::internal("Failed to read access token")),
        }
    }

    async fn fetch_user_info(&self, token: &ProviderToken) -> Result<SsoProfile> {
        let user: GithubUser = self
            .get_json("/user", token, "Failed to fetch user info", "Failed to read user info")
            .await?;

        let email = match user.email.filter(|email| !email.is_empty()) {
            Some(email) => email,
            None => {
                let emails: Vec<GithubEmail> = self
                    .get_json(
                        "/user/emails",
                        token,
                        "Failed to fetch user email",
                        "Failed to read user email",
                    )
                    .await?;
                select_primary_email(&emails)
                    .map(str::to_string)
                    .ok_or_else(|| Error::not_found("User email not found"))?
            }
        };

        Ok(SsoProfile {
            email,
            username: user.login,
            picture_url: user.avatar_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::{get, post},
        Form, Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    fn email(address: &str, primary: bool, verified: bool) -> GithubEmail {
        GithubEmail {
            email: address.to_string(),
            primary,
            verified,
        }
    }

    fn bearer(headers: &HeaderMap) -> String {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string()
    }

    /// Minimal stand-in for github.com + api.github.com.
    ///
    /// Code `good` yields token `public` (profile has an email), code `private`
    /// yields token `private` (email hidden, resolved via /user/emails) and
    /// code `unverified` yields a token whose emails are all unverified.
    async fn fake_github() -> anyhow::Result<SocketAddr> {
        let app = Router::new()
            .route(
                "/login/oauth/access_token",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    let token = match form.get("code").map(String::as_str) {
                        Some("good") => "public",
                        Some("private") => "private",
                        Some("unverified") => "unverified",
                        _ => {
                            return Json(json!({
                                "error": "bad_verification_code",
                                "error_description": "The code passed is incorrect or expired."
                            }));
                        }
                    };
                    Json(json!({"access_token": token, "token_type": "bearer", "scope": "user:email"}))
                }),
            )
            .route(
                "/user",
                get(|headers: HeaderMap| async move {
                    match bearer(&headers).as_str() {
                        "public" => (
                            StatusCode::OK,
                            Json(json!({"login": "octocat", "email": "octo@github.test", "avatar_url": "https://avatars.test/1"})),
                        ),
                        "private" | "unverified" => (
                            StatusCode::OK,
                            Json(json!({"login": "hidden", "email": null, "avatar_url": null})),
                        ),
                        _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"}))),
                    }
                }),
            )
            .route(
                "/user/emails",
                get(|headers: HeaderMap| async move {
                    let body: Value = match bearer(&headers).as_str() {
                        "private" => json!([
                            {"email": "old@github.test", "primary": false, "verified": true},
                            {"email": "main@github.test", "primary": true, "verified": true}
                        ]),
                        _ => json!([
                            {"email": "main@github.test", "primary": true, "verified": false}
                        ]),
                    };
                    Json(body)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(addr)
    }

    fn provider_for(addr: SocketAddr) -> anyhow::Result<GithubProvider> {
        let config = GithubConfig::new("client-id", SecretString::from("client-secret".to_string()))
            .with_redirect_url("http://localhost:3000/sso/github/callback")
            .with_endpoints(
                format!("http://{addr}/login/oauth/authorize"),
                format!("http://{addr}/login/oauth/access_token"),
                format!("http://{addr}/"),
            );
        GithubProvider::new(config)
    }

    #[test]
    fn picks_first_primary_verified_email() {
        let emails = vec![
            email("a@test", false, true),
            email("b@test", true, false),
            email("c@test", true, true),
            email("d@test", true, true),
        ];
        assert_eq!(select_primary_email(&emails), Some("c@test"));
        assert_eq!(select_primary_email(&emails[..2]), None);
        assert_eq!(select_primary_email(&[]), None);
    }

    #[test]
    fn auth_code_url_carries_client_scope_and_state() -> anyhow::Result<()> {
        let config = GithubConfig::new("abc", SecretString::from("s".to_string()))
            .with_redirect_url("https://app.test/callback");
        let provider = GithubProvider::new(config)?;
        let url = Url::parse(&provider.auth_code_url("xyz"))?;
        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("client_id").map(String::as_str), Some("abc"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("https://app.test/callback")
        );
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("scope").map(String::as_str), Some("user:email"));
        assert_eq!(query.get("state").map(String::as_str), Some("xyz"));
        assert!(!url.as_str().contains("client-secret"));
        Ok(())
    }

    #[tokio::test]
    async fn profile_email_is_used_when_present() -> anyhow::Result<()> {
        let provider = provider_for(fake_github().await?)?;
        let token = provider.exchange("good").await?;
        let profile = provider.fetch_user_info(&token).await?;
        assert_eq!(
            profile,
            SsoProfile {
                email: "octo@github.test".to_string(),
                username: "octocat".to_string(),
                picture_url: "https://avatars.test/1".to_string(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn hidden_email_falls_back_to_primary_verified() -> anyhow::Result<()> {
        let provider = provider_for(fake_github().await?)?;
        let token = provider.exchange("private").await?;
        let profile = provider.fetch_user_info(&token).await?;
        assert_eq!(profile.email, "main@github.test");
        assert_eq!(profile.username, "hidden");
        assert!(profile.picture_url.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn no_verified_email_is_not_found() -> anyhow::Result<()> {
        let provider = provider_for(fake_github().await?)?;
        let token = provider.exchange("unverified").await?;
        let err = provider.fetch_user_info(&token).await.err();
        assert_eq!(err, Some(Error::not_found("User email not found")));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_code_is_bad_request() -> anyhow::Result<()> {
        let provider = provider_for(fake_github().await?)?;
        let err = provider.exchange("stale").await.err();
        assert_eq!(err, Some(Error::bad_request("Invalid authorization code")));
        Ok(())
    }

    #[tokio::test]
    async fn revoked_access_token_is_bad_gateway() -> anyhow::Result<()> {
        let provider = provider_for(fake_github().await?)?;
        let token = ProviderToken {
            access_token: "revoked".to_string(),
        };
        let err = provider.fetch_user_info(&token).await.err();
        assert_eq!(err, Some(Error::bad_gateway("Failed to fetch user info")));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_provider_is_bad_gateway() -> anyhow::Result<()> {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
            listener.local_addr()?
        };
        let provider = provider_for(addr)?;
        let err = provider.exchange("good").await.err();
        assert_eq!(
            err,
            Some(Error::bad_gateway("Failed to exchange authorization code"))
        );
        Ok(())
    }
}
