//! Authentication orchestrator.
//!
//! Every operation coordinates the user directory, verification tokens, the
//! JWT issuer, SSO providers and the notification sender. Expected failures
//! come back as [`Error`]; infrastructure failures are logged here and
//! surfaced as `Internal` with a stable message.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    jwt::{Claims, JwtIssuer},
    password::{hash_password, verify_password},
    sso::SsoRegistry,
};
use crate::{
    email::{password_reset_email, verification_email, NotificationSender},
    error::{Error, Result},
    tokens::{generate_token, Purpose, VerificationTokens},
    users::{
        normalize_email, Account, AccountUpsert, CreateOutcome, NewAccount, Role, Status,
        UserDirectory,
    },
};

/// Link prefixes the raw verification token is appended to.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    email_verification_url: String,
    password_reset_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_email_verification_url(mut self, url: impl Into<String>) -> Self {
        self.email_verification_url = url.into();
        self
    }

    #[must_use]
    pub fn with_password_reset_url(mut self, url: impl Into<String>) -> Self {
        self.password_reset_url = url.into();
        self
    }

    #[must_use]
    pub fn email_verification_url(&self) -> &str {
        &self.email_verification_url
    }

    #[must_use]
    pub fn password_reset_url(&self) -> &str {
        &self.password_reset_url
    }
}

fn storage_failure(message: &'static str) -> impl FnOnce(anyhow::Error) -> Error {
    move |err| {
        error!("{message}: {err:#}");
        Error::internal(message)
    }
}

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const EMAIL_TAKEN: &str = "User with given email already exists";
const NOT_ACTIVE: &str = "User is not active";

pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    tokens: VerificationTokens,
    jwt: JwtIssuer,
    providers: SsoRegistry,
    notifier: Arc<dyn NotificationSender>,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: VerificationTokens,
        jwt: JwtIssuer,
        providers: SsoRegistry,
        notifier: Arc<dyn NotificationSender>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            jwt,
            providers,
            notifier,
            config,
        }
    }

    #[must_use]
    pub fn providers(&self) -> &SsoRegistry {
        &self.providers
    }

    /// Create a `Pending` account and mail its verification link.
    ///
    /// # Errors
    /// `BadRequest` if the email is taken; `Internal` if hashing, storage or
    /// the notification fails.
    pub async fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<Account> {
        let email = normalize_email(email);
        info!("Handling sign up");

        let existing = self
            .users
            .find_by_email(&email)
            .await
            .map_err(storage_failure("Failed to fetch user by email"))?;
        if existing.is_some() {
            warn!("Sign up rejected: email already registered");
            return Err(Error::bad_request(EMAIL_TAKEN));
        }

        let password_hash = hash_password(password.to_string())
            .await
            .map_err(storage_failure("Failed to hash password"))?;

        let created = self
            .users
            .create(NewAccount {
                email,
                password_hash,
                username: username.to_string(),
                role: Role::User,
                status: Status::Pending,
            })
            .await
            .map_err(storage_failure("Failed to save user"))?;

        let account = match created {
            CreateOutcome::Created(account) => account,
            // Lost a race with a concurrent sign-up for the same email.
            CreateOutcome::Conflict => return Err(Error::bad_request(EMAIL_TAKEN)),
        };

        self.send_verification_email(&account).await?;
        info!(user_id = %account.id, "Signed up");
        Ok(account)
    }

    /// # Errors
    /// `Unauthorized` with one generic message for an unknown email or a wrong
    /// password, and "Email not verified" for accounts that are not `Active`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let email = normalize_email(email);

        let account = self
            .users
            .find_by_email(&email)
            .await
            .map_err(storage_failure("Failed to fetch user"))?
            .ok_or_else(|| {
                warn!("Sign in rejected: unknown email");
                Error::unauthorized(INVALID_CREDENTIALS)
            })?;

        if !account.is_active() {
            warn!(user_id = %account.id, status = %account.status, "Sign in rejected: account not active");
            return Err(Error::unauthorized("Email not verified"));
        }

        if !verify_password(account.password_hash.clone(), password.to_string()).await {
            warn!(user_id = %account.id, "Sign in rejected: wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.jwt.issue(account.id)?;
        info!(user_id = %account.id, "Signed in");
        Ok(token)
    }

    /// Authorization URL of `provider_name`, carrying a random opaque state.
    ///
    /// # Errors
    /// `BadRequest` for unknown providers.
    pub fn sso_sign_in(&self, provider_name: &str) -> Result<String> {
        let provider = self.provider(provider_name)?;
        let state = generate_token().map_err(storage_failure("Failed to generate state"))?;
        info!(provider = provider_name, "Starting SSO sign in");
        Ok(provider.auth_code_url(&state))
    }

    /// Exchange the code, upsert the account by email as `Active` and issue a
    /// bearer token. A blocked account stays blocked and gets no token.
    ///
    /// # Errors
    /// `BadRequest` for unknown providers; `Unauthorized` for a blocked
    /// account; anything the provider reports.
    pub async fn sso_callback(&self, provider_name: &str, code: &str) -> Result<String> {
        let provider = self.provider(provider_name)?;
        info!(provider = provider_name, "Handling SSO callback");

        let provider_token = provider.exchange(code).await?;
        let profile = provider.fetch_user_info(&provider_token).await?;

        let account = self
            .users
            .upsert_by_email(AccountUpsert {
                email: normalize_email(&profile.email),
                username: profile.username,
                picture_url: profile.picture_url,
                provider: provider_name.to_string(),
                status: Status::Active,
            })
            .await
            .map_err(storage_failure("Failed to save user"))?;

        if !account.is_active() {
            warn!(user_id = %account.id, status = %account.status, "SSO sign in rejected: account not active");
            return Err(Error::unauthorized(NOT_ACTIVE));
        }

        let token = self.jwt.issue(account.id)?;
        info!(user_id = %account.id, provider = provider_name, "Signed in with SSO");
        Ok(token)
    }

    /// Only `Pending -> Active`; an already active account stays active.
    ///
    /// # Errors
    /// `NotFound` for unknown tokens or a vanished account; `BadRequest` for a
    /// password-reset token or an expired one; `Unauthorized` for a blocked
    /// account, whose tokens are left in place.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let verification = self.tokens.resolve(token).await?;

        if verification.purpose != Purpose::EmailVerification {
            warn!(user_id = %verification.user_id, purpose = %verification.purpose, "Invalid verification token purpose");
            return Err(Error::bad_request("Invalid token purpose"));
        }
        if verification.is_expired_at(Utc::now()) {
            warn!(user_id = %verification.user_id, expires_at = %verification.expires_at, "Email token expired");
            return Err(Error::bad_request("Email token expired"));
        }

        let mut account = self.account(verification.user_id).await?;
        match account.status {
            Status::Pending => {
                account.status = Status::Active;
                account = self.save(&account).await?;
            }
            Status::Active => {}
            Status::Blocked => {
                warn!(user_id = %account.id, "Email verification rejected: account blocked");
                return Err(Error::unauthorized(NOT_ACTIVE));
            }
        }

        self.tokens.revoke_all(account.id).await?;
        info!(user_id = %account.id, "Verified email address");
        Ok(())
    }

    /// Mail a password-reset link to the account owning `email`.
    ///
    /// # Errors
    /// `NotFound` when no account has that email.
    pub async fn send_password_reset_token(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .users
            .find_by_email(&email)
            .await
            .map_err(storage_failure("Failed to fetch user by email"))?
            .ok_or_else(|| {
                warn!("Password reset requested for unknown email");
                Error::not_found("User not found")
            })?;

        let token = self.tokens.issue(account.id, Purpose::PasswordReset).await?;
        let link = format!("{}{}", self.config.password_reset_url, token.token);
        self.notify(&password_reset_email(&account.email, &link)).await?;

        info!(user_id = %account.id, "Sent password reset token");
        Ok(())
    }

    /// # Errors
    /// As [`AuthService::verify_email`], with "Password token expired" for
    /// an expired reset token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let verification = self.tokens.resolve(token).await?;

        if verification.purpose != Purpose::PasswordReset {
            warn!(user_id = %verification.user_id, purpose = %verification.purpose, "Invalid verification token purpose");
            return Err(Error::bad_request("Invalid token purpose"));
        }
        if verification.is_expired_at(Utc::now()) {
            warn!(user_id = %verification.user_id, expires_at = %verification.expires_at, "Password reset token expired");
            return Err(Error::bad_request("Password token expired"));
        }

        let mut account = self.account(verification.user_id).await?;
        account.password_hash = hash_password(new_password.to_string())
            .await
            .map_err(storage_failure("Failed to hash password"))?;
        self.save(&account).await?;

        self.tokens.revoke_all(account.id).await?;
        info!(user_id = %account.id, "Reset password");
        Ok(())
    }

    /// # Errors
    /// `Unauthorized` for a bad signature, unexpected algorithm or passed expiry.
    pub fn verify_bearer(&self, bearer: &str) -> Result<Claims> {
        self.jwt.validate(bearer)
    }

    /// Account named by verified bearer claims, whatever its status.
    ///
    /// # Errors
    /// `Unauthorized` when the account no longer exists.
    pub async fn bearer_account(&self, claims: &Claims) -> Result<Account> {
        self.users
            .find_by_id(claims.sub)
            .await
            .map_err(storage_failure("Failed to fetch user by id"))?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Bearer token for unknown account");
                Error::unauthorized("User not found")
            })
    }

    /// [`AuthService::verify_bearer`] followed by [`AuthService::bearer_account`].
    ///
    /// # Errors
    /// As those two.
    pub async fn authenticate(&self, bearer: &str) -> Result<Account> {
        let claims = self.verify_bearer(bearer)?;
        self.bearer_account(&claims).await
    }

    /// # Errors
    /// `NotFound` when the account does not exist.
    pub async fn account(&self, id: Uuid) -> Result<Account> {
        self.users
            .find_by_id(id)
            .await
            .map_err(storage_failure("Failed to fetch user by id"))?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Administrative `Active -> Blocked` transition. Blocking a blocked
    /// account returns it unchanged.
    ///
    /// # Errors
    /// `NotFound` when the account does not exist; `BadRequest` for a
    /// `Pending` account.
    pub async fn block_account(&self, id: Uuid) -> Result<Account> {
        let mut account = self.account(id).await?;
        match account.status {
            Status::Active => {}
            Status::Blocked => return Ok(account),
            Status::Pending => {
                warn!(user_id = %account.id, "Block rejected: account not active");
                return Err(Error::bad_request("Only active accounts can be blocked"));
            }
        }
        account.status = Status::Blocked;
        let account = self.save(&account).await?;
        info!(user_id = %account.id, "Blocked account");
        Ok(account)
    }

    fn provider(&self, name: &str) -> Result<Arc<dyn super::sso::SsoProvider>> {
        self.providers.get(name).ok_or_else(|| {
            warn!(provider = name, "Unsupported SSO provider");
            Error::bad_request("Unsupported SSO provider")
        })
    }

    async fn save(&self, account: &Account) -> Result<Account> {
        self.users
            .update(account)
            .await
            .map_err(storage_failure("Failed to update user"))?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    async fn send_verification_email(&self, account: &Account) -> Result<()> {
        let token = self
            .tokens
            .issue(account.id, Purpose::EmailVerification)
            .await?;
        let link = format!("{}{}", self.config.email_verification_url, token.token);
        self.notify(&verification_email(&account.email, &account.username, &link))
            .await
    }

    async fn notify(&self, message: &crate::email::EmailMessage) -> Result<()> {
        self.notifier
            .send(message)
            .await
            .map_err(storage_failure("Failed to send email"))
    }
}
