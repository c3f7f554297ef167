//! Wiring of [`AuthService`] over in-memory collaborators.

use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    password::hash_password, sso::stub::StubProvider, AuthConfig, AuthService, JwtConfig,
    JwtIssuer, SsoProfile, SsoRegistry,
};
use crate::{
    email::recording::RecordingSender,
    tokens::{memory::MemoryTokenRepository, VerificationTokens},
    users::{memory::MemoryUserDirectory, Account, Role, Status},
};

pub(crate) const PASSWORD: &str = "P@ssw0rd1";

pub(crate) struct Harness {
    pub(crate) service: Arc<AuthService>,
    pub(crate) users: Arc<MemoryUserDirectory>,
    pub(crate) tokens: Arc<MemoryTokenRepository>,
    pub(crate) sender: Arc<RecordingSender>,
    /// Same keys as the service, for minting tokens directly.
    pub(crate) jwt: JwtIssuer,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_profile(SsoProfile {
            email: "octo@github.test".to_string(),
            username: "octocat".to_string(),
            picture_url: "https://avatars.test/1".to_string(),
        })
    }

    /// The `stub` provider accepts `good-code` and returns `profile`.
    pub(crate) fn with_profile(profile: SsoProfile) -> Self {
        let users = Arc::new(MemoryUserDirectory::default());
        let tokens = Arc::new(MemoryTokenRepository::default());
        let sender = Arc::new(RecordingSender::default());
        let jwt = JwtIssuer::new(
            &JwtConfig::new(SecretString::from("test-secret".to_string())).with_ttl_hours(1),
        );
        let providers = SsoRegistry::new().with_provider(
            "stub",
            Arc::new(StubProvider {
                code: "good-code".to_string(),
                profile,
            }),
        );
        let config = AuthConfig::new()
            .with_email_verification_url("https://app.test/verify?token=")
            .with_password_reset_url("https://app.test/reset?token=");

        let service = AuthService::new(
            users.clone(),
            VerificationTokens::new(tokens.clone(), 30),
            jwt.clone(),
            providers,
            sender.clone(),
            config,
        );

        Self {
            service: Arc::new(service),
            users,
            tokens,
            sender,
            jwt,
        }
    }

    pub(crate) async fn account_with(
        &self,
        email: &str,
        password: &str,
        role: Role,
        status: Status,
    ) -> anyhow::Result<Account> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password.to_string()).await?,
            username: email.split('@').next().unwrap_or_default().to_string(),
            picture_url: String::new(),
            role,
            status,
            provider: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(account.clone()).await;
        Ok(account)
    }

    pub(crate) async fn active_account(&self, email: &str, password: &str) -> anyhow::Result<Account> {
        self.account_with(email, password, Role::User, Status::Active)
            .await
    }
}
