//! Federated sign-in through external identity providers.
//!
//! Each provider implements [`SsoProvider`]; the [`SsoRegistry`] built at
//! startup maps the provider name used in routes (e.g. `github`) to it.

use async_trait::async_trait;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::error::Result;

pub mod github;

pub use github::{GithubConfig, GithubProvider};

/// Access token handed back by a provider's code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderToken {
    pub access_token: String,
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// Provider profile normalized to what an account needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SsoProfile {
    pub email: String,
    pub username: String,
    pub picture_url: String,
}

#[async_trait]
pub trait SsoProvider: Send + Sync {
    /// Where to send the browser to start the authorization-code flow.
    fn auth_code_url(&self, state: &str) -> String;

    /// # Errors
    /// `BadGateway` when the provider is unreachable, `BadRequest` when it
    /// rejects the code, `Internal` when its answer cannot be decoded.
    async fn exchange(&self, code: &str) -> Result<ProviderToken>;

    /// # Errors
    /// As [`SsoProvider::exchange`], plus `NotFound` when no verified email
    /// can be obtained.
    async fn fetch_user_info(&self, token: &ProviderToken) -> Result<SsoProfile>;
}

#[derive(Clone, Default)]
pub struct SsoRegistry {
    providers: HashMap<String, Arc<dyn SsoProvider>>,
}

impl SsoRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn SsoProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SsoProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubProvider;
    use super::*;

    #[test]
    fn registry_resolves_by_name() {
        let registry = SsoRegistry::new()
            .with_provider(
                "zeta",
                Arc::new(StubProvider {
                    code: "c".to_string(),
                    profile: SsoProfile::default(),
                }),
            )
            .with_provider(
                "alpha",
                Arc::new(StubProvider {
                    code: "c".to_string(),
                    profile: SsoProfile::default(),
                }),
            );
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("gitlab").is_none());
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn provider_token_debug_hides_the_secret() {
        let token = ProviderToken {
            access_token: "gho_secret".to_string(),
        };
        assert!(!format!("{token:?}").contains("gho_secret"));
    }
}
