//! Credentials, bearer tokens, SSO providers and the orchestrator tying them
//! to the user directory.

pub mod jwt;
pub mod password;
pub mod service;
pub mod sso;

#[cfg(test)]
pub(crate) mod testing;

pub use jwt::{Claims, JwtConfig, JwtIssuer};
pub use service::{AuthConfig, AuthService};
pub use sso::{SsoProfile, SsoProvider, SsoRegistry};
