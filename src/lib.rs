//! # Synthesizer (speech synthesis backend)
//!
//! `synthesizer` owns user accounts and authentication for the speech
//! synthesis platform. Model catalog, synthesis proxying and history live
//! behind the same API but are not part of this crate's auth core.
//!
//! ## Accounts
//!
//! Accounts are keyed by email. A local sign-up starts `Pending` and becomes
//! `Active` once the emailed verification link is used. SSO sign-in upserts
//! the account by email and lands it directly on `Active`; a local account and
//! an SSO login sharing an email are the same record.
//!
//! ## Tokens
//!
//! - **Bearer tokens** are HS256 JWTs carrying the account id as `sub`. They are
//!   stateless: validity is signature + expiry only.
//! - **Verification tokens** are random, single-purpose (email verification or
//!   password reset) and time-limited. Only their SHA-256 hash is stored.
//!   Consuming one deletes every outstanding token of that account.
//!
//! ## Errors
//!
//! Every expected failure is a typed [`error::Error`] mapped to a fixed HTTP
//! status at the boundary; nothing in a request path panics.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod error;
pub mod tokens;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
