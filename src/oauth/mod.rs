// ABOUTME: OAuth adapter trait, registry, and protection-state handling
// ABOUTME: Adapters are process-scoped singletons selected by linear name match
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # OAuth Provider Adapters
//!
//! Each identity provider plugs in through [`OAuthAdapter`]. The protection
//! state token is a random nonce; the `.` separator is reserved for an
//! optional base64-encoded post-login redirect URL appended after it. CSRF
//! verification compares the `state` query parameter against the cookie's
//! first `.`-segment.

pub mod providers;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::HashMap;

use crate::constants::cookies;

/// Identity data fetched from a provider after the code exchange
#[derive(Debug, Clone)]
pub struct ProviderUserData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the provider asserts the email is verified
    pub email_verified: bool,
}

/// OAuth adapter error types
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("provider configuration error: {0}")]
    Configuration(String),

    #[error("authorisation code missing from callback query")]
    MissingCode,

    #[error("code exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("user info fetch failed: {0}")]
    UserInfoFailed(String),
}

/// Capability set every OAuth provider adapter implements
///
/// Adapters are configured at startup and iterated linearly per callback;
/// at a handful of providers that costs nothing.
#[async_trait::async_trait]
pub trait OAuthAdapter: Send + Sync {
    /// Provider name; matches the URI segment selecting this adapter
    fn name(&self) -> &str;

    /// Name of the cookie storing the protection state for this provider
    fn cookie_key(&self) -> String {
        format!("{}{}", self.name(), cookies::OAUTH_STATE_SUFFIX)
    }

    /// Generate the protection state nonce. The `.` separator is reserved
    /// for the redirect-URL suffix and never appears in the nonce itself.
    fn generate_protection_token(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    /// Full redirect target for step 1 of the OAuth flow
    fn auth_code_url(&self, state: &str) -> String;

    /// Compare the callback's `state` parameter against the cookie value
    ///
    /// The cookie may carry a `.<base64-redirect>` suffix; only the first
    /// `.`-segment is the nonce. Returns the cookie name so the caller can
    /// clear it, and whether the request is authentic.
    fn verify_request_is_authentic(
        &self,
        query: &HashMap<String, String>,
        cookie_value: &str,
    ) -> (String, bool) {
        let nonce = cookie_value.split('.').next().unwrap_or_default();
        let authentic = query
            .get("state")
            .is_some_and(|state| !nonce.is_empty() && state == nonce);
        (self.cookie_key(), authentic)
    }

    /// Complete the code exchange and fetch the identity
    ///
    /// # Errors
    ///
    /// Returns an [`OAuthError`] if the code is missing, the exchange is
    /// rejected, or the user-info fetch fails.
    async fn user_data(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<ProviderUserData, OAuthError>;
}

/// Process-scoped adapter registry
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn OAuthAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register an adapter at startup
    pub fn register(&mut self, adapter: Box<dyn OAuthAdapter>) {
        tracing::info!("registering OAuth adapter: {}", adapter.name());
        self.adapters.push(adapter);
    }

    /// Linear name match over the registered adapters
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&dyn OAuthAdapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(AsRef::as_ref)
    }

    /// Iterate all registered adapters
    pub fn iter(&self) -> impl Iterator<Item = &dyn OAuthAdapter> {
        self.adapters.iter().map(AsRef::as_ref)
    }

    /// Names of all registered adapters
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAdapter;

    #[async_trait::async_trait]
    impl OAuthAdapter for StubAdapter {
        fn name(&self) -> &str {
            "stub"
        }

        fn auth_code_url(&self, state: &str) -> String {
            format!("https://example.com/auth?state={state}")
        }

        async fn user_data(
            &self,
            _query: &HashMap<String, String>,
        ) -> Result<ProviderUserData, OAuthError> {
            Err(OAuthError::MissingCode)
        }
    }

    #[test]
    fn test_protection_token_has_no_separator() {
        let adapter = StubAdapter;
        for _ in 0..32 {
            let token = adapter.generate_protection_token();
            assert_eq!(token.len(), 32);
            assert!(!token.contains('.'));
        }
    }

    #[test]
    fn test_verify_bare_nonce() {
        let adapter = StubAdapter;
        let mut query = HashMap::new();
        query.insert("state".to_owned(), "XYZ".to_owned());

        let (cookie_name, ok) = adapter.verify_request_is_authentic(&query, "XYZ");
        assert_eq!(cookie_name, "stub_oauth_state");
        assert!(ok);
    }

    #[test]
    fn test_verify_nonce_with_redirect_suffix() {
        let adapter = StubAdapter;
        let mut query = HashMap::new();
        query.insert("state".to_owned(), "XYZ".to_owned());

        let (_, ok) = adapter.verify_request_is_authentic(&query, "XYZ.aGVsbG8=");
        assert!(ok);
    }

    #[test]
    fn test_verify_rejects_mismatch_and_empty() {
        let adapter = StubAdapter;
        let mut query = HashMap::new();
        query.insert("state".to_owned(), "ABC".to_owned());

        let (_, ok) = adapter.verify_request_is_authentic(&query, "XYZ.aGVsbG8=");
        assert!(!ok);

        let (_, ok) = adapter.verify_request_is_authentic(&HashMap::new(), "XYZ");
        assert!(!ok);

        query.insert("state".to_owned(), String::new());
        let (_, ok) = adapter.verify_request_is_authentic(&query, "");
        assert!(!ok);
    }

    #[test]
    fn test_registry_linear_match() {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(StubAdapter));
        assert!(registry.find("stub").is_some());
        assert!(registry.find("google").is_none());
        assert_eq!(registry.names(), vec!["stub"]);
    }
}
