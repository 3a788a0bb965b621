//! Identity broker interface used by the auth gate and the OAuth callback.
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Random value binding a login redirect to its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateNonce(String);

impl StateNonce {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity the broker resolved a credential to.
///
/// Lives for one request only; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserIdentity {
    pub name: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl UserIdentity {
    /// Identity used when authentication is globally disabled.
    pub fn anonymous_admin() -> Self {
        Self {
            name: "anonymous".to_string(),
            admin: true,
            scopes: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("identity broker unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity broker rejected the request with status {0}")]
    Rejected(u16),
    #[error("identity broker returned an unexpected payload")]
    InvalidResponse,
}

/// Operations the request pipeline needs from the identity broker.
///
/// Implementations are shared across all in-flight requests (`Arc<dyn ...>`),
/// so they must be thread-safe; connection pooling is their own concern.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    // Resolve a credential to an identity.
    //
    // Fails soft: any rejection or transport problem yields `None`, which the
    // caller treats exactly like "no credential".
    async fn resolve(&self, credential: &Credential) -> Option<UserIdentity>;

    // Complete the OAuth code-for-token exchange.
    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthorityError>;

    // Create a state nonce bound to the path the user originally asked for.
    fn generate_state(&self, next_url: &str) -> StateNonce;

    // Recover the originally requested path from a state nonce.
    fn next_url_for_state(&self, state: &str) -> Option<String>;

    // Where unauthenticated users are sent to log in.
    fn login_url(&self, state: &StateNonce) -> String;

    // Cookie carrying the state nonce during the login round trip.
    fn state_cookie_name(&self) -> &str;

    /// Whether `identity` holds `scope`.
    ///
    /// An unfiltered scope covers its filtered forms:
    /// `access:services` grants `access:services!service=docservice`.
    fn has_scope(&self, identity: &UserIdentity, scope: &str) -> bool {
        let base = scope.split_once('!').map(|(base, _)| base);
        identity
            .scopes
            .iter()
            .any(|held| held == scope || Some(held.as_str()) == base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScopeOnly;

    #[async_trait]
    impl AuthorityClient for ScopeOnly {
        async fn resolve(&self, _credential: &Credential) -> Option<UserIdentity> {
            None
        }
        async fn exchange_code(&self, _code: &str) -> Result<Credential, AuthorityError> {
            Err(AuthorityError::InvalidResponse)
        }
        fn generate_state(&self, _next_url: &str) -> StateNonce {
            StateNonce::new("s")
        }
        fn next_url_for_state(&self, _state: &str) -> Option<String> {
            None
        }
        fn login_url(&self, _state: &StateNonce) -> String {
            String::new()
        }
        fn state_cookie_name(&self) -> &str {
            "state"
        }
    }

    fn user_with(scopes: &[&str]) -> UserIdentity {
        UserIdentity {
            name: "alice".into(),
            admin: false,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn exact_scope_is_granted() {
        let user = user_with(&["access:docservice!service=docservice"]);
        assert!(ScopeOnly.has_scope(&user, "access:docservice!service=docservice"));
    }

    #[test]
    fn unfiltered_scope_covers_filtered_scope() {
        let user = user_with(&["access:docservice"]);
        assert!(ScopeOnly.has_scope(&user, "access:docservice!service=docservice"));
    }

    #[test]
    fn other_service_scope_is_not_enough() {
        let user = user_with(&["access:docservice!service=other", "read:users"]);
        assert!(!ScopeOnly.has_scope(&user, "access:docservice!service=docservice"));
        assert!(!ScopeOnly.has_scope(&user_with(&[]), "access:docservice!service=docservice"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let rendered = format!("{:?}", Credential::new("abc123"));
        assert!(!rendered.contains("abc123"));
    }
}
