//! Relay authenticator contract (spec §4.7): `authenticate(headers) ->
//! Option<User>`, where `User` is an opaque, equality-comparable identity.
//! Grounded on `proxystore-config`'s `RelayAuthConfig { method, kwargs }`
//! reconstruction record, which names which variant below to build.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;

/// An opaque, equality-comparable client identity. Two registrations for
/// the same `client_uuid` are only compatible if their `User`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User(pub String);

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns `None` when the request does not carry a valid identity.
    async fn authenticate(&self, headers: &HeaderMap) -> Option<User>;
}

/// Accepts every connection under one shared identity. Suitable for
/// trusted networks and local development.
#[derive(Debug, Default)]
pub struct NullAuthenticator;

#[async_trait]
impl Authenticator for NullAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> Option<User> {
        Some(User("anonymous".to_string()))
    }
}

/// Extracts `Bearer <token>` from `Authorization` and validates it against
/// an external OAuth2 token-introspection endpoint (RFC 7662).
pub struct TokenIntrospectionAuthenticator {
    introspection_url: String,
    audience: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IntrospectResponse {
    active: bool,
    sub: Option<String>,
    #[serde(default)]
    aud: Option<serde_json::Value>,
}

impl TokenIntrospectionAuthenticator {
    pub fn new(introspection_url: String, audience: Option<String>) -> Self {
        Self {
            introspection_url,
            audience,
            client: reqwest::Client::new(),
        }
    }

    fn audience_matches(&self, aud: &Option<serde_json::Value>) -> bool {
        let Some(expected) = &self.audience else {
            return true;
        };
        match aud {
            Some(serde_json::Value::String(s)) => s == expected,
            Some(serde_json::Value::Array(values)) => {
                values.iter().any(|v| v.as_str() == Some(expected.as_str()))
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Authenticator for TokenIntrospectionAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<User> {
        let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;

        let response = self
            .client
            .post(&self.introspection_url)
            .form(&[("token", token)])
            .send()
            .await
            .ok()?;
        let introspected: IntrospectResponse = response.json().await.ok()?;

        if !introspected.active || !self.audience_matches(&introspected.aud) {
            return None;
        }
        introspected.sub.map(User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_authenticator_always_succeeds() {
        let auth = NullAuthenticator;
        assert!(auth.authenticate(&HeaderMap::new()).await.is_some());
    }

    #[test]
    fn audience_matches_against_a_string_or_array_claim() {
        let auth = TokenIntrospectionAuthenticator::new("https://example.test".to_string(), Some("proxystore".to_string()));
        assert!(auth.audience_matches(&Some(serde_json::json!("proxystore"))));
        assert!(auth.audience_matches(&Some(serde_json::json!(["other", "proxystore"]))));
        assert!(!auth.audience_matches(&Some(serde_json::json!("other"))));
    }
}
