//! Builds a [`RelayState`] from a loaded [`RelayConfig`] (spec §6
//! `[auth] { method: "globus"|null, ...kwargs }`).

use std::sync::Arc;

use proxystore_config::{RelayAuthConfig, RelayConfig};

use crate::auth::{Authenticator, NullAuthenticator, TokenIntrospectionAuthenticator};
use crate::clients::ClientManager;
use crate::server::RelayState;

pub fn build_authenticator(auth: &Option<RelayAuthConfig>) -> Arc<dyn Authenticator> {
    match auth.as_ref().and_then(|a| a.method.as_deref()) {
        None => Arc::new(NullAuthenticator),
        Some("token-introspection") => {
            let kwargs = &auth.as_ref().unwrap().kwargs;
            let url = kwargs
                .get("introspection_url")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let audience = kwargs.get("audience").and_then(|v| v.as_str()).map(str::to_string);
            Arc::new(TokenIntrospectionAuthenticator::new(url, audience))
        }
        Some(other) => {
            tracing::warn!(method = other, "unrecognized auth method, falling back to null authenticator");
            Arc::new(NullAuthenticator)
        }
    }
}

pub fn build_state(config: &RelayConfig) -> Arc<RelayState> {
    Arc::new(RelayState {
        clients: ClientManager::new(),
        authenticator: build_authenticator(&config.auth),
        max_message_bytes: config.max_message_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_auth_config_yields_null_authenticator() {
        let _ = build_authenticator(&None);
    }

    #[test]
    fn unrecognized_method_falls_back_to_null() {
        let cfg = RelayAuthConfig {
            method: Some("globus".to_string()),
            kwargs: Default::default(),
        };
        let _ = build_authenticator(&Some(cfg));
    }
}
