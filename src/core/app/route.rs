use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::storage::{
    clear_credentials, load_credentials, CredentialStore, Credentials, StoreError,
};
use crate::core::token::token_expired;

/// Screens the client can show. Each CLI entry point requests one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Chat,
}

impl Route {
    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Chat)
    }
}

/// Pick the screen to actually show for `requested`.
///
/// Signed-out users only ever see the login or registration forms, and
/// signed-in users are sent past them straight to the chat.
pub fn resolve_route(requested: Route, authenticated: bool) -> Route {
    match (requested, authenticated) {
        (route, false) if route.requires_auth() => Route::Login,
        (Route::Login | Route::Register, true) => Route::Chat,
        (route, _) => route,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub route: Route,
    pub credentials: Option<Credentials>,
}

/// Read the stored login and decide where to start. An expired token is
/// removed from the store and treated as signed out.
pub fn bootstrap(
    store: &dyn CredentialStore,
    requested: Route,
    now: DateTime<Utc>,
) -> Result<Bootstrap, StoreError> {
    let mut credentials = load_credentials(store)?;
    if credentials
        .as_ref()
        .is_some_and(|creds| token_expired(&creds.token, now))
    {
        info!("stored token has expired; clearing login");
        clear_credentials(store)?;
        credentials = None;
    }

    Ok(Bootstrap {
        route: resolve_route(requested, credentials.is_some()),
        credentials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{save_credentials, CredentialKey, MemoryStore};
    use crate::core::token::make_test_token;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn unauthenticated_users_land_on_login() {
        assert_eq!(resolve_route(Route::Chat, false), Route::Login);
        assert_eq!(resolve_route(Route::Login, false), Route::Login);
        assert_eq!(resolve_route(Route::Register, false), Route::Register);
    }

    #[test]
    fn authenticated_users_skip_auth_screens() {
        assert_eq!(resolve_route(Route::Login, true), Route::Chat);
        assert_eq!(resolve_route(Route::Register, true), Route::Chat);
        assert_eq!(resolve_route(Route::Chat, true), Route::Chat);
    }

    #[test]
    fn bootstrap_keeps_valid_login() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = make_test_token(&json!({"sub": "ada", "exp": now.timestamp() + 600}));
        save_credentials(
            &store,
            &Credentials {
                token: token.clone(),
                username: "ada".into(),
            },
        )
        .unwrap();

        let boot = bootstrap(&store, Route::Login, now).unwrap();
        assert_eq!(boot.route, Route::Chat);
        assert_eq!(boot.credentials.map(|c| c.token), Some(token));
    }

    #[test]
    fn bootstrap_clears_expired_token() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = make_test_token(&json!({"sub": "ada", "exp": now.timestamp() - 1}));
        save_credentials(
            &store,
            &Credentials {
                token,
                username: "ada".into(),
            },
        )
        .unwrap();

        let boot = bootstrap(&store, Route::Chat, now).unwrap();
        assert_eq!(boot.route, Route::Login);
        assert!(boot.credentials.is_none());
        assert_eq!(store.get(CredentialKey::Token).unwrap(), None);
        assert_eq!(store.get(CredentialKey::Username).unwrap(), None);
    }

    #[test]
    fn opaque_tokens_are_trusted_until_the_server_says_otherwise() {
        let store = MemoryStore::new();
        store.set(CredentialKey::Token, "opaque").unwrap();

        let boot = bootstrap(&store, Route::Chat, Utc::now()).unwrap();
        assert_eq!(boot.route, Route::Chat);
    }
}
