use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{NovaApi, RegisterRequest};
use crate::core::app::route::Route;
use crate::core::storage::{
    clear_credentials, save_credentials, CredentialStore, Credentials, StoreError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// What the front end should do after a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Navigate(Route),
    /// Stay on the current form and show this message next to it.
    Rejected(String),
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err("Username and password are required".to_string());
        }
        Ok(())
    }
}

impl RegistrationForm {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err("Username, email and password are required".to_string());
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }
}

/// Drives the login and registration forms.
///
/// Submissions take `&mut self`, so a second submit cannot begin until the
/// first one has resolved.
pub struct AuthController {
    api: Arc<dyn NovaApi>,
    store: Arc<dyn CredentialStore>,
}

impl AuthController {
    pub fn new(api: Arc<dyn NovaApi>, store: Arc<dyn CredentialStore>) -> Self {
        Self { api, store }
    }

    /// On success the token and username are persisted and the API client
    /// starts sending the token. On failure nothing is stored.
    pub async fn login(&mut self, form: &LoginForm) -> Result<AuthOutcome, StoreError> {
        if let Err(message) = form.validate() {
            return Ok(AuthOutcome::Rejected(message));
        }

        let username = form.username.trim();
        let response = match self.api.login(username, &form.password).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%username, error = %err, "login rejected");
                return Ok(AuthOutcome::Rejected(err.to_string()));
            }
        };

        save_credentials(
            self.store.as_ref(),
            &Credentials {
                token: response.access_token.clone(),
                username: username.to_string(),
            },
        )?;
        self.api.set_token(Some(response.access_token));
        info!(%username, "logged in");
        Ok(AuthOutcome::Navigate(Route::Chat))
    }

    /// Create the account, then sign in with the same credentials.
    ///
    /// If the follow-up login is refused the account still exists, so the
    /// user is sent to the login form rather than shown an error.
    pub async fn register(&mut self, form: &RegistrationForm) -> Result<AuthOutcome, StoreError> {
        if let Err(message) = form.validate() {
            return Ok(AuthOutcome::Rejected(message));
        }

        let request = RegisterRequest {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };
        if let Err(err) = self.api.register(&request).await {
            return Ok(AuthOutcome::Rejected(err.to_string()));
        }
        info!(username = %request.username, "account created");

        let login = LoginForm::new(request.username, request.password);
        match self.login(&login).await? {
            AuthOutcome::Navigate(route) => Ok(AuthOutcome::Navigate(route)),
            AuthOutcome::Rejected(_) => Ok(AuthOutcome::Navigate(Route::Login)),
        }
    }

    pub fn logout(&mut self) -> Result<AuthOutcome, StoreError> {
        self.api.set_token(None);
        clear_credentials(self.store.as_ref())?;
        info!("logged out");
        Ok(AuthOutcome::Navigate(Route::Login))
    }
}
