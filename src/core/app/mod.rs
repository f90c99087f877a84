//! Controllers behind each screen of the client.
//!
//! They hold view state and talk to the backend through [`NovaApi`], but never
//! touch the terminal. The `ui` layer drives them and renders what they hold.
//!
//! [`NovaApi`]: crate::api::NovaApi

pub mod auth;
pub mod chat;
pub mod preferences;
pub mod route;


pub use auth::{AuthController, AuthOutcome, LoginForm, RegistrationForm};
pub use chat::{ChatController, PendingSend, SendOutcome};
pub use preferences::{PreferencesPanel, PreferencesPoller, PreferencesUpdate, RequestSequence};
pub use route::{bootstrap, resolve_route, Bootstrap, Route};
