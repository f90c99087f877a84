//! Sign-in, sign-out, and the interactive chat entry point.

use std::error::Error;
use std::io;

use chrono::{Local, Utc};
use tokio::io::BufReader;

use crate::api::NovaApi;
use crate::cli::Context;
use crate::core::app::{bootstrap, AuthController, AuthOutcome, ChatController, Route};
use crate::core::storage::{clear_credentials, load_credentials, CredentialStore, Credentials};
use crate::core::token::TokenClaims;
use crate::ui::chat_loop::{run_chat_loop, ChatExit, ChatLoopOptions};
use crate::ui::prompt::{prompt_login, prompt_registration};
use crate::utils::input::sanitize_inline;

const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Show the login form until it succeeds, the user backs out, or the
/// attempts run out. Returns whether the user is now signed in.
async fn login_interactively(
    auth: &mut AuthController,
    default_username: Option<&str>,
) -> Result<bool, Box<dyn Error>> {
    for _ in 0..MAX_LOGIN_ATTEMPTS {
        let Some(form) = prompt_login(default_username)? else {
            return Ok(false);
        };
        match auth.login(&form).await? {
            AuthOutcome::Navigate(Route::Chat) => return Ok(true),
            AuthOutcome::Navigate(_) => return Ok(false),
            AuthOutcome::Rejected(message) => eprintln!("❌ {message}"),
        }
    }
    Err("Too many failed login attempts".into())
}

/// The stored login when `requested` would be skipped for the chat, that is
/// when a signed-in user asks for the login or registration form.
fn signed_in_redirect(
    store: &dyn CredentialStore,
    requested: Route,
) -> Result<Option<Credentials>, Box<dyn Error>> {
    let boot = bootstrap(store, requested, Utc::now())?;
    Ok(match boot.route {
        Route::Chat if requested != Route::Chat => boot.credentials,
        _ => None,
    })
}

/// Returns whether the form should be skipped in favour of the chat.
fn announce_redirect(
    context: &Context,
    requested: Route,
    force: bool,
) -> Result<bool, Box<dyn Error>> {
    if force {
        return Ok(false);
    }
    let Some(credentials) = signed_in_redirect(context.store.as_ref(), requested)? else {
        return Ok(false);
    };
    let name = display_name(&credentials).unwrap_or_else(|| "your account".to_string());
    println!(
        "Already signed in as {}. Opening the chat (use --force to sign in again).",
        sanitize_inline(&name)
    );
    Ok(true)
}

pub async fn run_login(context: &Context, force: bool) -> Result<(), Box<dyn Error>> {
    if announce_redirect(context, Route::Login, force)? {
        return run_chat(context).await;
    }
    let previous = load_credentials(context.store.as_ref())?.map(|c| c.username);
    let mut auth = AuthController::new(context.api(), context.store.clone());
    if login_interactively(&mut auth, previous.as_deref()).await? {
        let username = load_credentials(context.store.as_ref())?
            .map(|c| c.username)
            .unwrap_or_default();
        println!("✅ Logged in as {username}");
    }
    Ok(())
}

pub async fn run_register(context: &Context, force: bool) -> Result<(), Box<dyn Error>> {
    if announce_redirect(context, Route::Register, force)? {
        return run_chat(context).await;
    }
    let Some(form) = prompt_registration()? else {
        return Ok(());
    };
    let mut auth = AuthController::new(context.api(), context.store.clone());
    match auth.register(&form).await? {
        AuthOutcome::Navigate(Route::Chat) => {
            println!("✅ Account created. Logged in as {}", form.username);
            Ok(())
        }
        AuthOutcome::Navigate(_) => {
            println!("✅ Account created. Run 'nova login' to sign in.");
            Ok(())
        }
        AuthOutcome::Rejected(message) => Err(message.into()),
    }
}

pub fn run_logout(context: &Context) -> Result<(), Box<dyn Error>> {
    let signed_in = load_credentials(context.store.as_ref())?.is_some();
    clear_credentials(context.store.as_ref())?;
    if signed_in {
        println!("✅ Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

/// The stored username, or the token's `sub` claim when none was stored.
fn display_name(credentials: &Credentials) -> Option<String> {
    Some(credentials.username.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| TokenClaims::decode(&credentials.token).and_then(|claims| claims.sub))
        .filter(|name| !name.trim().is_empty())
}

fn whoami_lines(credentials: &Credentials) -> Vec<String> {
    let claims = TokenClaims::decode(&credentials.token);
    let mut lines = vec![sanitize_inline(
        &display_name(credentials).unwrap_or_else(|| "(unknown user)".to_string()),
    )];
    if let Some(user_id) = claims.as_ref().and_then(|c| c.user_id.as_deref()) {
        lines.push(format!("User id: {}", sanitize_inline(user_id)));
    }
    if let Some(expiry) = claims.as_ref().and_then(TokenClaims::expires_at) {
        lines.push(format!(
            "Login valid until {}",
            expiry.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    lines
}

pub fn run_whoami(context: &Context) -> Result<(), Box<dyn Error>> {
    let credentials = context.require_login()?;
    for line in whoami_lines(&credentials) {
        println!("{line}");
    }
    println!("API: {}", context.api.base_url());
    Ok(())
}

pub async fn run_status(context: &Context) -> Result<(), Box<dyn Error>> {
    let health = context.api.health().await?;
    println!("✅ {} is {}", context.api.base_url(), health.status);
    Ok(())
}

/// Sign in if needed, then run the chat loop on stdin/stdout.
pub async fn run_chat(context: &Context) -> Result<(), Box<dyn Error>> {
    let mut auth = AuthController::new(context.api(), context.store.clone());
    let boot = bootstrap(context.store.as_ref(), Route::Chat, Utc::now())?;

    let credentials = match boot.credentials {
        Some(credentials) => credentials,
        None => {
            println!("Sign in to Nova. No account yet? Run 'nova register'.");
            if !login_interactively(&mut auth, None).await? {
                return Ok(());
            }
            load_credentials(context.store.as_ref())?
                .ok_or("Login succeeded but no credentials were stored")?
        }
    };
    context.api.set_token(Some(credentials.token.clone()));

    let mut chat = ChatController::new(context.api())
        .with_memory_enabled(context.config.memory_enabled())
        .with_model(context.config.model.clone());
    let options = ChatLoopOptions {
        markdown: context.config.markdown(),
        poll_interval: context.config.preferences_poll_interval(),
        username: display_name(&credentials),
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    match run_chat_loop(&mut chat, &mut auth, &options, stdin, &mut stdout).await? {
        ChatExit::Quit => {}
        ChatExit::LoggedOut => println!("Logged out. Run 'nova' to sign in again."),
        ChatExit::SessionExpired => {
            auth.logout()?;
            println!("Run 'nova' to sign in again.");
        }
    }
    Ok(())
}
