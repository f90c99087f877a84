//! One-shot conversation commands: list, history, say, delete, rename,
//! export, and the preferences view.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use tokio::sync::mpsc;

use crate::cli::Context;
use crate::core::app::{ChatController, PreferencesPoller, SendOutcome};
use crate::ui::export::write_session_html;
use crate::ui::prompt::confirm;
use crate::ui::render::{write_message, write_preferences, write_sessions, write_transcript};
use crate::utils::input::sanitize_inline;

/// A logged-in controller with the session list already loaded.
async fn loaded_controller(context: &Context) -> Result<ChatController, Box<dyn Error>> {
    context.require_login()?;
    let mut chat = ChatController::new(context.api())
        .with_memory_enabled(context.config.memory_enabled())
        .with_model(context.config.model.clone());
    chat.load_sessions()
        .await
        .map_err(|err| context.api_failure(err))?;
    Ok(chat)
}

/// Map a list position or id to a session id.
fn resolve_session(chat: &ChatController, reference: &str) -> Result<String, Box<dyn Error>> {
    chat.find_session(reference)
        .map(|session| session.id.clone())
        .ok_or_else(|| {
            format!("No conversation matches '{reference}'. Run 'nova sessions' to list them.")
                .into()
        })
}

pub async fn list_sessions(context: &Context) -> Result<(), Box<dyn Error>> {
    let chat = loaded_controller(context).await?;
    write_sessions(&mut io::stdout().lock(), chat.sessions(), None)?;
    Ok(())
}

pub async fn show_history(context: &Context, reference: &str) -> Result<(), Box<dyn Error>> {
    let mut chat = loaded_controller(context).await?;
    let id = resolve_session(&chat, reference)?;
    chat.open_session(&id)
        .await
        .map_err(|err| context.api_failure(err))?;

    let mut out = io::stdout().lock();
    if let Some(title) = chat.current_title() {
        writeln!(out, "# {}\n", sanitize_inline(title))?;
    }
    if chat.messages().is_empty() {
        writeln!(out, "This conversation has no messages yet.")?;
    }
    write_transcript(&mut out, chat.messages(), context.config.markdown())?;
    Ok(())
}

pub async fn say(
    context: &Context,
    text: &str,
    reference: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let mut chat = loaded_controller(context).await?;
    if let Some(reference) = reference {
        let id = resolve_session(&chat, reference)?;
        chat.open_session(&id)
            .await
            .map_err(|err| context.api_failure(err))?;
    }

    let pending = chat.begin_send(text).ok_or("Nothing to send")?;
    let result = match context.api().send_chat(pending.request()).await {
        Err(err) if err.is_unauthorized() => return Err(context.api_failure(err)),
        other => other,
    };
    match chat.finish_send(pending, result) {
        SendOutcome::Replied => {
            let mut out = io::stdout().lock();
            if let Some(reply) = chat.messages().last().filter(|m| m.is_assistant()) {
                write_message(&mut out, reply, context.config.markdown())?;
            }
            if reference.is_none() {
                if let Some(id) = chat.current_session() {
                    eprintln!("(conversation {id})");
                }
            }
            Ok(())
        }
        SendOutcome::Discarded => Ok(()),
        SendOutcome::Failed(message) => Err(message.into()),
    }
}

pub async fn delete_session(
    context: &Context,
    reference: &str,
    assume_yes: bool,
) -> Result<(), Box<dyn Error>> {
    let mut chat = loaded_controller(context).await?;
    let id = resolve_session(&chat, reference)?;
    let deleted = chat
        .delete_session(&id, |title| {
            assume_yes
                || confirm(&format!("Delete \"{title}\"? This cannot be undone.")).unwrap_or(false)
        })
        .await
        .map_err(|err| context.api_failure(err))?;
    if deleted {
        println!("✅ Conversation deleted");
    } else {
        println!("Nothing deleted");
    }
    Ok(())
}

pub async fn rename_session(
    context: &Context,
    reference: &str,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    if title.trim().is_empty() {
        return Err("A new title is required".into());
    }
    let mut chat = loaded_controller(context).await?;
    let id = resolve_session(&chat, reference)?;
    chat.rename_session(&id, title)
        .await
        .map_err(|err| context.api_failure(err))?;
    println!("✅ Renamed to: {}", sanitize_inline(title));
    Ok(())
}

pub async fn export_session(
    context: &Context,
    reference: &str,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut chat = loaded_controller(context).await?;
    let id = resolve_session(&chat, reference)?;
    chat.open_session(&id)
        .await
        .map_err(|err| context.api_failure(err))?;

    let title = chat.current_title().unwrap_or("Conversation").to_string();
    write_session_html(output, &title, chat.messages())?;
    println!(
        "✅ Exported \"{}\" to {}",
        sanitize_inline(&title),
        output.display()
    );
    Ok(())
}

/// Print the learned preferences. With `watch`, keep polling and reprint
/// whenever they change, until Ctrl+C.
pub async fn show_preferences(context: &Context, watch: bool) -> Result<(), Box<dyn Error>> {
    context.require_login()?;
    let mut chat = ChatController::new(context.api());
    chat.refresh_preferences()
        .await
        .map_err(|err| context.api_failure(err))?;
    write_preferences(&mut io::stdout().lock(), chat.preferences())?;
    if !watch {
        return Ok(());
    }

    let (tx, mut updates) = mpsc::channel(4);
    let poller = PreferencesPoller::spawn(
        chat.api(),
        chat.preferences().sequence(),
        context.config.preferences_poll_interval(),
        tx,
    );
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => {
                let Some(update) = update else { break };
                let before = chat.preferences().preferences().clone();
                if chat.apply_preferences(update) && chat.preferences().preferences() != &before {
                    let mut out = io::stdout().lock();
                    writeln!(out)?;
                    write_preferences(&mut out, chat.preferences())?;
                }
            }
        }
    }
    drop(updates);
    poller.stop().await;
    Ok(())
}
