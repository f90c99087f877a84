//! Interactive chat session on a plain terminal.
//!
//! Three things can happen at any moment: the user submits a line, the reply
//! to an earlier message arrives, or the preferences poller delivers fresh
//! data. `tokio::select!` waits on all three so typing never blocks on the
//! network.

use std::error::Error;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::time::Duration;

use ratatui::crossterm::style::Stylize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ApiError, ChatResponse};
use crate::commands::{help_text, process_input, ChatCommand, InputAction};
use crate::core::app::{
    AuthController, ChatController, PendingSend, PreferencesPoller, SendOutcome,
};
use crate::core::message::Message;
use crate::ui::prompt::is_affirmative;
use crate::ui::render::{write_message, write_preferences, write_sessions, write_transcript};
use crate::utils::input::sanitize_inline;

type ReplyFuture = Pin<Box<dyn Future<Output = Result<ChatResponse, ApiError>> + Send>>;

#[derive(Debug, Clone)]
pub struct ChatLoopOptions {
    pub markdown: bool,
    pub poll_interval: Duration,
    pub username: Option<String>,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    Quit,
    LoggedOut,
    /// The server rejected the stored token.
    SessionExpired,
}

struct InFlight {
    pending: PendingSend,
    reply: ReplyFuture,
}

async fn next_reply(in_flight: &mut Option<InFlight>) -> Result<ChatResponse, ApiError> {
    match in_flight {
        Some(flight) => flight.reply.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Run until the user quits, logs out, or `input` ends. A reply still in
/// flight when input ends is waited for and shown.
pub async fn run_chat_loop<R, W>(
    chat: &mut ChatController,
    auth: &mut AuthController,
    options: &ChatLoopOptions,
    input: R,
    out: &mut W,
) -> Result<ChatExit, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let (tx, mut updates) = mpsc::channel(4);
    let poller = PreferencesPoller::spawn(
        chat.api(),
        chat.preferences().sequence(),
        options.poll_interval,
        tx,
    );

    write_banner(out, chat, options)?;
    if let Err(err) = chat.load_sessions().await {
        if let Some(exit) = report_error(out, &err)? {
            drop(updates);
            poller.stop().await;
            return Ok(exit);
        }
    }

    let mut in_flight: Option<InFlight> = None;
    let mut input_closed = false;

    let exit = loop {
        tokio::select! {
            line = lines.next_line(), if !input_closed => {
                match line? {
                    Some(line) => {
                        let action = process_input(&line);
                        if let Some(exit) =
                            handle_action(action, chat, auth, options, &mut lines, &mut in_flight, out)
                                .await?
                        {
                            break exit;
                        }
                    }
                    None => {
                        input_closed = true;
                        if in_flight.is_none() {
                            break ChatExit::Quit;
                        }
                    }
                }
            }
            result = next_reply(&mut in_flight), if in_flight.is_some() => {
                if let Some(InFlight { pending, .. }) = in_flight.take() {
                    if let Some(exit) = finish_reply(chat, options, pending, result, out).await? {
                        break exit;
                    }
                }
                if input_closed {
                    break ChatExit::Quit;
                }
            }
            Some(update) = updates.recv() => {
                if chat.apply_preferences(update) {
                    debug!("preferences updated by poller");
                }
            }
        }
        out.flush()?;
    };

    drop(updates);
    poller.stop().await;
    out.flush()?;
    Ok(exit)
}

fn write_banner<W: Write>(
    out: &mut W,
    chat: &ChatController,
    options: &ChatLoopOptions,
) -> std::io::Result<()> {
    match &options.username {
        Some(name) => writeln!(out, "Signed in as {}.", sanitize_inline(name).bold())?,
        None => writeln!(out, "Signed in.")?,
    }
    writeln!(
        out,
        "Memory is {}. Type /help for commands.",
        if chat.memory_enabled() { "on" } else { "off" }
    )?;
    out.flush()
}

/// Print `err`. Returns an exit reason when the login is no longer valid.
fn report_error<W: Write>(out: &mut W, err: &ApiError) -> std::io::Result<Option<ChatExit>> {
    if err.is_unauthorized() {
        return session_expired(out);
    }
    write_message(out, &Message::app_error(err.to_string()), false)?;
    Ok(None)
}

fn session_expired<W: Write>(out: &mut W) -> std::io::Result<Option<ChatExit>> {
    write_message(
        out,
        &Message::app_error("Your login has expired. Please log in again."),
        false,
    )?;
    Ok(Some(ChatExit::SessionExpired))
}

fn info<W: Write>(out: &mut W, text: impl Into<String>) -> std::io::Result<()> {
    write_message(out, &Message::app_info(text), false)
}

async fn handle_action<R, W>(
    action: InputAction,
    chat: &mut ChatController,
    auth: &mut AuthController,
    options: &ChatLoopOptions,
    lines: &mut Lines<R>,
    in_flight: &mut Option<InFlight>,
    out: &mut W,
) -> Result<Option<ChatExit>, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match action {
        InputAction::Ignore => Ok(None),
        InputAction::Invalid(message) => {
            write_message(out, &Message::app_error(message), false)?;
            Ok(None)
        }
        InputAction::Send(text) => {
            match chat.begin_send(&text) {
                Some(pending) => {
                    let api = chat.api();
                    let request = pending.request().clone();
                    *in_flight = Some(InFlight {
                        pending,
                        reply: Box::pin(async move { api.send_chat(&request).await }),
                    });
                    writeln!(out, "{}", "Nova is thinking…".dark_grey())?;
                }
                None => info(out, "Still waiting for the previous reply.")?,
            }
            Ok(None)
        }
        InputAction::Command(command) => {
            run_command(command, chat, auth, options, lines, out).await
        }
    }
}

async fn finish_reply<W: Write>(
    chat: &mut ChatController,
    options: &ChatLoopOptions,
    pending: PendingSend,
    result: Result<ChatResponse, ApiError>,
    out: &mut W,
) -> Result<Option<ChatExit>, Box<dyn Error>> {
    let expired = matches!(&result, Err(err) if err.is_unauthorized());
    match chat.finish_send(pending, result) {
        SendOutcome::Replied => {
            if let Some(reply) = chat.messages().last() {
                write_message(out, reply, options.markdown)?;
            }
            chat.refresh_after_send().await;
        }
        SendOutcome::Discarded => {
            info(
                out,
                "A reply arrived for a conversation you left. Open it again to read it.",
            )?;
            chat.refresh_after_send().await;
        }
        SendOutcome::Failed(_) if expired => return Ok(session_expired(out)?),
        SendOutcome::Failed(message) => {
            write_message(out, &Message::app_error(message), false)?;
        }
    }
    Ok(None)
}

async fn run_command<R, W>(
    command: ChatCommand,
    chat: &mut ChatController,
    auth: &mut AuthController,
    options: &ChatLoopOptions,
    lines: &mut Lines<R>,
    out: &mut W,
) -> Result<Option<ChatExit>, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match command {
        ChatCommand::Help => writeln!(out, "{}", help_text())?,
        ChatCommand::New => {
            chat.new_session();
            info(out, "Started a new conversation.")?;
        }
        ChatCommand::Sessions => {
            if let Err(err) = chat.load_sessions().await {
                return Ok(report_error(out, &err)?);
            }
            write_sessions(out, chat.sessions(), chat.current_session())?;
        }
        ChatCommand::Open(reference) => {
            if chat.sessions().is_empty() {
                if let Err(err) = chat.load_sessions().await {
                    return Ok(report_error(out, &err)?);
                }
            }
            let id = chat
                .find_session(&reference)
                .map(|session| session.id.clone())
                .unwrap_or(reference);
            if let Err(err) = chat.open_session(&id).await {
                return Ok(report_error(out, &err)?);
            }
            let title = chat.current_title().unwrap_or(&id).to_string();
            writeln!(out, "── {} ──", sanitize_inline(&title).bold())?;
            write_transcript(out, chat.messages(), options.markdown)?;
        }
        ChatCommand::Delete(target) => {
            let id = match target {
                Some(reference) => chat
                    .find_session(&reference)
                    .map(|session| session.id.clone())
                    .unwrap_or(reference),
                None => match chat.current_session() {
                    Some(id) => id.to_string(),
                    None => {
                        info(out, "No conversation is open. Use /delete <n|id>.")?;
                        return Ok(None);
                    }
                },
            };
            let title = chat
                .find_session(&id)
                .map(|session| sanitize_inline(&session.title))
                .unwrap_or_else(|| id.clone());
            write!(out, "Delete \"{title}\"? [y/N] ")?;
            out.flush()?;
            let answer = lines.next_line().await?;
            match chat
                .delete_session(&id, |_| answer.as_deref().is_some_and(is_affirmative))
                .await
            {
                Ok(true) => info(out, "Conversation deleted.")?,
                Ok(false) => info(out, "Kept it.")?,
                Err(err) => return Ok(report_error(out, &err)?),
            }
        }
        ChatCommand::Rename(title) => {
            let Some(id) = chat.current_session().map(str::to_string) else {
                info(out, "Nothing to rename yet. Send a message first.")?;
                return Ok(None);
            };
            if let Err(err) = chat.rename_session(&id, &title).await {
                return Ok(report_error(out, &err)?);
            }
            info(out, format!("Renamed to \"{}\".", sanitize_inline(&title)))?;
        }
        ChatCommand::Prefs => {
            if let Err(err) = chat.refresh_preferences().await {
                if let Some(exit) = report_error(out, &err)? {
                    return Ok(Some(exit));
                }
            }
            write_preferences(out, chat.preferences())?;
        }
        ChatCommand::Memory(None) => info(
            out,
            format!(
                "Memory is {}.",
                if chat.memory_enabled() { "on" } else { "off" }
            ),
        )?,
        ChatCommand::Memory(Some(enabled)) => {
            chat.set_memory_enabled(enabled);
            info(
                out,
                if enabled {
                    "Memory on: Nova will remember this conversation."
                } else {
                    "Memory off: new messages will not be remembered."
                },
            )?;
        }
        ChatCommand::Model(None) => info(
            out,
            format!("Model: {}", chat.model().unwrap_or("server default")),
        )?,
        ChatCommand::Model(Some(model)) => {
            chat.set_model(model);
            info(
                out,
                format!("Model set to {}.", chat.model().unwrap_or("server default")),
            )?;
        }
        ChatCommand::Logout => {
            auth.logout()?;
            info(out, "Logged out.")?;
            return Ok(Some(ChatExit::LoggedOut));
        }
        ChatCommand::Quit => return Ok(Some(ChatExit::Quit)),
    }
    Ok(None)
}
