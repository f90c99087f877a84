//! Plain-terminal views: session list, transcript, preferences, memories.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use ratatui::crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::{MemoryEntry, Session};
use crate::core::app::PreferencesPanel;
use crate::core::message::{Message, TranscriptRole};
use crate::ui::format::format_terminal;
use crate::utils::input::sanitize_inline;

pub const PREFERENCES_PLACEHOLDER: &str =
    "No preferences learned yet. Keep chatting and Nova will pick up what you like.";
const TITLE_WIDTH: usize = 40;

/// Cut `text` to at most `max_width` terminal columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn local_stamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn write_sessions<W: Write>(
    out: &mut W,
    sessions: &[Session],
    current: Option<&str>,
) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "No conversations yet. Say something to start one.");
    }
    let number_width = sessions.len().to_string().len();
    for (index, session) in sessions.iter().enumerate() {
        let marker = if current == Some(session.id.as_str()) { "*" } else { " " };
        let title = truncate_to_width(&sanitize_inline(&session.title), TITLE_WIDTH);
        let pad = TITLE_WIDTH.saturating_sub(UnicodeWidthStr::width(title.as_str()));
        let memory = if session.memory_enabled { "" } else { "  (memory off)" };
        writeln!(
            out,
            "{marker}{:>number_width$}. {title}{}  {}{memory}",
            index + 1,
            " ".repeat(pad),
            local_stamp(session.updated_at.or(session.created_at)).dark_grey(),
        )?;
    }
    Ok(())
}

fn role_label(role: TranscriptRole) -> String {
    match role {
        TranscriptRole::User => format!("{}", "You".bold().green()),
        TranscriptRole::Assistant => format!("{}", "Nova".bold().magenta()),
        TranscriptRole::AppInfo => format!("{}", "ℹ".blue()),
        TranscriptRole::AppError => format!("{}", "❌".red()),
    }
}

pub fn write_message<W: Write>(out: &mut W, message: &Message, markdown: bool) -> io::Result<()> {
    let body = match message.role {
        TranscriptRole::User | TranscriptRole::Assistant => format_terminal(&message.content, markdown),
        TranscriptRole::AppInfo | TranscriptRole::AppError => {
            format_terminal(&message.content, false)
        }
    };
    writeln!(out, "{} {body}", role_label(message.role))
}

pub fn write_transcript<W: Write>(
    out: &mut W,
    messages: &[Message],
    markdown: bool,
) -> io::Result<()> {
    for message in messages {
        write_message(out, message, markdown)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Each non-empty category on its own line, values shown as `[chips]`.
pub fn write_preferences<W: Write>(out: &mut W, panel: &PreferencesPanel) -> io::Result<()> {
    writeln!(out, "{}", "What Nova knows about you".bold())?;
    if !panel.is_loaded() {
        return writeln!(out, "  {}", "Loading…".dark_grey());
    }
    if !panel.has_values() {
        return writeln!(out, "  {}", PREFERENCES_PLACEHOLDER.dark_grey());
    }
    for (category, values) in panel.visible_categories() {
        let chips = values
            .iter()
            .map(|value| format!("[{}]", sanitize_inline(value)))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "  {}: {chips}", sanitize_inline(category).cyan())?;
    }
    Ok(())
}

pub fn write_memories<W: Write>(out: &mut W, memories: &[MemoryEntry]) -> io::Result<()> {
    if memories.is_empty() {
        return writeln!(out, "No memories found.");
    }
    for memory in memories {
        let score = memory
            .similarity
            .map(|s| format!(" {:.0}%", s * 100.0))
            .unwrap_or_default();
        writeln!(
            out,
            "{} {}{}  {}",
            format!("[{}]", sanitize_inline(&memory.kind)).cyan(),
            sanitize_inline(&memory.content),
            score.dark_grey(),
            local_stamp(memory.created_at).dark_grey(),
        )?;
        writeln!(out, "    id: {}", sanitize_inline(&memory.id))?;
    }
    Ok(())
}
