//! Raw-mode single-line prompt with optional masking, used for passwords.

use std::io::{self, IsTerminal, Write};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use unicode_width::UnicodeWidthStr;

use crate::utils::input::sanitize_text_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Visible,
    Masked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKey {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    KillToEnd,
    KillWord,
    Clear,
    Paste(String),
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    Pending,
    Done(String),
    Cancelled,
}

/// Text being edited plus a cursor counted in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptLine {
    text: String,
    cursor: usize,
}

impl PromptLine {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_at(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    pub fn apply(&mut self, key: EditKey) -> EditStep {
        match key {
            EditKey::Insert(c) => {
                let at = self.byte_at(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
            }
            EditKey::Backspace if self.cursor > 0 => {
                let (start, end) = (self.byte_at(self.cursor - 1), self.byte_at(self.cursor));
                self.text.replace_range(start..end, "");
                self.cursor -= 1;
            }
            EditKey::Delete if self.cursor < self.len() => {
                let (start, end) = (self.byte_at(self.cursor), self.byte_at(self.cursor + 1));
                self.text.replace_range(start..end, "");
            }
            EditKey::Left => self.cursor = self.cursor.saturating_sub(1),
            EditKey::Right => self.cursor = (self.cursor + 1).min(self.len()),
            EditKey::Home => self.cursor = 0,
            EditKey::End => self.cursor = self.len(),
            EditKey::KillToEnd => {
                let at = self.byte_at(self.cursor);
                self.text.truncate(at);
            }
            EditKey::KillWord => {
                let chars: Vec<char> = self.text.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                let (from, to) = (self.byte_at(start), self.byte_at(self.cursor));
                self.text.replace_range(from..to, "");
                self.cursor = start;
            }
            EditKey::Clear => {
                self.text.clear();
                self.cursor = 0;
            }
            EditKey::Paste(pasted) => {
                let mut lines = pasted.split('\n');
                let first = lines.next().unwrap_or_default();
                let at = self.byte_at(self.cursor);
                self.text.insert_str(at, first);
                self.cursor += first.chars().count();
                if lines.next().is_some() {
                    return EditStep::Done(self.text.clone());
                }
            }
            EditKey::Submit => return EditStep::Done(self.text.clone()),
            EditKey::Cancel => return EditStep::Cancelled,
            EditKey::Backspace | EditKey::Delete => {}
        }
        EditStep::Pending
    }

    pub fn rendered(&self, echo: Echo) -> String {
        match echo {
            Echo::Visible => self.text.clone(),
            Echo::Masked => "*".repeat(self.len()),
        }
    }
}

pub fn key_to_edit(key: &KeyEvent) -> Option<EditKey> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(EditKey::Submit),
        KeyCode::Esc => Some(EditKey::Cancel),
        KeyCode::Backspace => Some(EditKey::Backspace),
        KeyCode::Delete => Some(EditKey::Delete),
        KeyCode::Left => Some(EditKey::Left),
        KeyCode::Right => Some(EditKey::Right),
        KeyCode::Home => Some(EditKey::Home),
        KeyCode::End => Some(EditKey::End),
        KeyCode::Char('a') if ctrl => Some(EditKey::Home),
        KeyCode::Char('e') if ctrl => Some(EditKey::End),
        KeyCode::Char('k') if ctrl => Some(EditKey::KillToEnd),
        KeyCode::Char('w') if ctrl => Some(EditKey::KillWord),
        KeyCode::Char('u') if ctrl => Some(EditKey::Clear),
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => Some(EditKey::Cancel),
        KeyCode::Char('\n') | KeyCode::Char('\r') => Some(EditKey::Submit),
        KeyCode::Char(c) if !ctrl => Some(EditKey::Insert(c)),
        _ => None,
    }
}

/// Leaves raw mode and bracketed paste when dropped, even on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), event::EnableBracketedPaste) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), event::DisableBracketedPaste);
        let _ = disable_raw_mode();
    }
}

/// Read one line from the terminal. Returns `None` if the user cancels.
///
/// When stdin is not a terminal the line is read plainly, without echo
/// control, so scripted input keeps working.
pub fn read_line(prompt: &str, echo: Echo) -> io::Result<Option<String>> {
    if !io::stdin().is_terminal() {
        return read_piped_line(prompt);
    }

    let step = {
        let _guard = RawModeGuard::enter()?;
        let mut line = PromptLine::default();
        redraw(prompt, &line, echo)?;
        loop {
            let key = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key_to_edit(&key),
                Event::Paste(text) => Some(EditKey::Paste(sanitize_text_input(&text))),
                _ => None,
            };
            let Some(key) = key else { continue };
            match line.apply(key) {
                EditStep::Pending => redraw(prompt, &line, echo)?,
                done => break done,
            }
        }
    };
    println!();

    Ok(match step {
        EditStep::Done(text) => Some(text),
        EditStep::Pending | EditStep::Cancelled => None,
    })
}

fn read_piped_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buffer = String::new();
    if io::stdin().read_line(&mut buffer)? == 0 {
        return Ok(None);
    }
    Ok(Some(buffer.trim_end_matches(['\r', '\n']).to_string()))
}

fn redraw(prompt: &str, line: &PromptLine, echo: Echo) -> io::Result<()> {
    let shown = line.rendered(echo);
    let before_cursor: String = shown.chars().take(line.cursor()).collect();
    let column = UnicodeWidthStr::width(prompt) + UnicodeWidthStr::width(before_cursor.as_str());

    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[K{prompt}{shown}\r")?;
    if column > 0 {
        write!(stdout, "\x1b[{column}C")?;
    }
    stdout.flush()
}
