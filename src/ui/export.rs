//! Standalone HTML export of a conversation.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::core::message::Message;
use crate::ui::format::{escape_html, format_html};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#222}\
.message{padding:.75rem 1rem;margin:.5rem 0;border-radius:.5rem}\
.user{background:#e8f0fe;margin-left:3rem}\
.assistant{background:#f4f4f5;margin-right:3rem}\
.role{font-size:.8rem;font-weight:600;color:#555;margin-bottom:.25rem}\
code{background:#eee;padding:0 .2rem;border-radius:.2rem}\
pre{background:#eee;padding:.5rem;overflow-x:auto}\
footer{color:#888;font-size:.8rem;margin-top:2rem}";

/// Build a self-contained HTML page for `messages`. Client-side notices are
/// left out; only what the server stored is exported.
pub fn render_session_html(title: &str, messages: &[Message]) -> String {
    let title = escape_html(title);
    let mut body = String::new();
    for message in messages.iter().filter(|m| !m.role.is_app()) {
        let (class, label) = if message.is_user() {
            ("user", "You")
        } else {
            ("assistant", "Nova")
        };
        body.push_str(&format!(
            "<div class=\"message {class}\"><div class=\"role\">{label}</div><div class=\"content\">{}</div></div>\n",
            format_html(&message.content)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}<footer>Exported {}</footer>\n</body>\n</html>\n",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    )
}

/// Write the export atomically so a failed write never leaves half a page.
pub fn write_session_html(path: &Path, title: &str, messages: &[Message]) -> std::io::Result<()> {
    let html = render_session_html(title, messages);
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(html.as_bytes())?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
