//! Message formatting for the two output targets: HTML exports and the
//! terminal.
//!
//! Both walk the same pulldown-cmark event stream and only understand a small
//! markdown subset: bold, italic, inline code, code blocks, headings, lists
//! and line breaks. Raw HTML in a message is never passed through; it is
//! printed as the text the user typed.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use ratatui::crossterm::style::Stylize;

use crate::utils::input::sanitize_display_text;

#[derive(Clone, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render message text as an HTML fragment.
///
/// The text is escaped before the markdown pass runs, so nothing the user or
/// the model wrote can turn into markup: `<b>x</b>` comes out as the literal
/// characters. The parser decodes entities inside ordinary text, which is why
/// text events are escaped a second time on the way out; code spans and
/// blocks keep their already-escaped content verbatim.
pub fn format_html(text: &str) -> String {
    let escaped = escape_html(&sanitize_display_text(text));
    let mut out = String::with_capacity(escaped.len() + 16);
    let mut lists: Vec<ListKind> = Vec::new();
    let mut in_code_block = false;
    let mut blocks = 0usize;

    for event in Parser::new(&escaped) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if blocks > 0 && lists.is_empty() {
                    out.push_str("<br><br>");
                }
                blocks += 1;
            }
            Event::Start(Tag::Heading { .. }) => {
                if blocks > 0 {
                    out.push_str("<br><br>");
                }
                blocks += 1;
                out.push_str("<strong>");
            }
            Event::End(TagEnd::Heading(_)) => out.push_str("</strong>"),
            Event::Start(Tag::Strong) => out.push_str("<strong>"),
            Event::End(TagEnd::Strong) => out.push_str("</strong>"),
            Event::Start(Tag::Emphasis) => out.push_str("<em>"),
            Event::End(TagEnd::Emphasis) => out.push_str("</em>"),
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                blocks += 1;
                out.push_str("<pre><code>");
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push_str("</code></pre>");
            }
            Event::Start(Tag::List(start)) => {
                if lists.is_empty() && blocks > 0 {
                    out.push_str("<br>");
                }
                blocks += 1;
                lists.push(start.map_or(ListKind::Unordered, ListKind::Ordered));
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() {
                    out.push_str("<br>");
                }
                out.push_str(&"&nbsp;&nbsp;".repeat(lists.len().saturating_sub(1)));
                match lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::Code(code) => {
                out.push_str("<code>");
                out.push_str(&code);
                out.push_str("</code>");
            }
            Event::Text(text) if in_code_block => out.push_str(&text),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                out.push_str(&escape_html(&text))
            }
            Event::SoftBreak | Event::HardBreak => out.push_str("<br>"),
            Event::Rule => out.push_str("<hr>"),
            _ => {}
        }
    }

    out.trim_end_matches("<br>").to_string()
}

/// Render message text for the terminal.
///
/// Control characters are stripped first so server text cannot emit escape
/// sequences of its own. With `markdown` off the cleaned text is returned
/// unstyled.
pub fn format_terminal(text: &str, markdown: bool) -> String {
    let clean = sanitize_display_text(text);
    if !markdown {
        return clean;
    }

    let mut out = String::with_capacity(clean.len() + 32);
    let mut lists: Vec<ListKind> = Vec::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut in_code_block = false;
    let mut blocks = 0usize;

    for event in Parser::new(&clean) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if blocks > 0 && lists.is_empty() {
                    out.push_str("\n\n");
                }
                blocks += 1;
            }
            Event::Start(Tag::Heading { .. }) => {
                if blocks > 0 {
                    out.push_str("\n\n");
                }
                blocks += 1;
                bold += 1;
            }
            Event::End(TagEnd::Heading(_)) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Strong) => bold += 1,
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::Start(Tag::CodeBlock(kind)) => {
                if blocks > 0 {
                    out.push_str("\n\n");
                }
                blocks += 1;
                in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        out.push_str(&format!("{}\n", format!("[{lang}]").dark_grey()));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::List(start)) => {
                if lists.is_empty() && blocks > 0 {
                    out.push('\n');
                }
                blocks += 1;
                lists.push(start.map_or(ListKind::Unordered, ListKind::Ordered));
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                out.push('\n');
                out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                match lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::Code(code) => out.push_str(&format!("{}", code.to_string().cyan())),
            Event::Text(text) if in_code_block => {
                out.push_str(&format!("{}", text.trim_end_matches('\n').to_string().cyan()))
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                out.push_str(&styled(&text, bold > 0, italic > 0))
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────"),
            _ => {}
        }
    }

    out.trim_start_matches('\n').to_string()
}

fn styled(text: &str, bold: bool, italic: bool) -> String {
    match (bold, italic) {
        (false, false) => text.to_string(),
        (true, false) => format!("{}", text.bold()),
        (false, true) => format!("{}", text.italic()),
        (true, true) => format!("{}", text.bold().italic()),
    }
}
