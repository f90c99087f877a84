//! Text cleanup for anything that reaches the terminal.
//!
//! Input typed or pasted by the user and text sent back by the server both
//! pass through here, so neither can smuggle escape sequences into the
//! terminal.

/// Normalize typed or pasted input: tabs become four spaces, carriage
/// returns become newlines, and other control characters are dropped.
pub fn sanitize_text_input(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\t' => sanitized.push_str("    "),
            '\r' => sanitized.push('\n'),
            '\n' => sanitized.push(c),
            _ if !c.is_control() => sanitized.push(c),
            _ => {}
        }
    }

    sanitized
}

/// Clean server-provided text before printing it.
///
/// Like [`sanitize_text_input`], and additionally removes the Unicode
/// bidirectional override and isolate characters, which can make a line
/// display differently from what it contains. A `\r\n` pair collapses to
/// a single newline.
pub fn sanitize_display_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    sanitize_text_input(&normalized)
        .chars()
        .filter(|c| !is_bidi_control(*c))
        .collect()
}

/// Single-line variant for labels such as session titles.
pub fn sanitize_inline(text: &str) -> String {
    sanitize_display_text(text)
        .split('\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{200E}' | '\u{200F}')
}
