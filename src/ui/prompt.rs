//! Interactive forms for login and registration.

use std::io;

use crate::core::app::{LoginForm, RegistrationForm};
use crate::utils::line_editor::{read_line, Echo};

/// Ask for username and password. `None` means the user backed out.
pub fn prompt_login(default_username: Option<&str>) -> io::Result<Option<LoginForm>> {
    let label = match default_username {
        Some(name) => format!("Username [{name}]: "),
        None => "Username: ".to_string(),
    };
    let Some(mut username) = read_line(&label, Echo::Visible)? else {
        return Ok(None);
    };
    if username.trim().is_empty() {
        if let Some(name) = default_username {
            username = name.to_string();
        }
    }
    let Some(password) = read_line("Password: ", Echo::Masked)? else {
        return Ok(None);
    };
    Ok(Some(LoginForm::new(username.trim(), password)))
}

pub fn prompt_registration() -> io::Result<Option<RegistrationForm>> {
    let fields = [
        ("Username: ", Echo::Visible),
        ("Email: ", Echo::Visible),
        ("Password: ", Echo::Masked),
        ("Confirm password: ", Echo::Masked),
    ];
    let mut answers = Vec::with_capacity(fields.len());
    for (label, echo) in fields {
        match read_line(label, echo)? {
            Some(answer) => answers.push(answer),
            None => return Ok(None),
        }
    }
    let mut answers = answers.into_iter();
    let mut next = || answers.next().unwrap_or_default();
    Ok(Some(RegistrationForm {
        username: next().trim().to_string(),
        email: next().trim().to_string(),
        password: next(),
        confirm_password: next(),
    }))
}

/// Whether `answer` to a y/N question means yes. Anything else is no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn confirm(question: &str) -> io::Result<bool> {
    let answer = read_line(&format!("{question} [y/N] "), Echo::Visible)?;
    Ok(answer.as_deref().is_some_and(is_affirmative))
}
