//! Slash commands typed at the chat prompt.

mod registry;


pub use registry::{all_commands, matching_commands, Command, CommandInvocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    New,
    Sessions,
    Open(String),
    /// `None` targets the open conversation.
    Delete(Option<String>),
    Rename(String),
    Prefs,
    Memory(Option<bool>),
    /// `Some(None)` resets to the server default; `None` shows the current model.
    Model(Option<Option<String>>),
    Logout,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Send(String),
    Command(ChatCommand),
    /// A slash command that could not be parsed; the text explains why.
    Invalid(String),
    Ignore,
}

pub fn process_input(input: &str) -> InputAction {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return InputAction::Ignore;
    }
    if !trimmed.starts_with('/') {
        return InputAction::Send(trimmed.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let args = parts.next().unwrap_or_default().trim();

    let Some(command) = registry::find_command(name) else {
        let hint = match registry::matching_commands(name).first() {
            Some(candidate) if !name.is_empty() => format!(" Did you mean {}?", candidate.usage),
            _ => " Type /help for a list.".to_string(),
        };
        return InputAction::Invalid(format!("Unknown command: /{name}.{hint}"));
    };

    match (command.parse)(CommandInvocation { name, args }) {
        Ok(parsed) => InputAction::Command(parsed),
        Err(message) => InputAction::Invalid(message),
    }
}

pub fn help_text() -> String {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or_default();
    let mut text = String::from("Commands:\n");
    for command in all_commands() {
        text.push_str(&format!("  {:<width$}  {}\n", command.usage, command.help));
    }
    text.push_str("Anything else is sent to Nova.");
    text
}

fn no_args(invocation: CommandInvocation<'_>, command: ChatCommand) -> Result<ChatCommand, String> {
    if invocation.args.is_empty() {
        Ok(command)
    } else {
        Err(format!("/{} takes no arguments", invocation.name))
    }
}

fn required_arg<'a>(invocation: CommandInvocation<'a>, usage: &str) -> Result<&'a str, String> {
    if invocation.args.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(invocation.args)
    }
}

pub(super) fn parse_help(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::Help)
}

pub(super) fn parse_new(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::New)
}

pub(super) fn parse_sessions(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::Sessions)
}

pub(super) fn parse_open(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    required_arg(invocation, "/open <n|id>").map(|arg| ChatCommand::Open(arg.to_string()))
}

pub(super) fn parse_delete(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    let target = (!invocation.args.is_empty()).then(|| invocation.args.to_string());
    Ok(ChatCommand::Delete(target))
}

pub(super) fn parse_rename(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    required_arg(invocation, "/rename <title>").map(|arg| ChatCommand::Rename(arg.to_string()))
}

pub(super) fn parse_prefs(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::Prefs)
}

pub(super) fn parse_memory(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    match invocation.args.to_ascii_lowercase().as_str() {
        "" => Ok(ChatCommand::Memory(None)),
        "on" | "true" | "yes" => Ok(ChatCommand::Memory(Some(true))),
        "off" | "false" | "no" => Ok(ChatCommand::Memory(Some(false))),
        other => Err(format!("Expected on or off, got '{other}'")),
    }
}

pub(super) fn parse_model(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    Ok(ChatCommand::Model(match invocation.args {
        "" => None,
        "default" => Some(None),
        model => Some(Some(model.to_string())),
    }))
}

pub(super) fn parse_logout(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::Logout)
}

pub(super) fn parse_quit(invocation: CommandInvocation<'_>) -> Result<ChatCommand, String> {
    no_args(invocation, ChatCommand::Quit)
}
