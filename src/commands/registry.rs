use super::ChatCommand;

pub type CommandParser = fn(CommandInvocation<'_>) -> Result<ChatCommand, String>;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub parse: CommandParser,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`, for "did you mean" hints.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        parse: super::parse_help,
    },
    Command {
        name: "new",
        usage: "/new",
        help: "Start a new conversation.",
        parse: super::parse_new,
    },
    Command {
        name: "sessions",
        usage: "/sessions",
        help: "List your conversations.",
        parse: super::parse_sessions,
    },
    Command {
        name: "open",
        usage: "/open <n|id>",
        help: "Open a conversation by list number or id.",
        parse: super::parse_open,
    },
    Command {
        name: "delete",
        usage: "/delete [n|id]",
        help: "Delete a conversation (defaults to the open one).",
        parse: super::parse_delete,
    },
    Command {
        name: "rename",
        usage: "/rename <title>",
        help: "Rename the open conversation.",
        parse: super::parse_rename,
    },
    Command {
        name: "prefs",
        usage: "/prefs",
        help: "Show the preferences Nova has learned about you.",
        parse: super::parse_prefs,
    },
    Command {
        name: "memory",
        usage: "/memory [on|off]",
        help: "Show or toggle long-term memory for new messages.",
        parse: super::parse_memory,
    },
    Command {
        name: "model",
        usage: "/model [name|default]",
        help: "Show or override the model used for replies.",
        parse: super::parse_model,
    },
    Command {
        name: "logout",
        usage: "/logout",
        help: "Sign out and forget the stored login.",
        parse: super::parse_logout,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        parse: super::parse_quit,
    },
];
