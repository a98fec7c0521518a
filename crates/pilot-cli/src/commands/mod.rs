//! Slash commands for interactive mode

mod chats;

pub use chats::{ChatsCommand, SwitchCommand};

use std::path::PathBuf;

use pilot_agent::{ChatIndex, SessionId};

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Start a new chat, optionally titled
    NewChat(Option<String>),
    /// Make another chat current
    SwitchChat(SessionId),
    /// Retitle the current chat
    Rename(String),
    /// Empty the current chat's transcript
    Clear,
    /// Delete the current chat
    Delete,
    /// Write the current transcript to a file
    Export(PathBuf),
    /// Compose an email from a free-form instruction and send it
    Email(String),
    /// Show a message to the user (not sent to the assistant)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(
    input: &str,
    index: &ChatIndex,
    current: &SessionId,
) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::NewChat(non_empty(args)),

        "chats" | "ls" => ChatsCommand::execute(index, current),

        "switch" | "sw" => SwitchCommand::execute(args, index),

        "rename" | "r" => match non_empty(args) {
            Some(title) => CommandResult::Rename(title),
            None => CommandResult::Message("Usage: /rename <title>".to_string()),
        },

        "clear" | "c" => CommandResult::Clear,

        "delete" | "rm" => CommandResult::Delete,

        "export" | "x" => {
            let path = match args {
                "" => PathBuf::from(format!("chat_{}.json", current)),
                path => PathBuf::from(path),
            };
            CommandResult::Export(path)
        }

        "email" | "e" => match non_empty(args) {
            Some(instruction) => CommandResult::Email(instruction),
            None => CommandResult::Message(
                "Usage: /email <instruction>, e.g. /email send ada@example.com a reminder about Friday"
                    .to_string(),
            ),
        },

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn non_empty(args: &str) -> Option<String> {
    (!args.is_empty()).then(|| args.to_string())
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /new, /n [title]       Start a new chat
  /chats, /ls            List your chats
  /switch, /sw <chat>    Switch chat by number or id prefix
  /rename, /r <title>    Rename the current chat
  /clear, /c             Clear the current chat's history
  /delete, /rm           Delete the current chat
  /export, /x [path]     Save the current chat as JSON
  /email, /e <request>   Compose and send an email
  /quit, /exit, /q       Exit pilot

Examples:
  /new Trip planning     Start a chat titled "Trip planning"
  /switch 2              Switch to the second chat in /chats
  /export notes.json     Write the current chat to notes.json"#
        .to_string()
}
