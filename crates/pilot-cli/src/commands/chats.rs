//! /chats and /switch commands

use super::CommandResult;
use crate::utils::{format_timestamp, truncate_chars};
use pilot_agent::{ChatIndex, SessionId};

pub struct ChatsCommand;

impl ChatsCommand {
    pub fn execute(index: &ChatIndex, current: &SessionId) -> CommandResult {
        CommandResult::Message(Self::list_text(index, Some(current)))
    }

    /// Numbered chat listing, marking `current` with `*`
    pub fn list_text(index: &ChatIndex, current: Option<&SessionId>) -> String {
        if index.is_empty() {
            return "No chats yet. Start one with /new.".to_string();
        }

        let mut output = String::from("Your chats:\n");
        output.push_str(&format!(
            "    {:<3} {:<10} {:<17} Title\n",
            "#", "ID", "Created"
        ));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for (i, chat) in index.list().iter().enumerate() {
            let marker = if current == Some(&chat.id) { "*" } else { " " };
            output.push_str(&format!(
                "  {} {:<3} {:<10} {:<17} {}\n",
                marker,
                i + 1,
                chat.id.short(),
                format_timestamp(chat.created_at),
                truncate_chars(&chat.title, 40)
            ));
        }

        output.push_str("\nSwitch with: /switch <number or id prefix>");
        output
    }
}

pub struct SwitchCommand;

impl SwitchCommand {
    pub fn execute(args: &str, index: &ChatIndex) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /switch <number or id prefix>".to_string());
        }

        match index.resolve(args) {
            Some(chat) => CommandResult::SwitchChat(chat.id.clone()),
            None => CommandResult::Message(format!(
                "No chat matches '{}'. Use /chats to list them.",
                args
            )),
        }
    }
}
