//! Classifies inbound chat events.

use regex::Regex;

use checkin_core::{ChatEvent, EventKind};

/// Channel commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start (or restart) the current week.
    Start,
    /// Post the current summary as a new message.
    Post,
    /// Delete the current week's record.
    Delete,
}

/// What an event asks the bot to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A completion attempt. `link` is the first qualifying link, if any.
    Completion { link: Option<String> },
    /// A channel command.
    Command(Command),
    /// Nothing for the bot.
    Ignore,
}

/// Keywords that turn a channel message into a [`Command`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CommandKeywords {
    pub start: String,
    pub post: String,
    pub delete: String,
}

/// Maps [`ChatEvent`]s to [`Trigger`]s.
#[derive(Clone, Debug)]
pub struct TriggerParser {
    link: Regex,
    keywords: CommandKeywords,
}

impl TriggerParser {
    /// Parser using `link` for completions and `keywords` for commands.
    pub fn new(link: Regex, keywords: CommandKeywords) -> Self {
        Self { link, keywords }
    }

    /// Classify `event`.
    ///
    /// Slack delivers a mention both as `app_mention` and as a plain message.
    /// A mention carrying a command keyword is left to the plain message so
    /// the command runs once and no completion is attempted.
    pub fn parse(&self, event: &ChatEvent) -> Trigger {
        let command = self.command(&event.text);
        match (event.kind, command) {
            (EventKind::Mention, Some(_)) => Trigger::Ignore,
            (EventKind::Mention, None) => Trigger::Completion {
                link: self.link.find(&event.text).map(|m| m.as_str().to_string()),
            },
            (EventKind::Message, Some(command)) => Trigger::Command(command),
            (EventKind::Message, None) => Trigger::Ignore,
        }
    }

    /// Command named anywhere in `text`. Delete wins over the others.
    pub fn command(&self, text: &str) -> Option<Command> {
        [
            (Command::Delete, &self.keywords.delete),
            (Command::Start, &self.keywords.start),
            (Command::Post, &self.keywords.post),
        ]
        .into_iter()
        .find(|(_, keyword)| !keyword.is_empty() && text.contains(keyword.as_str()))
        .map(|(command, _)| command)
    }
}
