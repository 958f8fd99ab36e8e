//! Command grammar and the fixed reply texts.
//!
//! Matching is case-sensitive and done on the raw message body: exact match
//! for every command except `!tag `, which is a prefix.

/// Reply for group-only commands used in a direct chat.
pub const GROUP_ONLY_REPLY: &str = "This command can only be used in a group!";

/// Reply when `!sticker` is not a reply to a media message.
pub const STICKER_USAGE_REPLY: &str = "Reply to an image/video to create a sticker!";

/// Reply when sticker conversion fails.
pub const STICKER_ERROR_REPLY: &str = "Error creating sticker.";

/// Reply when a command could not fetch what it needed.
pub const LOOKUP_ERROR_REPLY: &str = "Something went wrong, please try again.";

/// Caption on resent view-once media.
pub const VIEW_ONCE_CAPTION: &str = "Here is the view once image you sent.";

/// Caption on archived media of a deleted message.
pub const DELETED_MEDIA_CAPTION: &str = "Deleted Media";

/// Header of a `!tagall` broadcast.
pub const TAG_ALL_HEADER: &str = "*Everyone in this group:*";

/// Header of an `!admins` broadcast.
pub const ADMINS_HEADER: &str = "*Admins:*";

const TAG_PREFIX: &str = "!tag ";

/// A recognized text command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!tagall` or `@all`.
    TagAll,
    /// `!tag <fragment>`, with the fragment trimmed and lowercased.
    Tag(String),
    /// `!admins`.
    Admins,
    /// `!sticker`.
    Sticker,
    /// `!help`.
    Help,
}

impl Command {
    /// Classify a message body. Returns `None` for ordinary messages.
    pub fn parse(body: &str) -> Option<Self> {
        match body {
            "!tagall" | "@all" => Some(Self::TagAll),
            "!admins" => Some(Self::Admins),
            "!sticker" => Some(Self::Sticker),
            "!help" => Some(Self::Help),
            _ => body
                .strip_prefix(TAG_PREFIX)
                .map(|rest| Self::Tag(rest.trim().to_lowercase())),
        }
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TagAll => "tagall",
            Self::Tag(_) => "tag",
            Self::Admins => "admins",
            Self::Sticker => "sticker",
            Self::Help => "help",
        }
    }
}

/// Header of a `!tag` broadcast.
pub fn matches_header(fragment: &str) -> String {
    format!("*Matches for \"{fragment}\":*")
}

/// Reply when `!tag` finds nobody.
pub fn no_match_reply(fragment: &str) -> String {
    format!("No one found with name \"{fragment}\".")
}

/// The `!help` text.
pub fn help_text() -> String {
    [
        "*WhatsApp Bot Commands*",
        "-------------------------",
        "*!tagall* or *@all*: Tag everyone in the group.",
        "*!tag <name>*: Tag specific people (e.g., !tag david).",
        "*!admins*: Tag all group admins.",
        "*!sticker*: Reply to an image to turn it into a sticker.",
        "*View Once Saver*: Send a view once image, and I will send it back to you.",
        "*Deleted Messages*: I automatically save deleted messages to your \"Note to Self\".",
        "*!help*: Show this help message.",
    ]
    .join("\n")
}
