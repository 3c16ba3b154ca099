//! Command parsing
//!
//! Commands are recognized by their first token; a `@botname` suffix is
//! stripped so group mentions keep working. Admin commands carry an
//! optional numeric argument; a missing or malformed argument yields
//! `None` and the handler answers with a usage hint.

/// Parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Translate,
    Languages,
    Status,
    Cancel,
    /// Textual language pick, `/lang_<code>`
    Lang(String),
    AddUser(Option<i64>),
    RemoveUser(Option<i64>),
    ListUsers,
    ResetUsage(Option<i64>),
    Unknown,
}

impl Command {
    /// Parse a message text. `None` when the text is not a command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.split_whitespace();
        let token = parts.next().unwrap_or_default();
        // "/start@maximus_bot" → "/start"
        let token = token.split('@').next().unwrap_or(token);
        let arg = parts.next().and_then(|a| a.parse::<i64>().ok());

        let cmd = match token {
            "/start" => Self::Start,
            "/help" => Self::Help,
            "/translate" => Self::Translate,
            "/languages" => Self::Languages,
            "/status" => Self::Status,
            "/cancel" => Self::Cancel,
            "/adduser" => Self::AddUser(arg),
            "/removeuser" => Self::RemoveUser(arg),
            "/listusers" => Self::ListUsers,
            "/resetusage" => Self::ResetUsage(arg),
            _ => token
                .strip_prefix("/lang_")
                .filter(|code| !code.is_empty())
                .map_or(Self::Unknown, |code| Self::Lang(code.to_string())),
        };
        Some(cmd)
    }
}
