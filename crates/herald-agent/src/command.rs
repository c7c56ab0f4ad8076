//! Prefix command parsing.

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Member counts of the ArmA and Falcon player roles and their ratio.
    Ratio,
    /// Join a group role. The argument may be empty.
    Join(String),
    /// Leave a group role. The argument may be empty.
    Leave(String),
    Events,
    Mission,
    Shutdown,
}

impl Command {
    /// Parse `content` if it starts with `prefix` and names a known command.
    /// Command names are case-insensitive; the argument is kept verbatim.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let body = content.trim().strip_prefix(prefix)?;
        let (name, arg) = match body.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (body, ""),
        };

        match name.to_lowercase().as_str() {
            "help" => Some(Self::Help),
            "ratio" => Some(Self::Ratio),
            "join" => Some(Self::Join(arg.to_string())),
            "leave" => Some(Self::Leave(arg.to_string())),
            "events" => Some(Self::Events),
            "mission" => Some(Self::Mission),
            "shutdown" => Some(Self::Shutdown),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Ratio => "ratio",
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Events => "events",
            Self::Mission => "mission",
            Self::Shutdown => "shutdown",
        }
    }

    /// Help text listing every command under `prefix`.
    pub fn help_text(prefix: &str) -> String {
        [
            ("help", "show this list"),
            ("ratio", "ArmA players versus Falcon players"),
            ("join <group>", "get the role for a group"),
            ("leave <group>", "drop the role for a group"),
            ("events", "upcoming calendar events"),
            ("mission", "the mission currently on the server"),
            ("shutdown", "stop the bot (admins only)"),
        ]
        .iter()
        .map(|(usage, what)| format!("`{prefix}{usage}` {what}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("!", "!help"), Some(Command::Help));
        assert_eq!(Command::parse("!", "  !EVENTS "), Some(Command::Events));
        assert_eq!(Command::parse("!", "!mission"), Some(Command::Mission));
        assert_eq!(Command::parse("!", "!Ratio"), Some(Command::Ratio));
        assert_eq!(Command::parse("!", "!shutdown now"), Some(Command::Shutdown));
        assert_eq!(
            Command::parse("!", "!join   Falcon Player "),
            Some(Command::Join("Falcon Player".into()))
        );
        assert_eq!(Command::parse("!", "!leave"), Some(Command::Leave(String::new())));
    }

    #[test]
    fn test_parse_ignores_other_messages() {
        assert_eq!(Command::parse("!", "hello there"), None);
        assert_eq!(Command::parse("!", "!dance"), None);
        assert_eq!(Command::parse("!", "?help"), None);
        assert_eq!(Command::parse("!", ""), None);
        assert_eq!(Command::parse("herald ", "herald help"), Some(Command::Help));
    }

    #[test]
    fn test_help_text_uses_prefix() {
        let help = Command::help_text("?");
        assert!(help.contains("`?join <group>`"));
        assert_eq!(help.lines().count(), 7);
    }
}
