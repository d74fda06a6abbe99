//! Interactive command parsing

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    /// Reset history, keeping the system message
    Clear,
    /// List qualified tool names
    Tools,
    /// Switch to the named backend, or the next configured one
    Switch(Option<String>),
    Help,
    /// Anything else goes to the model
    Query(String),
    /// Blank line
    Empty,
}

impl ReplCommand {
    /// Parse a line; command words are case-insensitive
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word.to_ascii_lowercase().as_str(), rest.is_empty()) {
            ("quit" | "exit", true) => ReplCommand::Quit,
            ("clear", true) => ReplCommand::Clear,
            ("tools", true) => ReplCommand::Tools,
            ("help", true) => ReplCommand::Help,
            ("switch", true) => ReplCommand::Switch(None),
            ("switch", false) if !rest.contains(char::is_whitespace) => {
                ReplCommand::Switch(Some(rest.to_string()))
            }
            _ => ReplCommand::Query(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  quit, exit       leave
  clear            forget the conversation (system prompt is kept)
  tools            list available tools
  switch [NAME]    switch to backend NAME, or the next configured backend
  help             show this message
Anything else is sent to the model.";

/// Name of the backend after `current` in `names`, wrapping around
pub fn next_backend<'a>(names: &'a [String], current: &str) -> Option<&'a str> {
    let position = names.iter().position(|n| n.eq_ignore_ascii_case(current));
    let next = match position {
        Some(i) => (i + 1) % names.len(),
        None => 0,
    };
    names.get(next).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(ReplCommand::parse("quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("EXIT"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("  Clear  "), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("tools"), ReplCommand::Tools);
        assert_eq!(ReplCommand::parse("help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("switch"), ReplCommand::Switch(None));
        assert_eq!(
            ReplCommand::parse("switch openrouter"),
            ReplCommand::Switch(Some("openrouter".into()))
        );
    }

    #[test]
    fn test_empty_input_is_ignored() {
        assert_eq!(ReplCommand::parse(""), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("   \t"), ReplCommand::Empty);
    }

    #[test]
    fn test_sentences_are_queries() {
        assert_eq!(
            ReplCommand::parse("clear the cache in /tmp"),
            ReplCommand::Query("clear the cache in /tmp".into())
        );
        assert_eq!(
            ReplCommand::parse("switch off the lights please"),
            ReplCommand::Query("switch off the lights please".into())
        );
        assert_eq!(
            ReplCommand::parse("what's the weather?"),
            ReplCommand::Query("what's the weather?".into())
        );
    }

    #[test]
    fn test_next_backend_wraps() {
        let names = vec!["chutes".to_string(), "openrouter".to_string()];
        assert_eq!(next_backend(&names, "chutes"), Some("openrouter"));
        assert_eq!(next_backend(&names, "OpenRouter"), Some("chutes"));
        assert_eq!(next_backend(&names, "unknown"), Some("chutes"));
        assert_eq!(next_backend(&[], "chutes"), None);
    }
}
