use teloxide::types::{ChatId, Recipient};

/// A chat that should receive notifications: a numeric chat id or an
/// `@username` of a group or channel. Kept exactly as written in the options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bot API `chat_id` for this destination
    pub fn recipient(&self) -> Recipient {
        match self.0.parse::<i64>() {
            Ok(id) => Recipient::Id(ChatId(id)),
            Err(_) => Recipient::ChannelUsername(self.0.clone()),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Line separators accepted in the receivers option (`\r\n` splits twice,
/// leaving an empty piece that is dropped).
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Parse the newline-separated receivers option.
///
/// The whole string is trimmed once, then blank lines are dropped. Order and
/// duplicates are preserved.
pub fn resolve(raw: &str) -> Vec<Destination> {
    raw.trim()
        .split(is_line_break)
        .filter(|line| !line.is_empty())
        .map(Destination::new)
        .collect()
}

pub fn resolve_option(raw: Option<&str>) -> Vec<Destination> {
    raw.map(resolve).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(destinations: &[Destination]) -> Vec<&str> {
        destinations.iter().map(Destination::as_str).collect()
    }

    #[test]
    fn test_drops_blank_lines() {
        assert_eq!(names(&resolve("a\n\nb\n ")), vec!["a", "b"]);
    }

    #[test]
    fn test_keeps_duplicates_in_order() {
        assert_eq!(names(&resolve("a\nb\na")), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(resolve("").is_empty());
        assert!(resolve("   \n\t\n  ").is_empty());
        assert!(resolve_option(None).is_empty());
    }

    #[test]
    fn test_only_outer_whitespace_is_trimmed() {
        // Interior lines keep their own whitespace; a line of spaces survives
        // because only empty lines are dropped.
        assert_eq!(
            names(&resolve("  -1001 \n  @alerts\n   \n42  ")),
            vec!["-1001 ", "  @alerts", "   ", "42"]
        );
    }

    #[test]
    fn test_crlf_lines() {
        assert_eq!(names(&resolve("123\r\n@ops\r\n")), vec!["123", "@ops"]);
    }

    #[test]
    fn test_other_line_separators() {
        assert_eq!(
            names(&resolve("111\r222\x0b333\x0c444\u{2028}@ops\u{85}555\x1e666")),
            vec!["111", "222", "333", "444", "@ops", "555", "666"]
        );
    }

    #[test]
    fn test_recipient_kinds() {
        assert_eq!(
            Destination::new("-1001234567890").recipient(),
            Recipient::Id(ChatId(-1001234567890))
        );
        assert_eq!(
            Destination::new("@alerts").recipient(),
            Recipient::ChannelUsername("@alerts".to_string())
        );
    }
}
