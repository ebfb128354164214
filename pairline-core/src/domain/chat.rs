use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatDirection {
    Local,
    Remote,
}

/// One line of in-session chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub direction: ChatDirection,
    pub text: String,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn local(text: String) -> Self {
        Self::new(ChatDirection::Local, text)
    }

    pub fn remote(text: String) -> Self {
        Self::new(ChatDirection::Remote, text)
    }

    fn new(direction: ChatDirection, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            text,
            timestamp: Timestamp::now(),
        }
    }
}

/// Terms blocked out of the box (off-platform solicitation)
pub const DEFAULT_DENY_LIST: &[&str] = &["onlyfans", "telegram", "cashapp", "venmo", "whatsapp"];

/// Naive keyword filter: case-insensitive substring match against a deny-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFilter {
    deny: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            deny: terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// A filter that lets everything through
    pub fn permissive() -> Self {
        Self { deny: Vec::new() }
    }

    pub fn allows(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        !self.deny.iter().any(|term| lowered.contains(term.as_str()))
    }

    pub fn terms(&self) -> &[String] {
        &self.deny
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_LIST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let filter = ContentFilter::new(["badword"]);
        assert!(!filter.allows("this has a BadWord in it"));
        assert!(!filter.allows("xxbadwordxx"));
        assert!(filter.allows("all clean"));
    }

    #[test]
    fn test_blank_terms_are_ignored() {
        let filter = ContentFilter::new(["", "  "]);
        assert!(filter.terms().is_empty());
        assert!(filter.allows("anything"));
    }

    #[test]
    fn test_default_filter() {
        let filter = ContentFilter::default();
        assert!(!filter.allows("add me on CashApp"));
        assert!(filter.allows("hello"));
    }

    #[test]
    fn test_message_directions() {
        let local = ChatMessage::local("hi".to_string());
        let remote = ChatMessage::remote("hey".to_string());
        assert_eq!(local.direction, ChatDirection::Local);
        assert_eq!(remote.direction, ChatDirection::Remote);
        assert_ne!(local.id, remote.id);
    }
}
