//! Core message types for chatbridge

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Upper-case label used when a transcript is rendered as plain text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

/// One role-tagged turn of a conversation.
///
/// Turns are never edited after creation; a transcript changes by appending
/// turns or by being replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Length of the content in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Renders the turn as `"<ROLE>: <content>"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);

        let parsed: ChatMessage = serde_json::from_str(r#"{"role":"system","content":"x"}"#).unwrap();
        assert_eq!(parsed.role, Role::System);
    }

    #[test]
    fn test_char_len_counts_characters() {
        let msg = ChatMessage::user("สวัสดี");
        assert_eq!(msg.char_len(), 6);
        assert!(msg.content.len() > 6);
    }

    #[test]
    fn test_render() {
        assert_eq!(ChatMessage::user("hello").render(), "USER: hello");
        assert_eq!(ChatMessage::assistant("hey").render(), "ASSISTANT: hey");
        assert_eq!(ChatMessage::system("be nice").render(), "SYSTEM: be nice");
    }
}
