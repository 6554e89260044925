//! Ephemeral one-to-one chat bound to the adjacent peer.

use chrono::{DateTime, Local};
use shared::{Identity, WireMessage};

/// Sender name used for the synthetic entry every session opens with.
pub const SYSTEM_SENDER: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub at: DateTime<Local>,
}

impl ChatEntry {
    pub fn display_time(&self) -> String {
        self.at.format("%H:%M:%S").to_string()
    }

    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }
}

/// An open chat with one recipient. Dropping it closes the chat; nothing
/// carries over to the next session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    recipient: String,
    log: Vec<ChatEntry>,
}

impl ChatSession {
    pub fn open(recipient: &str, at: DateTime<Local>) -> Self {
        Self {
            recipient: recipient.to_string(),
            log: vec![ChatEntry {
                sender: SYSTEM_SENDER.to_string(),
                text: format!("Connected to {}", recipient),
                at,
            }],
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.log
    }

    /// Logs an outgoing line and builds the frame for it.
    ///
    /// The log shows the line upper-cased; the frame keeps the text as typed.
    /// Blank input produces nothing.
    pub fn compose(
        &mut self,
        local: &Identity,
        text: &str,
        at: DateTime<Local>,
    ) -> Option<WireMessage> {
        if text.trim().is_empty() {
            return None;
        }

        self.log.push(ChatEntry {
            sender: local.as_str().to_string(),
            text: text.to_uppercase(),
            at,
        });
        Some(WireMessage::chat(local, &self.recipient, text))
    }

    /// Appends an incoming line if it comes from the bound recipient.
    pub fn receive(&mut self, sender: &str, message: &str, at: DateTime<Local>) -> bool {
        if sender != self.recipient {
            return false;
        }

        self.log.push(ChatEntry {
            sender: sender.to_string(),
            text: message.to_string(),
            at,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    #[test]
    fn test_session_starts_with_system_entry() {
        let session = ChatSession::open("bob", Local::now());

        assert_eq!(session.recipient(), "bob");
        assert_eq!(session.entries().len(), 1);
        assert!(session.entries()[0].is_system());
        assert_eq!(session.entries()[0].text, "Connected to bob");
    }

    #[test]
    fn test_compose_uppercases_log_but_not_wire() {
        let mut session = ChatSession::open("bob", Local::now());
        let frame = session.compose(&alice(), "hello", Local::now()).unwrap();

        assert_eq!(
            frame,
            WireMessage::Chat {
                recipient: "bob".to_string(),
                message: "hello".to_string(),
                sender: "alice".to_string(),
            }
        );
        let last = session.entries().last().unwrap();
        assert_eq!(last.sender, "alice");
        assert_eq!(last.text, "HELLO");
    }

    #[test]
    fn test_blank_input_sends_nothing() {
        let mut session = ChatSession::open("bob", Local::now());
        assert!(session.compose(&alice(), "   ", Local::now()).is_none());
        assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn test_receive_only_from_recipient() {
        let mut session = ChatSession::open("bob", Local::now());

        assert!(session.receive("bob", "hi alice", Local::now()));
        assert!(!session.receive("carol", "psst", Local::now()));

        let texts: Vec<&str> = session.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Connected to bob", "hi alice"]);
    }

    #[test]
    fn test_display_time_format() {
        let session = ChatSession::open("bob", Local::now());
        let time = session.entries()[0].display_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }
}
