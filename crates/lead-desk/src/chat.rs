use crate::router::SoundCue;
use lead_api::{ApiError, OutgoingChat};
use lead_core::events::ChatMessage;
use lead_core::LeadType;
use std::collections::VecDeque;
use tracing::warn;

pub const CHAT_HISTORY_LIMIT: usize = 200;
pub const MISSING_SENDER: &str = "Please select your Name in the chat dropdown first!";
const PLACEHOLDER_SENDER: &str = "Agent";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatSend {
    Ignored,
    Refused(&'static str),
    Send(OutgoingChat),
}

/// Department chat room of an operator portal.
#[derive(Debug)]
pub struct ChatPanel {
    department: Option<LeadType>,
    sender: Option<String>,
    messages: VecDeque<ChatMessage>,
    open: bool,
    unread: u32,
    pub draft: String,
    history_loaded: bool,
}

impl ChatPanel {
    pub fn new(department: Option<LeadType>, sender: Option<String>) -> Self {
        Self {
            department,
            sender: sender.filter(|name| !name.trim().is_empty()),
            messages: VecDeque::new(),
            open: false,
            unread: 0,
            draft: String::new(),
            history_loaded: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.department.is_some()
    }

    pub fn department(&self) -> Option<LeadType> {
        self.department
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn set_sender(&mut self, name: &str) {
        let name = name.trim();
        self.sender = (!name.is_empty()).then(|| name.to_string());
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
        if self.open {
            self.unread = 0;
        }
    }

    pub fn unread(&self) -> u32 {
        self.unread
    }

    pub fn badge(&self) -> Option<String> {
        match self.unread {
            0 => None,
            n if n > 9 => Some("9+".to_string()),
            n => Some(n.to_string()),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn needs_history(&self) -> bool {
        self.is_enabled() && !self.history_loaded
    }

    fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > CHAT_HISTORY_LIMIT {
            self.messages.pop_front();
        }
    }

    /// History is loaded once; entries without a department are kept.
    pub fn load_history(&mut self, result: Result<Vec<ChatMessage>, ApiError>) {
        let Some(department) = self.department else {
            return;
        };
        match result {
            Ok(history) => {
                self.history_loaded = true;
                let live: Vec<ChatMessage> = self.messages.drain(..).collect();
                for message in history.into_iter().filter(|m| m.is_for(department)) {
                    self.append(message);
                }
                for message in live {
                    self.append(message);
                }
            }
            Err(err) => warn!("chat_history_failed: {err}"),
        }
    }

    /// Live message already admitted by the router. Returns the cue to ring.
    pub fn receive(&mut self, message: ChatMessage) -> Option<SoundCue> {
        let from_self = self.sender.as_deref() == Some(message.sender.as_str());
        self.append(message);
        if from_self {
            return None;
        }
        if !self.open {
            self.unread = self.unread.saturating_add(1);
        }
        Some(SoundCue::Message)
    }

    pub fn begin_send(&mut self) -> ChatSend {
        let Some(department) = self.department else {
            return ChatSend::Ignored;
        };
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return ChatSend::Ignored;
        }
        let sender = match self.sender.as_deref() {
            Some(name) if name != PLACEHOLDER_SENDER => name.to_string(),
            _ => return ChatSend::Refused(MISSING_SENDER),
        };
        self.draft.clear();
        ChatSend::Send(OutgoingChat {
            sender,
            message: text,
            role: "agent".to_string(),
            dept: Some(department),
        })
    }

    /// The echo arrives over the channel; only failures matter here.
    pub fn complete_send(&mut self, result: Result<(), ApiError>) -> Option<String> {
        match result {
            Ok(()) => None,
            Err(err) => {
                warn!("chat_send_failed: {err}");
                Some(format!("chat send failed: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, dept: Option<&str>) -> ChatMessage {
        ChatMessage {
            sender: sender.to_string(),
            message: "hello".to_string(),
            role: "agent".to_string(),
            dept: dept.map(str::to_string),
            time: None,
        }
    }

    #[test]
    fn unread_badge_caps_at_nine_plus() {
        let mut chat = ChatPanel::new(Some(LeadType::Billing), Some("Haziq".to_string()));
        assert_eq!(chat.badge(), None);
        for _ in 0..3 {
            assert_eq!(chat.receive(message("Sam", Some("billing"))), Some(SoundCue::Message));
        }
        assert_eq!(chat.badge().as_deref(), Some("3"));
        for _ in 0..7 {
            chat.receive(message("Sam", Some("billing")));
        }
        assert_eq!(chat.unread(), 10);
        assert_eq!(chat.badge().as_deref(), Some("9+"));

        chat.toggle_open();
        assert_eq!(chat.badge(), None);
        chat.receive(message("Sam", Some("billing")));
        assert_eq!(chat.unread(), 0);
    }

    #[test]
    fn own_messages_are_silent() {
        let mut chat = ChatPanel::new(Some(LeadType::Billing), Some("Haziq".to_string()));
        assert_eq!(chat.receive(message("Haziq", Some("billing"))), None);
        assert_eq!(chat.unread(), 0);
        assert_eq!(chat.messages().count(), 1);
    }

    #[test]
    fn send_requires_a_real_sender() {
        let mut chat = ChatPanel::new(Some(LeadType::Insurance), None);
        chat.draft = "  need help  ".to_string();
        assert_eq!(chat.begin_send(), ChatSend::Refused(MISSING_SENDER));
        chat.set_sender("Agent");
        assert_eq!(chat.begin_send(), ChatSend::Refused(MISSING_SENDER));
        assert_eq!(chat.draft, "  need help  ");

        chat.set_sender("Areeb");
        let ChatSend::Send(outgoing) = chat.begin_send() else {
            panic!("expected send")
        };
        assert_eq!(outgoing.message, "need help");
        assert_eq!(outgoing.dept, Some(LeadType::Insurance));
        assert!(chat.draft.is_empty());
        assert_eq!(chat.begin_send(), ChatSend::Ignored);
    }

    #[test]
    fn history_is_filtered_and_precedes_live_messages() {
        let mut chat = ChatPanel::new(Some(LeadType::Billing), None);
        assert!(chat.needs_history());
        chat.receive(message("Live", Some("billing")));
        chat.load_history(Ok(vec![
            message("Old", Some("billing")),
            message("Other", Some("insurance")),
            message("Global", None),
        ]));
        let senders: Vec<&str> = chat.messages().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, vec!["Old", "Global", "Live"]);
        assert!(!chat.needs_history());
    }

    #[test]
    fn manager_portal_has_no_chat() {
        let mut chat = ChatPanel::new(None, Some("Boss".to_string()));
        chat.draft = "hi".to_string();
        assert!(!chat.is_enabled());
        assert!(!chat.needs_history());
        assert_eq!(chat.begin_send(), ChatSend::Ignored);
    }
}
