//! Transient notification feed and the single toast slot.

use std::collections::VecDeque;
use std::time::Duration;

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);
pub const TOAST_TTL: Duration = Duration::from_secs(3);
pub const FEED_CAPACITY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub tone: Tone,
}

/// Append-only list; each entry is removed by its own expiry, never in bulk.
#[derive(Debug)]
pub struct NotificationFeed {
    items: VecDeque<Notification>,
    next_id: u64,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }
}

impl NotificationFeed {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 1,
            capacity: capacity.max(1),
        }
    }

    /// Returns the id the caller schedules the expiry for.
    pub fn push(&mut self, text: impl Into<String>, tone: Tone) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification {
            id,
            text: text.into(),
            tone,
        });
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        id
    }

    pub fn expire(&mut self, id: u64) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.items.iter()
    }

    /// Newest `limit` entries in arrival order, the view stays scrolled to the bottom.
    pub fn tail(&self, limit: usize) -> impl Iterator<Item = &Notification> {
        self.items.iter().skip(self.items.len().saturating_sub(limit))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub text: String,
    pub tone: Tone,
}

/// One toast at a time; a newer toast replaces the visible one.
#[derive(Debug, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
    next_id: u64,
}

impl ToastSlot {
    pub fn show(&mut self, text: impl Into<String>, tone: Tone) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.current = Some(Toast {
            id,
            text: text.into(),
            tone,
        });
        id
    }

    /// Stale expiries of replaced toasts are ignored.
    pub fn expire(&mut self, id: u64) {
        if self.current.as_ref().map(|toast| toast.id) == Some(id) {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_notification_expires_independently() {
        let mut feed = NotificationFeed::default();
        let first = feed.push("first", Tone::Success);
        let second = feed.push("second", Tone::Warning);
        let third = feed.push("third", Tone::Error);

        assert!(feed.expire(second));
        assert!(!feed.expire(second));
        let texts: Vec<&str> = feed.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third"]);

        assert!(feed.expire(first));
        assert!(feed.expire(third));
        assert!(feed.is_empty());
    }

    #[test]
    fn feed_is_capped_and_tail_keeps_newest() {
        let mut feed = NotificationFeed::with_capacity(3);
        for idx in 0..5 {
            feed.push(format!("n{idx}"), Tone::Info);
        }
        assert_eq!(feed.len(), 3);
        let tail: Vec<&str> = feed.tail(2).map(|n| n.text.as_str()).collect();
        assert_eq!(tail, vec!["n3", "n4"]);
    }

    #[test]
    fn replaced_toast_ignores_old_expiry() {
        let mut slot = ToastSlot::default();
        let old = slot.show("Lead Submitted Successfully!", Tone::Success);
        let new = slot.show("Error: duplicate", Tone::Error);
        slot.expire(old);
        assert_eq!(slot.current().map(|t| t.id), Some(new));
        slot.expire(new);
        assert!(slot.current().is_none());
    }
}
