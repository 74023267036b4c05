use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of the process (or log partition) that owns an event
pub type ProcessId = u32;

/// Name of the pseudo event that opens every trace
pub const INITIAL_LABEL: &str = "INITIAL";

/// Interned event type label
///
/// Labels are compared and hashed by content; cloning shares the
/// underlying string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Arc<str>);

impl EventType {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The anchor every trace implicitly starts with
    ///
    /// `INITIAL AFby x` reads "every trace contains an `x`".
    pub fn initial() -> Self {
        Self::new(INITIAL_LABEL)
    }

    pub fn is_initial(&self) -> bool {
        self.as_str() == INITIAL_LABEL
    }
}

impl From<&str> for EventType {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for EventType {
    fn from(label: String) -> Self {
        Self(Arc::from(label))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an event interacts with FIFO channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Process-internal event; channel contents unchanged
    Local,
    /// Enqueue the event label on the tail of the channel
    Send(ChannelId),
    /// Dequeue the event label from the head of the channel
    Recv(ChannelId),
}

impl EventKind {
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            EventKind::Local => None,
            EventKind::Send(channel) | EventKind::Recv(channel) => Some(*channel),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Local => write!(f, "local"),
            EventKind::Send(channel) => write!(f, "send on {}", channel),
            EventKind::Recv(channel) => write!(f, "receive on {}", channel),
        }
    }
}

/// A single logged occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub label: EventType,
    pub process: ProcessId,
    pub kind: EventKind,
    /// Timestamp extracted from the log line, if any
    pub time: Option<i64>,
}

impl Event {
    pub fn local(label: impl Into<EventType>, process: ProcessId) -> Self {
        Self {
            label: label.into(),
            process,
            kind: EventKind::Local,
            time: None,
        }
    }

    /// Send of `message` by the channel's source process
    pub fn send(message: impl Into<EventType>, channel: ChannelId) -> Self {
        Self {
            label: message.into(),
            process: channel.src,
            kind: EventKind::Send(channel),
            time: None,
        }
    }

    /// Receive of `message` by the channel's destination process
    pub fn recv(message: impl Into<EventType>, channel: ChannelId) -> Self {
        Self {
            label: message.into(),
            process: channel.dst,
            kind: EventKind::Recv(channel),
            time: None,
        }
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn is_communication(&self) -> bool {
        !matches!(self.kind, EventKind::Local)
    }

    /// Event type qualified by owner and channel role (`p1:e`, `1->2#0!e`,
    /// `1->2#0?e`)
    ///
    /// Multi-process analyses use it as the event type, so a label logged
    /// locally, sent, and received stays three distinct types.
    pub fn qualified_type(&self) -> EventType {
        EventType::from(self.to_string())
    }

    /// Whether the owning process plays the channel role the kind implies
    pub fn is_owner_consistent(&self) -> bool {
        match self.kind {
            EventKind::Local => true,
            EventKind::Send(channel) => channel.src == self.process,
            EventKind::Recv(channel) => channel.dst == self.process,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Local => write!(f, "p{}:{}", self.process, self.label),
            EventKind::Send(channel) => write!(f, "{}!{}", channel, self.label),
            EventKind::Recv(channel) => write!(f, "{}?{}", channel, self.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_owned_by_source() {
        let cid = ChannelId::new(1, 2, 0);
        let e = Event::send("m", cid);
        assert_eq!(e.process, 1);
        assert_eq!(e.kind.channel(), Some(cid));
        assert!(e.is_communication());
    }

    #[test]
    fn test_recv_owned_by_destination() {
        let e = Event::recv("m", ChannelId::new(1, 2, 0));
        assert_eq!(e.process, 2);
    }

    #[test]
    fn test_event_display() {
        let cid = ChannelId::new(0, 1, 0);
        assert_eq!(Event::send("m", cid).to_string(), "0->1#0!m");
        assert_eq!(Event::recv("m", cid).to_string(), "0->1#0?m");
        assert_eq!(Event::local("tick", 3).to_string(), "p3:tick");
    }

    #[test]
    fn test_qualified_types_keep_roles_apart() {
        let cid = ChannelId::new(1, 2, 0);
        let types = [
            Event::send("e", cid).qualified_type(),
            Event::recv("e", cid).qualified_type(),
            Event::local("e", 1).qualified_type(),
        ];
        assert_eq!(types[0].as_str(), "1->2#0!e");
        assert_eq!(types[2].as_str(), "p1:e");
        assert_ne!(types[0], types[1]);
        assert_ne!(types[0], types[2]);
    }

    #[test]
    fn test_owner_consistency() {
        let cid = ChannelId::new(1, 2, 0);
        assert!(Event::send("m", cid).is_owner_consistent());
        let mut stray = Event::recv("m", cid);
        stray.process = 1;
        assert!(!stray.is_owner_consistent());
        assert!(EventType::initial().is_initial());
    }

    #[test]
    fn test_event_type_equality_by_content() {
        assert_eq!(EventType::from("open"), EventType::from("open".to_string()));
        assert!(EventType::from("a") < EventType::from("b"));
    }
}
