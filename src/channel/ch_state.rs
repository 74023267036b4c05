use super::ChannelId;
use crate::error::{ModelError, Result};
use crate::trace::EventType;
use std::collections::VecDeque;

/// In-flight messages on one channel, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChState {
    channel: ChannelId,
    queue: VecDeque<EventType>,
}

impl ChState {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            queue: VecDeque::new(),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn enqueue(&mut self, message: EventType) {
        self.queue.push_back(message);
    }

    /// Remove the head message, which must equal `expected`
    ///
    /// On error the queue is left unchanged.
    pub fn dequeue(&mut self, expected: &EventType) -> Result<EventType> {
        match self.queue.pop_front() {
            None => Err(ModelError::EmptyChannel {
                channel: self.channel,
                expected: expected.clone(),
            }),
            Some(head) if head != *expected => {
                let found = head.clone();
                self.queue.push_front(head);
                Err(ModelError::ChannelMismatch {
                    channel: self.channel,
                    expected: expected.clone(),
                    found,
                })
            }
            Some(head) => Ok(head),
        }
    }

    pub fn peek(&self) -> Option<&EventType> {
        self.queue.front()
    }

    pub fn messages(&self) -> impl Iterator<Item = &EventType> + '_ {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
