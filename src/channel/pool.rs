use super::{ChState, ChannelId};
use crate::error::{ModelError, Result};
use crate::trace::{Event, EventKind};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Handle to a canonical multi-channel state
///
/// Handles are only meaningful for the pool that issued them. Within one
/// pool, handle equality is content equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MultiChState(u32);

impl MultiChState {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Handle for the `len`-th registered content
    fn for_slot(len: usize) -> Result<Self> {
        u32::try_from(len)
            .map(MultiChState)
            .map_err(|_| ModelError::PoolExhausted { limit: u32::MAX })
    }
}

/// Contents of every tracked channel, ordered by channel id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiChContent {
    channels: Vec<ChState>,
}

impl MultiChContent {
    fn new(states: impl IntoIterator<Item = ChState>) -> Self {
        let by_id: BTreeMap<ChannelId, ChState> =
            states.into_iter().map(|s| (s.channel(), s)).collect();
        Self {
            channels: by_id.into_values().collect(),
        }
    }

    pub fn channels(&self) -> &[ChState] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&ChState> {
        self.position(id).map(|i| &self.channels[i])
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().map(ChState::channel)
    }

    /// True when no channel holds an in-flight message
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(ChState::is_empty)
    }

    /// Total number of in-flight messages
    pub fn message_count(&self) -> usize {
        self.channels.iter().map(ChState::len).sum()
    }

    fn position(&self, id: ChannelId) -> Option<usize> {
        self.channels.binary_search_by(|s| s.channel().cmp(&id)).ok()
    }
}

/// Canonicalization pool for multi-channel states
///
/// Scoped to one analysis run (see [`crate::context::AnalysisContext`]).
/// Every operation that produces a state goes through [`Self::intern`], which
/// returns the existing handle for known content or registers new content.
#[derive(Debug, Default)]
pub struct ChannelStatePool {
    contents: Vec<Arc<MultiChContent>>,
    index: FnvHashMap<Arc<MultiChContent>, MultiChState>,
    reused: u64,
}

impl ChannelStatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct contents registered so far
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Number of lookups answered by an existing instance
    pub fn reuse_count(&self) -> u64 {
        self.reused
    }

    /// Canonical all-empty state for a set of channels
    ///
    /// # Example
    /// ```
    /// use tracemint::channel::{ChannelId, ChannelStatePool};
    ///
    /// let mut pool = ChannelStatePool::new();
    /// let ids = [ChannelId::new(1, 2, 0), ChannelId::new(2, 1, 1)];
    /// let a = pool.from_channel_ids(ids).unwrap();
    /// let b = pool.from_channel_ids(ids).unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(pool.len(), 1);
    /// ```
    pub fn from_channel_ids<I>(&mut self, ids: I) -> Result<MultiChState>
    where
        I: IntoIterator<Item = ChannelId>,
    {
        self.intern(MultiChContent::new(ids.into_iter().map(ChState::new)))
    }

    /// Canonical state for explicit channel contents
    ///
    /// If a channel id appears more than once, the last state wins.
    pub fn from_channel_states<I>(&mut self, states: I) -> Result<MultiChState>
    where
        I: IntoIterator<Item = ChState>,
    {
        self.intern(MultiChContent::new(states))
    }

    /// Contents behind a handle issued by this pool
    ///
    /// # Panics
    ///
    /// If `state` was issued by a different pool with more states; use
    /// [`Self::try_content`] when the origin is not known.
    pub fn content(&self, state: MultiChState) -> &MultiChContent {
        &self.contents[state.index()]
    }

    pub fn try_content(&self, state: MultiChState) -> Option<&MultiChContent> {
        self.contents.get(state.index()).map(Arc::as_ref)
    }

    /// Apply one event and return the canonical successor state
    ///
    /// Sends enqueue the event label on their channel, receives dequeue it
    /// (it must be the channel head), local events return `state` itself.
    ///
    /// # Errors
    ///
    /// - `UnknownChannel` if the event's channel is not part of `state`
    /// - `EmptyChannel` / `ChannelMismatch` if a receive does not match the
    ///   head of its channel
    pub fn next_state(&mut self, state: MultiChState, event: &Event) -> Result<MultiChState> {
        match event.kind {
            EventKind::Local => Ok(state),
            EventKind::Send(channel) => self.apply(state, channel, |ch| {
                ch.enqueue(event.label.clone());
                Ok(())
            }),
            EventKind::Recv(channel) => {
                self.apply(state, channel, |ch| ch.dequeue(&event.label).map(|_| ()))
            }
        }
    }

    fn apply<F>(&mut self, state: MultiChState, channel: ChannelId, op: F) -> Result<MultiChState>
    where
        F: FnOnce(&mut ChState) -> Result<()>,
    {
        let mut content = self.content(state).clone();
        let pos = content
            .position(channel)
            .ok_or(ModelError::UnknownChannel { channel })?;
        op(&mut content.channels[pos])?;
        self.intern(content)
    }

    /// Get-or-insert; `&mut self` makes the lookup and the insert one step
    ///
    /// Fails with `PoolExhausted` once handles no longer fit in 32 bits.
    fn intern(&mut self, content: MultiChContent) -> Result<MultiChState> {
        if let Some(&handle) = self.index.get(&content) {
            self.reused += 1;
            return Ok(handle);
        }
        let handle = MultiChState::for_slot(self.contents.len())?;
        let content = Arc::new(content);
        trace!(
            state = handle.index(),
            messages = content.message_count(),
            "new canonical channel state"
        );
        self.contents.push(Arc::clone(&content));
        self.index.insert(content, handle);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_slots_fit_u32() {
        assert_eq!(MultiChState::for_slot(7).unwrap().index(), 7);
        assert!(MultiChState::for_slot(u32::MAX as usize).is_ok());
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            MultiChState::for_slot(u32::MAX as usize + 1),
            Err(ModelError::PoolExhausted { limit: u32::MAX })
        );
    }

    #[test]
    fn test_foreign_handle_has_no_content() {
        let mut big = ChannelStatePool::new();
        let channel = ChannelId::new(0, 1, 0);
        let empty = big.from_channel_ids([channel]).unwrap();
        let loaded = big
            .next_state(empty, &Event::send("m", channel))
            .unwrap();

        let mut small = ChannelStatePool::new();
        small.from_channel_ids([channel]).unwrap();
        assert!(small.try_content(empty).is_some());
        assert!(small.try_content(loaded).is_none());
        assert_eq!(big.try_content(loaded).map(MultiChContent::message_count), Some(1));
    }
}
