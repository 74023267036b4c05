//! FIFO channel state for distributed logs
//!
//! Channel contents are hash-consed: a [`ChannelStatePool`] keeps exactly one
//! canonical instance per distinct multi-channel content, and hands out
//! [`MultiChState`] handles. Two handles from the same pool are equal iff the
//! contents are equal, so joint-state deduplication during exploration costs a
//! single integer comparison.
//!
//! ```text
//! fromChannelIds([c1, c2])  ──►  #0  [[], []]
//!        │ send e on c1
//!        ▼
//!                                #1  [[e], []]
//!        │ recv e on c1
//!        ▼
//!                                #0  (same handle, no new content)
//! ```

mod ch_state;
mod channel_id;
mod pool;

pub use ch_state::ChState;
pub use channel_id::ChannelId;
pub use pool::{ChannelStatePool, MultiChContent, MultiChState};
