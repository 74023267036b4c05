use crate::trace::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directed FIFO channel between two processes
///
/// `instance` distinguishes several channels between the same pair of
/// processes. Equality is by `(src, dst, instance)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    pub src: ProcessId,
    pub dst: ProcessId,
    pub instance: u32,
}

impl ChannelId {
    pub const fn new(src: ProcessId, dst: ProcessId, instance: u32) -> Self {
        Self { src, dst, instance }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}#{}", self.src, self.dst, self.instance)
    }
}
