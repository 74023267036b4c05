//! Per-run analysis state

use crate::channel::ChannelStatePool;

/// State shared by the stages of one analysis run
///
/// Owns the channel-state canonicalization pool and the invariant numbering.
/// Nothing here outlives the run, so separate runs never share handles.
#[derive(Debug, Default)]
pub struct AnalysisContext {
    pool: ChannelStatePool,
    next_invariant_id: u32,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &ChannelStatePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ChannelStatePool {
        &mut self.pool
    }

    /// Allocate the next invariant id
    pub fn next_invariant_id(&mut self) -> u32 {
        let id = self.next_invariant_id;
        self.next_invariant_id += 1;
        id
    }

    pub fn invariants_compiled(&self) -> u32 {
        self.next_invariant_id
    }
}
