//! Happens-before view of a multi-process trace
//!
//! Each process contributes a chain (its events in log order). The k-th send
//! on a channel is matched with the k-th receive on that channel (FIFO), and
//! the send happens-before the receive. Vector clocks are computed over the
//! resulting DAG in topological order, so `happens_before` is an O(1) query.

use super::{EventKind, ProcessId, Trace};
use crate::channel::ChannelId;
use crate::error::{ModelError, Result};
use std::collections::{BTreeMap, VecDeque};

/// Partial order over the events of one trace
#[derive(Debug, Clone)]
pub struct PartialOrder {
    /// Dense slot of each event's process
    slot: Vec<usize>,
    /// Position of each event inside its process chain
    position: Vec<usize>,
    /// Event indices per process slot, in chain order
    chains: Vec<Vec<usize>>,
    /// `clocks[e][p]` = number of events of slot `p` that happen before or at `e`
    clocks: Vec<Vec<u32>>,
    processes: Vec<ProcessId>,
}

impl PartialOrder {
    /// Build the partial order, matching sends to receives per channel
    ///
    /// # Errors
    ///
    /// - `ConflictingEventKind` if a send is not owned by its channel's source
    ///   or a receive not by its destination
    /// - `UnmatchedReceive` if a channel has more receives than sends
    /// - `ChannelMismatch` if a receive's message differs from its matched send
    /// - `Unlinearizable` if process orders and message causality form a cycle
    pub fn build(trace: &Trace) -> Result<Self> {
        let events = trace.events();
        let processes: Vec<ProcessId> = trace.processes().into_iter().collect();
        let slot_of: BTreeMap<ProcessId, usize> = processes
            .iter()
            .enumerate()
            .map(|(slot, &pid)| (pid, slot))
            .collect();

        let mut chains: Vec<Vec<usize>> = vec![Vec::new(); processes.len()];
        let mut slot = Vec::with_capacity(events.len());
        let mut position = Vec::with_capacity(events.len());
        let mut sends: BTreeMap<ChannelId, VecDeque<usize>> = BTreeMap::new();
        let mut recvs: BTreeMap<ChannelId, Vec<usize>> = BTreeMap::new();

        for (idx, event) in events.iter().enumerate() {
            if !event.is_owner_consistent() {
                return Err(ModelError::ConflictingEventKind {
                    label: event.label.clone(),
                    process: event.process,
                    kind: event.kind,
                });
            }
            let s = slot_of[&event.process];
            slot.push(s);
            position.push(chains[s].len());
            chains[s].push(idx);
            match event.kind {
                EventKind::Send(channel) => sends.entry(channel).or_default().push_back(idx),
                EventKind::Recv(channel) => recvs.entry(channel).or_default().push(idx),
                EventKind::Local => {}
            }
        }

        // matched[recv] = send
        let mut matched: BTreeMap<usize, usize> = BTreeMap::new();
        for (channel, receives) in &recvs {
            let queue = sends.entry(*channel).or_default();
            for &recv in receives {
                let label = &events[recv].label;
                let send = queue.pop_front().ok_or_else(|| ModelError::UnmatchedReceive {
                    channel: *channel,
                    label: label.clone(),
                })?;
                if events[send].label != *label {
                    return Err(ModelError::ChannelMismatch {
                        channel: *channel,
                        expected: label.clone(),
                        found: events[send].label.clone(),
                    });
                }
                matched.insert(recv, send);
            }
        }

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); events.len()];
        let mut in_degree = vec![0usize; events.len()];
        for chain in &chains {
            for pair in chain.windows(2) {
                successors[pair[0]].push(pair[1]);
                in_degree[pair[1]] += 1;
            }
        }
        for (&recv, &send) in &matched {
            successors[send].push(recv);
            in_degree[recv] += 1;
        }

        // Kahn's algorithm; clocks flow along every DAG edge.
        let width = processes.len();
        let mut clocks: Vec<Vec<u32>> = vec![vec![0; width]; events.len()];
        let mut ready: VecDeque<usize> = (0..events.len()).filter(|&e| in_degree[e] == 0).collect();
        let mut resolved = 0usize;
        while let Some(e) = ready.pop_front() {
            resolved += 1;
            clocks[e][slot[e]] = (position[e] + 1) as u32;
            let own = clocks[e].clone();
            for &next in &successors[e] {
                for (dst, src) in clocks[next].iter_mut().zip(&own) {
                    *dst = (*dst).max(*src);
                }
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }
        if resolved < events.len() {
            return Err(ModelError::Unlinearizable {
                unresolved: events.len() - resolved,
            });
        }

        Ok(Self {
            slot,
            position,
            chains,
            clocks,
            processes,
        })
    }

    /// Strict happens-before between two events of the trace
    pub fn happens_before(&self, a: usize, b: usize) -> bool {
        a != b && self.clocks[b][self.slot[a]] as usize > self.position[a]
    }

    pub fn concurrent(&self, a: usize, b: usize) -> bool {
        a != b && !self.happens_before(a, b) && !self.happens_before(b, a)
    }

    /// Event indices per process, in chain order
    pub fn chains(&self) -> &[Vec<usize>] {
        &self.chains
    }

    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }

    pub fn event_count(&self) -> usize {
        self.slot.len()
    }
}
