//! Error taxonomy for model inference
//!
//! Every core stage either fully succeeds or fails with one of these
//! conditions. There is no silent partial result: callers that want a
//! best-effort model ask for a relaxed mode (k-tails, spurious-edge removal)
//! explicitly.

use crate::channel::ChannelId;
use crate::invariants::Invariant;
use crate::trace::{EventKind, EventType, ProcessId};
use thiserror::Error;

/// Errors raised by the mining, synthesis and composition engines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A receive names a message that is not at the head of its channel
    #[error("receive of '{expected}' on channel {channel} does not match channel head '{found}'")]
    ChannelMismatch {
        channel: ChannelId,
        expected: EventType,
        found: EventType,
    },

    /// A receive was applied to a channel with nothing in flight
    #[error("receive of '{expected}' on empty channel {channel}")]
    EmptyChannel {
        channel: ChannelId,
        expected: EventType,
    },

    #[error("channel {channel} is not tracked by this channel state")]
    UnknownChannel { channel: ChannelId },

    /// A trace contains more receives on a channel than sends
    #[error("receive of '{label}' on channel {channel} has no matching send")]
    UnmatchedReceive { channel: ChannelId, label: EventType },

    /// The per-process orders plus message causality contain a cycle
    #[error("partial order cannot be linearized: {unresolved} events lie on a causality cycle")]
    Unlinearizable { unresolved: usize },

    /// An event's owning process does not play the channel role of its kind
    #[error("event '{label}' of process {process} conflicts with its kind ({kind})")]
    ConflictingEventKind {
        label: EventType,
        process: ProcessId,
        kind: EventKind,
    },

    /// The requested invariants cannot all hold on any execution
    #[error("invariant set has an empty joint language: [{}]", format_invariants(.invariants))]
    InvariantContradiction { invariants: Vec<Invariant> },

    #[error("refinement cannot eliminate a counterexample to '{invariant}'")]
    NonConvergentRefinement { invariant: Invariant },

    /// More distinct channel contents than channel-state handles can address
    #[error("channel state pool is full ({limit} states)")]
    PoolExhausted { limit: u32 },

    #[error("joint state exploration exceeded {limit} states")]
    ExplorationLimit { limit: usize },

    #[error("event type '{0}' is not part of the automaton alphabet")]
    UnknownEventType(EventType),

    #[error("automata are defined over different alphabets")]
    AlphabetMismatch,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_invariants(invariants: &[Invariant]) -> String {
    invariants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, ModelError>;
