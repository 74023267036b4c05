//! Finite automata over event-type alphabets
//!
//! [`Dfa`] is a complete, table-driven automaton; [`Nfa`] is the sparse
//! nondeterministic form partition graphs are read as. Invariants compile to
//! small DFAs ([`compile_invariant`]) that are intersected and minimized into
//! a single model ([`intersect_all`]).
//!
//! ```text
//!   invariant ──compile──▶ Dfa ─┐
//!   invariant ──compile──▶ Dfa ─┼─intersect─▶ product ──minimize──▶ model
//!   k-tails   ──determinize──▶ ─┘
//! ```

mod alphabet;
mod compile;
mod dfa;
mod nfa;
mod ops;
mod spurious;

pub use alphabet::Alphabet;
pub use compile::{compile_invariant, compile_invariants, InvariantDfa};
pub use dfa::Dfa;
pub use nfa::Nfa;
pub use ops::{equivalent, intersect, intersect_all, minimize, trim};
pub use spurious::remove_spurious_edges;

use crate::export::ModelGraph;
use crate::trace::EventType;

/// Index of an automaton state
pub type StateId = usize;

/// Either automaton variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Automaton {
    Nfa(Nfa),
    Dfa(Dfa),
}

impl Automaton {
    pub fn state_count(&self) -> usize {
        match self {
            Automaton::Nfa(nfa) => nfa.state_count(),
            Automaton::Dfa(dfa) => dfa.state_count(),
        }
    }

    pub fn accepts<'a, I>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a EventType>,
    {
        match self {
            Automaton::Nfa(nfa) => nfa.accepts(labels),
            Automaton::Dfa(dfa) => dfa.accepts(labels),
        }
    }

    /// Deterministic form; a DFA is returned unchanged
    pub fn into_dfa(self) -> Dfa {
        match self {
            Automaton::Nfa(nfa) => nfa.determinize(),
            Automaton::Dfa(dfa) => dfa,
        }
    }

    pub fn to_graph(&self, kind: &str) -> ModelGraph {
        match self {
            Automaton::Nfa(nfa) => nfa.to_graph(kind),
            Automaton::Dfa(dfa) => dfa.to_graph(kind),
        }
    }
}
