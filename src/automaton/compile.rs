use super::{minimize, Alphabet, Dfa};
use crate::context::AnalysisContext;
use crate::error::{ModelError, Result};
use crate::invariants::{Invariant, InvariantKind};
use crate::trace::EventType;
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

/// An invariant together with its compiled automaton
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantDfa {
    pub id: u32,
    pub invariant: Invariant,
    #[serde(skip)]
    pub dfa: Dfa,
}

/// Compile one invariant into its minimal DFA over `alphabet`
///
/// Symbols other than the two predicates are self-loops, so the automaton
/// constrains only the relative order of its own event types. An anchored
/// invariant has no symbol for its first predicate; its automaton starts in
/// the state reached right after one.
pub fn compile_invariant(invariant: &Invariant, alphabet: &Arc<Alphabet>) -> Result<Dfa> {
    let index = |label: &EventType| {
        alphabet
            .index_of(label)
            .ok_or_else(|| ModelError::UnknownEventType(label.clone()))
    };
    let a = if invariant.is_anchored() {
        None
    } else {
        Some(index(&invariant.first)?)
    };
    let b = index(&invariant.second)?;
    let start = if a.is_some() { 0 } else { 1 };

    let dfa = match invariant.kind {
        // 0: nothing pending, 1: an `a` still waits for its `b`
        InvariantKind::AlwaysFollowedBy => {
            Dfa::from_fn(Arc::clone(alphabet), start, vec![true, false], |state, sym| {
                if Some(sym) == a {
                    1
                } else if sym == b {
                    0
                } else {
                    state
                }
            })
        }
        // 0: no `a` yet, 1: `a` seen, 2: violated
        InvariantKind::NeverFollowedBy => {
            Dfa::from_fn(Arc::clone(alphabet), start, vec![true, true, false], |state, sym| {
                match state {
                    0 if Some(sym) == a => 1,
                    1 if sym == b => 2,
                    _ => state,
                }
            })
        }
        // 0: undecided, 1: `a` came first, 2: `b` came first
        InvariantKind::AlwaysPrecedes => {
            Dfa::from_fn(Arc::clone(alphabet), start, vec![true, true, false], |state, sym| {
                match state {
                    0 if sym == b => 2,
                    0 if Some(sym) == a => 1,
                    _ => state,
                }
            })
        }
    };
    Ok(minimize(&dfa))
}

/// Compile every invariant, numbering them from the run context
pub fn compile_invariants<'a, I>(
    invariants: I,
    alphabet: &Arc<Alphabet>,
    ctx: &mut AnalysisContext,
) -> Result<Vec<InvariantDfa>>
where
    I: IntoIterator<Item = &'a Invariant>,
{
    invariants
        .into_iter()
        .map(|invariant| {
            let dfa = compile_invariant(invariant, alphabet)?;
            let id = ctx.next_invariant_id();
            trace!(id, %invariant, states = dfa.state_count(), "compiled invariant");
            Ok(InvariantDfa {
                id,
                invariant: invariant.clone(),
                dfa,
            })
        })
        .collect()
}
