use super::{Alphabet, Dfa, StateId};
use crate::error::{ModelError, Result};
use fnv::FnvHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Product automaton accepting the intersection of both languages
///
/// Only pairs reachable from the joint start state are materialized.
pub fn intersect(left: &Dfa, right: &Dfa) -> Result<Dfa> {
    if left.alphabet() != right.alphabet() {
        return Err(ModelError::AlphabetMismatch);
    }
    let k = left.alphabet().len();
    let mut ids: FnvHashMap<(StateId, StateId), StateId> = FnvHashMap::default();
    let mut pairs = vec![(left.start(), right.start())];
    ids.insert(pairs[0], 0);

    let mut delta = Vec::new();
    let mut queue = VecDeque::from([0usize]);
    while let Some(id) = queue.pop_front() {
        let (l, r) = pairs[id];
        for symbol in 0..k {
            let next = (left.next(l, symbol), right.next(r, symbol));
            let target = *ids.entry(next).or_insert_with(|| {
                pairs.push(next);
                queue.push_back(pairs.len() - 1);
                pairs.len() - 1
            });
            delta.push(target);
        }
    }

    let accepting = pairs
        .iter()
        .map(|&(l, r)| left.is_accepting(l) && right.is_accepting(r))
        .collect();
    Ok(Dfa::from_table(Arc::clone(left.alphabet()), delta, 0, accepting))
}

/// Minimal equivalent DFA in canonical form
///
/// Unreachable states are dropped, equivalent states merged by Moore
/// refinement, and the result renumbered in breadth-first order from the
/// start state. Two DFAs over the same alphabet accept the same language iff
/// their minimized forms are equal.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let n = dfa.state_count();
    let k = dfa.alphabet().len();
    let reachable = dfa.reachable();

    let mut class: Vec<usize> = (0..n).map(|s| usize::from(dfa.is_accepting(s))).collect();
    let mut class_count = 0;
    loop {
        let mut signatures: FnvHashMap<Vec<usize>, usize> = FnvHashMap::default();
        let mut next_class = vec![usize::MAX; n];
        for state in (0..n).filter(|&s| reachable[s]) {
            let mut signature = Vec::with_capacity(k + 1);
            signature.push(class[state]);
            signature.extend((0..k).map(|sym| class[dfa.next(state, sym)]));
            let fresh = signatures.len();
            next_class[state] = *signatures.entry(signature).or_insert(fresh);
        }
        let count = signatures.len();
        class = next_class;
        if count == class_count {
            break;
        }
        class_count = count;
    }

    // Canonical numbering: BFS from the start class, symbols in order
    let mut number = vec![usize::MAX; class_count];
    let mut representative = Vec::with_capacity(class_count);
    let mut queue = VecDeque::from([dfa.start()]);
    number[class[dfa.start()]] = 0;
    representative.push(dfa.start());
    while let Some(state) = queue.pop_front() {
        for sym in 0..k {
            let next = dfa.next(state, sym);
            if number[class[next]] == usize::MAX {
                number[class[next]] = representative.len();
                representative.push(next);
                queue.push_back(next);
            }
        }
    }

    let mut delta = Vec::with_capacity(representative.len() * k);
    for &state in &representative {
        delta.extend((0..k).map(|sym| number[class[dfa.next(state, sym)]]));
    }
    let accepting = representative.iter().map(|&s| dfa.is_accepting(s)).collect();
    Dfa::from_table(Arc::clone(dfa.alphabet()), delta, 0, accepting)
}

/// Language equality over a shared alphabet
pub fn equivalent(left: &Dfa, right: &Dfa) -> bool {
    left.alphabet() == right.alphabet() && minimize(left) == minimize(right)
}

/// Collapse every state that cannot reach acceptance into one sink
///
/// Keeps the live part of the automaton intact, unlike [`minimize`] which
/// also merges equivalent live states.
pub fn trim(dfa: &Dfa) -> Dfa {
    let live = dfa.live_states();
    let k = dfa.alphabet().len();
    let mut number: Vec<Option<StateId>> = vec![None; dfa.state_count()];
    let mut kept = Vec::new();
    for state in (0..dfa.state_count()).filter(|&s| live[s]) {
        number[state] = Some(kept.len());
        kept.push(state);
    }
    let sink = kept.len();
    let start = number[dfa.start()].unwrap_or(sink);

    let mut delta = Vec::with_capacity((kept.len() + 1) * k);
    let mut accepting = Vec::with_capacity(kept.len() + 1);
    for &state in &kept {
        delta.extend((0..k).map(|sym| number[dfa.next(state, sym)].unwrap_or(sink)));
        accepting.push(dfa.is_accepting(state));
    }
    delta.extend(std::iter::repeat(sink).take(k));
    accepting.push(false);
    Dfa::from_table(Arc::clone(dfa.alphabet()), delta, start, accepting)
}

/// Intersect a sequence of DFAs starting from the universal language
///
/// With `minimize_each` the running product is minimized after every step;
/// otherwise once at the end. Both produce the same canonical automaton.
pub fn intersect_all<'a, I>(alphabet: &Arc<Alphabet>, dfas: I, minimize_each: bool) -> Result<Dfa>
where
    I: IntoIterator<Item = &'a Dfa>,
{
    let mut product = Dfa::universal(Arc::clone(alphabet));
    for (step, dfa) in dfas.into_iter().enumerate() {
        product = intersect(&product, dfa)?;
        if minimize_each {
            product = minimize(&product);
        }
        debug!(step, states = product.state_count(), "intersected automaton");
    }
    Ok(if minimize_each { product } else { minimize(&product) })
}
