use super::{PartitionGraph, PartitionId};
use crate::automaton::{Dfa, InvariantDfa, StateId};
use fnv::FnvHashMap;
use std::collections::VecDeque;

/// Shortest abstract path that reaches TERMINAL while `dfa` rejects
///
/// Explores the product of partition graph and invariant automaton
/// breadth-first. The returned path starts at INITIAL and ends at TERMINAL.
pub fn find_counterexample(graph: &PartitionGraph, dfa: &Dfa) -> Option<Vec<PartitionId>> {
    type Key = (PartitionId, StateId);

    let start: Key = (graph.initial(), dfa.start());
    let mut parent: FnvHashMap<Key, Option<Key>> = FnvHashMap::default();
    parent.insert(start, None);
    let mut queue = VecDeque::from([start]);

    while let Some(key @ (partition, state)) = queue.pop_front() {
        for next in graph.successors(partition) {
            if next == graph.terminal() {
                if dfa.is_accepting(state) {
                    continue;
                }
                let mut path = vec![next];
                let mut cursor = Some(key);
                while let Some(current) = cursor {
                    path.push(current.0);
                    cursor = parent.get(&current).copied().flatten();
                }
                path.reverse();
                return Some(path);
            }
            let Some(label) = graph.label(next).and_then(|l| l.event()) else {
                continue;
            };
            let Some(next_state) = dfa.step_label(state, label) else {
                continue;
            };
            let next_key = (next, next_state);
            if !parent.contains_key(&next_key) {
                parent.insert(next_key, Some(key));
                queue.push_back(next_key);
            }
        }
    }
    None
}

/// First invariant (by position) with a counterexample, and the path
pub fn first_violation(
    graph: &PartitionGraph,
    invariants: &[InvariantDfa],
) -> Option<(usize, Vec<PartitionId>)> {
    invariants
        .iter()
        .enumerate()
        .find_map(|(i, inv)| find_counterexample(graph, &inv.dfa).map(|path| (i, path)))
}

pub fn satisfies_all(graph: &PartitionGraph, invariants: &[InvariantDfa]) -> bool {
    first_violation(graph, invariants).is_none()
}
