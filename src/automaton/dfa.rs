use super::{Alphabet, StateId};
use crate::export::{ModelGraph, TransitionEdge};
use crate::trace::EventType;
use std::collections::VecDeque;
use std::sync::Arc;

/// Complete deterministic automaton over an event-type alphabet
///
/// Every state has exactly one successor per symbol; rejected behavior ends
/// in a non-accepting sink. Exported graphs drop states that cannot reach an
/// accepting state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    alphabet: Arc<Alphabet>,
    /// Row-major table: `delta[state * |alphabet| + symbol]`
    delta: Vec<StateId>,
    start: StateId,
    accepting: Vec<bool>,
}

impl Dfa {
    /// Build a DFA from a transition function
    pub fn from_fn<F>(
        alphabet: Arc<Alphabet>,
        start: StateId,
        accepting: Vec<bool>,
        step: F,
    ) -> Self
    where
        F: Fn(StateId, usize) -> StateId,
    {
        let k = alphabet.len();
        let mut delta = Vec::with_capacity(accepting.len() * k);
        for state in 0..accepting.len() {
            for symbol in 0..k {
                delta.push(step(state, symbol));
            }
        }
        Self::from_table(alphabet, delta, start, accepting)
    }

    /// Every sequence of at least one symbol
    pub fn non_empty(alphabet: Arc<Alphabet>) -> Self {
        Self::from_fn(alphabet, 0, vec![false, true], |_, _| 1)
    }

    pub(crate) fn from_table(
        alphabet: Arc<Alphabet>,
        delta: Vec<StateId>,
        start: StateId,
        accepting: Vec<bool>,
    ) -> Self {
        debug_assert_eq!(delta.len(), accepting.len() * alphabet.len());
        debug_assert!(start < accepting.len());
        Self {
            alphabet,
            delta,
            start,
            accepting,
        }
    }

    /// Single accepting state looping on every symbol
    pub fn universal(alphabet: Arc<Alphabet>) -> Self {
        Self::from_fn(alphabet, 0, vec![true], |_, _| 0)
    }

    pub fn alphabet(&self) -> &Arc<Alphabet> {
        &self.alphabet
    }

    pub fn state_count(&self) -> usize {
        self.accepting.len()
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting[state]
    }

    pub fn next(&self, state: StateId, symbol: usize) -> StateId {
        self.delta[state * self.alphabet.len() + symbol]
    }

    /// Successor on a label, `None` if the label is outside the alphabet
    pub fn step_label(&self, state: StateId, label: &EventType) -> Option<StateId> {
        self.alphabet
            .index_of(label)
            .map(|symbol| self.next(state, symbol))
    }

    /// State reached after reading `labels` from the start state
    pub fn run<'a, I>(&self, labels: I) -> Option<StateId>
    where
        I: IntoIterator<Item = &'a EventType>,
    {
        labels
            .into_iter()
            .try_fold(self.start, |state, label| self.step_label(state, label))
    }

    pub fn accepts<'a, I>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a EventType>,
    {
        self.run(labels).is_some_and(|state| self.accepting[state])
    }

    /// All `(from, symbol, to)` triples of the table
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, usize, StateId)> + '_ {
        let k = self.alphabet.len();
        self.delta
            .iter()
            .enumerate()
            .map(move |(i, &to)| (i / k, i % k, to))
    }

    /// States reachable from the start state
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.state_count()];
        let mut queue = VecDeque::from([self.start]);
        seen[self.start] = true;
        while let Some(state) = queue.pop_front() {
            for symbol in 0..self.alphabet.len() {
                let next = self.next(state, symbol);
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Reachable states from which an accepting state is reachable
    pub fn live_states(&self) -> Vec<bool> {
        let n = self.state_count();
        let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
        for (from, _, to) in self.transitions() {
            reverse[to].push(from);
        }
        let mut coreachable = self.accepting.clone();
        let mut queue: VecDeque<StateId> = (0..n).filter(|&s| coreachable[s]).collect();
        while let Some(state) = queue.pop_front() {
            for &pred in &reverse[state] {
                if !coreachable[pred] {
                    coreachable[pred] = true;
                    queue.push_back(pred);
                }
            }
        }
        self.reachable()
            .into_iter()
            .zip(coreachable)
            .map(|(r, c)| r && c)
            .collect()
    }

    /// True when no label sequence is accepted
    pub fn is_empty(&self) -> bool {
        !self.live_states()[self.start]
    }

    /// A shortest accepted label sequence, if any
    pub fn shortest_accepted(&self) -> Option<Vec<EventType>> {
        let n = self.state_count();
        let mut parent: Vec<Option<(StateId, usize)>> = vec![None; n];
        let mut seen = vec![false; n];
        let mut queue = VecDeque::from([self.start]);
        seen[self.start] = true;
        while let Some(state) = queue.pop_front() {
            if self.accepting[state] {
                let mut word = Vec::new();
                let mut cursor = state;
                while let Some((prev, symbol)) = parent[cursor] {
                    word.push(self.alphabet.symbol(symbol).clone());
                    cursor = prev;
                }
                word.reverse();
                return Some(word);
            }
            for symbol in 0..self.alphabet.len() {
                let next = self.next(state, symbol);
                if !seen[next] {
                    seen[next] = true;
                    parent[next] = Some((state, symbol));
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Number of transitions between live states
    pub fn live_transition_count(&self) -> usize {
        let live = self.live_states();
        self.transitions()
            .filter(|&(from, _, to)| live[from] && live[to])
            .count()
    }

    /// Export live states only, renumbered with the start state first
    ///
    /// An empty-language DFA exports as a single non-accepting state.
    pub fn to_graph(&self, kind: &str) -> ModelGraph {
        let live = self.live_states();
        let mut graph = ModelGraph::new(kind);
        let mut number: Vec<Option<usize>> = vec![None; self.state_count()];

        number[self.start] = Some(graph.add_state(self.accepting[self.start] && live[self.start], None));
        for state in 0..self.state_count() {
            if live[state] && number[state].is_none() {
                number[state] = Some(graph.add_state(self.accepting[state], None));
            }
        }
        for (from, symbol, to) in self.transitions() {
            if let (true, true, Some(f), Some(t)) = (live[from], live[to], number[from], number[to]) {
                graph.add_transition(TransitionEdge::new(f, t, self.alphabet.symbol(symbol).as_str()));
            }
        }
        graph
    }
}
