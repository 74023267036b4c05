use super::{Alphabet, Dfa, StateId};
use crate::export::{ModelGraph, TransitionEdge};
use crate::trace::EventType;
use fnv::FnvHashMap;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// Nondeterministic automaton with a single start state (state 0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    alphabet: Arc<Alphabet>,
    /// Outgoing `(symbol, target)` pairs per state, sorted and unique
    transitions: Vec<Vec<(usize, StateId)>>,
    accepting: Vec<bool>,
}

impl Nfa {
    /// NFA with only the (non-accepting) start state
    pub fn new(alphabet: Arc<Alphabet>) -> Self {
        Self {
            alphabet,
            transitions: vec![Vec::new()],
            accepting: vec![false],
        }
    }

    pub fn alphabet(&self) -> &Arc<Alphabet> {
        &self.alphabet
    }

    pub fn start(&self) -> StateId {
        0
    }

    pub fn add_state(&mut self, accepting: bool) -> StateId {
        self.transitions.push(Vec::new());
        self.accepting.push(accepting);
        self.accepting.len() - 1
    }

    pub fn set_accepting(&mut self, state: StateId, accepting: bool) {
        self.accepting[state] = accepting;
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting[state]
    }

    pub fn add_transition(&mut self, from: StateId, symbol: usize, to: StateId) {
        let row = &mut self.transitions[from];
        if let Err(pos) = row.binary_search(&(symbol, to)) {
            row.insert(pos, (symbol, to));
        }
    }

    pub fn successors(&self, state: StateId) -> &[(usize, StateId)] {
        &self.transitions[state]
    }

    pub fn state_count(&self) -> usize {
        self.accepting.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.iter().map(Vec::len).sum()
    }

    fn step(&self, states: &BTreeSet<StateId>, symbol: usize) -> BTreeSet<StateId> {
        states
            .iter()
            .flat_map(|&s| self.transitions[s].iter())
            .filter(|(sym, _)| *sym == symbol)
            .map(|&(_, to)| to)
            .collect()
    }

    pub fn accepts<'a, I>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a EventType>,
    {
        let mut current = BTreeSet::from([self.start()]);
        for label in labels {
            let Some(symbol) = self.alphabet.index_of(label) else {
                return false;
            };
            current = self.step(&current, symbol);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&s| self.accepting[s])
    }

    /// Subset construction; the empty subset becomes the rejecting sink
    pub fn determinize(&self) -> Dfa {
        let k = self.alphabet.len();
        let mut ids: FnvHashMap<BTreeSet<StateId>, StateId> = FnvHashMap::default();
        let mut subsets: Vec<BTreeSet<StateId>> = Vec::new();
        let mut delta: Vec<StateId> = Vec::new();

        let start = BTreeSet::from([self.start()]);
        ids.insert(start.clone(), 0);
        subsets.push(start);

        let mut queue = VecDeque::from([0usize]);
        while let Some(id) = queue.pop_front() {
            for symbol in 0..k {
                let next = self.step(&subsets[id], symbol);
                let target = match ids.get(&next) {
                    Some(&existing) => existing,
                    None => {
                        let fresh = subsets.len();
                        ids.insert(next.clone(), fresh);
                        subsets.push(next);
                        queue.push_back(fresh);
                        fresh
                    }
                };
                delta.push(target);
            }
        }

        let accepting = subsets
            .iter()
            .map(|set| set.iter().any(|&s| self.accepting[s]))
            .collect();
        Dfa::from_table(Arc::clone(&self.alphabet), delta, 0, accepting)
    }

    pub fn to_graph(&self, kind: &str) -> ModelGraph {
        let mut graph = ModelGraph::new(kind);
        for &accepting in &self.accepting {
            graph.add_state(accepting, None);
        }
        for (from, row) in self.transitions.iter().enumerate() {
            for &(symbol, to) in row {
                graph.add_transition(TransitionEdge::new(
                    from,
                    to,
                    self.alphabet.symbol(symbol).as_str(),
                ));
            }
        }
        graph
    }
}
