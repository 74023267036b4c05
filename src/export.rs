//! In-memory graph form of synthesized models
//!
//! Every model variant (partition graph, NFA, DFA, per-invariant DFA, global
//! communicating model) is rendered to a [`ModelGraph`]: numbered states,
//! labeled transitions, an initial state and accepting markers. The graph is
//! serde-serializable; the CLI writes it as JSON and visualization layers
//! consume it from there.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A state of an exported model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: usize,
    pub accepting: bool,
    /// Descriptive label (partition label, joint-state summary)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

/// A labeled transition of an exported model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: usize,
    pub to: usize,
    pub label: String,
    /// Number of input-trace steps that traversed this transition
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delta_median: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delta_mode: Option<i64>,
}

impl TransitionEdge {
    pub fn new(from: usize, to: usize, label: impl Into<String>) -> Self {
        Self {
            from,
            to,
            label: label.into(),
            count: None,
            delta_median: None,
            delta_mode: None,
        }
    }
}

/// Serializable model: states, transitions, initial state, accepting markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGraph {
    /// Which model variant produced the graph ("nfa", "dfa", "global", ...)
    pub kind: String,
    pub initial: usize,
    pub states: Vec<StateNode>,
    pub transitions: Vec<TransitionEdge>,
}

impl ModelGraph {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            initial: 0,
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn add_state(&mut self, accepting: bool, label: Option<String>) -> usize {
        let id = self.states.len();
        self.states.push(StateNode {
            id,
            accepting,
            label,
        });
        id
    }

    pub fn add_transition(&mut self, edge: TransitionEdge) {
        self.transitions.push(edge);
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Distinct transition labels
    pub fn labels(&self) -> BTreeSet<&str> {
        self.transitions.iter().map(|t| t.label.as_str()).collect()
    }

    /// Nondeterministic acceptance check over transition labels
    ///
    /// Lets tests compare models across representations without going back
    /// to the automaton types.
    pub fn accepts<I, S>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.states.is_empty() {
            return false;
        }
        let mut current: BTreeSet<usize> = BTreeSet::from([self.initial]);
        for label in labels {
            let label = label.as_ref();
            current = self
                .transitions
                .iter()
                .filter(|t| current.contains(&t.from) && t.label == label)
                .map(|t| t.to)
                .collect();
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&s| self.states[s].accepting)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step() -> ModelGraph {
        let mut graph = ModelGraph::new("dfa");
        let s0 = graph.add_state(false, None);
        let s1 = graph.add_state(false, None);
        let s2 = graph.add_state(true, Some("done".to_string()));
        graph.add_transition(TransitionEdge::new(s0, s1, "open"));
        graph.add_transition(TransitionEdge::new(s1, s2, "close"));
        graph
    }

    #[test]
    fn test_graph_accepts() {
        let graph = two_step();
        assert!(graph.accepts(["open", "close"]));
        assert!(!graph.accepts(["open"]));
        assert!(!graph.accepts(["close"]));
    }

    #[test]
    fn test_json_skips_absent_fields() {
        let json = two_step().to_json().unwrap();
        assert!(json.contains("\"kind\": \"dfa\""));
        assert!(json.contains("\"label\": \"done\""));
        assert!(!json.contains("delta_median"));

        let back: ModelGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, two_step());
    }

    #[test]
    fn test_labels() {
        let model = two_step();
        let labels: Vec<_> = model.labels().into_iter().collect();
        assert_eq!(labels, vec!["close", "open"]);
    }
}
