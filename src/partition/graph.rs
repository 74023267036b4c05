use crate::automaton::{Alphabet, Nfa};
use crate::export::{ModelGraph, TransitionEdge};
use crate::stats::DeltaSeries;
use crate::trace::{EventType, TraceSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Index of an event node in the graph arena
pub type NodeId = usize;

/// Stable identifier of a partition; survives splits and merges of others
pub type PartitionId = usize;

/// What a node (and the partition holding it) stands for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeLabel {
    Initial,
    Event(EventType),
    Terminal,
}

impl NodeLabel {
    pub fn event(&self) -> Option<&EventType> {
        match self {
            NodeLabel::Event(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::Initial => f.write_str("INITIAL"),
            NodeLabel::Event(label) => write!(f, "{label}"),
            NodeLabel::Terminal => f.write_str("TERMINAL"),
        }
    }
}

#[derive(Debug, Clone)]
struct EventNode {
    label: NodeLabel,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    time: Option<i64>,
}

/// A set of event nodes treated as one abstract state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    label: NodeLabel,
    events: BTreeSet<NodeId>,
}

impl Partition {
    pub fn label(&self) -> &NodeLabel {
        &self.label
    }

    pub fn events(&self) -> &BTreeSet<NodeId> {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Observations behind one partition-graph edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeStats {
    /// Number of concrete node-to-node steps the edge abstracts
    pub count: usize,
    /// Time deltas of the steps whose endpoints both carry timestamps
    pub deltas: DeltaSeries,
}

/// What [`PartitionGraph::unmerge`] needs to take one merge back
#[derive(Debug, Clone)]
pub struct MergeUndo {
    into: PartitionId,
    other: PartitionId,
    label: NodeLabel,
    absorbed: BTreeSet<NodeId>,
    /// Edges that touched `other`, as they were
    removed: Vec<((PartitionId, PartitionId), EdgeStats)>,
    /// Prior value of every edge the merge rewrote
    replaced: Vec<((PartitionId, PartitionId), Option<EdgeStats>)>,
}

/// Partition graph over the events of a trace set
///
/// Each trace contributes a chain `INITIAL -> e1 -> ... -> en -> TERMINAL`
/// of nodes. All INITIAL nodes share partition [`Self::initial`], all
/// TERMINAL nodes share [`Self::terminal`]. An abstract edge `P -> Q` exists
/// iff some node of `P` is directly followed by a node of `Q`.
///
/// Events are taken in recorded order, so multi-process traces should be
/// projected per process first.
///
/// Splits and merges update the affected edges in place.
#[derive(Debug, Clone)]
pub struct PartitionGraph {
    alphabet: Arc<Alphabet>,
    nodes: Vec<EventNode>,
    partition_of: Vec<PartitionId>,
    partitions: BTreeMap<PartitionId, Partition>,
    edges: BTreeMap<(PartitionId, PartitionId), EdgeStats>,
    next_id: PartitionId,
}

const INITIAL: PartitionId = 0;
const TERMINAL: PartitionId = 1;

impl PartitionGraph {
    /// One partition per event type
    pub fn from_traces(traces: &TraceSet) -> Self {
        let mut by_label: BTreeMap<EventType, PartitionId> = BTreeMap::new();
        Self::build(traces, |label| {
            let next = by_label.len() + 2;
            *by_label.entry(label.clone()).or_insert(next)
        })
    }

    /// One partition per event node (the starting point of k-tails)
    pub fn singleton(traces: &TraceSet) -> Self {
        let mut next = 2;
        Self::build(traces, |_| {
            next += 1;
            next - 1
        })
    }

    fn build<F>(traces: &TraceSet, mut assign: F) -> Self
    where
        F: FnMut(&EventType) -> PartitionId,
    {
        let alphabet = Arc::new(Alphabet::new(traces.event_types()));
        let mut nodes: Vec<EventNode> = Vec::with_capacity(traces.event_count() + 2 * traces.len());
        let mut partition_of: Vec<PartitionId> = Vec::with_capacity(nodes.capacity());

        for trace in traces {
            nodes.push(EventNode {
                label: NodeLabel::Initial,
                prev: None,
                next: None,
                time: None,
            });
            partition_of.push(INITIAL);
            for event in trace.events() {
                let id = nodes.len();
                nodes[id - 1].next = Some(id);
                nodes.push(EventNode {
                    label: NodeLabel::Event(event.label.clone()),
                    prev: Some(id - 1),
                    next: None,
                    time: event.time,
                });
                partition_of.push(assign(&event.label));
            }
            let id = nodes.len();
            nodes[id - 1].next = Some(id);
            nodes.push(EventNode {
                label: NodeLabel::Terminal,
                prev: Some(id - 1),
                next: None,
                time: None,
            });
            partition_of.push(TERMINAL);
        }

        let mut partitions = BTreeMap::from([
            (
                INITIAL,
                Partition {
                    label: NodeLabel::Initial,
                    events: BTreeSet::new(),
                },
            ),
            (
                TERMINAL,
                Partition {
                    label: NodeLabel::Terminal,
                    events: BTreeSet::new(),
                },
            ),
        ]);
        for (id, node) in nodes.iter().enumerate() {
            partitions
                .entry(partition_of[id])
                .or_insert_with(|| Partition {
                    label: node.label.clone(),
                    events: BTreeSet::new(),
                })
                .events
                .insert(id);
        }

        let next_id = partitions.keys().next_back().map_or(2, |&last| last + 1);
        let mut graph = Self {
            alphabet,
            nodes,
            partition_of,
            partitions,
            edges: BTreeMap::new(),
            next_id,
        };
        for node in 0..graph.nodes.len() {
            graph.add_step(node);
        }
        graph
    }

    /// Abstract edge of the step leaving `node`, and its time delta
    fn step(&self, node: NodeId) -> Option<((PartitionId, PartitionId), Option<i64>)> {
        let next = self.nodes[node].next?;
        let key = (self.partition_of[node], self.partition_of[next]);
        let delta = match (self.nodes[node].time, self.nodes[next].time) {
            (Some(from), Some(to)) => Some(to - from),
            _ => None,
        };
        Some((key, delta))
    }

    fn add_step(&mut self, node: NodeId) {
        let Some((key, delta)) = self.step(node) else { return };
        let stats = self.edges.entry(key).or_default();
        stats.count += 1;
        if let Some(delta) = delta {
            stats.deltas.add_delta(delta);
        }
    }

    fn remove_step(&mut self, node: NodeId) {
        let Some((key, delta)) = self.step(node) else { return };
        let Some(stats) = self.edges.get_mut(&key) else { return };
        stats.count -= 1;
        if let Some(delta) = delta {
            stats.deltas.remove_delta(delta);
        }
        if stats.count == 0 {
            self.edges.remove(&key);
        }
    }

    /// Edges recounted from the node chains
    #[cfg(test)]
    pub(crate) fn recounted_edges(&self) -> BTreeMap<(PartitionId, PartitionId), EdgeStats> {
        let mut fresh = self.clone();
        fresh.edges.clear();
        for node in 0..fresh.nodes.len() {
            fresh.add_step(node);
        }
        fresh.edges
    }

    pub fn alphabet(&self) -> &Arc<Alphabet> {
        &self.alphabet
    }

    pub fn initial(&self) -> PartitionId {
        INITIAL
    }

    pub fn terminal(&self) -> PartitionId {
        TERMINAL
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn partitions(&self) -> impl Iterator<Item = (PartitionId, &Partition)> + '_ {
        self.partitions.iter().map(|(&id, p)| (id, p))
    }

    pub fn partition(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(&id)
    }

    pub fn partition_of(&self, node: NodeId) -> PartitionId {
        self.partition_of[node]
    }

    pub fn label(&self, id: PartitionId) -> Option<&NodeLabel> {
        self.partitions.get(&id).map(Partition::label)
    }

    /// Concrete successor of a node; `None` only for TERMINAL nodes
    pub fn next_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].next
    }

    pub fn edges(&self) -> &BTreeMap<(PartitionId, PartitionId), EdgeStats> {
        &self.edges
    }

    pub fn edge(&self, from: PartitionId, to: PartitionId) -> Option<&EdgeStats> {
        self.edges.get(&(from, to))
    }

    pub fn successors(&self, id: PartitionId) -> impl Iterator<Item = PartitionId> + '_ {
        self.edges
            .range((id, PartitionId::MIN)..=(id, PartitionId::MAX))
            .map(|(&(_, to), _)| to)
    }

    /// Move the nodes of `id` that satisfy `predicate` into a new partition
    ///
    /// Returns the new partition, or `None` when either side would be empty.
    pub fn split<F>(&mut self, id: PartitionId, predicate: F) -> Option<PartitionId>
    where
        F: Fn(NodeId) -> bool,
    {
        let partition = self.partitions.get_mut(&id)?;
        let (moved, kept): (BTreeSet<NodeId>, BTreeSet<NodeId>) =
            partition.events.iter().partition(|&&node| predicate(node));
        if moved.is_empty() || kept.is_empty() {
            return None;
        }
        partition.events = kept;
        let label = partition.label.clone();

        // every step entering or leaving a moved node changes its edge
        let sources: BTreeSet<NodeId> = moved
            .iter()
            .flat_map(|&node| self.nodes[node].prev.into_iter().chain([node]))
            .collect();
        for &node in &sources {
            self.remove_step(node);
        }
        let fresh = self.next_id;
        self.next_id += 1;
        for &node in &moved {
            self.partition_of[node] = fresh;
        }
        for &node in &sources {
            self.add_step(node);
        }
        self.partitions.insert(fresh, Partition { label, events: moved });
        Some(fresh)
    }

    /// Fold partition `other` into `into`; both must carry the same label
    ///
    /// Returns `false` (and changes nothing) for unknown ids, identical ids
    /// or differing labels.
    pub fn merge(&mut self, into: PartitionId, other: PartitionId) -> bool {
        self.merge_reversible(into, other).is_some()
    }

    /// [`Self::merge`], returning what [`Self::unmerge`] needs to revert it
    ///
    /// Edges are folded at the abstract level: every edge touching `other`
    /// is added onto its renamed counterpart.
    pub fn merge_reversible(&mut self, into: PartitionId, other: PartitionId) -> Option<MergeUndo> {
        if into == other || self.label(into).is_none() || self.label(into) != self.label(other) {
            return None;
        }
        let Partition { label, events: absorbed } = self.partitions.remove(&other)?;
        for &node in &absorbed {
            self.partition_of[node] = into;
        }
        if let Some(target) = self.partitions.get_mut(&into) {
            target.events.extend(absorbed.iter().copied());
        }

        let touching: Vec<(PartitionId, PartitionId)> = self
            .edges
            .keys()
            .filter(|&&(from, to)| from == other || to == other)
            .copied()
            .collect();
        let removed: Vec<((PartitionId, PartitionId), EdgeStats)> = touching
            .into_iter()
            .filter_map(|key| self.edges.remove(&key).map(|stats| (key, stats)))
            .collect();

        let rename = |id: PartitionId| if id == other { into } else { id };
        let mut replaced: Vec<((PartitionId, PartitionId), Option<EdgeStats>)> = Vec::new();
        for ((from, to), stats) in &removed {
            let key = (rename(*from), rename(*to));
            if !replaced.iter().any(|(seen, _)| *seen == key) {
                replaced.push((key, self.edges.get(&key).cloned()));
            }
            let target = self.edges.entry(key).or_default();
            target.count += stats.count;
            target.deltas.merge(&stats.deltas);
        }

        Some(MergeUndo {
            into,
            other,
            label,
            absorbed,
            removed,
            replaced,
        })
    }

    /// Revert the merge recorded in `undo`
    ///
    /// Only valid while no other split or merge happened since.
    pub fn unmerge(&mut self, undo: MergeUndo) {
        for (key, previous) in undo.replaced {
            match previous {
                Some(stats) => {
                    self.edges.insert(key, stats);
                }
                None => {
                    self.edges.remove(&key);
                }
            }
        }
        self.edges.extend(undo.removed);
        for &node in &undo.absorbed {
            self.partition_of[node] = undo.other;
        }
        if let Some(target) = self.partitions.get_mut(&undo.into) {
            target.events.retain(|node| !undo.absorbed.contains(node));
        }
        self.partitions.insert(
            undo.other,
            Partition {
                label: undo.label,
                events: undo.absorbed,
            },
        );
    }

    /// Event partitions grouped by label
    pub fn partitions_by_label(&self) -> BTreeMap<&EventType, Vec<PartitionId>> {
        let mut groups: BTreeMap<&EventType, Vec<PartitionId>> = BTreeMap::new();
        for (&id, partition) in &self.partitions {
            if let Some(label) = partition.label.event() {
                groups.entry(label).or_default().push(id);
            }
        }
        groups
    }

    /// Automaton state numbering: INITIAL is 0, event partitions follow in id
    /// order, TERMINAL is not a state
    fn state_numbers(&self) -> BTreeMap<PartitionId, usize> {
        self.partitions
            .keys()
            .filter(|&&id| id != TERMINAL)
            .enumerate()
            .map(|(state, &id)| (id, state))
            .collect()
    }

    fn is_accepting(&self, id: PartitionId) -> bool {
        self.edges.contains_key(&(id, TERMINAL))
    }

    /// Read the graph as an NFA: entering a partition reads its label, and
    /// partitions with an edge to TERMINAL accept
    pub fn to_nfa(&self) -> Nfa {
        let numbers = self.state_numbers();
        let mut nfa = Nfa::new(Arc::clone(&self.alphabet));
        for _ in 1..numbers.len() {
            nfa.add_state(false);
        }
        for (&id, &state) in &numbers {
            nfa.set_accepting(state, self.is_accepting(id));
        }
        for &(from, to) in self.edges.keys() {
            let (Some(&f), Some(&t)) = (numbers.get(&from), numbers.get(&to)) else {
                continue;
            };
            let symbol = self.partitions[&to]
                .label
                .event()
                .and_then(|label| self.alphabet.index_of(label));
            if let Some(symbol) = symbol {
                nfa.add_transition(f, symbol, t);
            }
        }
        nfa
    }

    /// Export with per-edge counts and time-delta summaries
    pub fn to_graph(&self, kind: &str) -> ModelGraph {
        let numbers = self.state_numbers();
        let mut graph = ModelGraph::new(kind);
        for &id in numbers.keys() {
            let partition = &self.partitions[&id];
            let label = format!("{} [{}]", partition.label, partition.len());
            graph.add_state(self.is_accepting(id), Some(label));
        }
        for (&(from, to), stats) in &self.edges {
            let (Some(&f), Some(&t)) = (numbers.get(&from), numbers.get(&to)) else {
                continue;
            };
            let mut edge = TransitionEdge::new(f, t, self.partitions[&to].label.to_string());
            edge.count = Some(stats.count);
            edge.delta_median = stats.deltas.median();
            edge.delta_mode = stats.deltas.mode();
            graph.add_transition(edge);
        }
        graph
    }
}
