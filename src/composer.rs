//! Global model composition for distributed logs
//!
//! Each process contributes a DFA over its own qualified event types
//! (`p1:e`, `1->2#0!e`, `1->2#0?e`). The composer
//! explores the joint state space `(local states, channel state)`: from a
//! joint state, any process may take one transition of its automaton; a send
//! enqueues on its channel and a receive is enabled only when its message is
//! at the head of the channel. Channel states come from the run's
//! [`ChannelStatePool`], so identical channel contents compare by handle.
//!
//! A joint state accepts when every process is in an accepting state and all
//! channels are empty.

use crate::automaton::{Dfa, StateId};
use crate::channel::{ChannelId, ChannelStatePool, MultiChState};
use crate::context::AnalysisContext;
use crate::error::{ModelError, Result};
use crate::export::{ModelGraph, TransitionEdge};
use crate::trace::{Event, EventKind, EventType, ProcessId, TraceSet};
use fnv::FnvHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// A process automaton and the event behind each of its symbols
///
/// Symbols are qualified event types (`p1:e`, `1->2#0!e`), so one label may
/// appear as a local event, a send and a receive of the same process.
#[derive(Debug, Clone)]
pub struct ProcessModel {
    pub process: ProcessId,
    pub dfa: Dfa,
    actions: BTreeMap<EventType, Event>,
}

impl ProcessModel {
    pub fn new(process: ProcessId, dfa: Dfa, actions: BTreeMap<EventType, Event>) -> Self {
        Self {
            process,
            dfa,
            actions,
        }
    }

    /// The event each qualified type of `process` stands for
    pub fn actions_from_traces(traces: &TraceSet, process: ProcessId) -> BTreeMap<EventType, Event> {
        traces
            .iter()
            .flat_map(|t| t.events())
            .filter(|e| e.process == process)
            .map(|e| {
                let template = Event {
                    time: None,
                    ..e.clone()
                };
                (e.qualified_type(), template)
            })
            .collect()
    }

    pub fn kind(&self, symbol: &EventType) -> EventKind {
        self.actions
            .get(symbol)
            .map_or(EventKind::Local, |event| event.kind)
    }

    fn event(&self, symbol: &EventType) -> Event {
        self.actions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Event::local(symbol.clone(), self.process))
    }
}

/// A joint state: one local state per process plus all channel contents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GfsmNode {
    pub locals: Vec<StateId>,
    pub channels: MultiChState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalTransition {
    pub from: usize,
    pub to: usize,
    pub event: Event,
}

/// Reachable joint state space of a communicating system
#[derive(Debug, Clone, Serialize)]
pub struct GlobalModel {
    processes: Vec<ProcessId>,
    nodes: Vec<GfsmNode>,
    accepting: Vec<bool>,
    transitions: Vec<GlobalTransition>,
}

impl GlobalModel {
    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }

    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn nodes(&self) -> &[GfsmNode] {
        &self.nodes
    }

    pub fn transitions(&self) -> &[GlobalTransition] {
        &self.transitions
    }

    pub fn is_accepting(&self, node: usize) -> bool {
        self.accepting[node]
    }

    /// Export; transitions are labeled with the event's display form
    /// (`p0:tick`, `0->1#0!m`, `0->1#0?m`)
    pub fn to_graph(&self, pool: &ChannelStatePool) -> ModelGraph {
        let mut graph = ModelGraph::new("global");
        for (id, node) in self.nodes.iter().enumerate() {
            let locals: Vec<String> = node.locals.iter().map(ToString::to_string).collect();
            let in_flight = pool.content(node.channels).message_count();
            let label = format!("[{}] in-flight={}", locals.join(","), in_flight);
            graph.add_state(self.accepting[id], Some(label));
        }
        for t in &self.transitions {
            graph.add_transition(TransitionEdge::new(t.from, t.to, t.event.to_string()));
        }
        graph
    }
}

/// Explore the joint state space of `models` over `channels`
///
/// Transitions into states of a process automaton that cannot reach
/// acceptance are skipped. Fails with `ExplorationLimit` once more than
/// `limit` joint states would be created.
pub fn compose(
    models: &[ProcessModel],
    channels: &BTreeSet<ChannelId>,
    ctx: &mut AnalysisContext,
    limit: Option<usize>,
) -> Result<GlobalModel> {
    let pool = ctx.pool_mut();
    let live: Vec<Vec<bool>> = models.iter().map(|m| m.dfa.live_states()).collect();

    let start = GfsmNode {
        locals: models.iter().map(|m| m.dfa.start()).collect(),
        channels: pool.from_channel_ids(channels.iter().copied())?,
    };
    let mut ids: FnvHashMap<GfsmNode, usize> = FnvHashMap::default();
    let mut nodes = vec![start.clone()];
    ids.insert(start, 0);
    let mut transitions = Vec::new();
    let mut queue = VecDeque::from([0usize]);

    while let Some(from) = queue.pop_front() {
        for (i, model) in models.iter().enumerate() {
            let local = nodes[from].locals[i];
            for (sym, label) in model.dfa.alphabet().symbols().iter().enumerate() {
                let target = model.dfa.next(local, sym);
                if !live[i][target] {
                    continue;
                }
                let event = model.event(label);
                let channels = match pool.next_state(nodes[from].channels, &event) {
                    Ok(next) => next,
                    Err(ModelError::ChannelMismatch { .. } | ModelError::EmptyChannel { .. }) => {
                        continue
                    }
                    Err(err) => return Err(err),
                };
                let mut locals = nodes[from].locals.clone();
                locals[i] = target;
                let node = GfsmNode { locals, channels };

                let to = match ids.get(&node) {
                    Some(&existing) => existing,
                    None => {
                        if let Some(max) = limit.filter(|&max| nodes.len() >= max) {
                            return Err(ModelError::ExplorationLimit { limit: max });
                        }
                        let fresh = nodes.len();
                        ids.insert(node.clone(), fresh);
                        nodes.push(node);
                        queue.push_back(fresh);
                        fresh
                    }
                };
                transitions.push(GlobalTransition { from, to, event });
            }
        }
        if from > 0 && from % 10_000 == 0 {
            debug!(explored = from, frontier = queue.len(), "composing global model");
        }
    }

    let accepting: Vec<bool> = nodes
        .iter()
        .map(|node| {
            pool.content(node.channels).is_empty()
                && node
                    .locals
                    .iter()
                    .zip(models)
                    .all(|(&state, model)| model.dfa.is_accepting(state))
        })
        .collect();

    info!(
        processes = models.len(),
        states = nodes.len(),
        transitions = transitions.len(),
        channel_states = pool.len(),
        "composed global model"
    );
    Ok(GlobalModel {
        processes: models.iter().map(|m| m.process).collect(),
        nodes,
        accepting,
        transitions,
    })
}
