//! Trace model: typed events grouped into execution traces
//!
//! A trace whose events all belong to one process is a total order (log
//! order). A trace spanning several processes is a partial order: each
//! process contributes its events in log order, and every receive is ordered
//! after its FIFO-matched send. Traces are never mutated after construction;
//! the engines only derive projections and partial-order views.

mod event;
mod partial_order;

pub use event::{Event, EventKind, EventType, ProcessId, INITIAL_LABEL};
pub use partial_order::PartialOrder;

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How events are named when they become invariant and automaton symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Bare log label
    Label,
    /// Owner- and channel-qualified type, see [`Event::qualified_type`]
    Qualified,
}

impl Naming {
    pub fn name(self, event: &Event) -> EventType {
        match self {
            Naming::Label => event.label.clone(),
            Naming::Qualified => event.qualified_type(),
        }
    }
}

/// One execution instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    events: Vec<Event>,
}

impl Trace {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Build a single-process trace from bare labels
    ///
    /// # Example
    /// ```
    /// use tracemint::trace::Trace;
    ///
    /// let trace = Trace::from_labels(["open", "read", "close"]);
    /// assert_eq!(trace.len(), 3);
    /// ```
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|label| Event::local(label.as_ref(), 0))
                .collect(),
        )
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn labels(&self) -> impl Iterator<Item = &EventType> + '_ {
        self.events.iter().map(|e| &e.label)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn processes(&self) -> BTreeSet<ProcessId> {
        self.events.iter().map(|e| e.process).collect()
    }

    /// Events owned by `process`, in log order
    pub fn project(&self, process: ProcessId) -> Trace {
        Trace::new(
            self.events
                .iter()
                .filter(|e| e.process == process)
                .cloned()
                .collect(),
        )
    }

    /// Events owned by `process` as a local trace over qualified types
    ///
    /// The result is totally ordered, so single-process synthesis applies to
    /// it unchanged; timestamps are kept.
    pub fn project_qualified(&self, process: ProcessId) -> Trace {
        Trace::new(
            self.events
                .iter()
                .filter(|e| e.process == process)
                .map(|e| Event {
                    label: e.qualified_type(),
                    process,
                    kind: EventKind::Local,
                    time: e.time,
                })
                .collect(),
        )
    }

    /// True when the log order is the only order (one process, no messages)
    pub fn is_totally_ordered(&self) -> bool {
        self.processes().len() <= 1 && !self.events.iter().any(Event::is_communication)
    }
}

/// The full input of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSet {
    traces: Vec<Trace>,
}

impl TraceSet {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self { traces }
    }

    pub fn push(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trace> {
        self.traces.iter()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.traces.iter().map(Trace::len).sum()
    }

    /// Every event type that occurs in at least one trace
    pub fn event_types(&self) -> BTreeSet<EventType> {
        self.traces
            .iter()
            .flat_map(|t| t.labels().cloned())
            .collect()
    }

    pub fn processes(&self) -> BTreeSet<ProcessId> {
        self.traces.iter().flat_map(Trace::processes).collect()
    }

    /// Symbol naming for this input: qualified types for multi-process logs
    pub fn naming(&self) -> Naming {
        if self.is_distributed() {
            Naming::Qualified
        } else {
            Naming::Label
        }
    }

    /// Every event type under `naming`
    pub fn event_types_named(&self, naming: Naming) -> BTreeSet<EventType> {
        self.traces
            .iter()
            .flat_map(|t| t.events().iter().map(move |e| naming.name(e)))
            .collect()
    }

    /// Channels used by any send or receive
    pub fn channels(&self) -> BTreeSet<ChannelId> {
        self.traces
            .iter()
            .flat_map(|t| t.events().iter().filter_map(|e| e.kind.channel()))
            .collect()
    }

    /// True when any trace must be treated as a partial order
    pub fn is_distributed(&self) -> bool {
        self.traces.iter().any(|t| !t.is_totally_ordered())
            || self.processes().len() > 1
    }

    /// Per-process view: every trace restricted to `process`
    pub fn project(&self, process: ProcessId) -> TraceSet {
        TraceSet::new(self.traces.iter().map(|t| t.project(process)).collect())
    }

    /// Per-process view over qualified event types
    pub fn project_qualified(&self, process: ProcessId) -> TraceSet {
        TraceSet::new(
            self.traces
                .iter()
                .map(|t| t.project_qualified(process))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a TraceSet {
    type Item = &'a Trace;
    type IntoIter = std::slice::Iter<'a, Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.iter()
    }
}

impl FromIterator<Trace> for TraceSet {
    fn from_iter<I: IntoIterator<Item = Trace>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
