use super::{mine_partial_order, Invariant, InvariantKind, InvariantSet};
use crate::error::Result;
use crate::trace::{EventType, TraceSet};
use std::collections::HashMap;
use tracing::debug;

/// Mine invariants, picking the partial-order miner for multi-process logs
pub fn mine_invariants(traces: &TraceSet) -> Result<InvariantSet> {
    if traces.is_distributed() {
        mine_partial_order(traces)
    } else {
        Ok(mine_total_order(traces))
    }
}

/// Occurrence counters accumulated over all traces
///
/// `followed[a][b]` counts occurrences of `a` with some `b` strictly later in
/// the same trace; `preceded[b][a]` counts occurrences of `b` with some `a`
/// strictly earlier. `containing[a]` counts traces with at least one `a`.
struct Counters {
    types: Vec<EventType>,
    traces: usize,
    containing: Vec<usize>,
    occurrences: Vec<usize>,
    followed: Vec<usize>,
    preceded: Vec<usize>,
}

impl Counters {
    fn new(types: Vec<EventType>) -> Self {
        let n = types.len();
        Self {
            types,
            traces: 0,
            containing: vec![0; n],
            occurrences: vec![0; n],
            followed: vec![0; n * n],
            preceded: vec![0; n * n],
        }
    }

    fn width(&self) -> usize {
        self.types.len()
    }

    /// One backward and one forward scan, O(len * types)
    fn scan(&mut self, ids: &[usize]) {
        let n = self.width();

        let mut after = vec![false; n];
        for &t in ids.iter().rev() {
            self.occurrences[t] += 1;
            for (b, seen) in after.iter().enumerate() {
                if *seen {
                    self.followed[t * n + b] += 1;
                }
            }
            after[t] = true;
        }
        self.traces += 1;
        for (t, present) in after.iter().enumerate() {
            if *present {
                self.containing[t] += 1;
            }
        }

        let mut before = vec![false; n];
        for &t in ids {
            for (a, seen) in before.iter().enumerate() {
                if *seen {
                    self.preceded[t * n + a] += 1;
                }
            }
            before[t] = true;
        }
    }

    fn into_invariants(self) -> InvariantSet {
        let n = self.width();
        let mut set = anchored(&self.types, &self.containing, self.traces);
        for a in 0..n {
            for b in 0..n {
                let followed = self.followed[a * n + b];
                if followed == self.occurrences[a] {
                    set.insert(self.invariant(InvariantKind::AlwaysFollowedBy, a, b));
                }
                if followed == 0 {
                    set.insert(self.invariant(InvariantKind::NeverFollowedBy, a, b));
                }
                if self.preceded[b * n + a] == self.occurrences[b] {
                    set.insert(self.invariant(InvariantKind::AlwaysPrecedes, a, b));
                }
            }
        }
        set
    }

    fn invariant(&self, kind: InvariantKind, a: usize, b: usize) -> Invariant {
        Invariant::new(kind, self.types[a].clone(), self.types[b].clone())
    }
}

/// `INITIAL AFby x` for every type `x` present in all of `traces` traces
pub(super) fn anchored(types: &[EventType], containing: &[usize], traces: usize) -> InvariantSet {
    if traces == 0 {
        return InvariantSet::new();
    }
    types
        .iter()
        .zip(containing)
        .filter(|(_, &count)| count == traces)
        .map(|(x, _)| Invariant::always_followed_by(EventType::initial(), x.clone()))
        .collect()
}

/// Mine invariants from totally ordered traces (log order)
///
/// Only event types that occur somewhere are considered. A pair of types that
/// never co-occurs in a trace yields its vacuous `NFby` relations. A type
/// found in every trace also yields `INITIAL AFby x`, which rules out traces
/// that skip it entirely.
///
/// # Example
/// ```
/// use tracemint::invariants::{mine_total_order, Invariant};
/// use tracemint::trace::{Trace, TraceSet};
///
/// let traces = TraceSet::new(vec![
///     Trace::from_labels(["login", "query", "logout"]),
///     Trace::from_labels(["login", "logout"]),
/// ]);
/// let invariants = mine_total_order(&traces);
///
/// assert!(invariants.contains(&Invariant::always_followed_by("login", "logout")));
/// assert!(invariants.contains(&Invariant::always_precedes("login", "query")));
/// assert!(invariants.contains(&Invariant::never_followed_by("logout", "login")));
/// assert!(invariants.contains(&Invariant::always_followed_by("INITIAL", "logout")));
/// ```
pub fn mine_total_order(traces: &TraceSet) -> InvariantSet {
    let types: Vec<EventType> = traces.event_types().into_iter().collect();
    let index: HashMap<EventType, usize> = types
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();

    let mut counters = Counters::new(types);
    for trace in traces {
        let ids: Vec<usize> = trace.labels().map(|label| index[label]).collect();
        counters.scan(&ids);
    }

    let invariants = counters.into_invariants();
    debug!(
        traces = traces.len(),
        events = traces.event_count(),
        invariants = invariants.len(),
        "mined total-order invariants"
    );
    invariants
}
