use super::miner::anchored;
use super::{Invariant, InvariantKind, InvariantSet};
use crate::error::Result;
use crate::trace::{EventType, PartialOrder, TraceSet};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Relations still standing after the traces seen so far
struct Candidates {
    width: usize,
    afby: Vec<bool>,
    nfby: Vec<bool>,
    ap: Vec<bool>,
}

impl Candidates {
    fn new(width: usize) -> Self {
        Self {
            width,
            afby: vec![true; width * width],
            nfby: vec![true; width * width],
            ap: vec![true; width * width],
        }
    }

    fn at(&self, a: usize, b: usize) -> usize {
        a * self.width + b
    }
}

/// Mine invariants that hold on every linearization of every trace
///
/// For an event `e` of type `a` under a partial order:
///
/// - `a AFby b` needs some `b` strictly after `e` (a `b` concurrent with `e`
///   can be scheduled before it)
/// - `a NFby b` needs every other `b` strictly before `e`
/// - `x AP a` needs some `x` strictly before `e`
///
/// Within a process chain the last occurrence of a type is the best witness
/// for "after" and the first is the best witness for "before", so each check
/// costs one vector-clock comparison per process.
///
/// Multi-process traces are mined over qualified event types (`p1:e`,
/// `0->1#0!m`), so a label that one process logs, sends and receives yields
/// three unrelated types. Presence does not depend on the linearization, so
/// `INITIAL AFby x` is mined exactly as for total orders.
///
/// # Errors
///
/// Propagates the input-inconsistency errors of [`PartialOrder::build`].
pub fn mine_partial_order(traces: &TraceSet) -> Result<InvariantSet> {
    let naming = traces.naming();
    let types: Vec<EventType> = traces.event_types_named(naming).into_iter().collect();
    let index: HashMap<EventType, usize> = types
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();
    let n = types.len();
    let mut candidates = Candidates::new(n);
    let mut containing = vec![0; n];

    for trace in traces {
        let po = PartialOrder::build(trace)?;
        let ids: Vec<usize> = trace
            .events()
            .iter()
            .map(|event| index[&naming.name(event)])
            .collect();
        let present: BTreeSet<usize> = ids.iter().copied().collect();
        for t in present {
            containing[t] += 1;
        }

        let mut first: Vec<Vec<Option<usize>>> = vec![vec![None; n]; po.chains().len()];
        let mut last: Vec<Vec<Option<usize>>> = vec![vec![None; n]; po.chains().len()];
        for (p, chain) in po.chains().iter().enumerate() {
            for &e in chain {
                first[p][ids[e]].get_or_insert(e);
                last[p][ids[e]] = Some(e);
            }
        }

        for (e, &a) in ids.iter().enumerate() {
            for b in 0..n {
                let slot = candidates.at(a, b);
                if candidates.afby[slot]
                    && !last
                        .iter()
                        .any(|row| row[b].is_some_and(|f| po.happens_before(e, f)))
                {
                    candidates.afby[slot] = false;
                }
                if candidates.nfby[slot]
                    && last
                        .iter()
                        .any(|row| row[b].is_some_and(|f| f != e && !po.happens_before(f, e)))
                {
                    candidates.nfby[slot] = false;
                }

                let slot = candidates.at(b, a);
                if candidates.ap[slot]
                    && !first
                        .iter()
                        .any(|row| row[b].is_some_and(|f| po.happens_before(f, e)))
                {
                    candidates.ap[slot] = false;
                }
            }
        }
    }

    let mut set = anchored(&types, &containing, traces.len());
    for a in 0..n {
        for b in 0..n {
            let slot = candidates.at(a, b);
            let pairs = [
                (candidates.afby[slot], InvariantKind::AlwaysFollowedBy),
                (candidates.nfby[slot], InvariantKind::NeverFollowedBy),
                (candidates.ap[slot], InvariantKind::AlwaysPrecedes),
            ];
            for (holds, kind) in pairs {
                if holds {
                    set.insert(Invariant::new(kind, types[a].clone(), types[b].clone()));
                }
            }
        }
    }

    debug!(
        traces = traces.len(),
        events = traces.event_count(),
        invariants = set.len(),
        "mined partial-order invariants"
    );
    Ok(set)
}
