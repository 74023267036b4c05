use super::{minimize, Dfa};
use crate::trace::TraceSet;
use std::sync::Arc;
use tracing::debug;

/// Redirect every transition no input trace traverses into a rejecting sink
///
/// The traces are replayed from the start state; replay of a trace stops at
/// the first label outside the alphabet. The result is minimized, so states
/// only reachable through removed transitions disappear.
pub fn remove_spurious_edges(dfa: &Dfa, traces: &TraceSet) -> Dfa {
    let k = dfa.alphabet().len();
    let n = dfa.state_count();
    let mut used = vec![false; n * k];
    for trace in traces {
        let mut state = dfa.start();
        for label in trace.labels() {
            let Some(sym) = dfa.alphabet().index_of(label) else {
                break;
            };
            used[state * k + sym] = true;
            state = dfa.next(state, sym);
        }
    }

    let sink = n;
    let mut delta: Vec<usize> = dfa
        .transitions()
        .map(|(from, sym, to)| if used[from * k + sym] { to } else { sink })
        .collect();
    delta.extend(std::iter::repeat(sink).take(k));
    let accepting = (0..n)
        .map(|s| dfa.is_accepting(s))
        .chain(std::iter::once(false))
        .collect();

    let removed = used.iter().filter(|&&u| !u).count();
    debug!(removed, "removed untraversed transitions");
    minimize(&Dfa::from_table(Arc::clone(dfa.alphabet()), delta, dfa.start(), accepting))
}
