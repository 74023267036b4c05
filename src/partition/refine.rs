use super::{check, coarsen, PartitionGraph, PartitionId};
use crate::automaton::InvariantDfa;
use crate::error::{ModelError, Result};
use crate::trace::TraceSet;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

/// Counters reported by a refinement run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefinementStats {
    pub splits: usize,
    pub merges: usize,
    pub partitions: usize,
}

/// Split partitions until no invariant has a counterexample
///
/// A split only removes abstract paths, so an invariant satisfied once stays
/// satisfied while later invariants are processed. Returns the number of
/// splits performed.
pub fn refine(graph: &mut PartitionGraph, invariants: &[InvariantDfa]) -> Result<usize> {
    let mut splits = 0;
    for inv in invariants {
        while let Some(path) = check::find_counterexample(graph, &inv.dfa) {
            trace!(invariant = %inv.invariant, length = path.len(), "counterexample");
            if split_along(graph, &path).is_none() {
                return Err(ModelError::NonConvergentRefinement {
                    invariant: inv.invariant.clone(),
                });
            }
            splits += 1;
        }
    }
    debug!(splits, partitions = graph.partition_count(), "refinement converged");
    Ok(splits)
}

/// Split the partition where the concrete traces stop following `path`
///
/// Walks the sets of nodes that realize each prefix of the path. At the first
/// step no such node can take, the previous partition is split into the nodes
/// that realize the prefix and the rest. Returns `None` when every step is
/// realized, meaning an input trace itself follows the path.
fn split_along(graph: &mut PartitionGraph, path: &[PartitionId]) -> Option<PartitionId> {
    let (&first, rest) = path.split_first()?;
    let mut current: BTreeSet<usize> = graph.partition(first)?.events().clone();
    let mut previous = first;

    for &partition in rest {
        let reached: BTreeSet<usize> = current
            .iter()
            .filter_map(|&node| graph.next_node(node))
            .filter(|&node| graph.partition_of(node) == partition)
            .collect();
        if reached.is_empty() {
            if previous == graph.initial() {
                return None;
            }
            return graph.split(previous, |node| current.contains(&node));
        }
        current = reached;
        previous = partition;
    }
    None
}

/// Full refinement pipeline over a trace set
///
/// Starts from one partition per event type, refines against every
/// invariant, then optionally coarsens.
pub fn synthesize(
    traces: &TraceSet,
    invariants: &[InvariantDfa],
    coarsen_after: bool,
) -> Result<(PartitionGraph, RefinementStats)> {
    let mut graph = PartitionGraph::from_traces(traces);
    let initial = graph.partition_count();
    let splits = refine(&mut graph, invariants)?;
    let merges = if coarsen_after {
        coarsen::coarsen(&mut graph, invariants)
    } else {
        0
    };
    let stats = RefinementStats {
        splits,
        merges,
        partitions: graph.partition_count(),
    };
    info!(
        initial,
        splits = stats.splits,
        merges = stats.merges,
        partitions = stats.partitions,
        "synthesized partition model"
    );
    Ok((graph, stats))
}
