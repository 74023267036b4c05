use super::{check, PartitionGraph, PartitionId};
use crate::automaton::InvariantDfa;
use tracing::{debug, trace};

/// Greedily merge same-label partitions while every invariant still holds
///
/// Each candidate merge is applied in place and taken back when it breaks
/// an invariant. The scan visits every same-label pair once and continues
/// past accepted merges, skipping partitions already absorbed. Returns the
/// number of merges.
pub fn coarsen(graph: &mut PartitionGraph, invariants: &[InvariantDfa]) -> usize {
    let groups: Vec<Vec<PartitionId>> = graph.partitions_by_label().into_values().collect();
    let mut merges = 0;
    let mut rejected = 0;

    for ids in groups {
        for (i, &into) in ids.iter().enumerate() {
            if graph.partition(into).is_none() {
                continue;
            }
            for &other in &ids[i + 1..] {
                let Some(undo) = graph.merge_reversible(into, other) else {
                    continue;
                };
                if check::satisfies_all(graph, invariants) {
                    trace!(into, other, "merged partitions");
                    merges += 1;
                } else {
                    graph.unmerge(undo);
                    rejected += 1;
                }
            }
        }
    }
    debug!(
        merges,
        rejected,
        partitions = graph.partition_count(),
        "coarsening finished"
    );
    merges
}
