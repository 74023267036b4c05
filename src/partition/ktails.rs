use super::{NodeLabel, PartitionGraph, PartitionId};
use crate::trace::TraceSet;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

type Tails = BTreeSet<Vec<NodeLabel>>;

/// k-tails model: merge partitions whose futures agree up to `k` steps
///
/// Starts from one partition per event and repeatedly merges all partitions
/// that share a label and a set of outgoing label sequences of length up to
/// `k` (a sequence may end early at TERMINAL), until nothing changes.
pub fn ktails(traces: &TraceSet, k: usize) -> PartitionGraph {
    let mut graph = PartitionGraph::singleton(traces);
    let mut rounds = 0;
    loop {
        rounds += 1;
        let tails = tails_up_to(&graph, k);
        let mut classes: BTreeMap<(NodeLabel, &Tails), Vec<PartitionId>> = BTreeMap::new();
        for (id, partition) in graph.partitions() {
            if let (NodeLabel::Event(_), Some(tail)) = (partition.label(), tails.get(&id)) {
                classes
                    .entry((partition.label().clone(), tail))
                    .or_default()
                    .push(id);
            }
        }
        let groups: Vec<Vec<PartitionId>> = classes
            .into_values()
            .filter(|ids| ids.len() > 1)
            .collect();
        if groups.is_empty() {
            break;
        }
        for ids in groups {
            for &other in &ids[1..] {
                graph.merge(ids[0], other);
            }
        }
    }
    debug!(k, rounds, partitions = graph.partition_count(), "k-tails converged");
    graph
}

/// Label sequences of length up to `k` leaving each partition
fn tails_up_to(graph: &PartitionGraph, k: usize) -> BTreeMap<PartitionId, Tails> {
    let ids: Vec<PartitionId> = graph.partitions().map(|(id, _)| id).collect();
    let mut level: BTreeMap<PartitionId, Tails> = ids
        .iter()
        .map(|&id| (id, BTreeSet::from([Vec::new()])))
        .collect();

    for _ in 0..k {
        let mut next: BTreeMap<PartitionId, Tails> = BTreeMap::new();
        for &id in &ids {
            let mut tails = Tails::new();
            for succ in graph.successors(id) {
                let Some(label) = graph.label(succ) else { continue };
                if *label == NodeLabel::Terminal {
                    tails.insert(vec![NodeLabel::Terminal]);
                    continue;
                }
                for tail in &level[&succ] {
                    let mut sequence = Vec::with_capacity(tail.len() + 1);
                    sequence.push(label.clone());
                    sequence.extend(tail.iter().cloned());
                    tails.insert(sequence);
                }
            }
            next.insert(id, tails);
        }
        level = next;
    }
    level
}
