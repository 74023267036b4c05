//! Partition-refinement model synthesis
//!
//! Events of the input traces are grouped into partitions; the quotient
//! graph over partitions is read as an automaton. [`refine`] splits
//! partitions until the model satisfies every mined invariant, [`coarsen`]
//! merges back whatever the invariants do not need, and [`ktails`] builds
//! the alternative k-tails model. Every operation keeps all input traces
//! accepted, since concrete event chains are never cut.

mod check;
mod coarsen;
mod graph;
mod ktails;
mod refine;

pub use check::{find_counterexample, first_violation, satisfies_all};
pub use coarsen::coarsen;
pub use graph::{
    EdgeStats, MergeUndo, NodeId, NodeLabel, Partition, PartitionGraph, PartitionId,
};
pub use ktails::ktails;
pub use refine::{refine, synthesize, RefinementStats};
