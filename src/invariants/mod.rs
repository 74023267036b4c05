//! Temporal invariant mining
//!
//! Three binary relations over event types are mined:
//!
//! - `a AFby b`: every `a` is eventually followed by a `b` in the same trace
//! - `a NFby b`: no `a` is ever followed by a `b`
//! - `a AP b`: every `b` is preceded by some earlier `a`
//!
//! An invariant is reported only if it holds on every input trace. For
//! multi-process traces it must hold on every linearization of the partial
//! order, which is decided with vector clocks rather than by enumerating
//! linearizations.

mod invariant;
mod miner;
mod po_miner;

pub use invariant::{Invariant, InvariantKind, InvariantSet};
pub use miner::{mine_invariants, mine_total_order};
pub use po_miner::mine_partial_order;
