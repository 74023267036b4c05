//! tracemint - behavioral model inference from system logs
//!
//! This library mines temporal invariants (`AFby`, `NFby`, `AP`) from
//! totally or partially ordered traces, synthesizes finite-state models that
//! satisfy exactly those invariants (by partition refinement, k-tails, or
//! intersection of per-invariant automata), and composes per-process models
//! of distributed systems over FIFO channels into a global model.

pub mod automaton;
pub mod channel;
pub mod cli;
pub mod composer;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod invariants;
pub mod parser;
pub mod partition;
pub mod pipeline;
pub mod stats;
pub mod trace;

pub use error::{ModelError, Result};
