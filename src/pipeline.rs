//! End-to-end mining run
//!
//! `traces -> invariants -> model(s)`, with per-process synthesis and global
//! composition for distributed input.

use crate::automaton::{
    compile_invariants, intersect_all, minimize, remove_spurious_edges, Alphabet, Dfa,
    InvariantDfa,
};
use crate::composer::{compose, ProcessModel};
use crate::config::{ExportVariant, MiningConfig, Mode};
use crate::context::AnalysisContext;
use crate::error::{ModelError, Result};
use crate::export::ModelGraph;
use crate::invariants::{mine_invariants, mine_total_order, Invariant, InvariantSet};
use crate::partition::{self, ktails, PartitionGraph, RefinementStats};
use crate::trace::{ProcessId, TraceSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Exported automaton of one mined invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantModel {
    pub id: u32,
    pub invariant: Invariant,
    pub model: ModelGraph,
}

/// Models synthesized for one process of a distributed system
///
/// Event types are qualified (`p1:e`, `0->1#0!m`).
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    pub process: ProcessId,
    pub invariants: InvariantSet,
    pub models: Vec<ModelGraph>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invariant_dfas: Vec<InvariantModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinementStats>,
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct MiningOutput {
    pub invariants: InvariantSet,
    pub models: Vec<ModelGraph>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invariant_dfas: Vec<InvariantModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinementStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ProcessOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<ModelGraph>,
}

impl MiningOutput {
    /// First exported model of the given kind ("nfa", "dfa", ...)
    pub fn model(&self, kind: &str) -> Option<&ModelGraph> {
        self.models.iter().find(|m| m.kind == kind)
    }
}

/// Result of synthesizing one totally ordered trace set
struct Synthesis {
    dfa: Dfa,
    partition_graph: Option<PartitionGraph>,
    invariant_dfas: Vec<InvariantDfa>,
    refinement: Option<RefinementStats>,
}

impl Synthesis {
    fn models(&self, config: &MiningConfig) -> Vec<ModelGraph> {
        let mut models = Vec::new();
        if config.exports(ExportVariant::Nfa) {
            match &self.partition_graph {
                Some(graph) => models.push(graph.to_graph("nfa")),
                None => debug!("no partition graph in this mode; skipping NFA export"),
            }
        }
        if config.exports(ExportVariant::Dfa) {
            models.push(self.dfa.to_graph("dfa"));
        }
        models
    }

    fn invariant_models(&self, config: &MiningConfig) -> Vec<InvariantModel> {
        if !config.exports(ExportVariant::InvariantDfas) {
            return Vec::new();
        }
        self.invariant_dfas
            .iter()
            .map(|inv| InvariantModel {
                id: inv.id,
                invariant: inv.invariant.clone(),
                model: inv.dfa.to_graph("invariant"),
            })
            .collect()
    }
}

/// Run mining and synthesis over `traces`
///
/// # Example
/// ```
/// use tracemint::config::MiningConfig;
/// use tracemint::context::AnalysisContext;
/// use tracemint::pipeline;
/// use tracemint::trace::{Trace, TraceSet};
///
/// let traces = TraceSet::new(vec![
///     Trace::from_labels(["open", "read", "close"]),
///     Trace::from_labels(["open", "close"]),
/// ]);
/// let mut ctx = AnalysisContext::new();
/// let output = pipeline::run(&traces, &MiningConfig::default(), &mut ctx).unwrap();
///
/// let dfa = output.model("dfa").unwrap();
/// assert!(dfa.accepts(["open", "read", "close"]));
/// assert!(!dfa.accepts(["close", "open"]));
/// ```
pub fn run(traces: &TraceSet, config: &MiningConfig, ctx: &mut AnalysisContext) -> Result<MiningOutput> {
    config.validate()?;
    let invariants = mine_invariants(traces)?;
    info!(
        traces = traces.len(),
        events = traces.event_count(),
        invariants = invariants.len(),
        "mined invariants"
    );

    if config.distributed || traces.is_distributed() {
        return run_distributed(traces, invariants, config, ctx);
    }

    let mut constraints = invariants.clone();
    constraints.extend(config.required_invariants.iter().cloned());
    let synthesis = synthesize(traces, &constraints, config, ctx)?;
    Ok(MiningOutput {
        models: synthesis.models(config),
        invariant_dfas: synthesis.invariant_models(config),
        refinement: synthesis.refinement,
        invariants,
        processes: Vec::new(),
        global: None,
    })
}

fn run_distributed(
    traces: &TraceSet,
    invariants: InvariantSet,
    config: &MiningConfig,
    ctx: &mut AnalysisContext,
) -> Result<MiningOutput> {
    let mut processes = Vec::new();
    let mut models = Vec::new();
    for pid in traces.processes() {
        let projected = traces.project_qualified(pid);
        let local_invariants = mine_total_order(&projected);
        let alphabet = projected.event_types();
        let mut constraints = local_invariants.clone();
        constraints.extend(
            config
                .required_invariants
                .iter()
                .filter(|inv| {
                    (inv.is_anchored() || alphabet.contains(&inv.first))
                        && alphabet.contains(&inv.second)
                })
                .cloned(),
        );
        let actions = ProcessModel::actions_from_traces(traces, pid);
        let synthesis = synthesize(&projected, &constraints, config, ctx)?;
        debug!(
            process = pid,
            invariants = local_invariants.len(),
            states = synthesis.dfa.state_count(),
            "synthesized process model"
        );
        processes.push(ProcessOutput {
            process: pid,
            models: synthesis.models(config),
            invariant_dfas: synthesis.invariant_models(config),
            refinement: synthesis.refinement,
            invariants: local_invariants,
        });
        models.push(ProcessModel::new(pid, synthesis.dfa, actions));
    }
    debug!(
        processes = processes.len(),
        "distributed run exports per-process models and invariant automata"
    );

    let global = compose(&models, &traces.channels(), ctx, config.max_explored_states)?;
    Ok(MiningOutput {
        invariants,
        models: Vec::new(),
        invariant_dfas: Vec::new(),
        refinement: None,
        processes,
        global: Some(global.to_graph(ctx.pool())),
    })
}

/// Build the model of one totally ordered trace set
fn synthesize(
    traces: &TraceSet,
    invariants: &InvariantSet,
    config: &MiningConfig,
    ctx: &mut AnalysisContext,
) -> Result<Synthesis> {
    let alphabet = Arc::new(Alphabet::new(traces.event_types()));
    let invariant_dfas = compile_invariants(invariants, &alphabet, ctx)?;

    match config.mode {
        Mode::Refine => {
            let (graph, refinement) = if config.perform_ktails {
                (ktails(traces, config.k_tail_length), None)
            } else {
                let (graph, stats) =
                    partition::synthesize(traces, &invariant_dfas, config.coarsen)?;
                (graph, Some(stats))
            };
            Ok(Synthesis {
                dfa: minimize(&graph.to_nfa().determinize()),
                partition_graph: Some(graph),
                invariant_dfas,
                refinement,
            })
        }
        Mode::Intersect => {
            let ktails_graph = config
                .perform_ktails
                .then(|| ktails(traces, config.k_tail_length));
            let ktails_dfa = ktails_graph
                .as_ref()
                .map(|graph| minimize(&graph.to_nfa().determinize()));

            // Invariants alone cannot rule out the empty trace when no type
            // occurs in every trace.
            let non_empty = (!traces.is_empty() && traces.iter().all(|t| !t.is_empty()))
                .then(|| Dfa::non_empty(Arc::clone(&alphabet)));

            let operands = invariant_dfas
                .iter()
                .map(|inv| &inv.dfa)
                .chain(ktails_dfa.as_ref())
                .chain(non_empty.as_ref());
            let mut dfa = intersect_all(&alphabet, operands, config.minimize_intersections)?;
            if dfa.is_empty() && !traces.is_empty() {
                return Err(ModelError::InvariantContradiction {
                    invariants: invariants.iter().cloned().collect(),
                });
            }
            if config.remove_spurious_edges {
                dfa = remove_spurious_edges(&dfa, traces);
            }
            info!(
                invariants = invariant_dfas.len(),
                states = dfa.state_count(),
                "intersected invariant automata"
            );
            Ok(Synthesis {
                dfa,
                partition_graph: ktails_graph,
                invariant_dfas,
                refinement: None,
            })
        }
    }
}
