//! Integration tests for model synthesis: refinement, k-tails, intersection

mod utils;

use std::sync::Arc;
use tracemint::automaton::{
    compile_invariant, equivalent, intersect_all, minimize, Alphabet, Dfa,
};
use tracemint::config::{ExportVariant, MiningConfig, Mode};
use tracemint::context::AnalysisContext;
use tracemint::invariants::{mine_total_order, Invariant};
use tracemint::pipeline;
use tracemint::trace::{EventType, TraceSet};
use tracemint::ModelError;
use utils::traces;

fn session_logs() -> TraceSet {
    traces(&[
        &["connect", "auth", "get", "get", "disconnect"],
        &["connect", "auth", "put", "disconnect"],
        &["connect", "fail", "disconnect"],
        &["connect", "auth", "disconnect"],
    ])
}

fn all_configs() -> Vec<MiningConfig> {
    let exports = vec![ExportVariant::Nfa, ExportVariant::Dfa];
    vec![
        MiningConfig {
            export: exports.clone(),
            ..MiningConfig::default()
        },
        MiningConfig {
            coarsen: false,
            export: exports.clone(),
            ..MiningConfig::default()
        },
        MiningConfig {
            export: exports.clone(),
            ..MiningConfig::ktails(2)
        },
        MiningConfig {
            mode: Mode::Intersect,
            export: exports.clone(),
            ..MiningConfig::default()
        },
        MiningConfig {
            mode: Mode::Intersect,
            perform_ktails: true,
            minimize_intersections: false,
            export: exports,
            ..MiningConfig::default()
        },
        MiningConfig::strict(),
    ]
}

#[test]
fn test_every_model_accepts_every_input_trace() {
    let input = session_logs();
    for config in all_configs() {
        let mut ctx = AnalysisContext::new();
        let output = pipeline::run(&input, &config, &mut ctx).unwrap();
        assert!(!output.models.is_empty(), "{config:?}");
        for model in &output.models {
            for trace in &input {
                assert!(
                    model.accepts(trace.labels().map(EventType::as_str)),
                    "{} model of {:?} rejects {:?}",
                    model.kind,
                    config.mode,
                    trace
                );
            }
        }
    }
}

#[test]
fn test_every_model_rejects_invariant_violations() {
    let input = session_logs();
    let violations: [&[&str]; 3] = [
        &["auth", "connect", "disconnect"],
        &["connect", "get"],
        &["connect", "auth", "disconnect", "connect"],
    ];
    for config in all_configs() {
        let output = pipeline::run(&input, &config, &mut AnalysisContext::new()).unwrap();
        let dfa = output.model("dfa").unwrap();
        for bad in violations {
            assert!(!dfa.accepts(bad), "{:?} accepts {bad:?}", config.mode);
        }
    }
}

#[test]
fn test_refinement_model_satisfies_exactly_mined_invariants() {
    let input = session_logs();
    let output = pipeline::run(
        &input,
        &MiningConfig::default(),
        &mut AnalysisContext::new(),
    )
    .unwrap();
    let intersect = pipeline::run(
        &input,
        &MiningConfig {
            mode: Mode::Intersect,
            ..MiningConfig::default()
        },
        &mut AnalysisContext::new(),
    )
    .unwrap();
    assert_eq!(output.invariants, intersect.invariants);

    let refined = output.model("dfa").unwrap();
    let product = intersect.model("dfa").unwrap();
    // The intersection is the largest language with these invariants
    for word in [
        vec!["connect", "auth", "get", "disconnect"],
        vec!["connect", "auth", "put", "put", "disconnect"],
    ] {
        if refined.accepts(&word) {
            assert!(product.accepts(&word));
        }
    }
    assert!(output.refinement.is_some_and(|s| s.partitions >= 7));
}

#[test]
fn test_intersection_is_stable_across_minimization_toggle() {
    let input = session_logs();
    let invariants = mine_total_order(&input);
    let alphabet = Arc::new(Alphabet::new(input.event_types()));
    let dfas: Vec<Dfa> = invariants
        .iter()
        .map(|inv| compile_invariant(inv, &alphabet).unwrap())
        .collect();

    let eager = intersect_all(&alphabet, &dfas, true).unwrap();
    let lazy = intersect_all(&alphabet, &dfas, false).unwrap();
    assert_eq!(eager, lazy);
    assert!(equivalent(&eager, &minimize(&lazy)));
    for trace in &input {
        assert!(eager.accepts(trace.labels()));
    }
}

#[test]
fn test_contradictory_invariants_have_no_accepting_path() {
    let alphabet = Arc::new(Alphabet::new(["a", "b"].map(EventType::from)));
    let dfas: Vec<Dfa> = [
        Invariant::always_precedes("b", "a"),
        Invariant::always_precedes("a", "b"),
        Invariant::always_followed_by(EventType::initial(), "a"),
    ]
    .iter()
    .map(|inv| compile_invariant(inv, &alphabet).unwrap())
    .collect();
    let product = intersect_all(&alphabet, &dfas, true).unwrap();

    // AP(b,a) and AP(a,b) leave only the empty word, which INITIAL AFby a forbids
    assert!(product.is_empty());
    assert!(!product.accepts(&[]));
    assert!(product.shortest_accepted().is_none());
}

#[test]
fn test_no_model_accepts_the_empty_trace_unless_observed() {
    let input = traces(&[&["open", "read", "close"], &["open", "close"]]);
    for config in [MiningConfig::default(), MiningConfig::strict()] {
        let output = pipeline::run(&input, &config, &mut AnalysisContext::new()).unwrap();
        let dfa = output.model("dfa").unwrap();
        assert!(!dfa.accepts(Vec::<&str>::new()), "{:?} accepts []", config.mode);
        assert!(dfa.accepts(["open", "close"]));
    }
}

#[test]
fn test_required_invariant_contradiction_is_reported() {
    let input = traces(&[&["open", "close"], &["open", "read", "close"]]);
    let config = MiningConfig {
        required_invariants: vec![Invariant::never_followed_by("open", "close")],
        ..MiningConfig::strict()
    };
    let err = pipeline::run(&input, &config, &mut AnalysisContext::new()).unwrap_err();
    match err {
        ModelError::InvariantContradiction { invariants } => {
            assert!(invariants.contains(&Invariant::never_followed_by("open", "close")));
            assert!(invariants.contains(&Invariant::always_followed_by(EventType::initial(), "open")));
        }
        other => panic!("expected a contradiction, got {other:?}"),
    }
}

#[test]
fn test_time_deltas_exported_on_nfa_edges() {
    let parser = tracemint::parser::LogParser::new(
        &[r"^(?<TIME>\d+) (?<TYPE>\w+)$"],
        Some("^$|^--$"),
        false,
    )
    .unwrap();
    let parsed = parser
        .parse_str("0 start\n4 stop\n--\n10 start\n12 stop\n--\n20 start\n24 stop\n")
        .unwrap();
    let input = TraceSet::new(parsed);

    let config = MiningConfig {
        export: vec![ExportVariant::Nfa],
        ..MiningConfig::default()
    };
    let output = pipeline::run(&input, &config, &mut AnalysisContext::new()).unwrap();
    let nfa = output.model("nfa").unwrap();
    let stop = nfa.transitions.iter().find(|t| t.label == "stop").unwrap();
    assert_eq!(stop.count, Some(3));
    assert_eq!(stop.delta_mode, Some(4));
    assert_eq!(stop.delta_median, Some(4));
}
