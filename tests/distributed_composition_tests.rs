//! Integration tests for per-process synthesis and global composition

mod utils;

use tracemint::channel::ChannelId;
use tracemint::config::{MiningConfig, Mode};
use tracemint::context::AnalysisContext;
use tracemint::pipeline;
use tracemint::trace::{Event, EventKind, EventType, Trace, TraceSet};
use tracemint::ModelError;
use utils::{client_server, event_labels};

#[test]
fn test_global_model_accepts_observed_interleavings() {
    let input = client_server();
    for mode in [Mode::Refine, Mode::Intersect] {
        let config = MiningConfig {
            mode,
            ..MiningConfig::default()
        };
        let mut ctx = AnalysisContext::new();
        let output = pipeline::run(&input, &config, &mut ctx).unwrap();

        assert_eq!(output.processes.len(), 2);
        let global = output.global.as_ref().unwrap();
        for trace in &input {
            assert!(global.accepts(event_labels(trace)), "{mode:?}");
        }
        // The reply cannot overtake the request
        assert!(!global.accepts(["1->0#0!resp", "1->0#0?resp"]));
        assert!(!global.accepts(["0->1#0!req"]));
    }
}

#[test]
fn test_process_models_cover_their_own_events() {
    let output = pipeline::run(
        &client_server(),
        &MiningConfig::default(),
        &mut AnalysisContext::new(),
    )
    .unwrap();

    let server = output.processes.iter().find(|p| p.process == 1).unwrap();
    let dfa = &server.models[0];
    assert!(dfa.accepts(["0->1#0?req", "1->0#0!resp"]));
    assert!(dfa.accepts(["0->1#0?req", "p1:work", "1->0#0!resp"]));
    assert!(!dfa.accepts(["1->0#0!resp", "0->1#0?req"]));
    assert!(server
        .invariants
        .iter()
        .any(|inv| inv.to_string() == "0->1#0?req AFby 1->0#0!resp"));
}

#[test]
fn test_channel_states_are_shared_in_run_context() {
    let input = client_server();
    let mut ctx = AnalysisContext::new();
    pipeline::run(&input, &MiningConfig::default(), &mut ctx).unwrap();
    // empty, req in flight, resp in flight
    assert_eq!(ctx.pool().len(), 3);
    assert!(ctx.pool().reuse_count() > 0);
}

#[test]
fn test_exploration_ceiling() {
    let config = MiningConfig {
        max_explored_states: Some(2),
        ..MiningConfig::default()
    };
    let err = pipeline::run(&client_server(), &config, &mut AnalysisContext::new()).unwrap_err();
    assert_eq!(err, ModelError::ExplorationLimit { limit: 2 });
}

#[test]
fn test_label_logged_sent_and_received_by_one_process() {
    let channel = ChannelId::new(1, 2, 0);
    let input = TraceSet::new(vec![Trace::new(vec![
        Event::send("e", channel),
        Event::recv("e", channel),
        Event::local("e", 1),
    ])]);
    let output = pipeline::run(&input, &MiningConfig::default(), &mut AnalysisContext::new())
        .unwrap();

    let global = output.global.as_ref().unwrap();
    assert!(global.accepts(event_labels(&input.traces()[0])));
    assert!(global.accepts(["1->2#0!e", "p1:e", "1->2#0?e"]));
    assert!(!global.accepts(["p1:e", "1->2#0!e", "1->2#0?e"]));

    let sender = output.processes.iter().find(|p| p.process == 1).unwrap();
    assert!(sender.models[0].accepts(["1->2#0!e", "p1:e"]));
}

#[test]
fn test_send_logged_by_foreign_process_rejected() {
    let channel = ChannelId::new(0, 1, 0);
    let mut forged = Event::send("ping", channel);
    forged.process = 1;
    let input = TraceSet::new(vec![Trace::new(vec![forged, Event::recv("ping", channel)])]);
    let err = pipeline::run(&input, &MiningConfig::default(), &mut AnalysisContext::new())
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::ConflictingEventKind {
            label: EventType::from("ping"),
            process: 1,
            kind: EventKind::Send(channel),
        }
    );
}

#[test]
fn test_forced_distributed_single_process() {
    let input = TraceSet::new(vec![Trace::from_labels(["boot", "run", "halt"])]);
    let config = MiningConfig {
        distributed: true,
        ..MiningConfig::default()
    };
    let output = pipeline::run(&input, &config, &mut AnalysisContext::new()).unwrap();
    let global = output.global.unwrap();
    assert!(global.accepts(["p0:boot", "p0:run", "p0:halt"]));
    assert!(!global.accepts(["p0:boot", "p0:halt"]));
}

#[test]
fn test_output_serializes_to_json() {
    let output = pipeline::run(
        &client_server(),
        &MiningConfig::default(),
        &mut AnalysisContext::new(),
    )
    .unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert!(json["invariants"].is_array());
    assert!(json["processes"].is_array());
    assert_eq!(json["global"]["kind"], "global");
    assert!(json["global"]["transitions"]
        .as_array()
        .is_some_and(|t| !t.is_empty()));
}
