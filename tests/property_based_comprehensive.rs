//! Comprehensive property-based tests
//!
//! Core properties checked with proptest over random traces:
//! 1. Every mined invariant holds on every input trace
//! 2. Every synthesized model accepts every input trace
//! 3. Channel states are canonical and FIFO send/receive round-trips
//! 4. Intersection equals the intersection of languages
//! 5. Time-delta statistics are order independent
//! 6. Partial-order invariants hold on every linearization

use proptest::prelude::*;
use std::sync::Arc;
use tracemint::automaton::{compile_invariant, intersect, Alphabet};
use tracemint::channel::{ChannelId, ChannelStatePool};
use tracemint::config::{MiningConfig, Mode};
use tracemint::context::AnalysisContext;
use tracemint::invariants::{mine_partial_order, mine_total_order, Invariant, InvariantKind};
use tracemint::pipeline;
use tracemint::stats::DeltaSeries;
use tracemint::trace::{Event, EventType, PartialOrder, Trace, TraceSet};
use std::collections::VecDeque;

fn label_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
}

fn trace_set_strategy() -> impl Strategy<Value = TraceSet> {
    prop::collection::vec(prop::collection::vec(label_strategy(), 0..6), 1..5)
        .prop_map(|traces| traces.into_iter().map(Trace::from_labels).collect())
}

/// One logged step: owner, action (0 local, 1 send, 2 receive), label
type Step = (u32, u8, String);

/// Two processes exchanging messages over `0->1#0` and `1->0#0`
///
/// A receive step on an empty channel is logged as a local event instead,
/// so every generated trace is consistent.
fn two_process_trace(steps: Vec<Step>) -> Trace {
    let mut queues: [VecDeque<String>; 2] = [VecDeque::new(), VecDeque::new()];
    let events = steps
        .into_iter()
        .map(|(process, action, label)| {
            let outgoing = ChannelId::new(process, 1 - process, 0);
            let incoming = ChannelId::new(1 - process, process, 0);
            match action {
                1 => {
                    queues[process as usize].push_back(label.clone());
                    Event::send(label, outgoing)
                }
                2 => match queues[1 - process as usize].pop_front() {
                    Some(message) => Event::recv(message, incoming),
                    None => Event::local(label, process),
                },
                _ => Event::local(label, process),
            }
        })
        .collect();
    Trace::new(events)
}

fn two_process_strategy() -> impl Strategy<Value = TraceSet> {
    let step = (0u32..2, 0u8..3, prop::sample::select(vec!["a", "b"]).prop_map(str::to_string));
    prop::collection::vec(prop::collection::vec(step, 0..6), 1..3)
        .prop_map(|traces| traces.into_iter().map(two_process_trace).collect())
}

/// Every event order consistent with the partial order of `trace`
fn linearizations(trace: &Trace) -> Vec<Vec<usize>> {
    fn extend(po: &PartialOrder, placed: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        let n = po.event_count();
        if placed.len() == n {
            out.push(placed.clone());
            return;
        }
        let candidates: Vec<usize> = (0..n).filter(|e| !placed.contains(e)).collect();
        for e in candidates {
            let ready = (0..n)
                .filter(|d| !placed.contains(d))
                .all(|d| !po.happens_before(d, e));
            if ready {
                placed.push(e);
                extend(po, placed, out);
                placed.pop();
            }
        }
    }
    let po = PartialOrder::build(trace).unwrap();
    let mut out = Vec::new();
    extend(&po, &mut Vec::new(), &mut out);
    out
}

fn kind_strategy() -> impl Strategy<Value = InvariantKind> {
    prop::sample::select(InvariantKind::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_mined_invariants_hold(traces in trace_set_strategy()) {
        let invariants = mine_total_order(&traces);
        for invariant in &invariants {
            for trace in &traces {
                prop_assert!(invariant.holds_on(trace.labels()), "{} violated", invariant);
            }
        }
    }

    #[test]
    fn prop_models_accept_inputs(
        traces in trace_set_strategy(),
        intersect_mode in any::<bool>(),
        ktails in any::<bool>(),
    ) {
        let config = MiningConfig {
            mode: if intersect_mode { Mode::Intersect } else { Mode::Refine },
            perform_ktails: ktails,
            ..MiningConfig::default()
        };
        let mut ctx = AnalysisContext::new();
        let output = pipeline::run(&traces, &config, &mut ctx).unwrap();
        let dfa = output.model("dfa").unwrap();
        for trace in &traces {
            prop_assert!(dfa.accepts(trace.labels().map(EventType::as_str)));
        }
    }

    #[test]
    fn prop_refined_model_satisfies_invariants(traces in trace_set_strategy()) {
        let invariants = mine_total_order(&traces);
        let mut ctx = AnalysisContext::new();
        let output = pipeline::run(&traces, &MiningConfig::default(), &mut ctx).unwrap();
        let dfa = output.model("dfa").unwrap();
        // Every short word the model accepts satisfies every invariant
        let symbols: Vec<String> = traces.event_types().iter().map(ToString::to_string).collect();
        let mut words: Vec<Vec<String>> = vec![Vec::new()];
        for _ in 0..3 {
            let longer: Vec<Vec<String>> = words
                .iter()
                .flat_map(|w| symbols.iter().map(move |s| {
                    let mut next = w.clone();
                    next.push(s.clone());
                    next
                }))
                .collect();
            words.extend(longer);
        }
        for word in words.iter().filter(|w| dfa.accepts(w.iter())) {
            let labels: Vec<EventType> = word.iter().map(EventType::new).collect();
            for invariant in &invariants {
                prop_assert!(invariant.holds_on(&labels), "{} accepts {:?}", invariant, word);
            }
        }
    }

    #[test]
    fn prop_partial_order_invariants_hold_on_every_linearization(traces in two_process_strategy()) {
        let invariants = mine_partial_order(&traces).unwrap();
        let naming = traces.naming();
        for trace in &traces {
            for order in linearizations(trace) {
                let labels: Vec<EventType> = order
                    .iter()
                    .map(|&e| naming.name(&trace.events()[e]))
                    .collect();
                for invariant in &invariants {
                    prop_assert!(invariant.holds_on(&labels), "{} violated by {:?}", invariant, labels);
                }
            }
        }
    }

    #[test]
    fn prop_fifo_round_trip(messages in prop::collection::vec(label_strategy(), 1..6)) {
        let channel = ChannelId::new(0, 1, 0);
        let mut pool = ChannelStatePool::new();
        let empty = pool.from_channel_ids([channel]).unwrap();
        let mut state = empty;
        for m in &messages {
            state = pool.next_state(state, &Event::send(m.as_str(), channel)).unwrap();
        }
        for m in &messages {
            state = pool.next_state(state, &Event::recv(m.as_str(), channel)).unwrap();
        }
        prop_assert_eq!(state, empty);
        prop_assert_eq!(pool.content(state).message_count(), 0);
    }

    #[test]
    fn prop_canonical_states(messages in prop::collection::vec(label_strategy(), 0..6)) {
        let channel = ChannelId::new(2, 3, 1);
        let mut pool = ChannelStatePool::new();
        let run = |pool: &mut ChannelStatePool| {
            let mut state = pool.from_channel_ids([channel]).unwrap();
            for m in &messages {
                state = pool.next_state(state, &Event::send(m.as_str(), channel)).unwrap();
            }
            state
        };
        let first = run(&mut pool);
        let size = pool.len();
        let second = run(&mut pool);
        prop_assert_eq!(first, second);
        prop_assert_eq!(pool.len(), size);
    }

    #[test]
    fn prop_local_events_are_identity(label in label_strategy(), pid in 0u32..4) {
        let mut pool = ChannelStatePool::new();
        let state = pool.from_channel_ids([ChannelId::new(0, 1, 0)]).unwrap();
        prop_assert_eq!(pool.next_state(state, &Event::local(label.as_str(), pid)).unwrap(), state);
    }

    #[test]
    fn prop_intersection_is_conjunction(
        k1 in kind_strategy(),
        k2 in kind_strategy(),
        word in prop::collection::vec(label_strategy(), 0..6),
    ) {
        let alphabet = Arc::new(Alphabet::new(["a", "b", "c", "d"].map(EventType::from)));
        let left = Invariant::new(k1, "a", "b");
        let right = Invariant::new(k2, "c", "a");
        let l = compile_invariant(&left, &alphabet).unwrap();
        let r = compile_invariant(&right, &alphabet).unwrap();
        let product = intersect(&l, &r).unwrap();
        let labels: Vec<EventType> = word.iter().map(EventType::new).collect();
        prop_assert_eq!(
            product.accepts(&labels),
            left.holds_on(&labels) && right.holds_on(&labels)
        );
    }

    #[test]
    fn prop_delta_stats_order_independent(mut deltas in prop::collection::vec(-50i64..50, 1..20)) {
        let forward: DeltaSeries = deltas.iter().copied().collect();
        deltas.reverse();
        let backward: DeltaSeries = deltas.iter().copied().collect();
        prop_assert_eq!(forward.mode(), backward.mode());
        prop_assert_eq!(forward.median(), backward.median());
        let median = forward.median().unwrap();
        prop_assert!(forward.min().unwrap() <= median && median <= forward.max().unwrap());
    }
}
