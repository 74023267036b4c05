// Shared helpers for integration tests

#![allow(dead_code)]

use tracemint::channel::ChannelId;
use tracemint::trace::{Event, EventType, Trace, TraceSet};

/// Totally ordered single-process traces from label lists
pub fn traces(sequences: &[&[&str]]) -> TraceSet {
    sequences
        .iter()
        .map(|labels| Trace::from_labels(labels.iter().copied()))
        .collect()
}

/// Client/server exchange: client sends `req`, server answers `resp`
///
/// The server logs a local `work` event between receiving and replying in
/// the second trace.
pub fn client_server() -> TraceSet {
    let up = ChannelId::new(0, 1, 0);
    let down = ChannelId::new(1, 0, 0);
    TraceSet::new(vec![
        Trace::new(vec![
            Event::send("req", up),
            Event::recv("req", up),
            Event::send("resp", down),
            Event::recv("resp", down),
        ]),
        Trace::new(vec![
            Event::send("req", up),
            Event::recv("req", up),
            Event::local("work", 1),
            Event::send("resp", down),
            Event::recv("resp", down),
        ]),
    ])
}

/// Display form of every event, as used by exported global models
pub fn event_labels(trace: &Trace) -> Vec<String> {
    trace.events().iter().map(ToString::to_string).collect()
}

/// Owner- and channel-qualified event types, as mined from multi-process logs
pub fn qualified_labels(trace: &Trace) -> Vec<EventType> {
    trace.events().iter().map(Event::qualified_type).collect()
}
