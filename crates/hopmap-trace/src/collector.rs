use crate::conduit::HopReceiver;
use hopmap_model::{HopEvent, Round};

/// Drains the conduit until the producer closes it.
pub fn collect(conduit: HopReceiver) -> Round {
    collect_with(conduit, |_| {})
}

/// Like [`collect`], handing every event to `observer` as it arrives. Events are
/// kept in arrival order; nothing is sorted.
pub fn collect_with<F>(conduit: HopReceiver, observer: F) -> Round
where
    F: Fn(&HopEvent),
{
    let mut events = Vec::new();
    for event in conduit {
        observer(&event);
        events.push(event);
    }
    Round::new(events)
}
