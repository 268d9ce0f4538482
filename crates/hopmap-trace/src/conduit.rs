//! Per-round channel between a prober and its collector.

use hopmap_model::HopEvent;
use std::sync::mpsc::{self, Receiver, SyncSender};

pub type HopSender = SyncSender<HopEvent>;
pub type HopReceiver = Receiver<HopEvent>;

/// Creates a rendezvous channel: every `send` blocks until the collector has
/// taken the event. Dropping the sender closes the round.
pub fn hop_conduit() -> (HopSender, HopReceiver) {
    mpsc::sync_channel(0)
}
