//! A family of Automatic-Repeat-reQuest (ARQ) data-link protocols: event-driven state machines
//!  that move a stream of messages across a lossy point-to-point channel.
//!
//! ## Protocols
//!
//! * Utopian - no acknowledgments or timers, for a perfect channel
//! * Simplex Stop&Wait - one-directional data with one outstanding frame, acknowledged by the
//!    receiver
//! * Stop&Wait - bidirectional, one outstanding frame per direction, with acks piggybacked on data
//!    frames and a deferred-ack timer for standalone ACKs
//! * Go-Back-N - a sliding send window; losses are repaired by resending everything from the oldest
//!    unacknowledged frame, triggered by a timeout or a NAK from the receiver
//! * Selective Repeat - placeholder only
//!
//! Engines implement [protocol::Protocol] and interact with the outside world exclusively through
//!  the [channel::Channel] they own: frames are emitted, timers are started and cancelled, and
//!  payloads are exchanged with the upper layer. Sequence numbers wrap modulo `max_sequence + 1`
//!  (see [sequence_space::SequenceSpace]).
//!
//! Frames have a textual wire format (see [frame::codec]).
//!
//! The [test_util] module has a deterministic discrete-event simulation for running engines
//!  against each other.

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod frame;
pub mod protocol;
pub mod sequence_space;
pub mod test_util;


#[cfg(test)]
mod test {
    use tracing::Level;

    #[ctor::ctor]
    fn init_test_logging() {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(Level::DEBUG)
            // .with_max_level(Level::TRACE)
            .try_init()
            .ok();
    }
}
