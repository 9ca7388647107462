//! The ARQ engines. Each engine is a pure event-driven state machine: the scheduler delivers one
//!  event at a time through [Protocol], and the engine reacts synchronously by issuing commands
//!  through the [Channel] it owns. No engine does anything outside of an event handler.

pub mod utopian;
pub mod simplex;
pub mod stop_and_wait;
pub mod go_back_n;
pub mod selective_repeat;

use tracing::{debug, warn};
use crate::channel::Channel;
use crate::config::ProtocolKind;
use crate::frame::{Frame, SimTime};
use crate::sequence_space::{SeqNo, SequenceSpace};

pub trait Protocol {
    fn kind(&self) -> ProtocolKind;

    fn on_start(&mut self, time: SimTime);
    /// The data frame with sequence number `seq` was completely put on the wire
    fn on_transmission_complete(&mut self, time: SimTime, seq: SeqNo);
    fn on_data_timeout(&mut self, time: SimTime);
    fn on_ack_timeout(&mut self, time: SimTime);
    fn on_frame_received(&mut self, time: SimTime, frame: Frame);
    fn on_stop(&mut self, time: SimTime);
}

pub fn new_protocol<C: Channel + 'static>(kind: ProtocolKind, channel: C) -> Box<dyn Protocol> {
    match kind {
        ProtocolKind::Utopian => Box::new(utopian::Utopian::new(channel)),
        ProtocolKind::SimplexSender => Box::new(simplex::SimplexSender::new(channel)),
        ProtocolKind::SimplexReceiver => Box::new(simplex::SimplexReceiver::new(channel)),
        ProtocolKind::StopAndWait => Box::new(stop_and_wait::StopAndWait::new(channel)),
        ProtocolKind::GoBackN => Box::new(go_back_n::GoBackN::new(channel)),
        ProtocolKind::SelectiveRepeat => Box::new(selective_repeat::SelectiveRepeat::new(channel)),
    }
}

const STOP_MESSAGE: &str = "Stopping simulation";

fn space_of(channel: &impl Channel) -> SequenceSpace {
    SequenceSpace::new(channel.max_sequence())
}

/// Fetches the next payload from the upper layer and wraps it in a data frame. Payloads that can
///  not be sent in a frame (empty, too long, containing whitespace) are skipped.
fn next_data_frame(channel: &mut impl Channel, seq: SeqNo, ack: SeqNo) -> Option<Frame> {
    while let Some(payload) = channel.fetch_downward() {
        match Frame::data(seq, ack, payload) {
            Ok(frame) => return Some(frame),
            Err(e) => warn!("skipping payload from upper layer: {}", e),
        }
    }
    None
}

/// Hands the payload of an in-order data frame to the upper layer. A rejected payload still
///  consumes the frame.
fn deliver(channel: &mut impl Channel, seq: SeqNo, info: String) {
    if !channel.deliver_upward(info) {
        debug!("upper layer rejected payload of frame {}", seq);
    }
}

/// Frames with sequence numbers outside the configured space can not belong to this
///  conversation and are dropped
fn is_acceptable(frame: &Frame, space: &SequenceSpace) -> bool {
    if frame.fits(space) {
        true
    }
    else {
        warn!("discarding frame {} - sequence number outside of 0..={}", frame, space.max_seq());
        false
    }
}
