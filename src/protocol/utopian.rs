//! The degenerate protocol for a perfect channel: no acknowledgments, no timers. The sender puts
//!  the next frame on the wire whenever the previous one is transmitted, and the receiver takes
//!  whatever arrives in order.

use tracing::trace;
use crate::channel::Channel;
use crate::config::ProtocolKind;
use crate::frame::{Frame, FrameBody, SimTime};
use crate::protocol::{deliver, is_acceptable, next_data_frame, space_of, Protocol, STOP_MESSAGE};
use crate::sequence_space::{SeqNo, SequenceSpace};

pub struct Utopian<C: Channel> {
    channel: C,
    space: SequenceSpace,
    next_frame_to_send: SeqNo,
    frame_expected: SeqNo,
}

impl<C: Channel> Utopian<C> {
    pub fn new(channel: C) -> Utopian<C> {
        let space = space_of(&channel);
        Utopian {
            channel,
            space,
            next_frame_to_send: 0,
            frame_expected: 0,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    fn send_next(&mut self) {
        let ack = self.space.prev(0);
        if let Some(frame) = next_data_frame(&mut self.channel, self.next_frame_to_send, ack) {
            self.channel.emit(frame);
            self.next_frame_to_send = self.space.next(self.next_frame_to_send);
        }
    }
}

impl<C: Channel> Protocol for Utopian<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Utopian
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Utopian Protocol");
        self.send_next();
    }

    fn on_transmission_complete(&mut self, _time: SimTime, _seq: SeqNo) {
        self.send_next();
    }

    fn on_data_timeout(&mut self, time: SimTime) {
        self.channel.log(&format!("{} Data Timeout not expected", time));
    }

    fn on_ack_timeout(&mut self, time: SimTime) {
        self.channel.log(&format!("{} ACK Timeout not expected", time));
    }

    fn on_frame_received(&mut self, _time: SimTime, frame: Frame) {
        if !is_acceptable(&frame, &self.space) {
            return;
        }

        match frame.into_body() {
            FrameBody::Data { seq, info, .. } if seq == self.frame_expected => {
                deliver(&mut self.channel, seq, info);
                self.frame_expected = self.space.next(self.frame_expected);
            }
            FrameBody::Data { seq, .. } => {
                trace!("dropping data frame {} - expected {}", seq, self.frame_expected);
            }
            _ => {}
        }
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}
