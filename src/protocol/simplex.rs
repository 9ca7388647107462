//! Simplex Stop&Wait: data flows in one direction only. The sender keeps exactly one frame
//!  outstanding and retransmits it on timeout; the receiver acknowledges every data frame it sees.

use tracing::{debug, trace};
use crate::channel::{Channel, TimerDiscipline};
use crate::config::ProtocolKind;
use crate::frame::{Frame, FrameBody, SimTime};
use crate::protocol::{deliver, is_acceptable, next_data_frame, space_of, Protocol, STOP_MESSAGE};
use crate::sequence_space::{SeqNo, SequenceSpace};

pub struct SimplexSender<C: Channel> {
    channel: C,
    space: SequenceSpace,
    next_frame_to_send: SeqNo,
    /// the frame waiting for its acknowledgment
    outstanding: Option<Frame>,
}

impl<C: Channel> SimplexSender<C> {
    pub fn new(channel: C) -> SimplexSender<C> {
        let space = space_of(&channel);
        SimplexSender {
            channel,
            space,
            next_frame_to_send: 0,
            outstanding: None,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    fn send_next(&mut self) {
        // no frames are received, so the ack field is always the sequence number before 0
        let ack = self.space.prev(0);
        self.outstanding = next_data_frame(&mut self.channel, self.next_frame_to_send, ack);
        if let Some(frame) = &self.outstanding {
            self.channel.emit(frame.clone());
        }
    }
}

impl<C: Channel> Protocol for SimplexSender<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::SimplexSender
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Simplex Stop&Wait Protocol - sender");
        self.send_next();
    }

    fn on_transmission_complete(&mut self, _time: SimTime, _seq: SeqNo) {
        self.channel.ensure_data_timer();
    }

    fn on_data_timeout(&mut self, time: SimTime) {
        if let Some(frame) = &self.outstanding {
            debug!("{} retransmitting {}", time, frame);
            self.channel.emit(frame.clone());
        }
    }

    fn on_ack_timeout(&mut self, time: SimTime) {
        self.channel.log(&format!("{} ACK Timeout not expected", time));
    }

    fn on_frame_received(&mut self, time: SimTime, frame: Frame) {
        if !is_acceptable(&frame, &self.space) {
            return;
        }
        trace!("{} received {}", time, frame);

        if let FrameBody::Ack { ack } = frame.body() {
            if self.outstanding.is_some() && *ack == self.next_frame_to_send {
                self.channel.stop_data_timer();
                self.next_frame_to_send = self.space.next(self.next_frame_to_send);
                self.send_next();
            }
            else {
                debug!("ignoring ACK {} - waiting for {}", ack, self.next_frame_to_send);
            }
        }
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}

pub struct SimplexReceiver<C: Channel> {
    channel: C,
    space: SequenceSpace,
    frame_expected: SeqNo,
}

impl<C: Channel> SimplexReceiver<C> {
    pub fn new(channel: C) -> SimplexReceiver<C> {
        let space = space_of(&channel);
        SimplexReceiver {
            channel,
            space,
            frame_expected: 0,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

impl<C: Channel> Protocol for SimplexReceiver<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::SimplexReceiver
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Simplex Receiver Protocol - Only receive data!");
    }

    fn on_transmission_complete(&mut self, time: SimTime, seq: SeqNo) {
        self.channel.log(&format!("{} DATA_END({}) not expected", time, seq));
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

        if let FrameBody::Data { seq, info, .. } = frame.into_body() {
            // duplicates are acknowledged too: the sender may have missed the previous ACK
            self.channel.emit(Frame::ack(seq));

            if seq == self.frame_expected {
                deliver(&mut self.channel, seq, info);
                self.frame_expected = self.space.next(self.frame_expected);
            }
            else {
                debug!("duplicate data frame {} - expected {}", seq, self.frame_expected);
            }
        }
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}
