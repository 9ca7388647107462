//! Go-Back-N: the sender keeps up to `send_window` data frames outstanding, and the receiver only
//!  accepts frames in order. A loss is repaired by going back to the oldest unacknowledged frame
//!  and resending everything from there, either after a data timeout or when the receiver asks
//!  for it with a NAK.
//!
//! ## Sender state
//!
//! ```ascii
//!   ack_expected        next_frame_to_send        high_water_mark
//!        |                     |                         |
//!   .... [ acknowledgment pending ........................ ) free ....
//!        [ already resent      ) [ retransmission burst   )
//! ```
//!
//! * `ack_expected` is the oldest frame not acknowledged yet
//! * `high_water_mark` is one past the highest frame sent so far. Acks and NAKs are only valid
//!    inside `[ack_expected, high_water_mark)`, which never shrinks during a retransmission burst.
//! * `next_frame_to_send` is the cursor for retransmissions. There is a burst pending iff it is
//!    behind `high_water_mark`.
//!
//! The remaining budget for fresh frames (`counter`) and the number of frames still to resend
//!  (`retransmission_counter`) are derived from these three, so they can not get out of sync.
//!
//! Data frames are sent one at a time: the next one is put on the wire when the channel reports
//!  the previous one's transmission as complete. All other events only start sending if no frame
//!  is in transmission.

use tracing::{debug, error, trace};
use crate::channel::{Channel, TimerDiscipline};
use crate::config::ProtocolKind;
use crate::frame::{Frame, FrameBody, SimTime};
use crate::protocol::{deliver, is_acceptable, next_data_frame, space_of, Protocol, STOP_MESSAGE};
use crate::sequence_space::{SeqNo, SequenceSpace};

pub struct GoBackN<C: Channel> {
    channel: C,
    space: SequenceSpace,
    send_window: u32,

    next_frame_to_send: SeqNo,
    ack_expected: SeqNo,
    high_water_mark: SeqNo,
    in_transmission: bool,
    /// the payload most recently sent with a given sequence number
    buffer: Vec<Option<String>>,

    frame_expected: SeqNo,
    nak_sent: bool,
}

impl<C: Channel> GoBackN<C> {
    pub fn new(channel: C) -> GoBackN<C> {
        let space = space_of(&channel);
        let send_window = channel.send_window();
        GoBackN {
            channel,
            space,
            send_window,
            next_frame_to_send: 0,
            ack_expected: 0,
            high_water_mark: 0,
            in_transmission: false,
            buffer: vec![None; space.modulus() as usize],
            frame_expected: 0,
            nak_sent: false,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// number of frames sent but not acknowledged
    pub fn outstanding(&self) -> u32 {
        self.space.distance(self.ack_expected, self.high_water_mark)
    }

    /// number of fresh frames that may be sent before the window is closed
    pub fn counter(&self) -> u32 {
        self.send_window.saturating_sub(self.outstanding())
    }

    /// number of frames still to be resent in the current retransmission burst
    pub fn retransmission_counter(&self) -> u32 {
        self.space.distance(self.next_frame_to_send, self.high_water_mark)
    }

    /// Sends the next data frame if the channel is free: a retransmission if a burst is pending,
    ///  otherwise a fresh frame if the window has room
    fn send_next(&mut self) {
        if self.in_transmission {
            return;
        }

        let ack = self.space.prev(self.frame_expected);

        if self.retransmission_counter() > 0 {
            let seq = self.next_frame_to_send;
            let frame = match &self.buffer[seq as usize] {
                Some(payload) => Frame::data(seq, ack, payload.clone()),
                None => {
                    error!("no payload buffered for frame {} - abandoning retransmission burst", seq);
                    self.next_frame_to_send = self.high_water_mark;
                    return;
                }
            };
            match frame {
                Ok(frame) => {
                    trace!("retransmitting frame {}, {} more pending", seq, self.retransmission_counter() - 1);
                    self.transmit(frame);
                    self.next_frame_to_send = self.space.next(seq);
                }
                Err(e) => {
                    error!("buffered payload for frame {} is invalid: {}", seq, e);
                    self.next_frame_to_send = self.high_water_mark;
                }
            }
        }
        else if self.counter() > 0 {
            let seq = self.high_water_mark;
            if let Some(frame) = next_data_frame(&mut self.channel, seq, ack) {
                self.buffer[seq as usize] = frame.info().map(str::to_string);
                self.transmit(frame);
                self.high_water_mark = self.space.next(seq);
                self.next_frame_to_send = self.high_water_mark;
            }
        }
        else {
            trace!("window closed - waiting for acknowledgment");
        }
    }

    fn transmit(&mut self, frame: Frame) {
        // the data frame carries the ack
        self.channel.stop_ack_timer();
        self.in_transmission = true;
        self.channel.emit(frame);
    }

    fn handle_ack(&mut self, ack: SeqNo) {
        if !self.space.between(self.ack_expected, ack, self.high_water_mark) {
            trace!("ignoring ack {} outside of [{}, {})", ack, self.ack_expected, self.high_water_mark);
            return;
        }

        self.channel.stop_data_timer();

        let burst_pending = self.next_frame_to_send != self.high_water_mark;
        let new_ack_expected = self.space.next(ack);
        if burst_pending && self.space.distance(self.ack_expected, self.next_frame_to_send) < self.space.distance(self.ack_expected, new_ack_expected) {
            // no point in resending frames that were just acknowledged
            self.next_frame_to_send = new_ack_expected;
        }
        self.ack_expected = new_ack_expected;

        if self.outstanding() > 0 {
            self.channel.restart_data_timer();
        }
        self.send_next();
    }

    fn handle_nak(&mut self, missing: SeqNo) {
        if missing != self.high_water_mark && !self.space.between(self.ack_expected, missing, self.high_water_mark) {
            debug!("ignoring NAK {} outside of [{}, {}]", missing, self.ack_expected, self.high_water_mark);
            return;
        }

        self.channel.stop_data_timer();

        // everything before the missing frame was received
        self.ack_expected = missing;
        self.next_frame_to_send = missing;

        if missing == self.high_water_mark {
            debug!("NAK {}: all frames acknowledged", missing);
        }
        else {
            debug!("NAK {}: resending {} frames", missing, self.retransmission_counter());
        }
        self.send_next();
    }

    fn handle_data(&mut self, seq: SeqNo, info: String) {
        if seq == self.frame_expected {
            self.nak_sent = false;
            deliver(&mut self.channel, seq, info);
            self.frame_expected = self.space.next(self.frame_expected);
            self.channel.ensure_ack_timer();
        }
        else if !self.nak_sent {
            debug!("frame {} out of order - sending NAK {}", seq, self.frame_expected);
            self.nak_sent = true;
            self.channel.emit(Frame::nak(self.frame_expected));
        }
        else {
            trace!("frame {} out of order - NAK already sent", seq);
            self.channel.emit(Frame::ack(self.space.prev(self.frame_expected)));
        }
    }
}

impl<C: Channel> Protocol for GoBackN<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::GoBackN
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Go-Back-N Protocol");
        self.send_next();
    }

    fn on_transmission_complete(&mut self, _time: SimTime, _seq: SeqNo) {
        self.in_transmission = false;
        if self.outstanding() > 0 {
            self.channel.ensure_data_timer();
        }
        self.send_next();
    }

    fn on_data_timeout(&mut self, time: SimTime) {
        if self.outstanding() == 0 {
            trace!("{} data timeout without outstanding frames", time);
            return;
        }

        debug!("{} data timeout - going back to frame {}, {} frames outstanding", time, self.ack_expected, self.outstanding());
        self.next_frame_to_send = self.ack_expected;
        self.send_next();
    }

    fn on_ack_timeout(&mut self, _time: SimTime) {
        self.channel.emit(Frame::ack(self.space.prev(self.frame_expected)));
    }

    fn on_frame_received(&mut self, time: SimTime, frame: Frame) {
        if !is_acceptable(&frame, &self.space) {
            return;
        }
        trace!("{} received {}", time, frame);

        match frame.into_body() {
            FrameBody::Data { seq, ack, info } => {
                self.handle_data(seq, info);
                self.handle_ack(ack);
            }
            FrameBody::Ack { ack } => self.handle_ack(ack),
            FrameBody::Nak { missing } => self.handle_nak(missing),
            FrameBody::Undefined => {}
        }
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}
