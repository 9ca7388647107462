//! Bidirectional Stop&Wait: each side has at most one data frame outstanding and piggybacks its
//!  acknowledgment on outgoing data frames. If there is no data to piggyback on, the deferred
//!  ack timer sends a standalone ACK.

use tracing::{debug, error, trace};
use crate::channel::{Channel, TimerDiscipline};
use crate::config::ProtocolKind;
use crate::frame::{Frame, FrameBody, SimTime};
use crate::protocol::{deliver, is_acceptable, next_data_frame, space_of, Protocol, STOP_MESSAGE};
use crate::sequence_space::{SeqNo, SequenceSpace};

pub struct StopAndWait<C: Channel> {
    channel: C,
    space: SequenceSpace,
    next_frame_to_send: SeqNo,
    frame_expected: SeqNo,
    /// payload of the data frame `next_frame_to_send` while it waits for its acknowledgment
    outstanding: Option<String>,
}

impl<C: Channel> StopAndWait<C> {
    pub fn new(channel: C) -> StopAndWait<C> {
        let space = space_of(&channel);
        StopAndWait {
            channel,
            space,
            next_frame_to_send: 0,
            frame_expected: 0,
            outstanding: None,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// returns true if a data frame was sent
    fn send_next(&mut self) -> bool {
        let ack = self.space.prev(self.frame_expected);
        match next_data_frame(&mut self.channel, self.next_frame_to_send, ack) {
            Some(frame) => {
                self.outstanding = frame.info().map(str::to_string);
                // the data frame carries the ack
                self.channel.stop_ack_timer();
                self.channel.emit(frame);
                true
            }
            None => {
                self.outstanding = None;
                false
            }
        }
    }

    /// returns true if the ack confirmed the outstanding frame and a new data frame was sent
    fn handle_ack(&mut self, ack: SeqNo) -> bool {
        if self.outstanding.is_none() || ack != self.next_frame_to_send {
            trace!("ignoring ack {} - outstanding: {}", ack, self.outstanding.is_some());
            return false;
        }

        self.channel.stop_data_timer();
        self.next_frame_to_send = self.space.next(self.next_frame_to_send);
        self.send_next()
    }
}

impl<C: Channel> Protocol for StopAndWait<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::StopAndWait
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Stop&Wait Protocol");
        self.send_next();
    }

    fn on_transmission_complete(&mut self, _time: SimTime, _seq: SeqNo) {
        if self.outstanding.is_some() {
            self.channel.ensure_data_timer();
        }
    }

    fn on_data_timeout(&mut self, time: SimTime) {
        let Some(payload) = &self.outstanding else {
            return;
        };

        // the ack must reflect the current receive state: a stale one may alias a newer seq
        let ack = self.space.prev(self.frame_expected);
        match Frame::data(self.next_frame_to_send, ack, payload.clone()) {
            Ok(frame) => {
                debug!("{} timeout - retransmitting {}", time, frame);
                self.channel.stop_ack_timer();
                self.channel.emit(frame);
            }
            Err(e) => error!("{} can not retransmit frame {}: {}", time, self.next_frame_to_send, e),
        }
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
                if seq == self.frame_expected {
                    deliver(&mut self.channel, seq, info);
                    self.frame_expected = self.space.next(self.frame_expected);
                }
                else {
                    debug!("duplicate data frame {} - expected {}", seq, self.frame_expected);
                }

                let piggybacked = self.handle_ack(ack);
                if !piggybacked {
                    self.channel.rearm_ack_timer();
                }
            }
            FrameBody::Ack { ack } => {
                self.handle_ack(ack);
            }
            _ => {}
        }
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::test_util::tracking_channel::TrackingChannel;

    fn engine(payloads: &[&str]) -> StopAndWait<TrackingChannel> {
        StopAndWait::new(TrackingChannel::with_payloads(ProtocolConfig::default(), payloads))
    }

    #[test]
    fn test_one_frame_outstanding() {
        let mut saw = engine(&["0", "1"]);
        saw.on_start(0);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(0, 7, "0").unwrap()]);

        saw.on_transmission_complete(10, 0);
        assert!(saw.channel().data_timer_active());
        assert!(saw.channel_mut().take_emitted().is_empty());

        saw.on_frame_received(130, Frame::ack(0));
        assert!(!saw.channel().data_timer_active());
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(1, 7, "1").unwrap()]);
        assert!(saw.channel().violations().is_empty());
    }

    #[test]
    fn test_timeout_resends_with_current_ack() {
        let mut saw = engine(&["0", "1"]);
        saw.on_start(0);
        saw.on_transmission_complete(10, 0);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(0, 7, "0").unwrap()]);

        saw.on_frame_received(60, Frame::data(0, 7, "x").unwrap());
        assert!(saw.channel().ack_timer_active());

        saw.channel_mut().expire_data_timer();
        saw.on_data_timeout(310);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(0, 0, "0").unwrap()]);
        assert!(!saw.channel().ack_timer_active());

        saw.on_transmission_complete(320, 0);
        assert!(saw.channel().data_timer_active());
        assert!(saw.channel().violations().is_empty());
    }

    #[test]
    fn test_retransmission_does_not_confirm_unseen_frame() {
        let config = ProtocolConfig { max_sequence: 1, ..ProtocolConfig::default() };
        let mut saw = StopAndWait::new(TrackingChannel::with_payloads(config, &["b0"]));
        saw.on_start(0);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(0, 1, "b0").unwrap()]);
        saw.on_transmission_complete(10, 0);

        // our frame is lost; the peer's frame 0 arrives and is acknowledged separately
        saw.on_frame_received(60, Frame::data(0, 1, "a0").unwrap());
        saw.channel_mut().expire_ack_timer();
        saw.on_ack_timeout(80);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::ack(0)]);

        // the peer has moved on to its frame 1, so the retransmission must not carry ack 1
        saw.channel_mut().expire_data_timer();
        saw.on_data_timeout(310);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(0, 0, "b0").unwrap()]);
        assert_eq!(saw.channel().delivered(), &["a0".to_string()]);
        assert!(saw.channel().violations().is_empty());
    }

    #[test]
    fn test_rejected_payload_consumes_frame() {
        let mut saw = engine(&[]);
        saw.channel_mut().accept_deliveries = false;

        saw.on_frame_received(60, Frame::data(0, 7, "b0").unwrap());
        saw.on_frame_received(70, Frame::data(1, 7, "b1").unwrap());
        saw.channel_mut().expire_ack_timer();
        saw.on_ack_timeout(90);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::ack(1)]);
        assert_eq!(saw.channel().delivered(), &["b0".to_string(), "b1".to_string()]);
    }

    #[test]
    fn test_piggybacked_ack() {
        let mut saw = engine(&["a0", "a1"]);
        saw.on_start(0);
        saw.on_transmission_complete(10, 0);
        saw.channel_mut().take_emitted();

        // peer's data acknowledges our frame 0 - our next frame carries the ack for peer's frame 0
        saw.on_frame_received(60, Frame::data(0, 0, "b0").unwrap());
        assert_eq!(saw.channel().delivered(), &["b0".to_string()]);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::data(1, 0, "a1").unwrap()]);
        assert!(!saw.channel().ack_timer_active());
        assert!(saw.channel().violations().is_empty());
    }

    #[test]
    fn test_deferred_ack() {
        let mut saw = engine(&[]);
        saw.on_start(0);

        saw.on_frame_received(60, Frame::data(0, 7, "b0").unwrap());
        assert!(saw.channel().ack_timer_active());
        assert!(saw.channel_mut().take_emitted().is_empty());

        // a second frame re-arms the timer
        saw.on_frame_received(70, Frame::data(1, 7, "b1").unwrap());
        assert!(saw.channel().ack_timer_active());

        saw.channel_mut().expire_ack_timer();
        saw.on_ack_timeout(90);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::ack(1)]);
        assert_eq!(saw.channel().delivered(), &["b0".to_string(), "b1".to_string()]);
        assert!(saw.channel().violations().is_empty());
    }

    #[test]
    fn test_duplicate_is_acked_not_delivered() {
        let mut saw = engine(&[]);
        saw.on_frame_received(60, Frame::data(0, 7, "b0").unwrap());
        saw.channel_mut().expire_ack_timer();
        saw.on_ack_timeout(80);
        saw.channel_mut().take_emitted();

        saw.on_frame_received(400, Frame::data(0, 7, "b0").unwrap());
        saw.channel_mut().expire_ack_timer();
        saw.on_ack_timeout(420);
        assert_eq!(saw.channel_mut().take_emitted(), vec![Frame::ack(0)]);
        assert_eq!(saw.channel().delivered(), &["b0".to_string()]);
    }

    #[test]
    fn test_ack_without_outstanding_frame_is_ignored() {
        let mut saw = engine(&[]);
        saw.on_start(0);
        saw.on_frame_received(10, Frame::ack(0));
        assert!(saw.channel_mut().take_emitted().is_empty());
        assert!(saw.channel().violations().is_empty());
    }
}
