//! A [Frame] is the unit that travels over the channel: a data frame carrying one payload, or a
//!  control frame (ACK / NAK) carrying only acknowledgment information.
//!
//! All kind-specific fields live in [FrameBody], so a frame can not carry a payload unless it
//!  is a data frame. Frames are built once per transmission attempt; the builder methods consume
//!  and return the frame, and there is no way to change a frame's body after construction.

pub mod codec;

use std::fmt::{Display, Formatter};
use thiserror::Error;
use crate::sequence_space::{SeqNo, SequenceSpace};

/// Maximum number of characters in a data frame's payload
pub const MAX_INFO_LENGTH: usize = 100;

/// Logical simulation time
pub type SimTime = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Undefined,
    Data,
    Ack,
    Nak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    Undefined,
    /// `ack` is the last sequence number the sender of this frame has delivered upward
    Data { seq: SeqNo, ack: SeqNo, info: String },
    Ack { ack: SeqNo },
    /// `missing` is the first sequence number the sender of this frame is still waiting for
    Nak { missing: SeqNo },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload must not be empty")]
    EmptyInfo,
    #[error("payload length {0} exceeds the maximum of {max}", max = MAX_INFO_LENGTH)]
    InfoTooLong(usize),
    #[error("payload must not contain whitespace")]
    WhitespaceInInfo,
    #[error("receive time {recv_time} is not after send time {send_time}")]
    ReceiveBeforeSend { send_time: SimTime, recv_time: SimTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    body: FrameBody,
    send_time: Option<SimTime>,
    recv_time: Option<SimTime>,
}

impl Frame {
    pub fn undefined() -> Frame {
        Frame::from_body(FrameBody::Undefined)
    }

    pub fn data(seq: SeqNo, ack: SeqNo, info: impl Into<String>) -> Result<Frame, FrameError> {
        let info = info.into();
        Self::check_info(&info)?;
        Ok(Frame::from_body(FrameBody::Data { seq, ack, info }))
    }

    pub fn ack(ack: SeqNo) -> Frame {
        Frame::from_body(FrameBody::Ack { ack })
    }

    pub fn nak(missing: SeqNo) -> Frame {
        Frame::from_body(FrameBody::Nak { missing })
    }

    fn from_body(body: FrameBody) -> Frame {
        Frame {
            body,
            send_time: None,
            recv_time: None,
        }
    }

    fn check_info(info: &str) -> Result<(), FrameError> {
        let len = info.chars().count();
        if len == 0 {
            return Err(FrameError::EmptyInfo);
        }
        if len > MAX_INFO_LENGTH {
            return Err(FrameError::InfoTooLong(len));
        }
        if info.chars().any(char::is_whitespace) {
            return Err(FrameError::WhitespaceInInfo);
        }
        Ok(())
    }

    pub fn with_send_time(self, send_time: SimTime) -> Frame {
        Frame {
            send_time: Some(send_time),
            ..self
        }
    }

    pub fn with_recv_time(self, recv_time: SimTime) -> Result<Frame, FrameError> {
        if let Some(send_time) = self.send_time {
            if recv_time <= send_time {
                return Err(FrameError::ReceiveBeforeSend { send_time, recv_time });
            }
        }
        Ok(Frame {
            recv_time: Some(recv_time),
            ..self
        })
    }

    pub fn body(&self) -> &FrameBody {
        &self.body
    }

    pub fn into_body(self) -> FrameBody {
        self.body
    }

    pub fn kind(&self) -> FrameKind {
        match &self.body {
            FrameBody::Undefined => FrameKind::Undefined,
            FrameBody::Data { .. } => FrameKind::Data,
            FrameBody::Ack { .. } => FrameKind::Ack,
            FrameBody::Nak { .. } => FrameKind::Nak,
        }
    }

    pub fn seq(&self) -> Option<SeqNo> {
        match &self.body {
            FrameBody::Data { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// The acknowledgment field: the cumulative ack for DATA and ACK frames, the missing sequence
    ///  number for NAK frames
    pub fn ack_field(&self) -> Option<SeqNo> {
        match &self.body {
            FrameBody::Undefined => None,
            FrameBody::Data { ack, .. } => Some(*ack),
            FrameBody::Ack { ack } => Some(*ack),
            FrameBody::Nak { missing } => Some(*missing),
        }
    }

    pub fn info(&self) -> Option<&str> {
        match &self.body {
            FrameBody::Data { info, .. } => Some(info),
            _ => None,
        }
    }

    pub fn send_time(&self) -> Option<SimTime> {
        self.send_time
    }

    pub fn recv_time(&self) -> Option<SimTime> {
        self.recv_time
    }

    /// true iff every sequence number carried by this frame is valid in the given space
    pub fn fits(&self, space: &SequenceSpace) -> bool {
        self.seq().map_or(true, |s| space.contains(s))
            && self.ack_field().map_or(true, |a| space.contains(a))
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            FrameBody::Undefined => write!(f, "UNDEFINED"),
            FrameBody::Data { seq, ack, .. } => write!(f, "DATA {} {}", seq, ack),
            FrameBody::Ack { ack } => write!(f, "ACK {}", ack),
            FrameBody::Nak { missing } => write!(f, "NAK {}", missing),
        }
    }
}
