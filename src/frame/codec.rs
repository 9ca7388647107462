//! Text wire format of a [Frame]. A frame is one line of whitespace separated tokens:
//!
//! ```ascii
//! frame  := header (SNDTIME time)? (RCVTIME time)? (INFO len payload)?
//! header := DATA seq ack | ACK ack | NAK missing
//! ```
//!
//! Decoding is all-or-nothing: either a complete and valid frame is returned, or the reason for
//!  the rejection is reported to the [DiagnosticSink] and an error is returned.

use std::str::FromStr;
use thiserror::Error;
use tracing::trace;
use crate::diagnostics::DiagnosticSink;
use crate::frame::{Frame, FrameBody, FrameError, SimTime, MAX_INFO_LENGTH};
use crate::sequence_space::SeqNo;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("Can have only one DATA,ACK or NAK")]
    DuplicateHeader,
    #[error("Received {0} without enough parameters")]
    MissingParameters(&'static str),
    #[error("Invalid number in {token} element: '{value}'")]
    InvalidNumber { token: &'static str, value: String },
    #[error("Received ACKVEC: Ignored - not supported")]
    AckVectorNotSupported,
    #[error("Received DATA with invalid data length {0}")]
    InvalidInfoLength(i64),
    #[error("Received DATA with invalid length ({declared}!={actual})")]
    InfoLengthMismatch { declared: usize, actual: usize },
    #[error("Received invalid token '{0}'")]
    InvalidToken(String),
    #[error("Received frame without DATA, ACK or NAK")]
    MissingHeader,
    #[error("Received DATA without INFO")]
    MissingInfo,
    #[error("Received INFO on a {0} frame")]
    UnexpectedInfo(&'static str),
    #[error("Received invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
}

impl Frame {
    /// Renders the frame in its wire format, or `None` for an undefined frame
    pub fn encode(&self) -> Option<String> {
        let mut result = match self.body() {
            FrameBody::Undefined => return None,
            FrameBody::Data { seq, ack, .. } => format!("DATA {} {}", seq, ack),
            FrameBody::Ack { ack } => format!("ACK {}", ack),
            FrameBody::Nak { missing } => format!("NAK {}", missing),
        };

        if let Some(t) = self.send_time() {
            result.push_str(&format!(" SNDTIME {}", t));
        }
        if let Some(t) = self.recv_time() {
            result.push_str(&format!(" RCVTIME {}", t));
        }
        if let Some(info) = self.info() {
            result.push_str(&format!(" INFO {} {}", info.chars().count(), info));
        }
        Some(result)
    }

    pub fn decode(line: &str, diagnostics: &mut dyn DiagnosticSink) -> Result<Frame, FrameDecodeError> {
        let result = Self::try_decode(line);
        if let Err(e) = &result {
            diagnostics.log(&e.to_string());
        }
        result
    }

    fn try_decode(line: &str) -> Result<Frame, FrameDecodeError> {
        trace!("decoding '{}'", line);

        let mut header: Option<(&'static str, SeqNo, Option<SeqNo>)> = None;
        let mut send_time: Option<SimTime> = None;
        let mut recv_time: Option<SimTime> = None;
        let mut info: Option<String> = None;

        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "DATA" => {
                    if header.is_some() {
                        return Err(FrameDecodeError::DuplicateHeader);
                    }
                    let seq = parse_param(&mut tokens, "DATA")?;
                    let ack = parse_param(&mut tokens, "DATA")?;
                    header = Some(("DATA", seq, Some(ack)));
                }
                "ACK" | "NAK" => {
                    if header.is_some() {
                        return Err(FrameDecodeError::DuplicateHeader);
                    }
                    let name = if token == "ACK" { "ACK" } else { "NAK" };
                    header = Some((name, parse_param(&mut tokens, name)?, None));
                }
                "SNDTIME" => send_time = Some(parse_param(&mut tokens, "SNDTIME")?),
                "RCVTIME" => recv_time = Some(parse_param(&mut tokens, "RCVTIME")?),
                "ACKVEC" => return Err(FrameDecodeError::AckVectorNotSupported),
                "INFO" => {
                    let declared: i64 = parse_param(&mut tokens, "INFO")?;
                    if declared < 1 || declared > MAX_INFO_LENGTH as i64 {
                        return Err(FrameDecodeError::InvalidInfoLength(declared));
                    }
                    let payload = tokens.next()
                        .ok_or(FrameDecodeError::MissingParameters("INFO"))?;
                    let actual = payload.chars().count();
                    if actual != declared as usize {
                        return Err(FrameDecodeError::InfoLengthMismatch { declared: declared as usize, actual });
                    }
                    info = Some(payload.to_string());
                }
                other => return Err(FrameDecodeError::InvalidToken(other.to_string())),
            }
        }

        let frame = match (header, info) {
            (None, _) => return Err(FrameDecodeError::MissingHeader),
            (Some(("DATA", seq, Some(ack))), Some(info)) => Frame::data(seq, ack, info)?,
            (Some(("DATA", _, _)), None) => return Err(FrameDecodeError::MissingInfo),
            (Some((name, _, _)), Some(_)) => return Err(FrameDecodeError::UnexpectedInfo(name)),
            (Some(("ACK", ack, _)), None) => Frame::ack(ack),
            (Some((_, missing, _)), None) => Frame::nak(missing),
        };

        let frame = match send_time {
            Some(t) => frame.with_send_time(t),
            None => frame,
        };
        match recv_time {
            Some(t) => Ok(frame.with_recv_time(t)?),
            None => Ok(frame),
        }
    }
}

fn parse_param<'a, T: FromStr>(tokens: &mut impl Iterator<Item = &'a str>, token: &'static str) -> Result<T, FrameDecodeError> {
    let raw = tokens.next()
        .ok_or(FrameDecodeError::MissingParameters(token))?;
    raw.parse()
        .map_err(|_| FrameDecodeError::InvalidNumber { token, value: raw.to_string() })
}
