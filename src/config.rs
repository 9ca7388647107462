use anyhow::bail;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use crate::frame::SimTime;

/// The protocols a terminal can run. The numbering is stable and used for selecting a
///  protocol e.g. from the command line.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum ProtocolKind {
    Utopian = 1,
    SimplexSender = 2,
    SimplexReceiver = 3,
    StopAndWait = 4,
    GoBackN = 5,
    SelectiveRepeat = 6,
}

impl ProtocolKind {
    /// The protocol the terminal on the other side of the channel runs
    pub fn peer(&self) -> ProtocolKind {
        match self {
            ProtocolKind::SimplexSender => ProtocolKind::SimplexReceiver,
            ProtocolKind::SimplexReceiver => ProtocolKind::SimplexSender,
            other => *other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Maximum number of unacknowledged data frames a sender may have outstanding. Only
    ///  Go-Back-N (and Selective-Repeat) use a window bigger than 1.
    pub send_window: u32,
    /// Number of out-of-order frames a receiver may buffer. Only relevant for Selective-Repeat.
    pub recv_window: u32,
    /// Sequence numbers run from 0 to this value inclusive, and then wrap around
    pub max_sequence: u32,
    /// Delay between a data frame's transmission completing and its retransmission, unless
    ///  it is acknowledged in time
    pub timeout: SimTime,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            send_window: 4,
            recv_window: 4,
            max_sequence: 7,
            timeout: 300,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.send_window == 0 {
            bail!("send window must be positive");
        }
        if self.recv_window == 0 {
            bail!("receive window must be positive");
        }
        if self.max_sequence == 0 {
            bail!("maximum sequence number must be positive");
        }
        if self.max_sequence == u32::MAX {
            bail!("maximum sequence number is too big");
        }
        if self.timeout == 0 {
            bail!("timeout must be positive");
        }
        Ok(())
    }

    /// validates the general constraints, plus those of a specific protocol
    pub fn validate_for(&self, kind: ProtocolKind) -> anyhow::Result<()> {
        self.validate()?;

        match kind {
            ProtocolKind::GoBackN => {
                // the receiver could not distinguish a full window of new frames from retransmissions
                if self.send_window > self.max_sequence {
                    bail!("Go-Back-N requires a send window of at most {} for max sequence {}, was {}", self.max_sequence, self.max_sequence, self.send_window);
                }
            }
            ProtocolKind::SelectiveRepeat => {
                if self.send_window as u64 + self.recv_window as u64 > self.max_sequence as u64 + 1 {
                    bail!("Selective Repeat requires send window + receive window <= {}", self.max_sequence as u64 + 1);
                }
            }
            _ => {}
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        for kind in [ProtocolKind::Utopian, ProtocolKind::SimplexSender, ProtocolKind::SimplexReceiver, ProtocolKind::StopAndWait, ProtocolKind::GoBackN, ProtocolKind::SelectiveRepeat] {
            assert!(ProtocolConfig::default().validate_for(kind).is_ok(), "{:?}", kind);
        }
    }

    #[rstest]
    #[case::zero_send_window(0, 4, 7, 300)]
    #[case::zero_recv_window(4, 0, 7, 300)]
    #[case::zero_max_seq(1, 1, 0, 300)]
    #[case::max_seq_overflow(1, 1, u32::MAX, 300)]
    #[case::zero_timeout(4, 4, 7, 0)]
    fn test_validate_rejects(#[case] send_window: u32, #[case] recv_window: u32, #[case] max_sequence: u32, #[case] timeout: SimTime) {
        let config = ProtocolConfig { send_window, recv_window, max_sequence, timeout };
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case::gbn_full(ProtocolKind::GoBackN, 7, 1, true)]
    #[case::gbn_too_big(ProtocolKind::GoBackN, 8, 1, false)]
    #[case::sr_half(ProtocolKind::SelectiveRepeat, 4, 4, true)]
    #[case::sr_too_big(ProtocolKind::SelectiveRepeat, 5, 4, false)]
    #[case::stop_and_wait_ignores_window(ProtocolKind::StopAndWait, 8, 8, true)]
    fn test_validate_for(#[case] kind: ProtocolKind, #[case] send_window: u32, #[case] recv_window: u32, #[case] valid: bool) {
        let config = ProtocolConfig { send_window, recv_window, ..ProtocolConfig::default() };
        assert_eq!(config.validate_for(kind).is_ok(), valid);
    }

    #[rstest]
    #[case(1, Some(ProtocolKind::Utopian))]
    #[case(5, Some(ProtocolKind::GoBackN))]
    #[case(6, Some(ProtocolKind::SelectiveRepeat))]
    #[case(0, None)]
    #[case(7, None)]
    fn test_kind_from_number(#[case] number: u8, #[case] expected: Option<ProtocolKind>) {
        assert_eq!(ProtocolKind::try_from_primitive(number).ok(), expected);
        if let Some(kind) = expected {
            assert_eq!(u8::from(kind), number);
        }
    }

    #[rstest]
    #[case(ProtocolKind::SimplexSender, ProtocolKind::SimplexReceiver)]
    #[case(ProtocolKind::SimplexReceiver, ProtocolKind::SimplexSender)]
    #[case(ProtocolKind::GoBackN, ProtocolKind::GoBackN)]
    fn test_peer(#[case] kind: ProtocolKind, #[case] expected: ProtocolKind) {
        assert_eq!(kind.peer(), expected);
    }
}
