use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::frame::{Frame, FrameKind};
use crate::sequence_space::SeqNo;
use crate::test_util::simulation::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Deliver,
    Drop,
    /// the frame arrives, but garbled so that the receiver can not decode it
    Corrupt,
}

/// Decides what the channel does with each frame put on the wire
pub trait LossModel {
    fn fate(&mut self, from: Side, frame: &Frame) -> Fate;
}

pub struct Lossless;

impl LossModel for Lossless {
    fn fate(&mut self, _from: Side, _frame: &Frame) -> Fate {
        Fate::Deliver
    }
}

/// Drops the first transmission of specific frames sent by one side: data frames are selected by
///  their sequence number, ACK and NAK frames by their ack field. Later transmissions of the same
///  frames get through.
pub struct DropFirst {
    from: Side,
    kind: FrameKind,
    pending: Vec<SeqNo>,
}

impl DropFirst {
    pub fn data(from: Side, seqs: &[SeqNo]) -> DropFirst {
        DropFirst {
            from,
            kind: FrameKind::Data,
            pending: seqs.to_vec(),
        }
    }

    pub fn acks(from: Side, acks: &[SeqNo]) -> DropFirst {
        DropFirst {
            from,
            kind: FrameKind::Ack,
            pending: acks.to_vec(),
        }
    }
}

impl LossModel for DropFirst {
    fn fate(&mut self, from: Side, frame: &Frame) -> Fate {
        if from != self.from || frame.kind() != self.kind {
            return Fate::Deliver;
        }

        let number = match self.kind {
            FrameKind::Data => frame.seq(),
            _ => frame.ack_field(),
        };
        match number.and_then(|n| self.pending.iter().position(|p| *p == n)) {
            Some(idx) => {
                self.pending.remove(idx);
                Fate::Drop
            }
            None => Fate::Deliver,
        }
    }
}

/// Drops or corrupts frames at random, with a fixed seed for reproducible runs
pub struct RandomLoss {
    rng: StdRng,
    drop_rate: f64,
    corrupt_rate: f64,
}

impl RandomLoss {
    pub fn new(seed: u64, drop_rate: f64, corrupt_rate: f64) -> anyhow::Result<RandomLoss> {
        if !(0.0..=1.0).contains(&drop_rate) || !(0.0..=1.0).contains(&corrupt_rate) || drop_rate + corrupt_rate > 1.0 {
            anyhow::bail!("invalid loss rates: drop {}, corrupt {}", drop_rate, corrupt_rate);
        }

        Ok(RandomLoss {
            rng: StdRng::seed_from_u64(seed),
            drop_rate,
            corrupt_rate,
        })
    }
}

impl LossModel for RandomLoss {
    fn fate(&mut self, _from: Side, _frame: &Frame) -> Fate {
        let r: f64 = self.rng.gen();
        if r < self.drop_rate {
            Fate::Drop
        }
        else if r < self.drop_rate + self.corrupt_rate {
            Fate::Corrupt
        }
        else {
            Fate::Deliver
        }
    }
}
