//! Sequence numbers are small logical integers that wrap around. All arithmetic on them goes
//!  through [SequenceSpace], which knows the modulus `max_seq + 1`.
//!
//! The single predicate that matters for window bookkeeping is [SequenceSpace::between]: it
//!  tests if a sequence number lies on the circular arc from `a` (inclusive) to `c` (exclusive).
//!  Every acknowledgment or NAK that arrives is validated against the outstanding window with it.

/// A sequence number in `0..=max_seq`.
pub type SeqNo = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    max_seq: SeqNo,
}

impl SequenceSpace {
    /// `max_seq` must be smaller than `u32::MAX` - configuration validation ensures that
    pub fn new(max_seq: SeqNo) -> SequenceSpace {
        SequenceSpace { max_seq }
    }

    pub fn max_seq(&self) -> SeqNo {
        self.max_seq
    }

    pub fn modulus(&self) -> u64 {
        self.max_seq as u64 + 1
    }

    pub fn contains(&self, s: SeqNo) -> bool {
        s <= self.max_seq
    }

    pub fn next(&self, s: SeqNo) -> SeqNo {
        if s >= self.max_seq { 0 } else { s + 1 }
    }

    pub fn prev(&self, s: SeqNo) -> SeqNo {
        if s == 0 { self.max_seq } else { s - 1 }
    }

    /// true iff `b` lies on the circular arc from `a` (inclusive) to `c` (exclusive). For `a == c`
    ///  the arc is empty.
    pub fn between(&self, a: SeqNo, b: SeqNo, c: SeqNo) -> bool {
        if a <= c {
            a <= b && b < c
        }
        else {
            b >= a || b < c
        }
    }

    /// number of steps from `from` forward to `to`
    pub fn distance(&self, from: SeqNo, to: SeqNo) -> u32 {
        let m = self.modulus();
        ((to as u64 + m - from as u64) % m) as u32
    }
}
