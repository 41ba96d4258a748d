use anyhow::Result;

use crate::segment::{Segment, SEGMENT_COUNT};

/// Which segments are lit for one digit, index-aligned to A..G.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitPattern(pub [bool; SEGMENT_COUNT]);

impl DigitPattern {
    pub fn is_lit(&self, segment: Segment) -> bool {
        self.0[segment.index()]
    }

    /// The lit segments in A..G order.
    pub fn lit_segments(&self) -> Vec<Segment> {
        Segment::ALL
            .into_iter()
            .filter(|segment| self.is_lit(*segment))
            .collect()
    }
}

const fn pattern(bits: [u8; SEGMENT_COUNT]) -> DigitPattern {
    let mut lit = [false; SEGMENT_COUNT];
    let mut i = 0;
    while i < SEGMENT_COUNT {
        lit[i] = bits[i] == 1;
        i += 1;
    }
    DigitPattern(lit)
}

/// Segment patterns for 0-9, columns A, B, C, D, E, F, G.
pub static DIGITS: [DigitPattern; 10] = [
    pattern([1, 1, 1, 1, 1, 1, 0]), // 0
    pattern([0, 1, 1, 0, 0, 0, 0]), // 1
    pattern([1, 1, 0, 1, 1, 0, 1]), // 2
    pattern([1, 1, 1, 1, 0, 0, 1]), // 3
    pattern([0, 1, 1, 0, 0, 1, 1]), // 4
    pattern([1, 0, 1, 1, 0, 1, 1]), // 5
    pattern([1, 0, 1, 1, 1, 1, 1]), // 6
    pattern([1, 1, 1, 0, 0, 0, 0]), // 7
    pattern([1, 1, 1, 1, 1, 1, 1]), // 8
    pattern([1, 1, 1, 1, 0, 1, 1]), // 9
];

/// Looks up the pattern for `digit`, rejecting anything outside 0..=9.
pub fn digit_pattern(digit: u8) -> Result<DigitPattern> {
    DIGITS
        .get(usize::from(digit))
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Digit {} is out of range, expected 0-9", digit))
}
