//! Segments of a 7-segment display and how they are wired.
//!
//! ```text
//!    AAAA
//!   F    B
//!   F    B
//!    GGGG
//!   E    C
//!   E    C
//!    DDDD
//! ```

use anyhow::{anyhow, Error, Result};
use std::{fmt, str::FromStr};

use crate::gpio::Level;

/// Number of segments in one digit, excluding the decimal point.
pub const SEGMENT_COUNT: usize = 7;

/// One lit/unlit element of a 7-segment display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Segment {
    /// All segments in pattern order.
    pub const ALL: [Segment; SEGMENT_COUNT] = [
        Segment::A,
        Segment::B,
        Segment::C,
        Segment::D,
        Segment::E,
        Segment::F,
        Segment::G,
    ];

    /// Position of the segment in a digit pattern.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Electrical polarity of the display.
///
/// * `CommonAnode` - the shared terminal goes to 3V3, a segment lights when driven LOW
/// * `CommonCathode` - the shared terminal goes to ground, a segment lights when driven HIGH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    CommonAnode,
    CommonCathode,
}

impl Polarity {
    /// The level that lights a segment.
    pub fn on_level(self) -> Level {
        match self {
            Polarity::CommonAnode => Level::LOW,
            Polarity::CommonCathode => Level::HIGH,
        }
    }

    /// The level that turns a segment off.
    pub fn off_level(self) -> Level {
        !self.on_level()
    }

    pub fn level(self, lit: bool) -> Level {
        if lit {
            self.on_level()
        } else {
            self.off_level()
        }
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Polarity> {
        match s.to_ascii_lowercase().as_str() {
            "common-anode" | "anode" => Ok(Polarity::CommonAnode),
            "common-cathode" | "cathode" => Ok(Polarity::CommonCathode),
            _ => Err(anyhow!("Invalid polarity: {} (expected common-anode or common-cathode)", s)),
        }
    }
}

/// The channel each segment is wired to, indexed A..G.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPins([u32; SEGMENT_COUNT]);

impl SegmentPins {
    /// Fails if two segments share a channel.
    pub fn new(channels: [u32; SEGMENT_COUNT]) -> Result<Self> {
        for (i, channel) in channels.iter().enumerate() {
            if channels[..i].contains(channel) {
                anyhow::bail!("Channel {} is assigned to more than one segment", channel);
            }
        }
        Ok(SegmentPins(channels))
    }

    pub fn channel(&self, segment: Segment) -> u32 {
        self.0[segment.index()]
    }

    pub fn channels(&self) -> &[u32; SEGMENT_COUNT] {
        &self.0
    }
}

impl Default for SegmentPins {
    /// BCM wiring used by the exercises: A=5, B=6, C=13, D=19, E=26, F=21, G=20.
    fn default() -> Self {
        SegmentPins([5, 6, 13, 19, 26, 21, 20])
    }
}

impl FromStr for SegmentPins {
    type Err = Error;

    /// Parses a comma separated list of seven channels in A..G order.
    fn from_str(s: &str) -> Result<SegmentPins> {
        let channels = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|e| anyhow!("Invalid channel '{}': {}", part.trim(), e))
            })
            .collect::<Result<Vec<u32>>>()?;

        let channels: [u32; SEGMENT_COUNT] = channels.try_into().map_err(|v: Vec<u32>| {
            anyhow!("Expected {} channels, got {}", SEGMENT_COUNT, v.len())
        })?;
        SegmentPins::new(channels)
    }
}
