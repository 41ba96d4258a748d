//! Raspberry Pi GPIO exercises: a blinking LED and a common-anode 7-segment display.
//!
//! Pins are driven through the Linux sysfs GPIO interface by [`GPIO`], or through
//! any other [`PinController`].

pub mod blink;
pub mod cancel;
pub mod cli;
pub mod digits;
pub mod display;
pub mod gpio;
pub mod mock;
pub mod pin_data;
pub mod segment;

pub use blink::Blinker;
pub use cancel::CancelToken;
pub use digits::{digit_pattern, DigitPattern, DIGITS};
pub use display::{DigitRenderer, PinDriver};
pub use gpio::{Direction, Level, PinController, GPIO};
pub use pin_data::{BoardInfo, ChannelInfo, Mode};
pub use segment::{Polarity, Segment, SegmentPins, SEGMENT_COUNT};

/// Starts the `env_logger` backend, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
