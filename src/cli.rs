//! Command line options shared by the 7-segment programs.

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::{
    display::{DigitRenderer, PinDriver},
    gpio::GPIO,
    pin_data::Mode,
    segment::{Polarity, SegmentPins},
};

#[derive(Args, Debug, Clone)]
pub struct DisplayArgs {
    /// Channels for segments a,b,c,d,e,f,g
    #[arg(long, default_value = "5,6,13,19,26,21,20")]
    pub pins: SegmentPins,

    /// common-anode or common-cathode
    #[arg(long, default_value = "common-anode")]
    pub polarity: Polarity,

    /// Pin numbering used by --pins, BCM or BOARD
    #[arg(long, default_value = "BCM")]
    pub mode: Mode,

    /// Seconds each digit stays on the display
    #[arg(long, default_value_t = 1.0)]
    pub delay: f64,
}

impl DisplayArgs {
    pub fn delay(&self) -> Result<Duration> {
        seconds(self.delay)
    }

    /// Opens the GPIO controller and returns a renderer with all segments configured and off.
    pub fn open(&self) -> Result<DigitRenderer<GPIO>> {
        let mut gpio = GPIO::new()?;
        gpio.setmode(self.mode)?;
        log::info!("Running on {}", gpio.board_info.model);

        let mut driver = PinDriver::new(gpio, self.pins, self.polarity);
        driver.configure()?;
        Ok(DigitRenderer::new(driver))
    }
}

/// Converts a user supplied number of seconds, rejecting negative or non-finite values.
pub fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| anyhow::anyhow!("Invalid delay {}: {}", value, e))
}
