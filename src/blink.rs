use anyhow::Result;
use std::time::Duration;

use crate::{
    cancel::CancelToken,
    gpio::{Level, PinController},
};

/// Blinks an LED wired between a channel and ground.
pub struct Blinker<P: PinController> {
    controller: P,
    channel: u32,
}

impl<P: PinController> Blinker<P> {
    /// Sets `channel` up as an output, starting LOW (LED off).
    pub fn new(mut controller: P, channel: u32) -> Result<Self> {
        controller.setup_output(channel, Level::LOW)?;
        Ok(Blinker {
            controller,
            channel,
        })
    }

    /// Waits `half_period`, turns the LED on, waits again, turns it off, and repeats
    /// until `token` is cancelled.
    ///
    /// The LED is left off and the channel released on return.
    pub fn run(mut self, half_period: Duration, token: &CancelToken) -> Result<()> {
        let blinked = self.blink_until_cancelled(half_period, token);
        let off = self.controller.write(self.channel, Level::LOW);
        let released = self.controller.release(&[self.channel]);
        blinked.and(off).and(released)
    }

    fn blink_until_cancelled(&mut self, half_period: Duration, token: &CancelToken) -> Result<()> {
        loop {
            if !token.sleep(half_period) {
                return Ok(());
            }
            self.controller.write(self.channel, Level::HIGH)?;
            log::info!("LED on");

            if !token.sleep(half_period) {
                return Ok(());
            }
            self.controller.write(self.channel, Level::LOW)?;
            log::info!("LED off");
        }
    }
}
