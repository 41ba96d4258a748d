//! Driving a single 7-segment digit.
//!
//! [`PinDriver`] owns the segment channels and knows the display's polarity;
//! [`DigitRenderer`] turns digits into segment writes on top of it.

use anyhow::Result;
use std::time::Duration;

use crate::{
    cancel::CancelToken,
    digits::digit_pattern,
    gpio::PinController,
    segment::{Polarity, Segment, SegmentPins, SEGMENT_COUNT},
};

/// Maps segments to channels and writes them through a [`PinController`].
///
/// Pins are cleared and released on drop if [`PinDriver::release`] was not called.
pub struct PinDriver<P: PinController> {
    controller: P,
    pins: SegmentPins,
    polarity: Polarity,
    lit: [bool; SEGMENT_COUNT],
    configured: bool,
}

impl<P: PinController> PinDriver<P> {
    pub fn new(controller: P, pins: SegmentPins, polarity: Polarity) -> Self {
        PinDriver {
            controller,
            pins,
            polarity,
            lit: [false; SEGMENT_COUNT],
            configured: false,
        }
    }

    /// Sets every segment channel up as an output, starting OFF.
    ///
    /// If one channel fails, the channels already set up are released before the error returns.
    pub fn configure(&mut self) -> Result<()> {
        let off = self.polarity.off_level();
        let channels = *self.pins.channels();
        for (set_up, channel) in channels.iter().enumerate() {
            if let Err(e) = self.controller.setup_output(*channel, off) {
                // hand back the channels that did get set up
                if set_up > 0 {
                    if let Err(release_err) = self.controller.release(&channels[..set_up]) {
                        log::warn!("Failed to release segment channels: {:#}", release_err);
                    }
                }
                return Err(e);
            }
        }
        self.lit = [false; SEGMENT_COUNT];
        self.configured = true;
        log::debug!(
            "Configured segment channels {:?} ({:?})",
            self.pins.channels(),
            self.polarity
        );
        Ok(())
    }

    pub fn set(&mut self, segment: Segment, lit: bool) -> Result<()> {
        if !self.configured {
            anyhow::bail!("Segment {} driven before configure()", segment);
        }
        self.controller
            .write(self.pins.channel(segment), self.polarity.level(lit))?;
        self.lit[segment.index()] = lit;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        for segment in Segment::ALL {
            self.set(segment, false)?;
        }
        Ok(())
    }

    /// Turns every segment off and hands the channels back. Does nothing if already released.
    pub fn release(&mut self) -> Result<()> {
        if !self.configured {
            return Ok(());
        }
        // release the channels even when clearing fails
        let cleared = self.clear_all();
        self.configured = false;
        let released = self.controller.release(self.pins.channels());
        cleared.and(released)
    }

    /// Segments currently lit, in A..G order.
    pub fn lit_segments(&self) -> Vec<Segment> {
        Segment::ALL
            .into_iter()
            .filter(|segment| self.lit[segment.index()])
            .collect()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn controller(&self) -> &P {
        &self.controller
    }
}

impl<P: PinController> Drop for PinDriver<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Failed to release segment channels: {:#}", e);
        }
    }
}

/// Shows digits on a display through a [`PinDriver`].
///
/// # Example
///
/// ```rust
/// use rpi_gpio_basics::{mock::MockController, DigitRenderer, PinDriver, Polarity, Segment, SegmentPins};
///
/// let mut driver = PinDriver::new(MockController::new(), SegmentPins::default(), Polarity::CommonAnode);
/// driver.configure().unwrap();
///
/// let mut renderer = DigitRenderer::new(driver);
/// renderer.render(1).unwrap();
/// assert_eq!(renderer.driver().lit_segments(), vec![Segment::B, Segment::C]);
/// ```
pub struct DigitRenderer<P: PinController> {
    driver: PinDriver<P>,
}

impl<P: PinController> DigitRenderer<P> {
    pub fn new(driver: PinDriver<P>) -> Self {
        DigitRenderer { driver }
    }

    pub fn driver(&self) -> &PinDriver<P> {
        &self.driver
    }

    /// Applies the pattern for `digit` to segments A..G in order.
    ///
    /// Digits outside 0..=9 are rejected before any pin is written.
    pub fn render(&mut self, digit: u8) -> Result<()> {
        let pattern = digit_pattern(digit)?;
        for segment in Segment::ALL {
            self.driver.set(segment, pattern.is_lit(segment))?;
        }
        log::trace!("Rendered {}", digit);
        Ok(())
    }

    /// Counts 0 through 9 and wraps, pausing `delay` after each digit, until `token` is cancelled.
    ///
    /// The display is cleared on return.
    pub fn cycle(&mut self, delay: Duration, token: &CancelToken) -> Result<()> {
        self.alternate(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9], delay, token)
    }

    /// Shows each digit of `digits` in turn, pausing `delay` after each and wrapping,
    /// until `token` is cancelled.
    ///
    /// The display is cleared on return.
    pub fn alternate(&mut self, digits: &[u8], delay: Duration, token: &CancelToken) -> Result<()> {
        if digits.is_empty() {
            anyhow::bail!("No digits to show");
        }
        for digit in digits {
            digit_pattern(*digit)?;
        }

        let shown = self.show_until_cancelled(digits, delay, token);
        let cleared = self.driver.clear_all();
        shown.and(cleared)
    }

    fn show_until_cancelled(&mut self, digits: &[u8], delay: Duration, token: &CancelToken) -> Result<()> {
        while !token.is_cancelled() {
            for digit in digits {
                if token.is_cancelled() {
                    break;
                }
                self.render(*digit)?;
                if !token.sleep(delay) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Clears the display and releases its channels.
    pub fn release(mut self) -> Result<()> {
        self.driver.release()
    }
}
