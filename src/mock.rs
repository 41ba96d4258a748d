//! An in-memory [`PinController`] that records every write, for running the
//! drivers without hardware.

use anyhow::{bail, Error};
use std::collections::HashMap;

use crate::gpio::{Level, PinController};

/// A single call made against a [`MockController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    Setup { channel: u32, initial: Level },
    Write { channel: u32, level: Level },
    Release { channel: u32 },
}

/// Records pin writes and tracks the current level of each configured output.
#[derive(Debug, Default)]
pub struct MockController {
    levels: HashMap<u32, Level>,
    pub events: Vec<PinEvent>,
    pub released: bool,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of a configured channel.
    pub fn level(&self, channel: u32) -> Option<Level> {
        self.levels.get(&channel).copied()
    }

    pub fn is_configured(&self, channel: u32) -> bool {
        self.levels.contains_key(&channel)
    }
}

impl PinController for MockController {
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error> {
        self.levels.insert(channel, initial);
        self.events.push(PinEvent::Setup { channel, initial });
        Ok(())
    }

    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error> {
        match self.levels.get_mut(&channel) {
            Some(current) => *current = level,
            None => bail!("The GPIO channel {} has not been set up as an OUTPUT", channel),
        }
        self.events.push(PinEvent::Write { channel, level });
        Ok(())
    }

    fn release(&mut self, channels: &[u32]) -> Result<(), Error> {
        for channel in channels {
            self.levels.remove(channel);
            self.events.push(PinEvent::Release { channel: *channel });
        }
        self.released = true;
        Ok(())
    }
}
