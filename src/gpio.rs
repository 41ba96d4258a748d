use anyhow::{Context, Error};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use crate::pin_data::{get_data, get_model, BoardInfo, ChannelInfo, Mode};

static SYSFS_ROOT: &str = "/sys/class/gpio";

// udev may take a moment to create the value file after export
const EXPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Specifies the GPIO pin value in output mode.
///
/// * `LOW` - 0
/// * `HIGH` - 1
///
/// # Example
///
/// When writing to a GPIO pin, you must specify the value. For example, to set
/// BCM channel 5 to LOW and BCM channel 6 to HIGH:
///
/// ```no_run
/// use rpi_gpio_basics::{GPIO, Level, Direction, Mode};
///
/// let mut gpio = GPIO::new().unwrap();
/// gpio.setmode(Mode::BCM).unwrap();
///
/// gpio.setup(vec![5, 6], Direction::OUT, None).unwrap();
/// gpio.output(vec![5, 6], vec![Level::LOW, Level::HIGH]).unwrap();
/// ```
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Level {
    LOW = 0,
    HIGH = 1,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::HIGH => "1",
            Level::LOW => "0",
        }
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::HIGH => Level::LOW,
            Level::LOW => Level::HIGH,
        }
    }
}

/// Specifies the GPIO pin direction.
///
/// * `IN` - Input
/// * `OUT` - Output
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Direction {
    OUT = 0,
    IN = 1,
}

/// The process-wide pin resource that the display and LED drivers write through.
///
/// [`GPIO`] drives real hardware through sysfs; [`crate::mock::MockController`]
/// records the writes for tests.
pub trait PinController {
    /// Configures `channel` as a digital output driven to `initial`.
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error>;

    /// Drives an output channel to `level`.
    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error>;

    /// Returns the channels to the system.
    fn release(&mut self, channels: &[u32]) -> Result<(), Error>;
}

impl<T: PinController + ?Sized> PinController for &mut T {
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error> {
        (**self).setup_output(channel, initial)
    }

    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error> {
        (**self).write(channel, level)
    }

    fn release(&mut self, channels: &[u32]) -> Result<(), Error> {
        (**self).release(channels)
    }
}

fn check_write_access(sysfs_root: &Path) -> Result<(), Error> {
    let export_path = sysfs_root.join("export");
    let unexport_path = sysfs_root.join("unexport");

    let export_metadata = fs::metadata(&export_path)
        .with_context(|| format!("Cannot access {}", export_path.display()))?;
    let unexport_metadata = fs::metadata(&unexport_path)
        .with_context(|| format!("Cannot access {}", unexport_path.display()))?;

    if !export_metadata.permissions().readonly() && !unexport_metadata.permissions().readonly() {
        Ok(())
    } else {
        Err(Error::msg("You do not have write access to the GPIO sysfs interface."))
    }
}

fn write_attribute(path: &Path, value: &str) -> Result<(), Error> {
    let mut f = fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    f.write_all(value.as_bytes())
        .with_context(|| format!("Cannot write '{}' to {}", value, path.display()))
}

/// A public struct that holds state information about the GPIO pins.
///
/// Public fields:
/// * `board_info` - The detected board model and header gpiochip
///
/// # Example
///
/// ```no_run
/// use rpi_gpio_basics::GPIO;
///
/// let gpio = GPIO::new().unwrap();
/// println!("{}", gpio.board_info.model);
/// ```
pub struct GPIO {
    pub board_info: BoardInfo,
    sysfs_root: PathBuf,
    channel_data_by_mode: HashMap<Mode, HashMap<u32, ChannelInfo>>,

    // lookup table for the active mode, pin to linux gpio mapping
    channel_data: HashMap<u32, ChannelInfo>,

    gpio_warnings: bool,
    gpio_mode: Option<Mode>,
    channel_configuration: HashMap<u32, Direction>,
}

impl GPIO {
    /// Creates a new `GPIO` object for the board this process runs on.
    ///
    /// Calling this function will automatically populate the `board_info` field.
    pub fn new() -> Result<Self, Error> {
        let model = get_model()?;
        Ok(Self::with_sysfs_root(SYSFS_ROOT, model))
    }

    /// Creates a `GPIO` object rooted at an arbitrary sysfs directory.
    pub fn with_sysfs_root(sysfs_root: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        let sysfs_root = sysfs_root.into();
        let (board_info, channel_data_by_mode) = get_data(&sysfs_root, model.into());
        log::debug!(
            "{}: header gpiochip {:?} at base {}",
            board_info.model,
            board_info.gpio_chip_label,
            board_info.gpio_base
        );

        GPIO {
            board_info,
            sysfs_root,
            channel_data_by_mode,

            channel_data: HashMap::new(),

            gpio_warnings: true,
            gpio_mode: None,
            channel_configuration: HashMap::new(),
        }
    }

    /// Enable or disable warnings during setup and cleanup.
    ///
    /// # Arguments
    ///
    /// * `warnings` - `true` to enable warnings, `false` to disable warnings
    pub fn setwarnings(&mut self, warnings: bool) {
        self.gpio_warnings = warnings;
    }

    /// Sets the pin numbering mode.
    ///
    /// # Arguments
    ///
    /// * `mode` - The pin numbering mode to use, `Mode::BOARD` or `Mode::BCM`
    pub fn setmode(&mut self, mode: Mode) -> Result<(), Error> {
        // check if a different mode has been set already
        if let Some(current_mode) = self.gpio_mode {
            if current_mode != mode {
                return Err(Error::msg("A different mode has already been set!"));
            }
        }

        self.channel_data = self
            .channel_data_by_mode
            .get(&mode)
            .cloned()
            .unwrap_or_default();
        self.gpio_mode = Some(mode);

        Ok(())
    }

    /// Returns the currently set pin numbering mode.
    pub fn getmode(&self) -> Option<Mode> {
        self.gpio_mode
    }

    fn validate_mode_set(&self) -> Result<(), Error> {
        match self.gpio_mode {
            Some(_) => Ok(()),
            None => Err(Error::msg(
                "Please set pin numbering mode using setmode(Mode::BOARD) or setmode(Mode::BCM)",
            )),
        }
    }

    fn channel_to_info(&self, channel: u32) -> Result<ChannelInfo, Error> {
        self.validate_mode_set()?;
        self.channel_data
            .get(&channel)
            .cloned()
            .ok_or_else(|| Error::msg(format!("The channel sent is invalid: {}", channel)))
    }

    fn channels_to_infos(&self, channels: &[u32]) -> Result<Vec<ChannelInfo>, Error> {
        channels
            .iter()
            .map(|channel| self.channel_to_info(*channel))
            .collect()
    }

    fn gpio_dir(&self, ch_info: &ChannelInfo) -> PathBuf {
        self.sysfs_root.join(&ch_info.global_gpio_name)
    }

    /// Return the current configuration of a channel as reported by sysfs.
    fn sysfs_channel_configuration(&self, ch_info: &ChannelInfo) -> Option<Direction> {
        let direction = fs::read_to_string(self.gpio_dir(ch_info).join("direction")).ok()?;
        match direction.trim() {
            "in" => Some(Direction::IN),
            "out" => Some(Direction::OUT),
            _ => None,
        }
    }

    fn export_gpio(&self, ch_info: &ChannelInfo) -> Result<(), Error> {
        let gpio_dir = self.gpio_dir(ch_info);
        if !gpio_dir.exists() {
            write_attribute(
                &self.sysfs_root.join("export"),
                &ch_info.global_gpio.to_string(),
            )?;
        }

        let value_path = gpio_dir.join("value");
        let started = Instant::now();
        while !value_path.exists() {
            if started.elapsed() > EXPORT_TIMEOUT {
                anyhow::bail!("Timed out waiting for {}", value_path.display());
            }
            thread::sleep(Duration::from_millis(10));
        }

        Ok(())
    }

    fn unexport_gpio(&self, ch_info: &ChannelInfo) -> Result<(), Error> {
        if self.gpio_dir(ch_info).exists() {
            write_attribute(
                &self.sysfs_root.join("unexport"),
                &ch_info.global_gpio.to_string(),
            )?;
        }
        Ok(())
    }

    fn output_one(&self, ch_info: &ChannelInfo, value: Level) -> Result<(), Error> {
        write_attribute(&self.gpio_dir(ch_info).join("value"), value.as_str())
    }

    fn cleanup_one(&mut self, ch_info: &ChannelInfo) -> Result<(), Error> {
        if self.channel_configuration.contains_key(&ch_info.channel) {
            self.unexport_gpio(ch_info)?;
            self.channel_configuration.remove(&ch_info.channel);
        }
        Ok(())
    }

    fn cleanup_all(&mut self) -> Result<(), Error> {
        let channels: Vec<u32> = self.channel_configuration.keys().copied().collect();
        for channel in channels {
            let ch_info = self.channel_to_info(channel)?;
            self.cleanup_one(&ch_info)?;
        }

        self.gpio_mode = None;

        Ok(())
    }

    fn setup_single_out(&mut self, ch_info: &ChannelInfo, initial: Option<Level>) -> Result<(), Error> {
        self.export_gpio(ch_info)?;
        write_attribute(&self.gpio_dir(ch_info).join("direction"), "out")?;

        if let Some(initial) = initial {
            self.output_one(ch_info, initial)?;
        }

        self.channel_configuration
            .insert(ch_info.channel, Direction::OUT);
        Ok(())
    }

    fn setup_single_in(&mut self, ch_info: &ChannelInfo) -> Result<(), Error> {
        self.export_gpio(ch_info)?;
        write_attribute(&self.gpio_dir(ch_info).join("direction"), "in")?;

        self.channel_configuration
            .insert(ch_info.channel, Direction::IN);
        Ok(())
    }

    /// Setup a channel or list of channels with a direction and (optional) initial value.
    ///
    /// # Arguments
    ///
    /// * `channels` - A list of channels to setup.
    /// * `direction` - `Direction::IN` or `Direction::OUT`
    /// * `initial` - An optional initial level for an output channel.
    pub fn setup(&mut self, channels: Vec<u32>, direction: Direction, initial: Option<Level>) -> Result<(), Error> {
        check_write_access(&self.sysfs_root)?;

        let ch_infos = self.channels_to_infos(&channels)?;

        if direction == Direction::IN && initial.is_some() {
            return Err(Error::msg("initial parameter is not valid for inputs"));
        }

        if self.gpio_warnings {
            for ch_info in ch_infos.iter() {
                let sysfs_cfg = self.sysfs_channel_configuration(ch_info);
                let app_cfg = self.channel_configuration.get(&ch_info.channel);

                // warn if channel has been setup external to current program
                if app_cfg.is_none() && sysfs_cfg.is_some() {
                    log::warn!(
                        "Channel {} is already in use, continuing anyway. Use setwarnings(false) to disable warnings",
                        ch_info.channel
                    );
                }
            }
        }

        // cleanup if the channel is already setup
        for ch_info in ch_infos.iter() {
            self.cleanup_one(ch_info)?;
        }

        for ch_info in ch_infos.iter() {
            match direction {
                Direction::OUT => self.setup_single_out(ch_info, initial)?,
                Direction::IN => self.setup_single_in(ch_info)?,
            }
        }

        Ok(())
    }

    /// Cleans up channels at the end of the program.
    ///
    /// # Arguments
    ///
    /// * `channels` - An optional list of channels to cleanup. If no channel is provided, all channels are cleaned.
    pub fn cleanup(&mut self, channels: Option<Vec<u32>>) -> Result<(), Error> {
        // warn if no channel is setup
        if self.gpio_mode.is_none() {
            if self.gpio_warnings {
                log::warn!("No channels have been set up yet - nothing to clean up!");
            }
            return Ok(());
        }

        // clean all channels if no channel param provided
        let channels = match channels {
            Some(channels) => channels,
            None => return self.cleanup_all(),
        };

        for ch_info in self.channels_to_infos(&channels)? {
            self.cleanup_one(&ch_info)?;
        }

        Ok(())
    }

    /// Returns the current value of the specified channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - The channel to read from.
    pub fn input(&self, channel: u32) -> Result<Level, Error> {
        let ch_info = self.channel_to_info(channel)?;

        if !self.channel_configuration.contains_key(&ch_info.channel) {
            return Err(Error::msg("You must setup() the GPIO channel first"));
        }

        let value_path = self.gpio_dir(&ch_info).join("value");
        let value = fs::read_to_string(&value_path)
            .with_context(|| format!("Cannot read {}", value_path.display()))?;
        match value.trim() {
            "0" => Ok(Level::LOW),
            _ => Ok(Level::HIGH),
        }
    }

    /// Writes a value to channels.
    ///
    /// # Arguments
    ///
    /// * `channels` - A list of channels to write to.
    /// * `values` - A list of values to write to the channels. Must be either HIGH or LOW.
    pub fn output(&self, channels: Vec<u32>, values: Vec<Level>) -> Result<(), Error> {
        let ch_infos = self.channels_to_infos(&channels)?;

        if values.len() != ch_infos.len() {
            return Err(Error::msg("Number of values != number of channels"));
        }

        // check that channels have been set as output
        for ch_info in ch_infos.iter() {
            if self.channel_configuration.get(&ch_info.channel) != Some(&Direction::OUT) {
                return Err(Error::msg(format!(
                    "The GPIO channel {} has not been set up as an OUTPUT",
                    ch_info.channel
                )));
            }
        }

        for (ch_info, value) in ch_infos.iter().zip(values) {
            self.output_one(ch_info, value)?;
        }

        Ok(())
    }
}

impl PinController for GPIO {
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error> {
        self.setup(vec![channel], Direction::OUT, Some(initial))
    }

    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error> {
        self.output(vec![channel], vec![level])
    }

    fn release(&mut self, channels: &[u32]) -> Result<(), Error> {
        self.cleanup(Some(channels.to_vec()))
    }
}
