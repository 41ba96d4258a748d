use anyhow::{anyhow, Result};
use std::{
    collections::HashMap,
    env, fmt, fs,
    path::Path,
    str::FromStr,
};

/// Specifies the pin numbering mode.
///
/// The pin numbering mode is used to determine the mapping between the pin numbers
/// and the GPIO channels. The pin numbering mode can be one of the following:
///
/// * `BOARD` - The pin numbers are the physical pin numbers on the 40-pin header.
/// * `BCM` - The pin numbers are the Broadcom SOC channel numbers.
///
/// # Example
///
/// ```rust
/// use rpi_gpio_basics::Mode;
///
/// let mode: Mode = "BCM".parse().unwrap();
/// assert_eq!(mode, Mode::BCM);
/// ```
#[derive(Eq, Hash, PartialEq, Clone, Copy, Debug)]
pub enum Mode {
    BOARD,
    BCM,
}

impl Mode {
    /// Converts a `Mode` enum to a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rpi_gpio_basics::Mode;
    ///
    /// assert_eq!(Mode::BOARD.to_str(), "BOARD");
    /// ```
    pub fn to_str(&self) -> &'static str {
        match self {
            Mode::BOARD => "BOARD",
            Mode::BCM => "BCM",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    /// Valid strings are `"BOARD"` and `"BCM"`, in any case.
    fn from_str(s: &str) -> Result<Mode> {
        match s.to_ascii_uppercase().as_str() {
            "BOARD" => Ok(Mode::BOARD),
            "BCM" => Ok(Mode::BCM),
            _ => Err(anyhow!("Invalid mode: {}", s)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Environment variable that overrides model detection, for containers without a device tree.
pub const MODEL_ENV_VAR: &str = "RPI_MODEL_NAME";

static DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

// gpiochip labels of the controllers that own the 40-pin header
static HEADER_CHIP_LABELS: [&str; 3] = ["pinctrl-bcm2835", "pinctrl-bcm2711", "pinctrl-rp1"];

/// Physical header pin (BOARD) to Broadcom channel (BCM) for every GPIO on the 40-pin header.
///
/// Power and ground pins are absent.
static HEADER_PINS: [(u32, u32); 28] = [
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (27, 0),
    (28, 1),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

/// Contains information about a single GPIO channel.
///
/// The fields are:
/// * `channel`: Channel number in the mode it was looked up with
/// * `bcm`: Broadcom channel number
/// * `global_gpio`: Linux exported GPIO number (global)
/// * `global_gpio_name`: Linux exported GPIO name
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub channel: u32,
    pub bcm: u32,
    pub global_gpio: u32,
    pub global_gpio_name: String,
}

/// Contains information about the board and the GPIO controller driving its header.
#[derive(Debug, Clone)]
pub struct BoardInfo {
    pub model: String,
    pub gpio_chip_label: Option<String>,
    pub gpio_base: u32,
}

fn read_file_to_string(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|contents| contents.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
}

/// Determines the board model from the device tree, falling back to `RPI_MODEL_NAME`.
pub(crate) fn get_model() -> Result<String> {
    resolve_model(
        read_file_to_string(Path::new(DEVICE_TREE_MODEL)),
        env::var(MODEL_ENV_VAR).ok(),
    )
}

fn resolve_model(device_tree_model: Option<String>, env_model: Option<String>) -> Result<String> {
    if let Some(model) = device_tree_model {
        if model.starts_with("Raspberry Pi") {
            return Ok(model);
        }
        log::warn!("Device tree reports '{}', which is not a Raspberry Pi.", model);
    }

    // get model info from the environment variables for docker containers
    if let Some(model_name) = env_model {
        let model_name = model_name.trim();
        if !model_name.is_empty() {
            return Ok(model_name.to_string());
        }
        log::warn!("Environment variable '{}' is empty.", MODEL_ENV_VAR);
    }

    anyhow::bail!("Could not determine Raspberry Pi model")
}

/// Finds the base number of the gpiochip that owns the header pins.
///
/// Recent kernels no longer start the SOC controller at 0, so the base must be read
/// from the chip's `base` file. When no known controller is present the base is 0.
fn find_header_chip(sysfs_root: &Path) -> (Option<String>, u32) {
    let entries = match fs::read_dir(sysfs_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", sysfs_root.display(), e);
            return (None, 0);
        }
    };

    let mut chips: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with("gpiochip"))
        })
        .collect();
    chips.sort();

    for chip in chips {
        let label = match read_file_to_string(&chip.join("label")) {
            Some(label) => label,
            None => continue,
        };
        if !HEADER_CHIP_LABELS.contains(&label.as_str()) {
            continue;
        }

        let base = read_file_to_string(&chip.join("base"))
            .and_then(|base| base.parse::<u32>().ok());
        match base {
            Some(base) => return (Some(label), base),
            None => log::warn!("gpiochip {} has no readable base", chip.display()),
        }
    }

    log::warn!("No known header gpiochip found, assuming base 0.");
    (None, 0)
}

/// Builds the channel lookup tables for both numbering modes.
pub(crate) fn get_data(
    sysfs_root: &Path,
    model: String,
) -> (BoardInfo, HashMap<Mode, HashMap<u32, ChannelInfo>>) {
    let (gpio_chip_label, gpio_base) = find_header_chip(sysfs_root);

    // create a hashmap of channel info, mapping each header pin to a ChannelInfo struct
    let mut board_data: HashMap<u32, ChannelInfo> = HashMap::new();
    let mut bcm_data: HashMap<u32, ChannelInfo> = HashMap::new();
    for &(board, bcm) in HEADER_PINS.iter() {
        let global_gpio = gpio_base + bcm;
        let channel_board = ChannelInfo {
            channel: board,
            bcm,
            global_gpio,
            global_gpio_name: format!("gpio{}", global_gpio),
        };
        let channel_bcm = ChannelInfo {
            channel: bcm,
            ..channel_board.clone()
        };

        board_data.insert(board, channel_board);
        bcm_data.insert(bcm, channel_bcm);
    }

    let mut channel_data: HashMap<Mode, HashMap<u32, ChannelInfo>> = HashMap::new();
    channel_data.insert(Mode::BOARD, board_data);
    channel_data.insert(Mode::BCM, bcm_data);

    let board_info = BoardInfo {
        model,
        gpio_chip_label,
        gpio_base,
    };

    (board_info, channel_data)
}
