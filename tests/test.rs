use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::Error;
use rpi_gpio_basics::{
    mock::{MockController, PinEvent},
    CancelToken, DigitRenderer, Direction, Level, Mode, PinController, PinDriver, Polarity,
    Segment, SegmentPins, DIGITS, GPIO,
};

/// Cancels a token once a given number of writes went through, and snapshots the
/// lit segments after every complete digit.
struct CancellingController {
    inner: MockController,
    token: CancelToken,
    cancel_after: usize,
    writes: usize,
    snapshots: Vec<BTreeSet<Segment>>,
}

impl CancellingController {
    fn new(token: CancelToken, cancel_after: usize) -> Self {
        CancellingController {
            inner: MockController::new(),
            token,
            cancel_after,
            writes: 0,
            snapshots: Vec::new(),
        }
    }

    fn lit(&self) -> BTreeSet<Segment> {
        let pins = SegmentPins::default();
        Segment::ALL
            .into_iter()
            .filter(|segment| self.inner.level(pins.channel(*segment)) == Some(Level::LOW))
            .collect()
    }
}

impl PinController for CancellingController {
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error> {
        self.inner.setup_output(channel, initial)
    }

    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error> {
        self.inner.write(channel, level)?;
        self.writes += 1;
        if self.writes % 7 == 0 {
            let lit = self.lit();
            self.snapshots.push(lit);
        }
        if self.writes >= self.cancel_after {
            self.token.cancel();
        }
        Ok(())
    }

    fn release(&mut self, channels: &[u32]) -> Result<(), Error> {
        self.inner.release(channels)
    }
}

fn renderer(controller: &mut MockController) -> DigitRenderer<&mut MockController> {
    let mut driver = PinDriver::new(controller, SegmentPins::default(), Polarity::CommonAnode);
    driver.configure().unwrap();
    DigitRenderer::new(driver)
}

fn lit(renderer: &DigitRenderer<&mut MockController>) -> BTreeSet<Segment> {
    renderer.driver().lit_segments().into_iter().collect()
}

#[test]
fn render_matches_table_for_every_digit() {
    let mut mock = MockController::new();
    let mut renderer = renderer(&mut mock);
    let pins = SegmentPins::default();

    for digit in 0..=9u8 {
        renderer.render(digit).unwrap();
        let expected: BTreeSet<Segment> = DIGITS[usize::from(digit)].lit_segments().into_iter().collect();
        assert_eq!(lit(&renderer), expected, "digit {}", digit);

        // the electrical levels agree with the bookkeeping
        for segment in Segment::ALL {
            let level = renderer.driver().controller().level(pins.channel(segment));
            let want = if expected.contains(&segment) { Level::LOW } else { Level::HIGH };
            assert_eq!(level, Some(want), "digit {} segment {}", digit, segment);
        }
    }
}

#[test]
fn render_is_idempotent() {
    let mut mock = MockController::new();
    let mut renderer = renderer(&mut mock);
    for digit in 0..=9u8 {
        renderer.render(digit).unwrap();
        let first = lit(&renderer);
        renderer.render(digit).unwrap();
        assert_eq!(lit(&renderer), first);
    }
}

#[test]
fn concrete_digits() {
    use Segment::*;

    let mut mock = MockController::new();
    let mut renderer = renderer(&mut mock);

    renderer.render(2).unwrap();
    assert_eq!(renderer.driver().lit_segments(), vec![A, B, D, E, G]);
    renderer.render(1).unwrap();
    assert_eq!(renderer.driver().lit_segments(), vec![B, C]);
    renderer.render(8).unwrap();
    assert_eq!(renderer.driver().lit_segments(), Segment::ALL.to_vec());
    renderer.render(0).unwrap();
    assert_eq!(renderer.driver().lit_segments(), vec![A, B, C, D, E, F]);
}

#[test]
fn cycle_wraps_back_to_zero() {
    let token = CancelToken::new();
    // eleven digits, 0..9 then 0 again
    let mut controller = CancellingController::new(token.clone(), 7 * 11);
    {
        let mut driver = PinDriver::new(&mut controller, SegmentPins::default(), Polarity::CommonAnode);
        driver.configure().unwrap();
        let mut renderer = DigitRenderer::new(driver);
        renderer.cycle(Duration::ZERO, &token).unwrap();
        renderer.release().unwrap();
    }

    let snapshots = &controller.snapshots;
    assert!(snapshots.len() >= 11);
    for (digit, snapshot) in snapshots.iter().take(10).enumerate() {
        let expected: BTreeSet<Segment> = DIGITS[digit].lit_segments().into_iter().collect();
        assert_eq!(snapshot, &expected, "digit {}", digit);
    }
    assert_eq!(snapshots[10], snapshots[0]);
}

#[test]
fn cancelling_mid_cycle_turns_everything_off() {
    let pins = SegmentPins::default();
    for cancel_after in 1..=30 {
        let token = CancelToken::new();
        let mut controller = CancellingController::new(token.clone(), cancel_after);
        {
            let mut driver = PinDriver::new(&mut controller, pins, Polarity::CommonAnode);
            driver.configure().unwrap();
            let mut renderer = DigitRenderer::new(driver);
            renderer.cycle(Duration::ZERO, &token).unwrap();

            assert!(renderer.driver().lit_segments().is_empty(), "cancel after {}", cancel_after);
            for channel in pins.channels() {
                assert_eq!(renderer.driver().controller().inner.level(*channel), Some(Level::HIGH));
            }
            // dropped without an explicit release
        }
        assert!(controller.inner.released);
        for channel in pins.channels() {
            assert!(!controller.inner.is_configured(*channel));
        }
    }
}

#[test]
fn alternate_shows_one_then_two() {
    let token = CancelToken::new();
    let mut controller = CancellingController::new(token.clone(), 7 * 3);
    {
        let mut driver = PinDriver::new(&mut controller, SegmentPins::default(), Polarity::CommonAnode);
        driver.configure().unwrap();
        let mut renderer = DigitRenderer::new(driver);
        renderer.alternate(&[1, 2], Duration::ZERO, &token).unwrap();
    }

    let expected: Vec<BTreeSet<Segment>> = [1usize, 2, 1]
        .iter()
        .map(|digit| DIGITS[*digit].lit_segments().into_iter().collect())
        .collect();
    assert_eq!(controller.snapshots[..3], expected[..]);
    // the clear on exit
    assert!(controller.snapshots[3].is_empty());
}

fn fake_sysfs(root: &Path, base: u32, exported: &[u32]) {
    fs::write(root.join("export"), "").unwrap();
    fs::write(root.join("unexport"), "").unwrap();

    let chip = root.join(format!("gpiochip{}", base));
    fs::create_dir_all(&chip).unwrap();
    fs::write(chip.join("label"), "pinctrl-bcm2711\n").unwrap();
    fs::write(chip.join("base"), format!("{}\n", base)).unwrap();

    for bcm in exported {
        let gpio = root.join(format!("gpio{}", base + bcm));
        fs::create_dir_all(&gpio).unwrap();
        fs::write(gpio.join("value"), "").unwrap();
        fs::write(gpio.join("direction"), "").unwrap();
    }
}

fn read_value(root: &Path, global: u32) -> String {
    fs::read_to_string(root.join(format!("gpio{}/value", global))).unwrap()
}

#[test]
fn sysfs_renders_digit_two() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 512, &[5, 6, 13, 19, 26, 21, 20]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 4 Model B");
    gpio.setmode(Mode::BCM).unwrap();

    let mut driver = PinDriver::new(gpio, SegmentPins::default(), Polarity::CommonAnode);
    driver.configure().unwrap();
    let direction = fs::read_to_string(root.path().join("gpio517/direction")).unwrap();
    assert_eq!(direction, "out");
    assert_eq!(read_value(root.path(), 517), "1");

    let mut renderer = DigitRenderer::new(driver);
    renderer.render(2).unwrap();
    // A, B, D, E, G low; C, F high
    assert_eq!(read_value(root.path(), 512 + 5), "0");
    assert_eq!(read_value(root.path(), 512 + 6), "0");
    assert_eq!(read_value(root.path(), 512 + 13), "1");
    assert_eq!(read_value(root.path(), 512 + 19), "0");
    assert_eq!(read_value(root.path(), 512 + 26), "0");
    assert_eq!(read_value(root.path(), 512 + 21), "1");
    assert_eq!(read_value(root.path(), 512 + 20), "0");

    renderer.release().unwrap();
    for bcm in [5, 6, 13, 19, 26, 21, 20] {
        assert_eq!(read_value(root.path(), 512 + bcm), "1");
    }
    // the last channel handed back
    let unexported = fs::read_to_string(root.path().join("unexport")).unwrap();
    assert_eq!(unexported, "532");
}

#[test]
fn sysfs_board_numbering() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 0, &[2]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 3 Model B");
    gpio.setmode(Mode::BOARD).unwrap();
    gpio.setup(vec![3], Direction::OUT, Some(Level::LOW)).unwrap();
    assert_eq!(read_value(root.path(), 2), "0");

    gpio.output(vec![3], vec![Level::HIGH]).unwrap();
    assert_eq!(gpio.input(3).unwrap(), Level::HIGH);

    gpio.cleanup(None).unwrap();
    assert_eq!(gpio.getmode(), None);
}

#[test]
fn sysfs_rejects_misuse() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 0, &[5, 6]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 3 Model B");
    // no mode yet
    assert!(gpio.setup(vec![5], Direction::OUT, None).is_err());

    gpio.setmode(Mode::BCM).unwrap();
    assert!(gpio.setmode(Mode::BOARD).is_err());

    // not a header channel
    assert!(gpio.setup(vec![40], Direction::OUT, None).is_err());
    // not set up
    assert!(gpio.output(vec![5], vec![Level::HIGH]).is_err());
    assert!(gpio.setup(vec![6], Direction::IN, Some(Level::HIGH)).is_err());

    gpio.setup(vec![5, 6], Direction::OUT, None).unwrap();
    assert!(gpio.output(vec![5, 6], vec![Level::HIGH]).is_err());
    gpio.output(vec![5, 6], vec![Level::HIGH, Level::LOW]).unwrap();
    assert_eq!(read_value(root.path(), 6), "0");
}

#[test]
fn sysfs_export_times_out_without_kernel() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 0, &[]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 3 Model B");
    gpio.setmode(Mode::BCM).unwrap();
    assert!(gpio.setup(vec![17], Direction::OUT, None).is_err());

    let exported = fs::read_to_string(root.path().join("export")).unwrap();
    assert_eq!(exported, "17");
}

/// Fails the setup of one channel, leaving the others to the inner mock.
struct FailingSetupController {
    inner: MockController,
    fail_channel: u32,
}

impl PinController for FailingSetupController {
    fn setup_output(&mut self, channel: u32, initial: Level) -> Result<(), Error> {
        if channel == self.fail_channel {
            anyhow::bail!("cannot set up channel {}", channel);
        }
        self.inner.setup_output(channel, initial)
    }

    fn write(&mut self, channel: u32, level: Level) -> Result<(), Error> {
        self.inner.write(channel, level)
    }

    fn release(&mut self, channels: &[u32]) -> Result<(), Error> {
        self.inner.release(channels)
    }
}

#[test]
fn failed_configure_releases_channels_already_set_up() {
    let pins = SegmentPins::default();
    for (failing, fail_channel) in pins.channels().iter().enumerate() {
        let mut controller = FailingSetupController {
            inner: MockController::new(),
            fail_channel: *fail_channel,
        };
        {
            let mut driver = PinDriver::new(&mut controller, pins, Polarity::CommonAnode);
            assert!(driver.configure().is_err());
            assert!(!driver.is_configured());
        }

        for channel in pins.channels() {
            assert!(!controller.inner.is_configured(*channel), "failing {} channel {}", failing, channel);
        }
        let released = controller
            .inner
            .events
            .iter()
            .filter(|event| matches!(event, PinEvent::Release { .. }))
            .count();
        assert_eq!(released, failing);
    }
}

#[test]
fn sysfs_failed_configure_unexports_earlier_segments() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 0, &[5, 6, 13, 19, 26, 21]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 3 Model B");
    gpio.setmode(Mode::BCM).unwrap();

    // 99 is not a header channel
    let pins: SegmentPins = "5,6,13,19,26,21,99".parse().unwrap();
    let mut driver = PinDriver::new(gpio, pins, Polarity::CommonAnode);
    assert!(driver.configure().is_err());
    drop(driver);

    let unexported = fs::read_to_string(root.path().join("unexport")).unwrap();
    assert_eq!(unexported, "21");
}

#[test]
fn sysfs_failed_unexport_keeps_channel_set_up() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs(root.path(), 0, &[5]);

    let mut gpio = GPIO::with_sysfs_root(root.path(), "Raspberry Pi 3 Model B");
    gpio.setmode(Mode::BCM).unwrap();
    gpio.setup(vec![5], Direction::OUT, Some(Level::LOW)).unwrap();

    fs::remove_file(root.path().join("unexport")).unwrap();
    assert!(gpio.cleanup(Some(vec![5])).is_err());
    // still an output as far as this process knows
    gpio.output(vec![5], vec![Level::HIGH]).unwrap();

    fs::write(root.path().join("unexport"), "").unwrap();
    gpio.cleanup(Some(vec![5])).unwrap();
    assert!(gpio.output(vec![5], vec![Level::LOW]).is_err());
    assert_eq!(fs::read_to_string(root.path().join("unexport")).unwrap(), "5");
}
