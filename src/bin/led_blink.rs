//! Blinks an LED wired to header pin 3 (BCM 2) every half second until Ctrl+C.

use anyhow::Result;
use clap::Parser;

use rpi_gpio_basics::{cli::seconds, init_logging, Blinker, CancelToken, Mode, GPIO};

#[derive(Parser)]
#[command(about = "Blink an LED until interrupted", long_about = None)]
struct Cli {
    /// Channel the LED is wired to
    #[arg(long, default_value_t = 3)]
    pin: u32,

    /// Pin numbering used by --pin, BOARD or BCM
    #[arg(long, default_value = "BOARD")]
    mode: Mode,

    /// Seconds the LED stays on, and off
    #[arg(long, default_value_t = 0.5)]
    delay: f64,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let half_period = seconds(cli.delay)?;

    let token = CancelToken::on_interrupt()?;

    let mut gpio = GPIO::new()?;
    gpio.setwarnings(false);
    gpio.setmode(cli.mode)?;

    log::info!("Blinking {} pin {}. Ctrl+C to exit.", cli.mode, cli.pin);
    Blinker::new(gpio, cli.pin)?.run(half_period, &token)
}
