//! Counts 0 to 9 on a common-anode 7-segment display, forever, until Ctrl+C.

use anyhow::Result;
use clap::Parser;

use rpi_gpio_basics::{cli::DisplayArgs, init_logging, CancelToken};

#[derive(Parser)]
#[command(about = "Count 0-9 on a 7-segment display", long_about = None)]
struct Cli {
    #[command(flatten)]
    display: DisplayArgs,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let delay = cli.display.delay()?;

    let token = CancelToken::on_interrupt()?;
    let mut renderer = cli.display.open()?;

    log::info!("Showing 0 to 9, switching every {:?}. Ctrl+C to exit.", delay);
    let shown = renderer.cycle(delay, &token);
    shown.and(renderer.release())
}
