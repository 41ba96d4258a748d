//! Alternates between 1 and 2 on a common-anode 7-segment display until Ctrl+C.

use anyhow::Result;
use clap::Parser;

use rpi_gpio_basics::{cli::DisplayArgs, init_logging, CancelToken};

#[derive(Parser)]
#[command(about = "Alternate 1 and 2 on a 7-segment display", long_about = None)]
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

    log::info!("Showing 1 and 2, switching every {:?}. Ctrl+C to exit.", delay);
    let shown = renderer.alternate(&[1, 2], delay, &token);
    shown.and(renderer.release())
}
