//! `superled-emulator`: a pretend matrix that listens on TCP and draws the
//! frames it receives in the terminal.

use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use superled::emulator::{DeviceEvent, Emulator};
use superled::TerminalPreview;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "superled-emulator", version, about = "Emulate a networked LED matrix")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:2208")]
    listen: String,

    /// Serve a single session, then exit
    #[arg(long)]
    once: bool,

    /// Log events instead of drawing frames
    #[arg(long)]
    headless: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "emulator failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> superled::Result<()> {
    let emulator = Emulator::bind(&cli.listen)?;
    // Leave room for the log lines above the matrix
    let mut preview = TerminalPreview::new(io::stdout()).at(0, 2);

    loop {
        let mut drawn = 0u64;
        let served = emulator.serve_one(|event| match event {
            DeviceEvent::Frame(frame) if !cli.headless => {
                if let Err(e) = preview.draw(&frame) {
                    warn!(error = %e, "could not draw frame");
                }
                drawn += 1;
            }
            DeviceEvent::Frame(_) => debug!("frame received"),
            other => info!(?other, "device event"),
        });

        match served {
            Ok(stats) => info!(frames = stats.frames, effects = stats.effects, drawn, "session ended"),
            Err(e) if cli.once => return Err(e),
            // A misbehaving host ends its session, not the emulator
            Err(e) => warn!(error = %e, "session aborted"),
        }

        if cli.once {
            io::stdout().flush()?;
            return Ok(());
        }
    }
}
