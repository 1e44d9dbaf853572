//! `superled`: drive a 16x16 LED matrix from the command line.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use superled::{Config, Display, ImageOptions, LinkKind, Rgb, ScrollSpeed};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "superled", version, about = "Drive a 16x16 RGB LED matrix")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(flatten)]
    link: LinkArgs,

    /// Stop long-running commands after this many seconds
    #[arg(long, global = true)]
    seconds: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct LinkArgs {
    /// Serial port of an Arduino matrix
    #[arg(long, conflicts_with_all = ["tcp", "preview"])]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, requires = "serial")]
    baud: Option<u32>,

    /// `host:port` of a networked matrix or the emulator
    #[arg(long, conflicts_with = "preview")]
    tcp: Option<String>,

    /// Draw in this terminal instead of on a device
    #[arg(long)]
    preview: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scroll a message
    Text {
        message: String,
        /// Text color as `R,G,B` or `#rrggbb`
        #[arg(long, default_value = "255,255,255")]
        color: Rgb,
        /// 1 (slowest) to 10 (fastest)
        #[arg(long)]
        speed: Option<u8>,
        /// Step whole pixels only
        #[arg(long)]
        no_antialias: bool,
    },
    /// Show 16x16 images or animated GIFs
    Image {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Loop until stopped
        #[arg(long)]
        repeat: bool,
        /// Device brightness to set first
        #[arg(long)]
        brightness: Option<u8>,
    },
    /// Show time and date
    Clock {
        #[arg(long, default_value = "255,255,255")]
        color: Rgb,
    },
    /// Set device brightness
    Brightness { level: u8 },
    /// Run the device self-test
    Selftest,
    /// Turn every LED off
    Blank,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "superled failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> superled::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_link_args(&mut config, cli.link);

    let mut display = Display::connect(&config)?;
    if let Some(seconds) = cli.seconds {
        let stop = display.stop_token();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop.cancel();
        });
    }

    let outcome = match cli.command {
        Command::Text {
            message,
            color,
            speed,
            no_antialias,
        } => {
            if let Some(speed) = speed {
                display.set_scroll_speed(ScrollSpeed::new(speed)?);
            }
            if no_antialias {
                display.set_antialias(false);
            }
            display.scroll_text(&message, color)
        }
        Command::Image {
            paths,
            repeat,
            brightness,
        } => {
            let options = ImageOptions { brightness, repeat };
            let shown = if let [path] = paths.as_slice() {
                display.show_image(path, options)
            } else {
                display.show_images(&paths, options)
            };
            // Keep the last frame up; shutdown blanks the matrix
            let stop = display.stop_token();
            while shown.is_ok() && stop.sleep(Duration::from_millis(250)) {}
            shown
        }
        Command::Clock { color } => display.run_clock(color),
        Command::Brightness { level } => display.set_brightness(level),
        Command::Selftest => display.self_test(),
        Command::Blank => display.blank(),
    };

    // The transmit loop's own error explains a stopped producer better
    let stats = display.shutdown()?;
    info!(frames = stats.frames, effects = stats.effects, "done");
    outcome
}

fn apply_link_args(config: &mut Config, args: LinkArgs) {
    let link = &mut config.link;
    if let Some(port) = args.serial {
        link.kind = LinkKind::Serial;
        link.port = port;
    }
    if let Some(baud) = args.baud {
        link.baud = baud;
    }
    if let Some(address) = args.tcp {
        link.kind = LinkKind::Tcp;
        link.address = address;
    }
    if args.preview {
        link.kind = LinkKind::Preview;
    }
}
