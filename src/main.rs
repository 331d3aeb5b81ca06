use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use tspec::audio::{AudioSource, CpalSource, SpectrumAnalyzer, WavFileSource};
use tspec::render::{RenderSurface, TerminalSurface};
use tspec::visual::Colormap;
use tspec::{ExitReason, FrameScheduler, Settings, StreamError};

#[derive(Parser)]
#[command(name = "tspec")]
#[command(about = "Real-time audio spectrum visualizer for the terminal")]
struct Args {
    /// Capture from the input device whose name contains this text
    #[arg(short, long)]
    device: Option<String>,

    /// Play a WAV file through the visualizer instead of capturing
    #[arg(short, long, conflicts_with = "device")]
    file: Option<PathBuf>,

    /// Analysis window length (power of two, 16 to 16384)
    #[arg(long, default_value_t = tspec::config::DEFAULT_FFT_SIZE)]
    fft_size: usize,

    /// Target frames per second
    #[arg(long, default_value_t = tspec::config::DEFAULT_FRAME_RATE)]
    fps: u32,

    /// Initial smoothing, 0.0 (none) to 0.99 (heavy)
    #[arg(long, default_value_t = 0.8)]
    smoothing: f32,

    /// Initial bar gain, 0.1 to 5.0
    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Initial peak hold in seconds, 0 to 5
    #[arg(long, default_value_t = 1.0)]
    hold: f32,

    #[arg(long, value_enum, default_value_t = Colormap::Classic)]
    colormap: Colormap,

    /// Start in waterfall mode
    #[arg(long)]
    waterfall: bool,

    /// Write logs to this file (the terminal is busy drawing)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            fft_size: self.fft_size,
            frame_rate: self.fps,
            smoothing: self.smoothing,
            gain: self.gain,
            hold_seconds: self.hold,
            colormap: self.colormap,
            waterfall: self.waterfall,
        }
        .clamped()
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let mut builder =
                env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            builder
        }
        // Without a file only an explicit RUST_LOG writes to stderr.
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")),
    };
    builder.init();
    Ok(())
}

fn open_source(args: &Args, settings: &Settings) -> Result<Box<dyn AudioSource>> {
    let capacity = settings.capture_capacity();
    let source: Box<dyn AudioSource> = match &args.file {
        Some(path) => Box::new(
            WavFileSource::open(path, capacity)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(
            CpalSource::open("tspec", args.device.as_deref(), capacity)
                .context("Failed to start audio capture (is an input device available?)")?,
        ),
    };
    info!("Audio source: {} at {} Hz", source.name(), source.sample_rate());
    Ok(source)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let settings = args.settings();
    info!("Starting tspec with {:?}", settings);

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("Failed to install signal handler")?;

    // Acquired in this order; an early return drops whatever exists in reverse.
    let source = open_source(&args, &settings)?;
    let analyzer = SpectrumAnalyzer::new(settings.fft_size).context("Failed to create analyzer")?;
    let surface = TerminalSurface::init().context("Failed to set up the terminal")?;
    info!("Terminal {:?}, color {:?}", surface.size(), surface.color_support());

    let scheduler = FrameScheduler::new(source, analyzer, surface, &settings, running);
    match scheduler.run()? {
        ExitReason::Quit | ExitReason::Interrupted | ExitReason::Stream(StreamError::Ended) => {}
        ExitReason::Stream(error) => {
            warn!("Stopped: {}", error);
            eprintln!("tspec: {}", error);
        }
    }
    Ok(())
}
