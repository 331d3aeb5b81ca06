use std::time::Duration;

use crate::visual::Colormap;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_FRAME_RATE: u32 = 60;

pub const SMOOTHING_MAX: f32 = 0.99;
pub const SMOOTHING_STEP: f32 = 0.05;

pub const GAIN_MIN: f32 = 0.1;
pub const GAIN_MAX: f32 = 5.0;
pub const GAIN_STEP: f32 = 0.1;

pub const HOLD_MAX_SECONDS: f32 = 5.0;
pub const HOLD_STEP_SECONDS: f32 = 0.25;

/// Startup parameters for one visualizer session.
///
/// Built from the command line; nothing here is read from or written to disk.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Analysis window length N (power of two).
    pub fft_size: usize,
    /// Target frames per second of the render loop.
    pub frame_rate: u32,
    /// Initial smoothing coefficient, 0.0 = instant, 0.99 = heavy.
    pub smoothing: f32,
    /// Initial linear gain applied to bar values.
    pub gain: f32,
    /// Initial peak-hold duration in seconds.
    pub hold_seconds: f32,
    pub colormap: Colormap,
    /// Start in waterfall mode instead of bars.
    pub waterfall: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            frame_rate: DEFAULT_FRAME_RATE,
            smoothing: 0.8,
            gain: 1.0,
            hold_seconds: 1.0,
            colormap: Colormap::Classic,
            waterfall: false,
        }
    }
}

impl Settings {
    /// Clamp every adjustable value into its runtime range.
    pub fn clamped(mut self) -> Self {
        self.frame_rate = self.frame_rate.clamp(1, 240);
        self.smoothing = clamp_or(self.smoothing, 0.0, SMOOTHING_MAX, 0.8);
        self.gain = clamp_or(self.gain, GAIN_MIN, GAIN_MAX, 1.0);
        self.hold_seconds = clamp_or(self.hold_seconds, 0.0, HOLD_MAX_SECONDS, 1.0);
        self
    }

    /// Capture ring capacity: a power of two comfortably above the FFT window.
    pub fn capture_capacity(&self) -> usize {
        (self.fft_size.max(1) * 2).next_power_of_two()
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}
