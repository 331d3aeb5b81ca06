use log::debug;

use crate::config::{
    Settings, GAIN_MAX, GAIN_MIN, GAIN_STEP, HOLD_MAX_SECONDS, HOLD_STEP_SECONDS, SMOOTHING_MAX,
    SMOOTHING_STEP,
};
use crate::visual::{Colormap, DisplayMode};

/// Semantic keyboard commands, independent of the key that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    SmoothingUp,
    SmoothingDown,
    GainUp,
    GainDown,
    HoldUp,
    HoldDown,
    CycleColormap,
    ToggleWaterfall,
    ToggleStats,
    ToggleHelp,
}

/// One event from the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Command(Command),
    Resize { cols: u16, rows: u16 },
}

/// Key bindings shown by the help overlay.
pub const KEY_HELP: &[(&str, &str)] = &[
    ("q / Esc", "quit"),
    ("+ / -", "smoothing up / down"),
    ("] / [", "gain up / down"),
    (". / ,", "peak hold up / down"),
    ("c", "cycle colormap"),
    ("w", "toggle waterfall"),
    ("s", "toggle stats"),
    ("? / h", "toggle help"),
];

/// Runtime-adjustable display parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub smoothing: f32,
    pub gain: f32,
    pub hold_seconds: f32,
    pub colormap: Colormap,
    pub mode: DisplayMode,
    pub show_stats: bool,
    pub show_help: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Controls {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            smoothing: settings.smoothing.clamp(0.0, SMOOTHING_MAX),
            gain: settings.gain.clamp(GAIN_MIN, GAIN_MAX),
            hold_seconds: settings.hold_seconds.clamp(0.0, HOLD_MAX_SECONDS),
            colormap: settings.colormap,
            mode: if settings.waterfall {
                DisplayMode::Waterfall
            } else {
                DisplayMode::Bars
            },
            show_stats: false,
            show_help: false,
        }
    }

    /// Apply a command. `Quit` is not a control change and is ignored here.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Quit => {}
            Command::SmoothingUp => {
                self.smoothing = step(self.smoothing, SMOOTHING_STEP, 0.0, SMOOTHING_MAX)
            }
            Command::SmoothingDown => {
                self.smoothing = step(self.smoothing, -SMOOTHING_STEP, 0.0, SMOOTHING_MAX)
            }
            Command::GainUp => self.gain = step(self.gain, GAIN_STEP, GAIN_MIN, GAIN_MAX),
            Command::GainDown => self.gain = step(self.gain, -GAIN_STEP, GAIN_MIN, GAIN_MAX),
            Command::HoldUp => {
                self.hold_seconds =
                    step(self.hold_seconds, HOLD_STEP_SECONDS, 0.0, HOLD_MAX_SECONDS)
            }
            Command::HoldDown => {
                self.hold_seconds =
                    step(self.hold_seconds, -HOLD_STEP_SECONDS, 0.0, HOLD_MAX_SECONDS)
            }
            Command::CycleColormap => self.colormap = self.colormap.next(),
            Command::ToggleWaterfall => self.mode = self.mode.toggled(),
            Command::ToggleStats => self.show_stats = !self.show_stats,
            Command::ToggleHelp => self.show_help = !self.show_help,
        }
        debug!("Controls after {:?}: {:?}", command, self);
    }
}

/// Add `delta` and clamp, rounding to hundredths so repeated steps land on
/// exact values.
fn step(value: f32, delta: f32, min: f32, max: f32) -> f32 {
    (((value + delta) * 100.0).round() / 100.0).clamp(min, max)
}
