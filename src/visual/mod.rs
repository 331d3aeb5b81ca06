pub mod bars;
pub mod colormap;
pub mod compositor;
pub mod loudness;
pub mod waterfall;

pub use bars::{BarMapping, BarState};
pub use colormap::{Colormap, Rgb};
pub use compositor::Scene;
pub use loudness::LoudnessStats;
pub use waterfall::Waterfall;

use log::debug;

use crate::audio::SampleWindow;
use crate::config::Settings;
use crate::render::{ColorSupport, Frame};
use crate::ui::{Command, Controls};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Bars,
    Waterfall,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Bars => DisplayMode::Waterfall,
            DisplayMode::Waterfall => DisplayMode::Bars,
        }
    }
}

/// Everything between the smoothed spectrum and a composed frame.
///
/// Owns one [`BarState`] per terminal column, the bar-to-bin mapping, the
/// waterfall history (one row per plot row) and the loudness statistics.
/// Layout-dependent parts are rebuilt by [`VisualState::resize`] and
/// [`VisualState::set_sample_rate`].
pub struct VisualState {
    frame: Frame,
    bars: Vec<BarState>,
    mapping: BarMapping,
    waterfall: Waterfall,
    row_values: Vec<f32>,
    loudness: LoudnessStats,
    controls: Controls,
    color: ColorSupport,
    frame_rate: u32,
    fft_size: usize,
    sample_rate: u32,
    source_name: String,
}

impl VisualState {
    pub fn new(
        settings: &Settings,
        size: (u16, u16),
        sample_rate: u32,
        color: ColorSupport,
    ) -> Self {
        let (cols, rows) = size;
        let plot_rows = rows.saturating_sub(1) as usize;
        Self {
            frame: Frame::new(cols, rows),
            bars: vec![BarState::default(); cols as usize],
            mapping: BarMapping::new(cols as usize, sample_rate, settings.fft_size),
            waterfall: Waterfall::new(cols as usize, plot_rows),
            row_values: Vec::with_capacity(cols as usize),
            loudness: LoudnessStats::new(settings.frame_rate),
            controls: Controls::from_settings(settings),
            color,
            frame_rate: settings.frame_rate,
            fft_size: settings.fft_size,
            sample_rate,
            source_name: String::new(),
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Reallocate everything sized by the terminal. Bar and waterfall history
    /// starts over.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == (self.frame.width(), self.frame.height()) {
            return;
        }
        debug!("Visual layout {}x{}", cols, rows);
        self.frame = Frame::new(cols, rows);
        self.bars = vec![BarState::default(); cols as usize];
        self.mapping = BarMapping::new(cols as usize, self.sample_rate, self.fft_size);
        self.waterfall.resize(cols as usize, rows.saturating_sub(1) as usize);
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == self.sample_rate {
            return;
        }
        debug!("Sample rate changed {} -> {}", self.sample_rate, sample_rate);
        self.sample_rate = sample_rate;
        self.mapping = BarMapping::new(self.bars.len(), sample_rate, self.fft_size);
    }

    /// Feed one tick: the smoothed spectrum and the window it came from.
    pub fn update(&mut self, spectrum: &[f32], window: &SampleWindow) {
        if self.mapping.is_stale(self.bars.len(), self.sample_rate, self.fft_size) {
            self.mapping = BarMapping::new(self.bars.len(), self.sample_rate, self.fft_size);
        }

        let hold = bars::hold_frames(self.controls.hold_seconds, self.frame_rate);
        let gain = self.controls.gain;
        self.row_values.clear();
        for (bar, &bin) in self.bars.iter_mut().zip(self.mapping.bins()) {
            let value = spectrum.get(bin).copied().unwrap_or(0.0) * gain;
            bar.update(value, hold, bars::PEAK_DECAY_PER_FRAME);
            self.row_values.push(bar.value);
        }
        self.waterfall.push(&self.row_values);

        self.loudness.update(window.valid_left(), window.valid_right());
    }

    /// Apply a control command and return the smoothing the analyzer should use.
    pub fn apply(&mut self, command: Command) -> f32 {
        self.controls.apply(command);
        self.controls.smoothing
    }

    /// Compose the current state into the internal frame.
    pub fn compose(&mut self) -> &Frame {
        let scene = Scene {
            bars: &self.bars,
            waterfall: &self.waterfall,
            loudness: &self.loudness,
            controls: &self.controls,
            color: self.color,
            sample_rate: self.sample_rate,
            fft_size: self.fft_size,
            source_name: &self.source_name,
        };
        compositor::compose(&mut self.frame, &scene);
        &self.frame
    }

    pub fn size(&self) -> (u16, u16) {
        (self.frame.width(), self.frame.height())
    }

    pub fn bars(&self) -> &[BarState] {
        &self.bars
    }

    pub fn mapping(&self) -> &BarMapping {
        &self.mapping
    }

    pub fn waterfall(&self) -> &Waterfall {
        &self.waterfall
    }

    pub fn loudness(&self) -> &LoudnessStats {
        &self.loudness
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
