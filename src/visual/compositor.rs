//! Drawing of bars, waterfall and overlays into a [`Frame`].
//!
//! The plot area is every row but the last, which holds the status line.
//! Heights are resolved to eighths of a cell with the Unicode lower block
//! elements.

use crate::render::{Cell, ColorSupport, Frame};
use crate::ui::{Controls, KEY_HELP};

use super::bars::BarState;
use super::colormap::{Colormap, Rgb};
use super::loudness::LoudnessStats;
use super::waterfall::Waterfall;
use super::DisplayMode;

/// Sub-cell steps per row.
pub const LEVELS_PER_CELL: usize = 8;

/// Bar fill by eighths, index 0 is empty.
pub const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Thin markers from the bottom eighth of a cell to the top one.
pub const PEAK_GLYPHS: [char; 8] = ['▁', '⎽', '⎼', '-', '─', '⎻', '⎺', '▔'];

/// Waterfall intensity without color.
pub const SHADE_GLYPHS: [char; 5] = [' ', '░', '▒', '▓', '█'];

pub const PEAK_COLOR: Rgb = Rgb::new(235, 235, 235);
pub const STATUS_COLOR: Rgb = Rgb::new(0, 200, 200);
pub const OVERLAY_COLOR: Rgb = Rgb::new(220, 220, 220);

/// Fill glyph index for `value` in plot row `row_from_bottom`.
pub fn bar_glyph_index(value: f32, plot_rows: usize, row_from_bottom: usize) -> usize {
    let eighths = value * (plot_rows * LEVELS_PER_CELL) as f32
        - (row_from_bottom * LEVELS_PER_CELL) as f32;
    eighths.floor().clamp(0.0, LEVELS_PER_CELL as f32) as usize
}

/// Row (from the bottom) and eighth within that row of a peak marker, or
/// `None` for a zero peak.
pub fn peak_position(peak: f32, plot_rows: usize) -> Option<(usize, usize)> {
    if plot_rows == 0 || peak <= 0.0 || peak.is_nan() {
        return None;
    }
    let eighths = (peak.min(1.0) * (plot_rows * LEVELS_PER_CELL) as f32).floor() as usize;
    let row = (eighths / LEVELS_PER_CELL).min(plot_rows - 1);
    let sub = (eighths - row * LEVELS_PER_CELL).min(LEVELS_PER_CELL - 1);
    Some((row, sub))
}

/// Everything the compositor reads for one frame.
pub struct Scene<'a> {
    pub bars: &'a [BarState],
    pub waterfall: &'a Waterfall,
    pub loudness: &'a LoudnessStats,
    pub controls: &'a Controls,
    pub color: ColorSupport,
    pub sample_rate: u32,
    pub fft_size: usize,
    pub source_name: &'a str,
}

impl Scene<'_> {
    fn tint(&self, rgb: Rgb) -> Option<Rgb> {
        self.color.has_color().then_some(rgb)
    }
}

/// Redraw `frame` from scratch.
pub fn compose(frame: &mut Frame, scene: &Scene<'_>) {
    frame.clear();
    if frame.height() == 0 || frame.width() == 0 {
        return;
    }
    let plot_rows = frame.height() as usize - 1;

    match scene.controls.mode {
        DisplayMode::Bars => draw_bars(frame, scene, plot_rows),
        DisplayMode::Waterfall => draw_waterfall(frame, scene, plot_rows),
    }
    draw_status(frame, scene);
    if scene.controls.show_stats {
        draw_stats(frame, scene);
    }
    if scene.controls.show_help {
        draw_help(frame, scene);
    }
}

fn draw_bars(frame: &mut Frame, scene: &Scene<'_>, plot_rows: usize) {
    let colormap = scene.controls.colormap;
    for (x, bar) in scene.bars.iter().enumerate().take(frame.width() as usize) {
        let x = x as u16;
        for row in 0..plot_rows {
            let index = bar_glyph_index(bar.value, plot_rows, row);
            if index == 0 {
                continue;
            }
            let t = (row as f32 + 0.5) / plot_rows as f32;
            let y = (plot_rows - 1 - row) as u16;
            frame.set(x, y, Cell::new(BAR_GLYPHS[index], scene.tint(colormap.color_for(t))));
        }

        if let Some((row, sub)) = peak_position(bar.peak, plot_rows) {
            // Only in a cell the bar fill does not reach.
            if bar_glyph_index(bar.value, plot_rows, row) == 0 {
                let y = (plot_rows - 1 - row) as u16;
                frame.set(x, y, Cell::new(PEAK_GLYPHS[sub], scene.tint(PEAK_COLOR)));
            }
        }
    }
}

fn draw_waterfall(frame: &mut Frame, scene: &Scene<'_>, plot_rows: usize) {
    let colormap: Colormap = scene.controls.colormap;
    for age in 0..plot_rows {
        let Some(values) = scene.waterfall.row(age) else {
            break;
        };
        let y = (plot_rows - 1 - age) as u16;
        for (x, &value) in values.iter().enumerate().take(frame.width() as usize) {
            let cell = if scene.color.has_color() {
                Cell::new('█', Some(colormap.color_for(value)))
            } else {
                let steps = (SHADE_GLYPHS.len() - 1) as f32;
                let level = (value.clamp(0.0, 1.0) * steps).round() as usize;
                Cell::new(SHADE_GLYPHS[level], None)
            };
            frame.set(x as u16, y, cell);
        }
    }
}

pub fn status_line(scene: &Scene<'_>) -> String {
    let controls = scene.controls;
    let mode = match controls.mode {
        DisplayMode::Bars => "bars",
        DisplayMode::Waterfall => "waterfall",
    };
    format!(
        " {} | smooth {:.0}% | gain {:.1}x | hold {:.2}s | {} | ? help | q quit",
        mode,
        controls.smoothing * 100.0,
        controls.gain,
        controls.hold_seconds,
        controls.colormap.name(),
    )
}

fn draw_status(frame: &mut Frame, scene: &Scene<'_>) {
    let y = frame.height() - 1;
    frame.put_str(0, y, &status_line(scene), scene.tint(STATUS_COLOR));
}

/// Write `lines` as a blank-backed box at `(x, y)`, clipped to the plot area.
fn draw_box(frame: &mut Frame, x: u16, y: u16, lines: &[String], fg: Option<Rgb>) {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let last_plot_row = frame.height().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let row = y.saturating_add(i as u16);
        if row >= last_plot_row {
            break;
        }
        frame.put_str(x, row, &format!("{:<width$}", line, width = width), fg);
    }
}

pub fn stats_lines(scene: &Scene<'_>) -> Vec<String> {
    let [rms_left, rms_right] = scene.loudness.rms_dbfs();
    vec![
        format!(" source {} ", scene.source_name),
        format!(" peak   {:7.1} dBFS ", scene.loudness.peak_dbfs()),
        format!(" rms L  {:7.1} dBFS ", rms_left),
        format!(" rms R  {:7.1} dBFS ", rms_right),
        format!(" {} Hz, {}-point FFT ", scene.sample_rate, scene.fft_size),
    ]
}

fn draw_stats(frame: &mut Frame, scene: &Scene<'_>) {
    draw_box(frame, 0, 0, &stats_lines(scene), scene.tint(OVERLAY_COLOR));
}

fn draw_help(frame: &mut Frame, scene: &Scene<'_>) {
    let mut lines = vec![" keys ".to_string()];
    lines.extend(KEY_HELP.iter().map(|(keys, action)| format!(" {:<8} {} ", keys, action)));

    let box_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
    let x = frame.width().saturating_sub(box_width) / 2;
    let y = frame.height().saturating_sub(1).saturating_sub(lines.len() as u16) / 2;
    draw_box(frame, x, y, &lines, scene.tint(OVERLAY_COLOR));
}
