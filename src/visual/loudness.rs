//! Rolling peak and RMS levels for the stats overlay.

/// Displayed levels below this are shown as the floor.
pub const DBFS_FLOOR: f32 = -120.0;

/// Peak window length in seconds.
pub const PEAK_WINDOW_SECONDS: f32 = 3.0;
/// RMS window length in seconds.
pub const RMS_WINDOW_SECONDS: f32 = 0.25;
/// Displayed values are recomputed every this many frames.
pub const DEFAULT_DECIMATION: u64 = 15;

/// Two circular per-frame accumulators with decimated readout.
///
/// The long window keeps each frame's maximum absolute sample, the short
/// window each frame's mean square per channel. Both are indexed by the frame
/// counter modulo their length.
#[derive(Debug, Clone)]
pub struct LoudnessStats {
    peaks: Vec<f32>,
    mean_squares: [Vec<f32>; 2],
    frame_counter: u64,
    decimation: u64,
    peak: f32,
    rms: [f32; 2],
}

impl LoudnessStats {
    pub fn new(frame_rate: u32) -> Self {
        let frames = |seconds: f32| ((seconds * frame_rate as f32).round() as usize).max(1);
        Self::with_windows(
            frames(PEAK_WINDOW_SECONDS),
            frames(RMS_WINDOW_SECONDS),
            DEFAULT_DECIMATION,
        )
    }

    pub fn with_windows(peak_frames: usize, rms_frames: usize, decimation: u64) -> Self {
        let rms_frames = rms_frames.max(1);
        Self {
            peaks: vec![0.0; peak_frames.max(1)],
            mean_squares: [vec![0.0; rms_frames], vec![0.0; rms_frames]],
            frame_counter: 0,
            decimation: decimation.max(1),
            peak: 0.0,
            rms: [0.0; 2],
        }
    }

    /// Record one frame's windows and refresh the readout on decimation ticks.
    pub fn update(&mut self, left: &[f32], right: &[f32]) {
        let frame_peak = left
            .iter()
            .chain(right)
            .filter(|s| s.is_finite())
            .fold(0.0f32, |max, &s| max.max(s.abs()));

        let peak_slot = (self.frame_counter % self.peaks.len() as u64) as usize;
        self.peaks[peak_slot] = frame_peak;

        let rms_slot = (self.frame_counter % self.mean_squares[0].len() as u64) as usize;
        for (window, samples) in self.mean_squares.iter_mut().zip([left, right]) {
            window[rms_slot] = mean_square(samples);
        }

        self.frame_counter += 1;
        if self.frame_counter % self.decimation == 0 {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.peak = self.peaks.iter().fold(0.0f32, |max, &p| max.max(p));
        for (rms, window) in self.rms.iter_mut().zip(&self.mean_squares) {
            let mean = window.iter().sum::<f32>() / window.len() as f32;
            *rms = mean.max(0.0).sqrt();
        }
    }

    /// Max absolute sample over the long window, as of the last readout.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Per-channel RMS over the short window, as of the last readout.
    pub fn rms(&self) -> [f32; 2] {
        self.rms
    }

    pub fn peak_dbfs(&self) -> f32 {
        to_dbfs(self.peak)
    }

    pub fn rms_dbfs(&self) -> [f32; 2] {
        [to_dbfs(self.rms[0]), to_dbfs(self.rms[1])]
    }
}

fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().filter(|s| s.is_finite()).map(|s| s * s).sum();
    sum / samples.len() as f32
}

pub fn to_dbfs(level: f32) -> f32 {
    if level > 0.0 && level.is_finite() {
        (20.0 * level.log10()).max(DBFS_FLOOR)
    } else {
        DBFS_FLOOR
    }
}
