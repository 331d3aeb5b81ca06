//! Bar layout and per-bar peak tracking.

/// Lowest frequency shown by the leftmost bar.
pub const MIN_FREQUENCY_HZ: f32 = 20.0;

/// Peak fall per frame once its hold has expired.
pub const PEAK_DECAY_PER_FRAME: f32 = 1.0 / 60.0;

/// Spectrum bin index for each bar on an octave-equalized frequency axis.
///
/// Bar `b` of `B` sits at `20 Hz * (nyquist / 20 Hz)^(b / (B - 1))`. Bins are
/// clamped to `[1, N/2 - 1]` so the DC term never shows. Adjacent bars may
/// share a bin at the low end.
#[derive(Debug, Clone, PartialEq)]
pub struct BarMapping {
    bins: Vec<usize>,
    sample_rate: u32,
    fft_size: usize,
}

impl BarMapping {
    pub fn new(bar_count: usize, sample_rate: u32, fft_size: usize) -> Self {
        let bins = (0..bar_count)
            .map(|bar| bin_for_bar(bar, bar_count, sample_rate, fft_size))
            .collect();
        Self {
            bins,
            sample_rate,
            fft_size,
        }
    }

    /// Whether this mapping must be rebuilt for the given layout.
    pub fn is_stale(&self, bar_count: usize, sample_rate: u32, fft_size: usize) -> bool {
        self.bins.len() != bar_count || self.sample_rate != sample_rate || self.fft_size != fft_size
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

pub fn bin_for_bar(bar: usize, bar_count: usize, sample_rate: u32, fft_size: usize) -> usize {
    let max_bin = (fft_size / 2).saturating_sub(1).max(1);
    if sample_rate == 0 || fft_size == 0 {
        return 1;
    }

    let max_frequency = (sample_rate as f32 / 2.0).max(MIN_FREQUENCY_HZ);
    let position = if bar_count > 1 {
        bar as f32 / (bar_count - 1) as f32
    } else {
        0.0
    };
    let frequency = MIN_FREQUENCY_HZ * (max_frequency / MIN_FREQUENCY_HZ).powf(position);
    let bin_width = sample_rate as f32 / fft_size as f32;

    ((frequency / bin_width).round() as usize).clamp(1, max_bin)
}

/// Displayed value and peak marker of one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BarState {
    /// Current value after gain, in [0, 1].
    pub value: f32,
    /// Peak marker, never below `value`.
    pub peak: f32,
    /// Frames left before the peak starts to fall.
    pub hold: u32,
}

impl BarState {
    pub fn update(&mut self, value: f32, hold_frames: u32, decay: f32) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.value = value;

        if value >= self.peak {
            self.peak = value;
            self.hold = hold_frames;
        } else if self.hold > 0 {
            self.hold -= 1;
        } else {
            self.peak = (self.peak - decay).max(value);
        }
    }
}

/// Frames to hold a peak for `seconds` at `frame_rate`.
pub fn hold_frames(seconds: f32, frame_rate: u32) -> u32 {
    (seconds.max(0.0) * frame_rate as f32).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_monotonic() {
        let layouts = [
            (80, 48000, 2048),
            (7, 44100, 512),
            (300, 8000, 4096),
            (1, 48000, 2048),
        ];
        for &(bars, rate, size) in &layouts {
            let mapping = BarMapping::new(bars, rate, size);
            assert_eq!(mapping.len(), bars);
            assert!(mapping.bins().windows(2).all(|w| w[0] <= w[1]));
            assert!(mapping.bins().iter().all(|&bin| bin >= 1 && bin < size / 2));
        }
    }

    #[test]
    fn test_mapping_endpoints() {
        let mapping = BarMapping::new(80, 48000, 2048);
        // 20 Hz rounds to bin 1 at 23.4 Hz per bin; nyquist clamps to the last bin.
        assert_eq!(mapping.bins()[0], 1);
        assert_eq!(mapping.bins()[79], 1023);
    }

    #[test]
    fn test_low_bars_may_share_bins() {
        let mapping = BarMapping::new(200, 48000, 1024);
        assert!(mapping.bins().windows(2).any(|w| w[0] == w[1]));
    }

    #[test]
    fn test_degenerate_layouts() {
        assert!(BarMapping::new(0, 48000, 2048).is_empty());
        assert_eq!(bin_for_bar(0, 1, 48000, 2048), 1);
        assert_eq!(bin_for_bar(3, 10, 0, 2048), 1);
    }

    #[test]
    fn test_staleness() {
        let mapping = BarMapping::new(40, 48000, 2048);
        assert!(!mapping.is_stale(40, 48000, 2048));
        assert!(mapping.is_stale(80, 48000, 2048));
        assert!(mapping.is_stale(40, 44100, 2048));
    }

    #[test]
    fn test_peak_latches_and_holds() {
        let mut bar = BarState::default();
        bar.update(0.8, 3, 0.1);
        assert_eq!((bar.peak, bar.hold), (0.8, 3));

        for expected_hold in [2, 1, 0] {
            bar.update(0.2, 3, 0.1);
            assert_eq!(bar.peak, 0.8);
            assert_eq!(bar.hold, expected_hold);
        }

        bar.update(0.2, 3, 0.1);
        assert!((bar.peak - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_peak_never_below_value() {
        let mut bar = BarState::default();
        let values = [0.9, 0.1, 0.5, 0.85, 0.3, 0.0, 1.0, 0.95, 0.2];
        let mut previous_peak = 0.0;
        for _ in 0..20 {
            for &v in &values {
                let held = bar.hold;
                bar.update(v, 2, 0.25);
                assert!(bar.peak >= bar.value);
                if bar.peak < previous_peak {
                    assert_eq!(held, 0, "peak fell while hold was active");
                }
                previous_peak = bar.peak;
            }
        }
    }

    #[test]
    fn test_decay_stops_at_current_value() {
        let mut bar = BarState::default();
        bar.update(1.0, 0, 0.3);
        bar.update(0.9, 0, 0.3);
        assert_eq!(bar.peak, 0.9);
        assert_eq!(bar.hold, 0);
    }

    #[test]
    fn test_hold_frames_rounding() {
        assert_eq!(hold_frames(1.0, 60), 60);
        assert_eq!(hold_frames(0.25, 60), 15);
        assert_eq!(hold_frames(-1.0, 60), 0);
    }
}
