use std::sync::Arc;

use log::debug;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::SMOOTHING_MAX;
use crate::error::AnalyzerError;

pub const MIN_FFT_SIZE: usize = 16;
pub const MAX_FFT_SIZE: usize = 16384;

/// Lower edge of the displayed dB range; maps to 0.0.
pub const DB_FLOOR: f32 = -80.0;
const MAGNITUDE_EPSILON: f32 = 1e-10;

/// Real-input forward DFT of a fixed size.
///
/// `forward` reads exactly `len()` real samples and writes the first
/// `len() / 2` complex bins (DC up to, but excluding, Nyquist).
pub trait RealTransform: Send {
    fn len(&self) -> usize;

    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]);
}

/// [`RealTransform`] backed by a rustfft complex plan.
pub struct RustFftTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Result<Self, AnalyzerError> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size)?;
        buffer.resize(size, Complex::new(0.0, 0.0));

        let mut scratch = Vec::new();
        scratch.try_reserve_exact(fft.get_inplace_scratch_len())?;
        scratch.resize(fft.get_inplace_scratch_len(), Complex::new(0.0, 0.0));

        Ok(Self {
            fft,
            buffer,
            scratch,
        })
    }
}

impl RealTransform for RustFftTransform {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]) {
        for (slot, &x) in self.buffer.iter_mut().zip(input) {
            *slot = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let bins = output.len().min(self.buffer.len() / 2);
        output[..bins].copy_from_slice(&self.buffer[..bins]);
    }
}

/// Normalized and smoothed magnitude spectrum, `fft_size / 2` bins each.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    /// This tick's magnitude in dB, mapped from [-80, 0] to [0, 1].
    pub magnitudes: Vec<f32>,
    /// Exponentially smoothed `magnitudes`.
    pub smoothed: Vec<f32>,
}

/// Windowing, transform, dB normalization and temporal smoothing.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    transform: Box<dyn RealTransform>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    window: Vec<f32>,
    frame: SpectrumFrame,
    smoothing: f32,
}

impl SpectrumAnalyzer {
    /// Analyzer using the rustfft transform.
    pub fn new(fft_size: usize) -> Result<Self, AnalyzerError> {
        Self::validate(fft_size)?;
        let transform = RustFftTransform::new(fft_size)?;
        Self::with_transform(Box::new(transform))
    }

    /// Analyzer around an injected transform; its length sets N.
    pub fn with_transform(transform: Box<dyn RealTransform>) -> Result<Self, AnalyzerError> {
        let fft_size = transform.len();
        Self::validate(fft_size)?;
        let bins = fft_size / 2;

        let input = zeroed(fft_size, 0.0f32)?;
        let output = zeroed(bins, Complex::new(0.0f32, 0.0))?;
        let magnitudes = zeroed(bins, 0.0f32)?;
        let smoothed = zeroed(bins, 0.0f32)?;
        let mut window = Vec::new();
        window.try_reserve_exact(fft_size)?;

        debug!("Spectrum analyzer ready: {} point FFT, {} bins", fft_size, bins);

        Ok(Self {
            fft_size,
            transform,
            input,
            output,
            window,
            frame: SpectrumFrame {
                magnitudes,
                smoothed,
            },
            smoothing: 0.8,
        })
    }

    fn validate(fft_size: usize) -> Result<(), AnalyzerError> {
        if fft_size.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            Ok(())
        } else {
            Err(AnalyzerError::InvalidSize(fft_size))
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Set the smoothing coefficient for subsequent calls, clamped to [0, 0.99].
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, SMOOTHING_MAX)
        } else {
            0.0
        };
    }

    pub fn frame(&self) -> &SpectrumFrame {
        &self.frame
    }

    /// Analyze the valid samples of one window.
    ///
    /// Up to `fft_size` samples are used (the newest ones if more are given);
    /// shorter input is zero-padded on the left.
    pub fn process(&mut self, samples: &[f32]) -> &SpectrumFrame {
        let valid = samples.len().min(self.fft_size);
        let samples = &samples[samples.len() - valid..];
        let offset = self.fft_size - valid;

        self.input[..offset].fill(0.0);
        self.ensure_window(valid);
        if valid > 1 {
            for ((dst, &x), &w) in self.input[offset..]
                .iter_mut()
                .zip(samples)
                .zip(&self.window)
            {
                *dst = finite(x) * w;
            }
        } else {
            for (dst, &x) in self.input[offset..].iter_mut().zip(samples) {
                *dst = finite(x);
            }
        }

        self.transform.forward(&self.input, &mut self.output);

        let scale = self.fft_size as f32;
        let alpha = self.smoothing;
        for ((bin, magnitude), smoothed) in self
            .output
            .iter()
            .zip(self.frame.magnitudes.iter_mut())
            .zip(self.frame.smoothed.iter_mut())
        {
            let mag = bin.norm() / scale;
            let db = 20.0 * (mag + MAGNITUDE_EPSILON).log10();
            let normalized = ((db - DB_FLOOR) / -DB_FLOOR).clamp(0.0, 1.0);
            let normalized = if normalized.is_nan() { 0.0 } else { normalized };

            *magnitude = normalized;
            *smoothed = alpha * *smoothed + (1.0 - alpha) * normalized;
        }

        &self.frame
    }

    /// Hann coefficients for `valid` samples, recomputed only when the valid
    /// length changes.
    fn ensure_window(&mut self, valid: usize) {
        if self.window.len() == valid || valid <= 1 {
            return;
        }
        let denom = (valid - 1) as f32;
        self.window.clear();
        self.window.extend((0..valid).map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
            0.5 * (1.0 - phase.cos())
        }));
    }
}

fn zeroed<T: Clone>(len: usize, value: T) -> Result<Vec<T>, AnalyzerError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

#[inline]
fn finite(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert!(matches!(
            SpectrumAnalyzer::new(1000),
            Err(AnalyzerError::InvalidSize(1000))
        ));
        assert!(SpectrumAnalyzer::new(8).is_err());
        assert!(SpectrumAnalyzer::new(32768).is_err());
        assert!(SpectrumAnalyzer::new(2048).is_ok());
    }

    #[test]
    fn test_zero_window_yields_zero_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new(256).unwrap();
        analyzer.set_smoothing(0.5);
        let frame = analyzer.process(&[0.0; 256]);
        assert_eq!(frame.magnitudes.len(), 128);
        assert!(frame.magnitudes.iter().all(|&m| m == 0.0));
        assert!(frame.smoothed.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_smoothed_decays_toward_zero_on_silence() {
        let mut analyzer = SpectrumAnalyzer::new(256).unwrap();
        analyzer.set_smoothing(0.5);
        analyzer.process(&sine(1000.0, 8000.0, 256));
        let before: f32 = analyzer.frame().smoothed.iter().sum();
        assert!(before > 0.0);

        analyzer.process(&[0.0; 256]);
        let after: f32 = analyzer.frame().smoothed.iter().sum();
        assert!((after - before * 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_zero_smoothing_passes_through() {
        let mut analyzer = SpectrumAnalyzer::new(512).unwrap();
        analyzer.set_smoothing(0.0);
        analyzer.process(&sine(300.0, 8000.0, 512));
        analyzer.process(&sine(2500.0, 8000.0, 512));
        let frame = analyzer.frame();
        assert_eq!(frame.magnitudes, frame.smoothed);
    }

    #[test]
    fn test_heavy_smoothing_moves_at_most_one_percent() {
        let mut analyzer = SpectrumAnalyzer::new(512).unwrap();
        analyzer.set_smoothing(1.5);
        assert_eq!(analyzer.smoothing(), 0.99);

        let frame = analyzer.process(&sine(1200.0, 8000.0, 512));
        for (&target, &smoothed) in frame.magnitudes.iter().zip(&frame.smoothed) {
            assert!(smoothed <= target * 0.01 + 1e-6);
        }
    }

    #[test]
    fn test_set_smoothing_clamps_low_and_nan() {
        let mut analyzer = SpectrumAnalyzer::new(64).unwrap();
        analyzer.set_smoothing(-0.3);
        assert_eq!(analyzer.smoothing(), 0.0);
        analyzer.set_smoothing(f32::NAN);
        assert_eq!(analyzer.smoothing(), 0.0);
    }

    #[test]
    fn test_sine_440_peaks_near_bin_19() {
        let mut analyzer = SpectrumAnalyzer::new(2048).unwrap();
        analyzer.set_smoothing(0.0);
        let frame = analyzer.process(&sine(440.0, 48000.0, 2048));

        let (peak_bin, &peak) = frame
            .smoothed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!(peak_bin == 18 || peak_bin == 19, "peak at bin {peak_bin}");
        assert!(peak > 0.8);
        assert!(frame.smoothed[200..].iter().all(|&m| m < 0.05));
    }

    #[test]
    fn test_short_window_is_left_padded() {
        let mut analyzer = SpectrumAnalyzer::new(1024).unwrap();
        analyzer.set_smoothing(0.0);
        let frame = analyzer.process(&sine(440.0, 48000.0, 512));
        assert!(frame.magnitudes.iter().all(|m| (0.0..=1.0).contains(m)));
        assert!(frame.magnitudes[9] > frame.magnitudes[300]);
    }

    #[test]
    fn test_degenerate_windows_do_not_produce_nan() {
        let mut analyzer = SpectrumAnalyzer::new(64).unwrap();
        analyzer.set_smoothing(0.0);
        for input in [&[][..], &[0.7][..], &[f32::NAN, f32::INFINITY][..]] {
            let frame = analyzer.process(input);
            assert!(frame.smoothed.iter().all(|m| m.is_finite()));
        }
    }

    struct ImpulseTransform(usize);

    impl RealTransform for ImpulseTransform {
        fn len(&self) -> usize {
            self.0
        }

        fn forward(&mut self, _input: &[f32], output: &mut [Complex<f32>]) {
            output.fill(Complex::new(0.0, 0.0));
            output[3] = Complex::new(self.0 as f32, 0.0);
        }
    }

    #[test]
    fn test_injected_transform_drives_normalization() {
        let mut analyzer =
            SpectrumAnalyzer::with_transform(Box::new(ImpulseTransform(64))).unwrap();
        analyzer.set_smoothing(0.0);
        let frame = analyzer.process(&[0.0; 64]);
        assert!((frame.magnitudes[3] - 1.0).abs() < 1e-6);
        assert_eq!(frame.magnitudes[4], 0.0);
    }
}
