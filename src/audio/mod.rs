pub mod capture;
pub mod fft;
pub mod playback;
pub mod processor;

pub use capture::{CaptureBuffer, CaptureReader, CaptureWriter};
pub use fft::{RealTransform, RustFftTransform, SpectrumAnalyzer, SpectrumFrame};
pub use playback::WavFileSource;
pub use processor::CpalSource;

use crate::error::StreamError;

/// A per-tick snapshot of the most recent frames, one buffer per channel.
///
/// Mono sources fill both channels with the same samples. Only the trailing
/// `valid` frames were actually produced; the rest are zero padding.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    left: Vec<f32>,
    right: Vec<f32>,
    valid: usize,
}

impl SampleWindow {
    pub fn new(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
            valid: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// The produced part of the left channel, oldest first.
    pub fn valid_left(&self) -> &[f32] {
        &self.left[self.len() - self.valid..]
    }

    /// The produced part of the right channel, oldest first.
    pub fn valid_right(&self) -> &[f32] {
        &self.right[self.len() - self.valid..]
    }

    /// Average both channels of the produced portion into `out`, returning the
    /// mixed slice.
    pub fn mix_valid<'a>(&self, out: &'a mut Vec<f32>) -> &'a [f32] {
        out.clear();
        out.extend(
            self.valid_left()
                .iter()
                .zip(self.valid_right())
                .map(|(l, r)| (l + r) * 0.5),
        );
        out.as_slice()
    }

    pub(crate) fn channels_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.left, &mut self.right)
    }

    pub(crate) fn set_valid(&mut self, valid: usize) {
        self.valid = valid.min(self.len());
    }
}

/// The audio producer side of the pipeline, as seen by the render loop.
///
/// Implementations own a [`CaptureWriter`] driven by some backend thread and
/// hand out reads of the shared ring. Every method must be safe to call before
/// any audio has arrived; reads then return zero-filled windows.
pub trait AudioSource {
    /// Human readable name of the connected stream.
    fn name(&self) -> &str;

    fn sample_rate(&self) -> u32;

    /// Copy the latest `window.len()` frames into `window` and return how many
    /// of them were actually produced.
    fn latest_samples(&self, window: &mut SampleWindow) -> usize;

    /// Non-blocking check for an asynchronous stream failure or end of stream.
    fn poll_stream_error(&mut self) -> Option<StreamError>;

    /// Stop the producer. Idempotent; also invoked on drop.
    fn shutdown(&mut self);
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn latest_samples(&self, window: &mut SampleWindow) -> usize {
        (**self).latest_samples(window)
    }

    fn poll_stream_error(&mut self) -> Option<StreamError> {
        (**self).poll_stream_error()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
