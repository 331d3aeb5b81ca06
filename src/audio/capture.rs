//! Single-producer ring shared between the audio callback and the render loop.
//!
//! Samples are stored as `f32` bit patterns in `AtomicU32` slots, interleaved
//! with a stride equal to the channel count so both channels of a frame share
//! one write index. The producer publishes the frame counter with `Release`
//! after filling a block; the reader loads it with `Acquire` and copies the
//! newest frames backwards from it.
//!
//! There is no lock. If the producer laps the reader mid-copy, the oldest
//! samples of that read may come from the newer block. That bounded staleness
//! is accepted so the real-time callback can never be stalled by the renderer.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use super::SampleWindow;

struct Shared {
    slots: Box<[AtomicU32]>,
    channels: usize,
    mask: usize,
    /// Total frames ever written; the write index is `written & mask`.
    written: AtomicUsize,
}

/// Constructor namespace for the capture ring.
pub struct CaptureBuffer;

impl CaptureBuffer {
    /// Allocate a ring of at least `capacity` frames (rounded up to a power of
    /// two) with one or two channels.
    ///
    /// Returns the only writer handle and a reader that may be cloned freely.
    pub fn with_capacity(capacity: usize, channels: usize) -> (CaptureWriter, CaptureReader) {
        let capacity = capacity.max(1).next_power_of_two();
        let channels = channels.clamp(1, 2);
        let slots = (0..capacity * channels)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let shared = Arc::new(Shared {
            slots,
            channels,
            mask: capacity - 1,
            written: AtomicUsize::new(0),
        });

        (
            CaptureWriter {
                shared: Arc::clone(&shared),
            },
            CaptureReader { shared },
        )
    }
}

/// Producer handle. Not `Clone`: there is exactly one writer per ring.
pub struct CaptureWriter {
    shared: Arc<Shared>,
}

impl CaptureWriter {
    /// Append one frame. Missing channels repeat the first sample, extra
    /// channels are ignored.
    pub fn write(&self, frame: &[f32]) {
        let Some(&first) = frame.first() else {
            return;
        };
        let shared = &*self.shared;
        let index = shared.written.load(Ordering::Relaxed);
        let base = (index & shared.mask) * shared.channels;
        for channel in 0..shared.channels {
            let sample = frame.get(channel).copied().unwrap_or(first);
            shared.slots[base + channel].store(sample.to_bits(), Ordering::Relaxed);
        }
        shared.written.store(index.wrapping_add(1), Ordering::Release);
    }

    /// Append an interleaved block with `source_channels` samples per frame,
    /// converting each sample to `f32` and adapting the channel layout.
    ///
    /// The write index is published once, after the whole block is stored.
    pub fn write_interleaved<T, F>(&self, data: &[T], source_channels: usize, convert: F)
    where
        T: Copy,
        F: Fn(T) -> f32,
    {
        let source_channels = source_channels.max(1);
        let shared = &*self.shared;
        let mut index = shared.written.load(Ordering::Relaxed);

        for frame in data.chunks_exact(source_channels) {
            let base = (index & shared.mask) * shared.channels;
            match (shared.channels, source_channels) {
                (1, 1) => store(&shared.slots[base], convert(frame[0])),
                (1, _) => {
                    let sum: f32 = frame.iter().map(|&s| convert(s)).sum();
                    store(&shared.slots[base], sum / source_channels as f32);
                }
                (_, 1) => {
                    let sample = convert(frame[0]);
                    store(&shared.slots[base], sample);
                    store(&shared.slots[base + 1], sample);
                }
                _ => {
                    store(&shared.slots[base], convert(frame[0]));
                    store(&shared.slots[base + 1], convert(frame[1]));
                }
            }
            index = index.wrapping_add(1);
        }

        shared.written.store(index, Ordering::Release);
    }
}

#[inline]
fn store(slot: &AtomicU32, sample: f32) {
    let sample = if sample.is_finite() { sample } else { 0.0 };
    slot.store(sample.to_bits(), Ordering::Relaxed);
}

/// Consumer handle used by the render loop.
#[derive(Clone)]
pub struct CaptureReader {
    shared: Arc<Shared>,
}

impl CaptureReader {
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }

    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    /// Frames written since start (saturates only after `usize` wraps).
    pub fn frames_written(&self) -> usize {
        self.shared.written.load(Ordering::Acquire)
    }

    /// Copy the `window.len()` most recent frames into `window`, oldest first.
    ///
    /// Frames not yet produced, and any request beyond the ring capacity, are
    /// zero-filled at the front. Returns the number of valid trailing frames.
    /// Mono rings copy the single channel into both sides of the window.
    pub fn read_latest(&self, window: &mut SampleWindow) -> usize {
        let shared = &*self.shared;
        let end = shared.written.load(Ordering::Acquire);
        let n = window.len();
        let valid = n.min(end).min(self.capacity());
        let padding = n - valid;
        let start = end.wrapping_sub(valid);

        let (left, right) = window.channels_mut();
        left[..padding].fill(0.0);
        right[..padding].fill(0.0);

        for i in 0..valid {
            let base = (start.wrapping_add(i) & shared.mask) * shared.channels;
            let l = f32::from_bits(shared.slots[base].load(Ordering::Relaxed));
            let r = if shared.channels == 2 {
                f32::from_bits(shared.slots[base + 1].load(Ordering::Relaxed))
            } else {
                l
            };
            left[padding + i] = l;
            right[padding + i] = r;
        }

        window.set_valid(valid);
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let (_writer, reader) = CaptureBuffer::with_capacity(3000, 2);
        assert_eq!(reader.capacity(), 4096);
    }

    #[test]
    fn test_channel_count_is_clamped() {
        let (_writer, surround) = CaptureBuffer::with_capacity(8, 6);
        assert_eq!(surround.channels(), 2);
        let (_writer, silent) = CaptureBuffer::with_capacity(8, 0);
        assert_eq!(silent.channels(), 1);
    }

    #[test]
    fn test_read_before_any_write_is_zero() {
        let (_writer, reader) = CaptureBuffer::with_capacity(16, 1);
        let mut window = SampleWindow::new(8);
        assert_eq!(reader.read_latest(&mut window), 0);
        assert!(window.left().iter().all(|&s| s == 0.0));
        assert!(window.right().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_underfilled_read_is_front_zero_filled() {
        let (writer, reader) = CaptureBuffer::with_capacity(16, 1);
        for s in [1.0, 2.0, 3.0] {
            writer.write(&[s]);
        }

        let mut window = SampleWindow::new(5);
        assert_eq!(reader.read_latest(&mut window), 3);
        assert_eq!(window.left(), &[0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(window.valid_left(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_returns_last_n_in_write_order_after_wrap() {
        let (writer, reader) = CaptureBuffer::with_capacity(8, 1);
        for i in 0..21 {
            writer.write(&[i as f32]);
        }

        let mut window = SampleWindow::new(5);
        assert_eq!(reader.read_latest(&mut window), 5);
        assert_eq!(window.left(), &[16.0, 17.0, 18.0, 19.0, 20.0]);
    }

    #[test]
    fn test_request_beyond_capacity_truncates() {
        let (writer, reader) = CaptureBuffer::with_capacity(4, 1);
        for i in 0..10 {
            writer.write(&[i as f32]);
        }

        let mut window = SampleWindow::new(6);
        assert_eq!(reader.read_latest(&mut window), 4);
        assert_eq!(window.left(), &[0.0, 0.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_stereo_channels_share_write_index() {
        let (writer, reader) = CaptureBuffer::with_capacity(8, 2);
        writer.write_interleaved(&[0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3], 2, |s| s);

        let mut window = SampleWindow::new(3);
        assert_eq!(reader.read_latest(&mut window), 3);
        assert_eq!(window.left(), &[0.1, 0.2, 0.3]);
        assert_eq!(window.right(), &[-0.1, -0.2, -0.3]);
    }

    #[test]
    fn test_interleaved_layout_adaptation() {
        let (mono_writer, mono_reader) = CaptureBuffer::with_capacity(8, 1);
        mono_writer.write_interleaved(&[1.0f32, 0.0, 0.5, 0.5], 2, |s| s);
        let mut window = SampleWindow::new(2);
        mono_reader.read_latest(&mut window);
        assert_eq!(window.left(), &[0.5, 0.5]);
        assert_eq!(window.right(), &[0.5, 0.5]);

        let (stereo_writer, stereo_reader) = CaptureBuffer::with_capacity(8, 2);
        stereo_writer.write_interleaved(&[i16::MAX], 1, |s| s as f32 / i16::MAX as f32);
        let mut window = SampleWindow::new(1);
        stereo_reader.read_latest(&mut window);
        assert_eq!(window.left(), &[1.0]);
        assert_eq!(window.right(), &[1.0]);
    }

    #[test]
    fn test_non_finite_samples_are_zeroed() {
        let (writer, reader) = CaptureBuffer::with_capacity(4, 1);
        writer.write_interleaved(&[f32::NAN, f32::INFINITY], 1, |s| s);
        let mut window = SampleWindow::new(2);
        reader.read_latest(&mut window);
        assert_eq!(window.left(), &[0.0, 0.0]);
    }

    #[test]
    fn test_concurrent_writer_never_breaks_reader() {
        let (writer, reader) = CaptureBuffer::with_capacity(1024, 2);
        let producer = std::thread::spawn(move || {
            let block: Vec<f32> = (0..256).map(|i| (i % 7) as f32 * 0.1).collect();
            for _ in 0..2000 {
                writer.write_interleaved(&block, 2, |s| s);
            }
        });

        let mut window = SampleWindow::new(2048);
        for _ in 0..200 {
            let valid = reader.read_latest(&mut window);
            assert!(valid <= 1024);
            assert!(window.left().iter().all(|s| (0.0..=0.6 + 1e-6).contains(s)));
        }

        producer.join().unwrap();
        assert_eq!(reader.frames_written(), 2000 * 128);
    }
}
