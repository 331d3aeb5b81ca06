use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use hound::{SampleFormat, WavReader};
use log::{debug, info, warn};

use super::{AudioSource, CaptureBuffer, CaptureReader, CaptureWriter, SampleWindow};
use crate::error::{InitError, StreamError};

/// Producer block length: 10 ms of audio per write.
const BLOCKS_PER_SECOND: u32 = 100;

/// Streams a WAV file into the capture ring at its natural rate, as if it
/// were a live input. End of file is reported as [`StreamError::Ended`].
pub struct WavFileSource {
    name: String,
    sample_rate: u32,
    reader: CaptureReader,
    errors: Receiver<StreamError>,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, InitError> {
        let path = path.as_ref();
        let wav = WavReader::open(path)?;
        let spec = wav.spec();

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => wav.into_samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                wav.into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let channels = spec.channels.max(1) as usize;
        info!(
            "Loaded audio file: {:?} ({}Hz, {} channels, {} frames)",
            path,
            spec.sample_rate,
            channels,
            samples.len() / channels
        );

        let (writer, reader) = CaptureBuffer::with_capacity(capacity, channels);
        debug!(
            "Capture ring: {} frames x {} channels",
            reader.capacity(),
            reader.channels()
        );
        let (error_sender, errors) = crossbeam_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));

        let producer = {
            let running = Arc::clone(&running);
            let sample_rate = spec.sample_rate;
            std::thread::Builder::new()
                .name("tspec-wav".to_string())
                .spawn(move || {
                    Self::produce(samples, channels, sample_rate, writer, error_sender, running)
                })
                .map_err(InitError::Spawn)?
        };

        Ok(Self {
            name: path.display().to_string(),
            sample_rate: spec.sample_rate,
            reader,
            errors,
            running,
            producer: Some(producer),
        })
    }

    fn produce(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
        writer: CaptureWriter,
        errors: Sender<StreamError>,
        running: Arc<AtomicBool>,
    ) {
        let frames_per_block = (sample_rate / BLOCKS_PER_SECOND).max(1) as usize;
        let block_interval = Duration::from_secs(1) / BLOCKS_PER_SECOND;
        let mut deadline = Instant::now();

        for block in samples.chunks(frames_per_block * channels) {
            if !running.load(Ordering::Relaxed) {
                debug!("WAV producer stopped early");
                return;
            }
            writer.write_interleaved(block, channels, |s| s);

            deadline += block_interval;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }

        info!("Reached end of audio file");
        let _ = errors.try_send(StreamError::Ended);
    }
}

impl AudioSource for WavFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn latest_samples(&self, window: &mut SampleWindow) -> usize {
        self.reader.read_latest(window)
    }

    fn poll_stream_error(&mut self) -> Option<StreamError> {
        self.errors.try_recv().ok()
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("WAV producer thread panicked");
            }
        }
    }
}

impl Drop for WavFileSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
