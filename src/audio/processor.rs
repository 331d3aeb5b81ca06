use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use super::{AudioSource, CaptureBuffer, CaptureReader, CaptureWriter, SampleWindow};
use crate::error::{InitError, StreamError};

/// Live capture from a cpal input device into the shared ring.
pub struct CpalSource {
    name: String,
    sample_rate: u32,
    reader: CaptureReader,
    errors: Receiver<StreamError>,
    stream: Option<Stream>,
}

impl CpalSource {
    /// Open the default input device, or the first device whose name contains
    /// `device_hint`, and start streaming into a ring of `capacity` frames.
    pub fn open(
        client_name: &str,
        device_hint: Option<&str>,
        capacity: usize,
    ) -> Result<Self, InitError> {
        let host = cpal::default_host();
        let device = Self::select_device(&host, device_hint)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| InitError::Backend(format!("Failed to get default input config: {}", e)))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        info!("{}: using audio device: {}", client_name, device_name);
        info!(
            "Audio config: {} channels at {} Hz ({:?})",
            config.channels, config.sample_rate.0, sample_format
        );

        let (writer, reader) = CaptureBuffer::with_capacity(capacity, config.channels as usize);
        debug!(
            "Capture ring: {} frames x {} channels",
            reader.capacity(),
            reader.channels()
        );
        let (error_sender, errors) = crossbeam_channel::bounded(8);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, writer, error_sender)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, writer, error_sender)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, writer, error_sender)?,
            SampleFormat::I32 => Self::build_stream::<i32>(&device, &config, writer, error_sender)?,
            other => return Err(InitError::UnsupportedFormat(format!("{:?}", other))),
        };
        stream
            .play()
            .map_err(|e| InitError::Backend(format!("Failed to start input stream: {}", e)))?;

        Ok(Self {
            name: device_name,
            sample_rate: config.sample_rate.0,
            reader,
            errors,
            stream: Some(stream),
        })
    }

    fn select_device(host: &cpal::Host, device_hint: Option<&str>) -> Result<Device, InitError> {
        let Some(hint) = device_hint else {
            return host.default_input_device().ok_or(InitError::NoInputDevice);
        };

        host
            .input_devices()
            .map_err(|e| InitError::Backend(format!("Failed to list input devices: {}", e)))?
            .find(|device| {
                device
                    .name()
                    .map(|name| device_matches(&name, hint))
                    .unwrap_or(false)
            })
            .ok_or_else(|| InitError::DeviceNotFound(hint.to_string()))
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        writer: CaptureWriter,
        errors: Sender<StreamError>,
    ) -> Result<Stream, InitError>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        let channels = config.channels as usize;
        info!("Creating input stream with {} channels at {} Hz", channels, config.sample_rate.0);

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    writer.write_interleaved(data, channels, |s| f32::from_sample(s));
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                    let event = match err {
                        cpal::StreamError::DeviceNotAvailable => StreamError::Disconnected,
                        other => StreamError::Backend(other.to_string()),
                    };
                    let _ = errors.try_send(event);
                },
                None,
            )
            .map_err(|e| InitError::Backend(format!("Failed to build input stream: {}", e)))
    }
}

impl AudioSource for CpalSource {
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
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause input stream: {}", e);
            }
            info!("Audio capture stopped");
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Case-insensitive substring match of a device name against a user hint.
fn device_matches(name: &str, hint: &str) -> bool {
    name.to_lowercase().contains(&hint.to_lowercase())
}
