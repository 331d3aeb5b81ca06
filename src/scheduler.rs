//! The fixed-rate render loop.
//!
//! Each tick checks for termination, reads the latest capture window,
//! analyzes it, updates the visual state, presents a frame and handles at
//! most one input event. The loop runs on the main thread; the only other
//! threads are the audio producer and the signal handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::audio::{AudioSource, SampleWindow, SpectrumAnalyzer};
use crate::config::Settings;
use crate::error::StreamError;
use crate::render::RenderSurface;
use crate::ui::{Command, InputEvent};
use crate::visual::VisualState;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// The user pressed a quit key.
    Quit,
    /// The termination flag was cleared by a signal handler.
    Interrupted,
    /// The audio stream failed or ended.
    Stream(StreamError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    Continue,
    Exit(ExitReason),
}

pub struct FrameScheduler<R: RenderSurface, A: AudioSource> {
    // Fields drop in declaration order: surface, then analyzer, then source.
    surface: R,
    analyzer: SpectrumAnalyzer,
    state: VisualState,
    window: SampleWindow,
    mix: Vec<f32>,
    source: A,
    running: Arc<AtomicBool>,
    quit_requested: bool,
    frame_interval: Duration,
    frames: u64,
}

impl<R: RenderSurface, A: AudioSource> FrameScheduler<R, A> {
    pub fn new(
        source: A,
        mut analyzer: SpectrumAnalyzer,
        surface: R,
        settings: &Settings,
        running: Arc<AtomicBool>,
    ) -> Self {
        let state = VisualState::new(
            settings,
            surface.size(),
            source.sample_rate(),
            surface.color_support(),
        )
        .with_source_name(source.name());
        analyzer.set_smoothing(state.controls().smoothing);

        Self {
            window: SampleWindow::new(analyzer.fft_size()),
            mix: Vec::with_capacity(analyzer.fft_size()),
            surface,
            analyzer,
            state,
            source,
            running,
            quit_requested: false,
            frame_interval: settings.frame_interval(),
            frames: 0,
        }
    }

    pub fn state(&self) -> &VisualState {
        &self.state
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One iteration of the loop, without pacing.
    pub fn tick(&mut self) -> Result<Tick> {
        if !self.running.load(Ordering::SeqCst) {
            let reason = if self.quit_requested {
                ExitReason::Quit
            } else {
                ExitReason::Interrupted
            };
            return Ok(Tick::Exit(reason));
        }
        if let Some(error) = self.source.poll_stream_error() {
            return Ok(Tick::Exit(ExitReason::Stream(error)));
        }

        self.state.set_sample_rate(self.source.sample_rate());

        self.source.latest_samples(&mut self.window);
        let mixed = self.window.mix_valid(&mut self.mix);
        let spectrum = self.analyzer.process(mixed);
        self.state.update(&spectrum.smoothed, &self.window);

        self.surface
            .present(self.state.compose())
            .context("Failed to draw frame")?;
        self.frames += 1;

        match self.surface.poll_input().context("Failed to read input")? {
            Some(InputEvent::Resize { cols, rows }) => self.state.resize(cols, rows),
            Some(InputEvent::Command(Command::Quit)) => {
                self.quit_requested = true;
                self.running.store(false, Ordering::SeqCst);
            }
            Some(InputEvent::Command(command)) => {
                let smoothing = self.state.apply(command);
                self.analyzer.set_smoothing(smoothing);
            }
            None => {}
        }

        Ok(Tick::Continue)
    }

    /// Run until quit, interrupt or stream loss, then tear everything down.
    pub fn run(mut self) -> Result<ExitReason> {
        info!(
            "Rendering {} at {:.1} fps",
            self.source.name(),
            1.0 / self.frame_interval.as_secs_f64()
        );

        let outcome = loop {
            let started = Instant::now();
            match self.tick() {
                Ok(Tick::Continue) => {}
                Ok(Tick::Exit(reason)) => break Ok(reason),
                Err(e) => break Err(e),
            }

            if self.frames % 600 == 0 {
                debug!("{} frames rendered", self.frames);
            }
            let elapsed = started.elapsed();
            if elapsed < self.frame_interval {
                thread::sleep(self.frame_interval - elapsed);
            }
        };

        let frames = self.frames;
        self.teardown();
        if let Ok(reason) = &outcome {
            info!("Render loop stopped after {} frames: {:?}", frames, reason);
        }
        outcome
    }

    /// Release the surface first and the audio source last.
    pub fn teardown(mut self) {
        if let Err(e) = self.surface.shutdown() {
            warn!("Failed to restore render surface: {}", e);
        }
        let Self {
            surface,
            analyzer,
            mut source,
            ..
        } = self;
        drop(surface);
        drop(analyzer);
        source.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        CaptureBuffer, CaptureReader, CaptureWriter, RealTransform, RustFftTransform,
    };
    use crate::render::{ColorSupport, Frame};
    use rustfft::num_complex::Complex;
    use std::collections::VecDeque;
    use std::f32::consts::PI;
    use std::io;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct MockSurface {
        size: (u16, u16),
        events: VecDeque<InputEvent>,
        last_frame: Option<Frame>,
        log: Log,
    }

    impl MockSurface {
        fn new(size: (u16, u16), events: Vec<InputEvent>, log: Log) -> Self {
            Self {
                size,
                events: events.into(),
                last_frame: None,
                log,
            }
        }
    }

    impl RenderSurface for MockSurface {
        fn size(&self) -> (u16, u16) {
            self.size
        }

        fn color_support(&self) -> ColorSupport {
            ColorSupport::TrueColor
        }

        fn present(&mut self, frame: &Frame) -> io::Result<()> {
            self.last_frame = Some(frame.clone());
            Ok(())
        }

        fn poll_input(&mut self) -> io::Result<Option<InputEvent>> {
            let event = self.events.pop_front();
            if let Some(InputEvent::Resize { cols, rows }) = event {
                self.size = (cols, rows);
            }
            Ok(event)
        }

        fn shutdown(&mut self) -> io::Result<()> {
            self.log.lock().unwrap().push("surface");
            Ok(())
        }
    }

    struct MockSource {
        writer: CaptureWriter,
        reader: CaptureReader,
        sample_rate: u32,
        errors: VecDeque<StreamError>,
        log: Log,
    }

    impl MockSource {
        fn new(sample_rate: u32, log: Log) -> Self {
            let (writer, reader) = CaptureBuffer::with_capacity(4096, 2);
            Self {
                writer,
                reader,
                sample_rate,
                errors: VecDeque::new(),
                log,
            }
        }

        fn write_sine(&self, frequency: f32, frames: usize) {
            for i in 0..frames {
                let s = (2.0 * PI * frequency * i as f32 / self.sample_rate as f32).sin();
                self.writer.write(&[s, s]);
            }
        }
    }

    impl AudioSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn latest_samples(&self, window: &mut SampleWindow) -> usize {
            self.reader.read_latest(window)
        }

        fn poll_stream_error(&mut self) -> Option<StreamError> {
            self.errors.pop_front()
        }

        fn shutdown(&mut self) {
            self.log.lock().unwrap().push("source");
        }
    }

    struct LoggedTransform {
        inner: RustFftTransform,
        log: Log,
    }

    impl RealTransform for LoggedTransform {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]) {
            self.inner.forward(input, output)
        }
    }

    impl Drop for LoggedTransform {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("analyzer");
        }
    }

    fn settings() -> Settings {
        Settings {
            smoothing: 0.0,
            frame_rate: 240,
            ..Settings::default()
        }
    }

    fn scheduler(events: Vec<InputEvent>, log: &Log) -> FrameScheduler<MockSurface, MockSource> {
        let analyzer = SpectrumAnalyzer::new(2048).unwrap();
        FrameScheduler::new(
            MockSource::new(48000, log.clone()),
            analyzer,
            MockSurface::new((80, 25), events, log.clone()),
            &settings(),
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn test_sine_reaches_the_bars() {
        let log = Log::default();
        let mut scheduler = scheduler(Vec::new(), &log);
        scheduler.source.write_sine(440.0, 2048);

        assert_eq!(scheduler.tick().unwrap(), Tick::Continue);
        let smoothed = &scheduler.analyzer().frame().smoothed;
        let loudest = smoothed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| bin)
            .unwrap();
        assert!(loudest == 18 || loudest == 19);
        assert!(scheduler.state().bars().iter().any(|b| b.value > 0.5));
        assert!(scheduler.surface().last_frame.is_some());
    }

    #[test]
    fn test_resize_from_80_to_40_columns() {
        let log = Log::default();
        let mut scheduler = scheduler(vec![InputEvent::Resize { cols: 40, rows: 20 }], &log);
        scheduler.source.write_sine(1000.0, 2048);

        scheduler.tick().unwrap();
        assert_eq!(scheduler.state().bars().len(), 40);
        assert_eq!(scheduler.state().mapping().len(), 40);
        assert_eq!(scheduler.state().waterfall().width(), 40);

        scheduler.tick().unwrap();
        let frame = scheduler.surface().last_frame.as_ref().unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 20));
    }

    #[test]
    fn test_quit_exits_on_next_tick() {
        let log = Log::default();
        let mut scheduler = scheduler(vec![InputEvent::Command(Command::Quit)], &log);
        assert_eq!(scheduler.tick().unwrap(), Tick::Continue);
        assert_eq!(scheduler.tick().unwrap(), Tick::Exit(ExitReason::Quit));
    }

    #[test]
    fn test_cleared_flag_is_an_interrupt() {
        let log = Log::default();
        let mut scheduler = scheduler(Vec::new(), &log);
        scheduler.running.store(false, Ordering::SeqCst);
        assert_eq!(scheduler.tick().unwrap(), Tick::Exit(ExitReason::Interrupted));
        assert_eq!(scheduler.frames(), 0);
    }

    #[test]
    fn test_stream_error_stops_the_loop() {
        let log = Log::default();
        let mut scheduler = scheduler(Vec::new(), &log);
        scheduler.source.errors.push_back(StreamError::Ended);
        assert_eq!(
            scheduler.tick().unwrap(),
            Tick::Exit(ExitReason::Stream(StreamError::Ended))
        );
    }

    #[test]
    fn test_smoothing_command_reaches_analyzer() {
        let log = Log::default();
        let mut scheduler = scheduler(vec![InputEvent::Command(Command::SmoothingUp)], &log);
        assert_eq!(scheduler.analyzer().smoothing(), 0.0);
        scheduler.tick().unwrap();
        assert!((scheduler.analyzer().smoothing() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_sample_rate_change_is_picked_up() {
        let log = Log::default();
        let mut scheduler = scheduler(Vec::new(), &log);
        scheduler.source.sample_rate = 44100;
        scheduler.tick().unwrap();
        assert_eq!(scheduler.state().sample_rate(), 44100);
    }

    #[test]
    fn test_run_tears_down_in_order() {
        let log = Log::default();
        let transform = LoggedTransform {
            inner: RustFftTransform::new(1024).unwrap(),
            log: log.clone(),
        };
        let analyzer = SpectrumAnalyzer::with_transform(Box::new(transform)).unwrap();
        let scheduler = FrameScheduler::new(
            MockSource::new(48000, log.clone()),
            analyzer,
            MockSurface::new((20, 10), vec![InputEvent::Command(Command::Quit)], log.clone()),
            &settings(),
            Arc::new(AtomicBool::new(true)),
        );

        assert_eq!(scheduler.run().unwrap(), ExitReason::Quit);
        assert_eq!(*log.lock().unwrap(), vec!["surface", "analyzer", "source"]);
    }
}
