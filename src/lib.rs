//! Real-time terminal audio spectrum visualizer.
//!
//! The pipeline runs strictly one way: an audio producer writes into a
//! [`audio::CaptureBuffer`], the [`scheduler::FrameScheduler`] copies the latest
//! window out once per tick, the [`audio::SpectrumAnalyzer`] turns it into a
//! smoothed spectrum, and [`visual::VisualState`] composes a [`render::Frame`]
//! for the render surface.

pub mod audio;
pub mod config;
pub mod error;
pub mod render;
pub mod scheduler;
pub mod ui;
pub mod visual;

pub use config::Settings;
pub use error::{AnalyzerError, InitError, StreamError};
pub use scheduler::{ExitReason, FrameScheduler};
