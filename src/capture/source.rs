//! Frame source abstraction.
//!
//! A live source hands out frames until it is released. This module
//! provides the trait a scan session drives, plus a scripted source that
//! replays a fixed sequence for tests and demonstrations.

use super::{Facing, Frame, SourceConfig};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors that can occur while acquiring or reading a source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The user or platform refused camera access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// No matching device exists.
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    /// The image or device produced unusable data.
    #[error("unreadable image: {0}")]
    Unreadable(String),
    /// The track ended while scanning.
    #[error("source lost: {0}")]
    Lost(String),
    /// Frames were requested before `acquire`.
    #[error("source not acquired")]
    NotAcquired,
}

/// Trait for live frame sources.
///
/// This abstraction allows swapping between real camera hardware
/// and scripted implementations for testing.
pub trait FrameSource {
    /// Acquires the underlying device.
    fn acquire(&mut self, config: &SourceConfig, facing: Facing) -> Result<(), SourceError>;

    /// Returns the current frame.
    ///
    /// `Ok(None)` means no new frame is ready yet. An error means the
    /// source is gone and will not produce further frames.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Checks if the source is currently acquired.
    fn is_acquired(&self) -> bool;

    /// Stops all tracks and releases the device. A no-op when not acquired.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn acquire(&mut self, config: &SourceConfig, facing: Facing) -> Result<(), SourceError> {
        (**self).acquire(config, facing)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn is_acquired(&self) -> bool {
        (**self).is_acquired()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Failed reads in a row after which a live source counts as lost.
pub(crate) const MAX_CONSECUTIVE_READ_FAILURES: u32 = 30;

/// Decides whether a failed frame read ends the track.
///
/// A single failed grab is skipped. The track is lost once the backend says
/// the device is gone, or after `limit` failures in a row.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
pub(crate) struct ReadFailures {
    consecutive: u32,
    limit: u32,
}

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
impl ReadFailures {
    pub(crate) fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    /// A frame arrived.
    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Records a failed read; `Err` means the track has ended.
    pub(crate) fn record(&mut self, message: &str) -> Result<(), SourceError> {
        self.consecutive += 1;
        if device_gone(message) {
            return Err(SourceError::Lost(message.to_string()));
        }
        if self.consecutive >= self.limit {
            return Err(SourceError::Lost(format!(
                "{} failed reads in a row, last: {}",
                self.consecutive, message
            )));
        }
        Ok(())
    }

    pub(crate) fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Default for ReadFailures {
    fn default() -> Self {
        Self::new(MAX_CONSECUTIVE_READ_FAILURES)
    }
}

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn device_gone(message: &str) -> bool {
    const GONE: [&str; 5] = [
        "disconnected",
        "no such device",
        "device removed",
        "stream closed",
        "stream not open",
    ];
    let lowered = message.to_lowercase();
    GONE.iter().any(|marker| lowered.contains(marker))
}

/// One step of a [`ScriptedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Produce a frame.
    Frame,
    /// No frame ready on this poll.
    Idle,
    /// The track ends.
    Lose,
}

/// Scripted source that replays a fixed sequence of steps.
///
/// Once the script is exhausted the source keeps producing frames, like a
/// camera pointed at a static scene.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<ScriptStep>,
    deny: Option<SourceError>,
    acquired: bool,
    facing: Option<Facing>,
    sequence: u64,
    releases: u32,
}

impl ScriptedSource {
    /// Creates a source that produces frames indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that follows `steps` before producing frames
    /// indefinitely.
    pub fn with_script(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Creates a source whose acquisition always fails with `error`.
    pub fn denied(error: SourceError) -> Self {
        Self {
            deny: Some(error),
            ..Self::default()
        }
    }

    /// Number of frames produced so far.
    pub fn frames_served(&self) -> u64 {
        self.sequence
    }

    /// Number of times the source was released while acquired.
    pub fn release_count(&self) -> u32 {
        self.releases
    }

    /// Facing requested by the last successful acquisition.
    pub fn acquired_facing(&self) -> Option<Facing> {
        self.facing
    }
}

impl FrameSource for ScriptedSource {
    fn acquire(&mut self, config: &SourceConfig, facing: Facing) -> Result<(), SourceError> {
        if let Some(error) = &self.deny {
            return Err(error.clone());
        }
        if config.validate().is_err() {
            return Err(SourceError::DeviceNotFound(format!(
                "no mode {}x{}@{}",
                config.width, config.height, config.fps
            )));
        }
        self.acquired = true;
        self.facing = Some(facing);
        tracing::info!(?facing, "ScriptedSource acquired");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.acquired {
            return Err(SourceError::NotAcquired);
        }
        match self.script.pop_front().unwrap_or(ScriptStep::Frame) {
            ScriptStep::Frame => {
                self.sequence += 1;
                Ok(Some(Frame::blank(8, 8, self.sequence)))
            }
            ScriptStep::Idle => Ok(None),
            ScriptStep::Lose => {
                self.acquired = false;
                Err(SourceError::Lost("track ended".into()))
            }
        }
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }

    fn release(&mut self) {
        if self.acquired {
            self.acquired = false;
            self.releases += 1;
            tracing::info!("ScriptedSource released");
        }
    }
}
