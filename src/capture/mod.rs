//! Frame sources and frame handling.
//!
//! This module provides abstractions for pulling frames from a live
//! camera or loading a single still image. Sources only deliver pixels;
//! decoding happens in [`crate::decode`].

#[cfg(feature = "camera")]
mod camera;
mod config;
mod frame;
mod source;
mod still;

#[cfg(feature = "camera")]
pub use camera::NativeCamera;
pub use config::{ConfigError, Facing, FileConfig, OutputConfig, SourceConfig};
pub use frame::Frame;
pub use source::{FrameSource, ScriptStep, ScriptedSource, SourceError};
pub use still::{ImageFile, ImageSource};
