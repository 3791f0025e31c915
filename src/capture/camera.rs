//! Native camera source backed by `nokhwa`.

use super::source::ReadFailures;
use super::{Facing, Frame, FrameSource, SourceConfig, SourceError};
use nokhwa::{
    pixel_format::LumaFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
        RequestedFormatType, Resolution,
    },
    Camera, NokhwaError,
};

/// A platform camera streaming luma frames.
#[derive(Default)]
pub struct NativeCamera {
    camera: Option<Camera>,
    sequence: u64,
    read_failures: ReadFailures,
}

impl NativeCamera {
    /// Creates an unopened camera; the device is chosen on acquire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the device whose name matches `facing`, falling back to the
    /// configured index.
    fn select_device(config: &SourceConfig, facing: Facing) -> Result<CameraIndex, SourceError> {
        let devices = nokhwa::query(ApiBackend::Auto).map_err(map_open_error)?;
        if devices.is_empty() {
            return Err(SourceError::DeviceNotFound("no cameras attached".into()));
        }

        let hints = facing.name_hints();
        let by_facing = devices.iter().find(|info| {
            let name = info.human_name().to_lowercase();
            hints.iter().any(|hint| name.contains(hint))
        });

        match by_facing {
            Some(info) => {
                tracing::debug!(name = %info.human_name(), ?facing, "Selected camera by facing");
                Ok(info.index().clone())
            }
            None => Ok(CameraIndex::Index(config.device_index)),
        }
    }
}

impl FrameSource for NativeCamera {
    fn acquire(&mut self, config: &SourceConfig, facing: Facing) -> Result<(), SourceError> {
        config
            .validate()
            .map_err(|e| SourceError::DeviceNotFound(e.to_string()))?;

        let index = Self::select_device(config, facing)?;
        let requested = RequestedFormat::new::<LumaFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        let mut camera = Camera::new(index, requested).map_err(map_open_error)?;
        camera.open_stream().map_err(map_open_error)?;

        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            "NativeCamera opened"
        );
        self.camera = Some(camera);
        self.sequence = 0;
        self.read_failures.reset();
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let camera = self.camera.as_mut().ok_or(SourceError::NotAcquired)?;

        let buffer = match camera.frame() {
            Ok(buffer) => {
                self.read_failures.reset();
                buffer
            }
            Err(e) => {
                let message = e.to_string();
                self.read_failures.record(&message)?;
                tracing::debug!(
                    error = %message,
                    consecutive = self.read_failures.consecutive(),
                    "Skipping failed frame grab"
                );
                return Ok(None);
            }
        };
        let image = match buffer.decode_image::<LumaFormat>() {
            Ok(image) => image,
            Err(e) => {
                // A corrupt MJPEG frame is not a lost track.
                tracing::debug!(error = %e, "Dropping undecodable camera frame");
                return Ok(None);
            }
        };

        self.sequence += 1;
        let (width, height) = (image.width(), image.height());
        Ok(Some(Frame::new(image.into_raw(), width, height, self.sequence)))
    }

    fn is_acquired(&self) -> bool {
        self.camera.is_some()
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream cleanly");
            }
            tracing::info!("NativeCamera closed");
        }
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.release();
    }
}

fn map_open_error(error: NokhwaError) -> SourceError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        SourceError::PermissionDenied(message)
    } else {
        SourceError::DeviceNotFound(message)
    }
}
